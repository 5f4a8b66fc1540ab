// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Build script for the `smpt-sys` FFI crate.
//!
//! This script:
//! 1. Locates the ScienceMode include tree (honouring `SMPT_INCLUDE_DIR`)
//! 2. Runs the header-to-descriptor pipeline from `smpt-cdef` (honouring `SMPT_CPP`)
//! 3. Writes the descriptor to `OUT_DIR/smpt.cdef` for `include_str!`
//! 4. Generates the records and the `SmptLibrary` function table with `bindgen`,
//!    restricted to the names the descriptor declares
//!
//! The pipeline never fails. Without vendor headers the minimal descriptor is written
//! and the crate compiles its hand-written records. When headers were parsed but
//! `bindgen` cannot run, the hand-written records are checked against the descriptor
//! and the build stops if they disagree.

use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use smpt_cdef::{
    BindingDescriptor, Generation, Generator, GeneratorConfig, Platform,
    config::{CPP_ENV, INCLUDE_DIR_ENV},
    layout, minimal,
};

/// cfg set when `OUT_DIR/bindings.rs` was generated.
const BINDGEN_CFG: &str = "smpt_bindgen";

/// Functions the safe layer calls through the table.
const REQUIRED_FUNCTIONS: [&str; 11] = [
    "smpt_open_serial_port",
    "smpt_close_serial_port",
    "smpt_check_serial_port",
    "smpt_packet_number_generator_next",
    "smpt_new_packet_received",
    "smpt_last_ack",
    "smpt_send_get_extended_version",
    "smpt_get_get_extended_version_ack",
    "smpt_send_ll_init",
    "smpt_send_ll_channel_config",
    "smpt_send_ll_stop",
];

/// Records the safe layer reads or fills in.
const REQUIRED_TYPES: [&str; 6] = [
    "Smpt_Result",
    "Smpt_device",
    "Smpt_ll_init",
    "Smpt_ll_channel_config",
    "Smpt_get_extended_version_ack",
    "Smpt_ack",
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={INCLUDE_DIR_ENV}");
    println!("cargo:rerun-if-env-changed={CPP_ENV}");
    println!("cargo:rerun-if-env-changed=LIBCLANG_PATH");
    println!("cargo::rustc-check-cfg=cfg({BINDGEN_CFG})");

    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("failed to get current directory"));
    let repo_root = manifest_dir.parent().unwrap();
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Candidates relative to the workspace root come before the working-directory ones.
    let mut config = GeneratorConfig::default();
    let workspace_candidates = [
        repo_root.join("smpt").join("ScienceMode_Library").join("include"),
        repo_root.join("smpt").join("ScienceMode_Library"),
        repo_root.join("include").join("ScienceMode4"),
    ];
    for (index, candidate) in workspace_candidates.into_iter().enumerate() {
        config.candidates.insert(index, candidate);
    }
    let config = config.from_env();
    let platform = config.platform.clone();

    let generation = Generator::new(config).generate();
    let report = &generation.report;
    if report.include_root.is_found() {
        println!("cargo:include={}", report.include_root.path().display());
        for header in &report.parsed_headers {
            println!(
                "cargo:rerun-if-changed={}",
                report.include_root.header_path(header).display()
            );
        }
    }

    std::fs::write(out_dir.join("smpt.cdef"), generation.descriptor.render())
        .expect("Could not write descriptor");

    if generation.descriptor.is_minimal() {
        return;
    }
    match generate_bindings(&generation, &platform) {
        Some(bindings) => {
            std::fs::write(out_dir.join("bindings.rs"), bindings)
                .expect("Could not write bindings");
            println!("cargo:rustc-cfg={BINDGEN_CFG}");
        }
        None => check_fallback(&generation.descriptor),
    }
}

/// Runs `bindgen` over the parsed root headers. Returns `None` when libclang is missing,
/// clang rejects the headers or the output lacks something the safe layer uses.
fn generate_bindings(generation: &Generation, platform: &Platform) -> Option<String> {
    let root = &generation.report.include_root;
    let descriptor = &generation.descriptor;
    let wrapper: String = generation
        .report
        .parsed_headers
        .iter()
        .map(|header| format!("#include \"{}\"\n", root.header_path(header).display()))
        .collect();

    let mut builder = bindgen::builder()
        .header_contents("smpt_wrapper.h", &wrapper)
        .clang_args(root.include_dirs().iter().map(|dir| include_arg(dir)))
        .clang_arg(format!("-D{}", platform.identity_macro))
        .derive_default(true)
        .derive_debug(true)
        .prepend_enum_name(false)
        .dynamic_library_name("SmptLibrary")
        .dynamic_link_require_all(false)
        .layout_tests(false);
    for name in descriptor.function_names() {
        builder = builder.allowlist_function(regex_literal(&name));
    }
    for name in descriptor
        .type_names()
        .iter()
        .map(String::as_str)
        .chain(REQUIRED_TYPES)
    {
        builder = builder.allowlist_type(regex_literal(name));
    }
    for define in descriptor.defines() {
        if let Some(name) = define.split_whitespace().nth(1) {
            builder = builder.allowlist_var(regex_literal(name));
        }
    }
    for name in REQUIRED_FUNCTIONS {
        builder = builder.allowlist_function(name);
    }

    // A missing libclang panics inside clang-sys instead of returning an error.
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let generated = panic::catch_unwind(AssertUnwindSafe(|| builder.generate()));
    panic::set_hook(hook);

    let bindings = match generated {
        Ok(Ok(bindings)) => bindings.to_string(),
        Ok(Err(err)) => {
            println!("cargo:warning=bindgen failed, using hand-written records: {err}");
            return None;
        }
        Err(_) => {
            println!("cargo:warning=libclang not available, using hand-written records");
            return None;
        }
    };

    let mut missing: Vec<&str> = REQUIRED_FUNCTIONS
        .iter()
        .filter(|name| !bindings.contains(&format!("pub {name}:")))
        .chain(
            REQUIRED_TYPES[1..]
                .iter()
                .filter(|name| !bindings.contains(&format!("pub struct {name} "))),
        )
        .copied()
        .collect();
    if !bindings.contains("Smpt_Result_Successful") {
        missing.push("Smpt_Result_Successful");
    }
    if !missing.is_empty() {
        println!(
            "cargo:warning=generated bindings lack {}, using hand-written records",
            missing.join(", ")
        );
        return None;
    }
    Some(bindings)
}

/// Stops the build when the hand-written records disagree with the parsed headers.
fn check_fallback(descriptor: &BindingDescriptor) {
    let mismatches = layout::check_records(descriptor, &minimal::MINIMAL_TYPES);
    if !mismatches.is_empty() {
        panic!(
            "hand-written records do not match the ScienceMode headers:\n  {}\n\
             install libclang (or set LIBCLANG_PATH) so bindings can be generated",
            mismatches.join("\n  ")
        );
    }
}

fn include_arg(dir: &Path) -> String {
    format!("-I{}", dir.display())
}

fn regex_literal(name: &str) -> String {
    format!("^{name}$")
}
