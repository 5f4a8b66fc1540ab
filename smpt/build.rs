// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Build script for the `smpt` crate.
//!
//! This script generates `constants.rs` containing compile-time paths to the
//! workspace root and the local library directory. These paths are used by the
//! configuration module to search for a development build of the library.

use std::env;
use std::path::PathBuf;

fn main() {
    // Workspace root is one level up from this crate
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("failed to get current directory"));
    let repo_root = manifest_dir.parent().unwrap();
    let local_lib_dir = repo_root.join("lib");

    // Generate constants.rs in the build output directory
    let out_path = PathBuf::from(env::var("OUT_DIR").expect("failed to get output directory"))
        .join("constants.rs");

    let data = format!(
        "pub const SMPT_REPO_ROOT: &str = {:?};\n\
        pub const SMPT_LOCAL_LIB_DIR: &str = {:?};\n",
        repo_root.to_string_lossy(),
        local_lib_dir.to_string_lossy()
    );
    std::fs::write(out_path, data).expect("Unable to write file");
}
