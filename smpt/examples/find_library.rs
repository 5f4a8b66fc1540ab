// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Shows which ScienceMode library would be loaded and optionally checks a serial port.
//!
//! ```text
//! cargo run -p smpt --example find_library -- --lib-dir ./lib --port /dev/ttyUSB0
//! ```

mod common;

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use smpt::{
    Device, LibraryArtifact, LoaderConfig, Resolver,
    api::select_from,
    resolver::{DynamicLoader, LoadAttempt},
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Opts {
    /// Directory searched before the defaults.
    #[arg(long, env = "SMPT_LIB_DIR")]
    lib_dir: Option<PathBuf>,

    /// Serial port to check and open.
    #[arg(long)]
    port: Option<String>,
}

#[derive(Serialize)]
struct Report {
    search_dirs: Vec<PathBuf>,
    loaded: Option<LibraryArtifact>,
    static_artifacts: Vec<LibraryArtifact>,
    attempts: Vec<LoadAttempt>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::setup_logging();
    let opts: Opts = Opts::parse();

    let mut config = LoaderConfig::default();
    if let Some(dir) = opts.lib_dir {
        config.search_dirs.insert(0, dir);
    }

    let resolution = Resolver::new(&config).resolve(&mut DynamicLoader);
    let report = Report {
        search_dirs: config.search_dirs.clone(),
        loaded: resolution.loaded.as_ref().map(|(artifact, _)| artifact.clone()),
        static_artifacts: resolution.static_artifacts.clone(),
        attempts: resolution.attempts.clone(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.loaded.is_none() && !report.static_artifacts.is_empty() {
        info!("link the static library into a shared one to use it");
    }

    let api = select_from(resolution);
    if let Some(port) = opts.port {
        let present = Device::check_serial_port(&api, &port)?;
        info!(port = %port, present, binding = ?api.kind(), "checked serial port");
        if present {
            let mut device = Device::open(api, &port)?;
            match device.send_get_extended_version() {
                Ok(packet_number) => info!(packet_number, "requested extended version"),
                Err(err) => warn!(error = %err, "extended version not available"),
            }
        }
    }
    Ok(())
}
