// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Writes the binding descriptor for a ScienceMode header tree.
//!
//! ```text
//! cargo run -p smpt-cdef --example generate_cdef -- \
//!     --include-dir smpt/ScienceMode_Library/include --output smpt.cdef --report
//! ```

use std::path::PathBuf;

use clap::Parser;
use smpt_cdef::{Generator, GeneratorConfig};
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Opts {
    /// Include root to use before the default candidates.
    #[arg(long, env = "SMPT_INCLUDE_DIR")]
    include_dir: Option<PathBuf>,

    /// C preprocessor program. Searched for on PATH when omitted.
    #[arg(long, env = "SMPT_CPP")]
    cpp: Option<PathBuf>,

    /// File the descriptor is written to.
    #[arg(long, short, default_value = "smpt.cdef")]
    output: PathBuf,

    /// Print the generation report as JSON.
    #[arg(long)]
    report: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let opts: Opts = Opts::parse();

    let mut config = GeneratorConfig::default();
    if let Some(dir) = opts.include_dir {
        config.candidates.insert(0, dir);
    }
    config.preprocessor = opts.cpp;

    let generation = Generator::new(config).generate();
    std::fs::write(&opts.output, generation.descriptor.render())?;
    info!(
        output = %opts.output.display(),
        minimal = generation.descriptor.is_minimal(),
        "wrote binding descriptor"
    );

    if opts.report {
        println!("{}", serde_json::to_string_pretty(&generation.report)?);
    }
    Ok(())
}
