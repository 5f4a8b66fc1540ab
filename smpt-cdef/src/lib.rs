// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! # smpt-cdef
//!
//! Turns the ScienceMode C header tree into a binding descriptor: a plain text list of
//! `#define` lines, type declarations and function prototypes that describes the
//! vendor library to the binding layer.
//!
//! ## Pipeline
//!
//! ```text
//! locate include root ──► parse root headers (fallback tiers) ──► collect declarations
//!                     └─► harvest #define constants ─────────────────┐
//!                                                                    ▼
//!                                                        assemble descriptor
//! ```
//!
//! Every stage degrades instead of failing. A missing include tree, a missing
//! preprocessor or a header that no tier can parse still produce a descriptor; if no
//! header parses at all, a small hand-written descriptor is used.
//!
//! ## Examples
//!
//! ```no_run
//! use smpt_cdef::{Generator, GeneratorConfig};
//!
//! let generation = Generator::new(GeneratorConfig::default().from_env()).generate();
//! println!("{}", generation.descriptor);
//! ```

pub mod assemble;
pub mod c;
pub mod collector;
pub mod config;
mod error;
pub mod harvest;
pub mod layout;
pub mod locator;
pub mod manifest;
pub mod minimal;
pub mod orchestrator;
pub mod platform;
pub mod preprocess;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

pub use assemble::{Assembler, BindingDescriptor};
pub use collector::{Accumulator, Collector};
pub use config::GeneratorConfig;
pub use error::{Error, Result};
pub use locator::{IncludeRoot, Layout};
pub use manifest::HeaderManifest;
pub use orchestrator::{Attempt, Orchestrator, Outcome, Tier};
pub use platform::{Os, Platform};
pub use preprocess::{CommandPreprocessor, NoPreprocessor, Preprocessor};

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub include_root: IncludeRoot,
    pub preprocessor: String,
    pub attempts: Vec<Attempt>,
    pub parsed_headers: Vec<String>,
    pub skipped_headers: Vec<String>,
    pub defines: usize,
    pub types: usize,
    pub functions: usize,
    /// Set when no header parsed and the minimal descriptor was used.
    pub minimal: bool,
}

/// Output of [`Generator::generate`].
#[derive(Debug, Clone)]
pub struct Generation {
    pub descriptor: BindingDescriptor,
    pub report: GenerationReport,
}

/// Runs the descriptor pipeline.
pub struct Generator {
    config: GeneratorConfig,
    preprocessor: Box<dyn Preprocessor>,
}

impl Generator {
    /// Creates a generator using the configured preprocessor, or the first one found on
    /// `PATH`.
    pub fn new(config: GeneratorConfig) -> Self {
        let preprocessor: Box<dyn Preprocessor> = match &config.preprocessor {
            Some(program) => Box::new(CommandPreprocessor::new(program)),
            None => match CommandPreprocessor::discover() {
                Some(found) => Box::new(found),
                None => {
                    warn!("no C preprocessor found, only raw parsing is available");
                    Box::new(NoPreprocessor)
                }
            },
        };
        Self {
            config,
            preprocessor,
        }
    }

    /// Creates a generator with a specific preprocessor implementation.
    pub fn with_preprocessor(config: GeneratorConfig, preprocessor: impl Preprocessor + 'static) -> Self {
        Self {
            config,
            preprocessor: Box::new(preprocessor),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Runs the whole pipeline. Never fails; see [`GenerationReport`] for what happened.
    pub fn generate(&self) -> Generation {
        let config = &self.config;
        let root = locator::locate(&config.candidates);
        let manifest = config
            .manifest
            .clone()
            .unwrap_or_else(|| HeaderManifest::vendor(root.layout()));

        let collector = Collector::new(&root, &config.function_exclusions);
        let parsed = Orchestrator::new(
            &root,
            &config.platform,
            self.preprocessor.as_ref(),
            collector,
        )
        .run(&manifest.root_headers);

        let minimal = parsed.parsed.is_empty();
        let accumulator = if minimal {
            warn!("could not parse any headers, using the minimal descriptor");
            minimal::minimal_accumulator()
        } else {
            parsed.accumulator
        };

        let declared: HashSet<String> = accumulator.declared_names().iter().cloned().collect();
        let defines = harvest::harvest(
            &root,
            &manifest.define_headers,
            &config.define_blacklist,
            &declared,
        );
        let descriptor = Assembler::new(&config.platform).assemble(&defines, &accumulator, minimal);

        info!(
            defines = descriptor.defines().len(),
            types = descriptor.types().len(),
            functions = descriptor.functions().len(),
            minimal,
            "assembled binding descriptor"
        );

        let report = GenerationReport {
            include_root: root,
            preprocessor: self.preprocessor.name().to_string(),
            attempts: parsed.attempts,
            parsed_headers: parsed.parsed,
            skipped_headers: parsed.skipped,
            defines: descriptor.defines().len(),
            types: descriptor.types().len(),
            functions: descriptor.functions().len(),
            minimal,
        };
        Generation { descriptor, report }
    }
}
