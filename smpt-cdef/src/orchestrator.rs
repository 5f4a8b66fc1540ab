// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Fallback parse orchestrator.
//!
//! Each root header goes through up to four tiers, each weaker than the previous one:
//!
//! 1. [`Tier::FullPreprocess`]: preprocessor with the complete macro table.
//! 2. [`Tier::MinimalPreprocess`]: preprocessor with include paths and a few defines.
//! 3. [`Tier::Raw`]: the header text as-is, no conditional compilation.
//! 4. [`Tier::ManualPreprocess`]: comments stripped and a `#define` prelude prepended,
//!    written to a temporary file and parsed like tier 3.
//!
//! A header that fails all four is skipped. Every attempt is recorded.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    Error, Result,
    c::{self, Mode, TranslationUnit},
    collector::{Accumulator, Collector},
    locator::IncludeRoot,
    platform::Platform,
    preprocess::{self, Preprocessor},
};

/// One parsing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    FullPreprocess,
    MinimalPreprocess,
    Raw,
    ManualPreprocess,
}

impl Tier {
    /// All tiers, strongest first.
    pub const ALL: [Tier; 4] = [
        Tier::FullPreprocess,
        Tier::MinimalPreprocess,
        Tier::Raw,
        Tier::ManualPreprocess,
    ];
}

/// What happened in one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded {
        /// New type entries contributed.
        types: usize,
        /// New function entries contributed.
        functions: usize,
        /// Foreign declarations skipped by the parser.
        skipped: usize,
    },
    Failed {
        reason: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }
}

/// Log entry for one header and tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub header: String,
    pub tier: Tier,
    pub outcome: Outcome,
}

/// Result of running every root header through the tiers.
#[derive(Debug, Clone, Default)]
pub struct ParsedHeaders {
    pub accumulator: Accumulator,
    pub attempts: Vec<Attempt>,
    /// Headers that parsed under some tier.
    pub parsed: Vec<String>,
    /// Headers that failed every tier.
    pub skipped: Vec<String>,
}

/// Drives headers through the fallback tiers.
pub struct Orchestrator<'a> {
    root: &'a IncludeRoot,
    platform: &'a Platform,
    preprocessor: &'a dyn Preprocessor,
    collector: Collector<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        root: &'a IncludeRoot,
        platform: &'a Platform,
        preprocessor: &'a dyn Preprocessor,
        collector: Collector<'a>,
    ) -> Self {
        Self {
            root,
            platform,
            preprocessor,
            collector,
        }
    }

    /// Parses every header in order.
    pub fn run(&self, headers: &[String]) -> ParsedHeaders {
        let mut parsed = ParsedHeaders::default();
        for header in headers {
            let (accumulator, success) = self.parse_header(
                header,
                std::mem::take(&mut parsed.accumulator),
                &mut parsed.attempts,
            );
            parsed.accumulator = accumulator;
            if success {
                parsed.parsed.push(header.clone());
            } else {
                warn!(header = %header, "all parsing strategies failed, skipping header");
                parsed.skipped.push(header.clone());
            }
        }
        parsed
    }

    /// Runs one header through the tiers until one succeeds.
    ///
    /// Declarations are only added from the successful tier. Returns the accumulator
    /// and whether any tier succeeded.
    pub fn parse_header(
        &self,
        header: &str,
        mut acc: Accumulator,
        attempts: &mut Vec<Attempt>,
    ) -> (Accumulator, bool) {
        let path = self.root.header_path(header);
        for tier in Tier::ALL {
            match self.attempt(tier, &path) {
                Ok(unit) => {
                    let (types, functions) = (acc.types().len(), acc.functions().len());
                    acc = self.collector.collect(&unit, acc);
                    let outcome = Outcome::Succeeded {
                        types: acc.types().len() - types,
                        functions: acc.functions().len() - functions,
                        skipped: unit.skipped,
                    };
                    info!(header = %header, ?tier, ?outcome, "parsed header");
                    attempts.push(Attempt {
                        header: header.to_string(),
                        tier,
                        outcome,
                    });
                    return (acc, true);
                }
                Err(error) => {
                    debug!(header = %header, ?tier, %error, "parse attempt failed");
                    attempts.push(Attempt {
                        header: header.to_string(),
                        tier,
                        outcome: Outcome::Failed {
                            reason: error.to_string(),
                        },
                    });
                }
            }
        }
        (acc, false)
    }

    fn attempt(&self, tier: Tier, path: &Path) -> Result<TranslationUnit> {
        match tier {
            Tier::FullPreprocess => {
                let args = preprocess::full_tier_args(self.root, self.platform);
                let text = self.preprocessor.preprocess(path, &args)?;
                self.parse(&text, None, Mode::Preprocessed)
            }
            Tier::MinimalPreprocess => {
                let args = preprocess::minimal_tier_args(self.root);
                let text = self.preprocessor.preprocess(path, &args)?;
                self.parse(&text, None, Mode::Preprocessed)
            }
            Tier::Raw => {
                let text = read(path)?;
                self.parse(&text, Some(path), Mode::Raw)
            }
            Tier::ManualPreprocess => {
                let text = read(path)?;
                let prepared = preprocess::manual_preprocess(&text, path, self.platform);
                let mut file = tempfile::Builder::new()
                    .prefix("smpt_")
                    .suffix(".h")
                    .tempfile()
                    .map_err(|source| Error::io(std::env::temp_dir(), source))?;
                file.write_all(prepared.as_bytes())
                    .map_err(|source| Error::io(file.path(), source))?;
                let temp_path: PathBuf = file.path().to_path_buf();
                let text = read(&temp_path)?;
                self.parse(&text, Some(&temp_path), Mode::Raw)
            }
        }
    }

    fn parse(&self, text: &str, file: Option<&Path>, mode: Mode) -> Result<TranslationUnit> {
        let file = file.map(|path| path.to_string_lossy().into_owned());
        c::parse_source(text, file.as_deref(), mode, |location| {
            self.collector.is_foreign(location)
        })
    }
}

fn read(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| Error::io(path, source))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
