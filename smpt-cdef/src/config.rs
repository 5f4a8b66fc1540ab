// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Generator configuration.
//!
//! Defaults match a source checkout or an installed package. Two environment variables
//! override them, which is how the `smpt-sys` build script points the pipeline at a
//! specific vendor tree or compiler:
//!
//! - `SMPT_INCLUDE_DIR`: include root tried before every default candidate.
//! - `SMPT_CPP`: preprocessor program to use instead of probing `PATH`.

use std::{collections::HashSet, env, path::PathBuf};

use crate::{locator, manifest::HeaderManifest, platform::Platform};

/// Environment variable naming an include root.
pub const INCLUDE_DIR_ENV: &str = "SMPT_INCLUDE_DIR";
/// Environment variable naming a preprocessor program.
pub const CPP_ENV: &str = "SMPT_CPP";

/// Settings of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Include-root candidates, most preferred first.
    pub candidates: Vec<PathBuf>,
    /// Target platform.
    pub platform: Platform,
    /// Explicit preprocessor; searched for on `PATH` when `None`.
    pub preprocessor: Option<PathBuf>,
    /// Functions never emitted.
    pub function_exclusions: HashSet<String>,
    /// Define names never harvested.
    pub define_blacklist: HashSet<String>,
    /// Overrides the vendor manifest.
    pub manifest: Option<HeaderManifest>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            candidates: locator::default_candidates(),
            platform: Platform::current(),
            preprocessor: None,
            function_exclusions: HashSet::new(),
            define_blacklist: HashSet::from(["main".to_string()]),
            manifest: None,
        }
    }
}

impl GeneratorConfig {
    /// A configuration that only considers `include_root`.
    pub fn with_include_root(include_root: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![include_root.into()],
            ..Self::default()
        }
    }

    /// Applies `SMPT_INCLUDE_DIR` and `SMPT_CPP` on top of `self`.
    pub fn from_env(mut self) -> Self {
        if let Some(dir) = env::var_os(INCLUDE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.candidates.insert(0, PathBuf::from(dir));
        }
        if let Some(cpp) = env::var_os(CPP_ENV).filter(|v| !v.is_empty()) {
            self.preprocessor = Some(PathBuf::from(cpp));
        }
        self
    }
}
