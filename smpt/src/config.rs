// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Search-path configuration for the native ScienceMode library.
//!
//! Directories are searched in this order:
//!
//! 1. `SMPT_LIB_DIR`, when set
//! 2. the directory of the running executable (bundled libraries)
//! 3. the workspace `lib/` directory of a development checkout
//! 4. `~/.local/lib`
//! 5. the platform's system library directories

use std::{env, path::PathBuf, str::FromStr};

use smpt_cdef::Platform;

// Build script generates constants.rs with SMPT_REPO_ROOT and SMPT_LOCAL_LIB_DIR
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

/// Environment variable naming a directory searched before all others.
pub const LIB_DIR_ENV: &str = "SMPT_LIB_DIR";

/// Where and for which platform the resolver looks for the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Search directories, most preferred first.
    pub search_dirs: Vec<PathBuf>,
    /// Library naming conventions to apply.
    pub platform: Platform,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let platform = Platform::current();
        Self {
            search_dirs: default_search_dirs(&platform),
            platform,
        }
    }
}

impl LoaderConfig {
    /// A configuration searching exactly `search_dirs`.
    pub fn new(search_dirs: impl IntoIterator<Item = PathBuf>, platform: Platform) -> Self {
        Self {
            search_dirs: search_dirs.into_iter().collect(),
            platform,
        }
    }

    /// Prepends `SMPT_LIB_DIR` to the search directories when it is set.
    pub fn from_env(mut self) -> Self {
        if let Some(dir) = env::var_os(LIB_DIR_ENV).filter(|v| !v.is_empty()) {
            self.search_dirs.insert(0, PathBuf::from(dir));
        }
        self
    }
}

/// Default search directories for `platform`, most preferred first.
pub fn default_search_dirs(platform: &Platform) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    dirs.extend(bundled_lib_dir());
    dirs.push(get_smpt_local_lib_dir());
    dirs.extend(user_lib_dir());
    dirs.extend(platform.system_lib_dirs.iter().map(PathBuf::from));
    dirs
}

/// Directory of the running executable.
pub fn bundled_lib_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
}

/// `~/.local/lib`, when a home directory is known.
pub fn user_lib_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".local").join("lib"))
}

/// Returns the `lib/` directory of the workspace this crate was built in.
///
/// # Panics
///
/// Panics if `SMPT_LOCAL_LIB_DIR` was set to an invalid path at build time.
pub fn get_smpt_local_lib_dir() -> PathBuf {
    PathBuf::from_str(SMPT_LOCAL_LIB_DIR).expect("build error: 'SMPT_LOCAL_LIB_DIR' is invalid")
}

/// Returns the root directory of the workspace.
///
/// This is primarily used by tests and demos to locate files relative to the
/// repository structure.
///
/// # Panics
///
/// Panics if `SMPT_REPO_ROOT` was set to an invalid path at build time.
///
/// # Examples
///
/// ```no_run
/// use smpt::config::get_smpt_repo_root;
///
/// let headers = get_smpt_repo_root().join("smpt/ScienceMode_Library/include");
/// ```
pub fn get_smpt_repo_root() -> PathBuf {
    PathBuf::from_str(SMPT_REPO_ROOT).expect("build error: 'SMPT_REPO_ROOT' is invalid")
}
