// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Header locator: picks the vendor include tree.
//!
//! The ScienceMode headers live in different places depending on whether we run from
//! a source checkout or from an installed package. The locator walks an ordered list of
//! candidates and returns the first plausible one. Not finding any is not an error: the
//! pipeline still has to emit a descriptor, so the first candidate is returned in
//! degraded mode and the parse stage falls back as needed.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

/// The four subtrees of a source-style include tree.
pub const SUBTREES: [&str; 4] = ["general", "low-level", "mid-level", "dyscom-level"];

/// How headers are arranged below the include root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layout {
    /// Source tree: `general/`, `low-level/`, `mid-level/`, `dyscom-level/`.
    Nested,
    /// Installed package: every header in one directory.
    Flattened,
}

/// The selected include root. Immutable once chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeRoot {
    path: PathBuf,
    layout: Layout,
    found: bool,
}

impl IncludeRoot {
    /// Builds an include root for a known directory, detecting its layout.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = absolutize(path.into());
        let layout = detect_layout(&path);
        let found = path.is_dir();
        Self {
            path,
            layout,
            found,
        }
    }

    fn placeholder(path: PathBuf) -> Self {
        Self {
            layout: detect_layout(&path),
            path,
            found: false,
        }
    }

    /// Absolute path of the root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected layout.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// `false` when no candidate existed and this root is a placeholder.
    pub fn is_found(&self) -> bool {
        self.found
    }

    /// Full path of a header given its manifest-relative path.
    pub fn header_path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.path.clone(), |path, part| path.join(part))
    }

    /// Directories passed to the preprocessor as include paths.
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        match self.layout {
            Layout::Flattened => vec![self.path.clone()],
            Layout::Nested => {
                let mut dirs = vec![self.path.clone(), self.path.join("general")];
                dirs.push(self.path.join("general").join("packet"));
                dirs.extend(SUBTREES[1..].iter().map(|sub| self.path.join(sub)));
                dirs
            }
        }
    }

    /// Whether a source location belongs to the vendor tree.
    pub fn contains(&self, file: &Path) -> bool {
        absolutize(file.to_path_buf()).starts_with(&self.path)
    }
}

/// Default candidate list, most preferred first.
///
/// The bundled `include/` directory next to the running executable comes first,
/// followed by source checkout layouts and installed layouts relative to the
/// working directory.
pub fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join("include"));
    }
    candidates.extend(
        [
            "./smpt/ScienceMode_Library/include",
            "./smpt/ScienceMode_Library",
            "../smpt/ScienceMode_Library/include",
            "../smpt/ScienceMode_Library",
            "../include/ScienceMode4",
            "./include/ScienceMode4",
        ]
        .into_iter()
        .map(|candidate| absolutize(PathBuf::from(candidate))),
    );
    candidates
}

/// Returns the first candidate that looks like an include tree.
///
/// A candidate qualifies when it contains a `general/` subdirectory or, failing that,
/// when it simply exists (flattened layout). If nothing qualifies the first candidate
/// is returned with [`IncludeRoot::is_found`] set to `false`.
pub fn locate(candidates: &[PathBuf]) -> IncludeRoot {
    let hit = candidates
        .iter()
        .find(|candidate| candidate.join("general").is_dir())
        .or_else(|| candidates.iter().find(|candidate| candidate.is_dir()));

    match hit {
        Some(path) => {
            let root = IncludeRoot::at(path.clone());
            info!(
                path = %root.path.display(),
                layout = ?root.layout,
                "found ScienceMode include directory"
            );
            root
        }
        None => {
            let fallback = candidates
                .first()
                .cloned()
                .unwrap_or_else(|| PathBuf::from("include"));
            warn!(
                path = %fallback.display(),
                "could not find ScienceMode include directory, continuing with default"
            );
            IncludeRoot::placeholder(absolutize(fallback))
        }
    }
}

fn detect_layout(path: &Path) -> Layout {
    if path.join("general").is_dir() {
        Layout::Nested
    } else {
        Layout::Flattened
    }
}

pub(crate) fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::path::absolute(&path).unwrap_or(path)
}
