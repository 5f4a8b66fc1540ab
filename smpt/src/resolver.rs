// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Native library resolution.
//!
//! The resolver walks the configured search directories in order and tries every shared
//! library name of the platform in each of them. The first artifact that loads wins. A
//! load failure is logged together with the OS error and the next candidate is tried.
//!
//! Static archives are never loaded. They are recorded in the [`Resolution`] so the
//! caller can report that the library exists but has to be linked into a binding first.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use smpt_cdef::{Os, Platform};
use smpt_sys::SmptLibrary;
use tracing::{debug, info, warn};

use crate::{Result, config::LoaderConfig};

/// Kind of a discovered library file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Shared,
    Static,
}

/// A native library file found in a search directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub platform: Os,
}

/// Outcome of one attempt to load a shared artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadAttempt {
    pub artifact: LibraryArtifact,
    /// `None` when the load succeeded.
    pub error: Option<String>,
}

impl LoadAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Opens a library file.
///
/// [`DynamicLoader`] is the real implementation. Tests substitute their own.
pub trait LibraryLoader {
    type Library;

    fn load(&mut self, path: &Path) -> Result<Self::Library>;
}

/// Loads libraries with `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicLoader;

impl LibraryLoader for DynamicLoader {
    type Library = SmptLibrary;

    fn load(&mut self, path: &Path) -> Result<SmptLibrary> {
        // Safety: loading runs the library's initialisers. The ScienceMode library has
        // none with preconditions.
        Ok(unsafe { SmptLibrary::new(path) }?)
    }
}

/// Everything the resolver found.
#[derive(Debug)]
pub struct Resolution<L> {
    /// The first shared artifact that loaded.
    pub loaded: Option<(LibraryArtifact, L)>,
    /// Static archives found along the way.
    pub static_artifacts: Vec<LibraryArtifact>,
    /// Every load attempt, in order.
    pub attempts: Vec<LoadAttempt>,
}

impl<L> Resolution<L> {
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Number of successful loads from `dir`.
    pub fn loads_from(&self, dir: &Path) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.succeeded() && a.artifact.path.parent() == Some(dir))
            .count()
    }
}

/// Searches for and loads the native library.
#[derive(Debug, Clone)]
pub struct Resolver {
    search_dirs: Vec<PathBuf>,
    platform: Platform,
}

impl Resolver {
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            search_dirs: config.search_dirs.clone(),
            platform: config.platform.clone(),
        }
    }

    /// Existing library files in search order: per directory, shared names before
    /// static names.
    pub fn candidates(&self) -> Vec<LibraryArtifact> {
        let kinds = [
            (ArtifactKind::Shared, self.platform.shared_names),
            (ArtifactKind::Static, self.platform.static_names),
        ];
        let mut found = Vec::new();
        for dir in &self.search_dirs {
            for (kind, names) in kinds {
                for name in names {
                    let path = dir.join(name);
                    if path.is_file() {
                        found.push(LibraryArtifact {
                            path,
                            kind,
                            platform: self.platform.os,
                        });
                    }
                }
            }
        }
        found
    }

    /// Loads the first shared artifact `loader` accepts.
    pub fn resolve<L: LibraryLoader>(&self, loader: &mut L) -> Resolution<L::Library> {
        let (shared, static_artifacts): (Vec<_>, Vec<_>) = self
            .candidates()
            .into_iter()
            .partition(|artifact| artifact.kind == ArtifactKind::Shared);

        for artifact in &static_artifacts {
            debug!(path = %artifact.path.display(), "found static library");
        }

        let mut attempts = Vec::new();
        let mut loaded = None;
        for artifact in shared {
            match loader.load(&artifact.path) {
                Ok(library) => {
                    info!(path = %artifact.path.display(), "loaded ScienceMode library");
                    attempts.push(LoadAttempt {
                        artifact: artifact.clone(),
                        error: None,
                    });
                    loaded = Some((artifact, library));
                    break;
                }
                Err(err) => {
                    let diagnostic = os_diagnostic(&err, &self.platform);
                    warn!(
                        path = %artifact.path.display(),
                        error = %err,
                        os_error = diagnostic.as_deref().unwrap_or("none"),
                        "failed to load library, trying next candidate"
                    );
                    let error = match diagnostic {
                        Some(diagnostic) => format!("{err} ({diagnostic})"),
                        None => err.to_string(),
                    };
                    attempts.push(LoadAttempt {
                        artifact,
                        error: Some(error),
                    });
                }
            }
        }

        if loaded.is_none() {
            if static_artifacts.is_empty() {
                warn!(
                    searched = self.search_dirs.len(),
                    "no loadable ScienceMode library found"
                );
            } else {
                warn!(
                    count = static_artifacts.len(),
                    "only static ScienceMode libraries found; they must be linked into a binding before use"
                );
            }
            self.log_library_files();
        }

        Resolution {
            loaded,
            static_artifacts,
            attempts,
        }
    }

    /// Logs every library-looking file in the search directories.
    fn log_library_files(&self) {
        for dir in &self.search_dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            let names: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .filter(|name| Platform::is_library_file(name))
                .collect();
            if !names.is_empty() {
                info!(dir = %dir.display(), files = ?names, "library files present");
            }
        }
    }
}

/// OS error code carried by a load failure, in the platform's usual form.
///
/// `LoadLibraryExW` failures carry the `GetLastError` code as an `io::Error` source.
/// `dlopen` failures carry only the `dlerror` text, which is already part of the
/// error's message, so they yield `None`.
fn os_diagnostic(err: &(dyn std::error::Error + 'static), platform: &Platform) -> Option<String> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(code) = err
            .downcast_ref::<io::Error>()
            .and_then(io::Error::raw_os_error)
        {
            return Some(if platform.is_windows() {
                format!("GetLastError={code}: {err}")
            } else {
                format!("errno={code}: {err}")
            });
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn diagnostic_comes_from_the_load_error() {
        let linux = Platform::for_os(Os::Linux);
        let windows = Platform::for_os(Os::Windows);
        let missing = io::Error::from_raw_os_error(2);

        let diagnostic = os_diagnostic(&missing, &linux).unwrap();
        assert!(diagnostic.starts_with("errno=2: "), "{diagnostic}");
        let diagnostic = os_diagnostic(&missing, &windows).unwrap();
        assert!(diagnostic.starts_with("GetLastError=2: "), "{diagnostic}");

        assert_eq!(os_diagnostic(&Error::Other("no code".into()), &linux), None);
        assert_eq!(os_diagnostic(&io::Error::other("no code"), &linux), None);
    }
}
