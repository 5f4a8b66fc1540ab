// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Tests for library resolution.
//!
//! A fake loader stands in for `dlopen`, so no real library is needed. Library files
//! are empty files in temporary directories.

use std::path::{Path, PathBuf};

use smpt::{
    ArtifactKind, BindingKind, Error, LibraryLoader, LoaderConfig, Resolver, resolver::DynamicLoader,
    select_api,
};
use smpt_cdef::{Os, Platform};

static LOG_ONCE: std::sync::Once = std::sync::Once::new();

fn init_logging() {
    LOG_ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .init();
    });
}

/// Accepts every path except those listed in `broken`, and records what it was asked.
#[derive(Default)]
struct FakeLoader {
    broken: Vec<PathBuf>,
    requested: Vec<PathBuf>,
}

impl LibraryLoader for FakeLoader {
    type Library = PathBuf;

    fn load(&mut self, path: &Path) -> smpt::Result<PathBuf> {
        self.requested.push(path.to_path_buf());
        if self.broken.iter().any(|b| b == path) {
            return Err(Error::Other(format!("cannot load {}", path.display())));
        }
        Ok(path.to_path_buf())
    }
}

fn lib_dir(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create library directory");
    for file in files {
        std::fs::write(dir.path().join(file), b"").expect("failed to write library file");
    }
    dir
}

fn linux_config(dirs: &[&Path]) -> LoaderConfig {
    LoaderConfig::new(
        dirs.iter().map(|d| d.to_path_buf()),
        Platform::for_os(Os::Linux),
    )
}

#[test]
fn loads_from_the_only_directory_with_a_shared_library() {
    init_logging();
    let first = lib_dir(&["README.txt"]);
    let second = lib_dir(&["libsmpt.so"]);
    let config = linux_config(&[first.path(), second.path()]);

    let mut loader = FakeLoader::default();
    let resolution = Resolver::new(&config).resolve(&mut loader);

    let (artifact, library) = resolution.loaded.as_ref().expect("nothing loaded");
    assert_eq!(artifact.path, second.path().join("libsmpt.so"));
    assert_eq!(artifact.kind, ArtifactKind::Shared);
    assert_eq!(*library, second.path().join("libsmpt.so"));
    assert_eq!(resolution.loads_from(first.path()), 0);
    assert_eq!(resolution.loads_from(second.path()), 1);
    assert_eq!(loader.requested, [second.path().join("libsmpt.so")]);
}

/// `dlopen` rejects an empty file. The recorded error is the loader's own message, which
/// names the file.
#[cfg(target_os = "linux")]
#[test]
fn native_load_failure_keeps_the_loader_message() {
    init_logging();
    let dir = lib_dir(&["libsmpt.so"]);
    let config = linux_config(&[dir.path()]);

    let resolution = Resolver::new(&config).resolve(&mut DynamicLoader);

    assert!(!resolution.is_loaded());
    let error = resolution.attempts[0].error.as_deref().unwrap();
    assert!(error.starts_with("Loading library: "), "{error}");
    assert!(error.contains("libsmpt.so"), "{error}");
    assert!(!error.contains("errno="), "{error}");
}

#[test]
fn load_failure_moves_on_to_the_next_candidate() {
    init_logging();
    let first = lib_dir(&["libsmpt.so"]);
    let second = lib_dir(&["libsmpt.so.4"]);
    let config = linux_config(&[first.path(), second.path()]);

    let mut loader = FakeLoader {
        broken: vec![first.path().join("libsmpt.so")],
        ..Default::default()
    };
    let resolution = Resolver::new(&config).resolve(&mut loader);

    assert_eq!(resolution.attempts.len(), 2);
    assert!(!resolution.attempts[0].succeeded());
    assert_eq!(
        resolution.attempts[0].error.as_deref(),
        Some(format!("Other error: cannot load {}", first.path().join("libsmpt.so").display()).as_str())
    );
    assert!(resolution.attempts[1].succeeded());
    assert_eq!(
        resolution.loaded.map(|(artifact, _)| artifact.path),
        Some(second.path().join("libsmpt.so.4"))
    );
}

#[test]
fn shared_names_are_preferred_within_a_directory() {
    let dir = lib_dir(&["libsmpt.a", "libsmpt.so.4.0.0", "libsmpt.so"]);
    let config = linux_config(&[dir.path()]);

    let names: Vec<(String, ArtifactKind)> = Resolver::new(&config)
        .candidates()
        .into_iter()
        .map(|a| (a.path.file_name().unwrap().to_string_lossy().into_owned(), a.kind))
        .collect();
    assert_eq!(
        names,
        [
            ("libsmpt.so".to_string(), ArtifactKind::Shared),
            ("libsmpt.so.4.0.0".to_string(), ArtifactKind::Shared),
            ("libsmpt.a".to_string(), ArtifactKind::Static),
        ]
    );
}

#[test]
fn static_library_is_recorded_but_never_loaded() {
    init_logging();
    let dir = lib_dir(&["libsmpt.a"]);
    let config = linux_config(&[dir.path()]);

    let mut loader = FakeLoader::default();
    let resolution = Resolver::new(&config).resolve(&mut loader);

    assert!(!resolution.is_loaded());
    assert!(loader.requested.is_empty());
    assert_eq!(resolution.static_artifacts.len(), 1);
    assert_eq!(resolution.static_artifacts[0].kind, ArtifactKind::Static);
}

#[test]
fn windows_names_are_used_for_windows() {
    let dir = lib_dir(&["libsmpt.so", "smpt.dll", "smpt.lib"]);
    let config = LoaderConfig::new([dir.path().to_path_buf()], Platform::for_os(Os::Windows));

    let kinds: Vec<ArtifactKind> = Resolver::new(&config)
        .candidates()
        .into_iter()
        .map(|a| a.kind)
        .collect();
    assert_eq!(kinds, [ArtifactKind::Shared, ArtifactKind::Static]);
}

#[test]
fn artifact_serializes_to_json() {
    let dir = lib_dir(&["libsmpt.so"]);
    let config = linux_config(&[dir.path()]);
    let artifact = Resolver::new(&config).candidates().remove(0);

    let json = serde_json::to_value(&artifact).unwrap();
    assert_eq!(json["kind"], "shared");
    assert_eq!(json["platform"], "Linux");
}

#[test]
fn missing_library_selects_the_simulated_binding() {
    init_logging();
    let empty = lib_dir(&[]);
    let api = select_api(&linux_config(&[empty.path()]));
    assert_eq!(api.kind(), BindingKind::Simulated);
}

#[test]
fn strict_native_load_reports_no_library() {
    let empty = lib_dir(&[]);
    assert!(matches!(
        smpt::load_native(&linux_config(&[empty.path()])),
        Err(Error::NoLibrary)
    ));
}
