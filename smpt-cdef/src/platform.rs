// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Platform capabilities resolved once and threaded through the pipeline.
//!
//! The header locator, the descriptor assembler and the native library resolver all
//! need to know which operating system they are targeting. Rather than branching on
//! `cfg!` at every call site, they receive a [`Platform`] value describing library
//! naming conventions, system search paths and which OS-exclusive record fields exist.

use serde::Serialize;

/// Operating system family of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Os {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    MacOs,
    /// Linux and other POSIX systems.
    Linux,
}

/// Everything the pipeline needs to know about the target platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// Macro the vendor headers test to select platform code.
    pub identity_macro: &'static str,
    /// Shared library file names, most preferred first.
    pub shared_names: &'static [&'static str],
    /// Static archive file names, most preferred first.
    pub static_names: &'static [&'static str],
    /// System-wide library directories, searched last.
    pub system_lib_dirs: &'static [&'static str],
    /// Whether the device record carries the Windows serial port `HANDLE`.
    pub windows_handle_field: bool,
    /// Whether the device record carries the POSIX serial port descriptor.
    pub posix_descriptor_field: bool,
}

impl Platform {
    /// Capabilities of the platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::for_os(Os::Windows)
        } else if cfg!(target_os = "macos") {
            Self::for_os(Os::MacOs)
        } else {
            Self::for_os(Os::Linux)
        }
    }

    /// Capabilities of an explicitly chosen platform.
    pub fn for_os(os: Os) -> Self {
        match os {
            Os::Windows => Self {
                os,
                identity_macro: "_WIN32",
                shared_names: &["smpt.dll", "libsmpt.dll"],
                static_names: &["libsmpt.lib", "smpt.lib"],
                system_lib_dirs: &[],
                windows_handle_field: true,
                posix_descriptor_field: false,
            },
            Os::MacOs => Self {
                os,
                identity_macro: "__APPLE__",
                shared_names: &[
                    "libsmpt.dylib",
                    "libsmpt.so",
                    "libsmpt.so.4",
                    "libsmpt.so.4.0.0",
                ],
                static_names: &["libsmpt.a"],
                system_lib_dirs: &["/usr/local/lib", "/usr/lib"],
                windows_handle_field: false,
                posix_descriptor_field: true,
            },
            Os::Linux => Self {
                os,
                identity_macro: "__linux__",
                shared_names: &["libsmpt.so", "libsmpt.so.4", "libsmpt.so.4.0.0"],
                static_names: &["libsmpt.a"],
                system_lib_dirs: &["/usr/local/lib", "/usr/lib"],
                windows_handle_field: false,
                posix_descriptor_field: true,
            },
        }
    }

    /// Returns `true` when targeting Windows.
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Preprocessor definition erasing inline assembly.
    ///
    /// MSVC-style preprocessors reject function-like definitions with `...`.
    pub fn asm_erasure(&self) -> &'static str {
        if self.is_windows() {
            "__asm__="
        } else {
            "__asm__(...)="
        }
    }

    /// Whether a file name looks like any native library artifact.
    pub fn is_library_file(name: &str) -> bool {
        [".so", ".dll", ".dylib", ".a", ".lib"]
            .iter()
            .any(|ext| name.ends_with(ext))
            || name.contains(".so.")
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}
