// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the descriptor pipeline.
//!
//! None of these are fatal for the pipeline as a whole: the orchestrator turns them
//! into failed attempts and moves on to the next tier or header.

use std::path::PathBuf;

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while locating, preprocessing or parsing vendor headers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No C preprocessor could be found on this machine.
    #[error("no C preprocessor available")]
    PreprocessorUnavailable,

    /// The preprocessor could not be launched.
    #[error("failed to run preprocessor '{program}': {source}")]
    PreprocessorLaunch {
        /// Program that was launched.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The preprocessor ran but exited unsuccessfully.
    #[error("preprocessor '{program}' failed ({status}): {stderr}")]
    PreprocessorFailed {
        /// Program that was launched.
        program: String,
        /// Exit status as text.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The C grammar could not be loaded or produced no tree.
    #[error("C parser unavailable: {0}")]
    Grammar(String),

    /// The C front-end rejected the input.
    #[error("{file}:{line}: {message}")]
    Syntax {
        /// File the offending declaration belongs to, as reported by line markers.
        file: String,
        /// One-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
