// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! C front end for header declarations.
//!
//! Parsing is done by the tree-sitter C grammar. [`syntax`] lowers its syntax tree into
//! the declaration model of [`ast`], and [`render`] prints declarations back as
//! single-line text.

pub mod ast;
pub mod macros;
pub mod render;
pub mod syntax;

use std::sync::{Arc, LazyLock};

use regex::Regex;

pub use syntax::TranslationUnit;

use crate::Result;
use ast::Location;

/// `# 12 "file"` as written by cpp/gcc/clang, and `#line 12 "file"` as written by MSVC.
static LINE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*#\s*(?:line\s+)?(\d+)\s+"((?:[^"\\]|\\.)*)""#)
        .expect("line marker pattern is valid")
});

/// How the input text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Preprocessor output. Line markers attribute text to files.
    Preprocessed,
    /// Unprocessed header text. Alias and annotation `#define`s are applied and every
    /// conditional branch is read.
    Raw,
}

/// File and line of every row of the text handed to the parser.
#[derive(Debug, Clone, Default)]
pub struct LineMap {
    rows: Vec<Location>,
}

impl LineMap {
    /// Replaces line markers in `source` by empty lines and records, for every row, the
    /// file and line it came from. Rows before the first marker belong to `file`.
    pub fn strip_markers(source: &str, file: Option<&str>) -> (String, Self) {
        let mut current: Option<Arc<str>> = file.map(Arc::from);
        let mut line = 1;
        let mut rows = Vec::new();
        let mut text = String::with_capacity(source.len());

        for raw in source.split('\n') {
            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            if let Some(marker) = LINE_MARKER.captures(raw) {
                rows.push(Location {
                    file: current.clone(),
                    line,
                });
                line = marker[1].parse().unwrap_or(1);
                current = Some(Arc::from(marker[2].replace("\\\\", "\\")));
                text.push('\n');
                continue;
            }
            rows.push(Location {
                file: current.clone(),
                line,
            });
            line += 1;
            text.push_str(raw);
            text.push('\n');
        }
        (text, Self { rows })
    }

    /// Location of a zero-based row.
    pub fn location(&self, row: usize) -> Location {
        self.rows.get(row).cloned().unwrap_or_default()
    }
}

/// Parses `source` and lowers it to declarations in one step.
///
/// See [`syntax::lower`] for the meaning of `recoverable`.
pub fn parse_source<F>(
    source: &str,
    file: Option<&str>,
    mode: Mode,
    recoverable: F,
) -> Result<TranslationUnit>
where
    F: Fn(&Location) -> bool,
{
    let (text, lines) = match mode {
        Mode::Preprocessed => LineMap::strip_markers(source, file),
        Mode::Raw => LineMap::strip_markers(&macros::expand(source), file),
    };
    syntax::lower(&text, &lines, mode, recoverable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_become_blank_rows() {
        let source = "# 1 \"/inc/a.h\"\nint a;\n# 7 \"/inc/b.h\" 2\nint b;\n";
        let (text, lines) = LineMap::strip_markers(source, None);
        assert_eq!(text.lines().collect::<Vec<_>>(), ["", "int a;", "", "int b;", ""]);
        assert_eq!(lines.location(1).file.as_deref(), Some("/inc/a.h"));
        assert_eq!(lines.location(1).line, 1);
        assert_eq!(lines.location(3).file.as_deref(), Some("/inc/b.h"));
        assert_eq!(lines.location(3).line, 7);
    }

    #[test]
    fn msvc_markers_and_escaped_paths() {
        let (_, lines) = LineMap::strip_markers("#line 3 \"C:\\\\inc\\\\a.h\"\nint a;", None);
        assert_eq!(lines.location(1).file.as_deref(), Some("C:\\inc\\a.h"));
        assert_eq!(lines.location(1).line, 3);
    }

    #[test]
    fn text_before_markers_belongs_to_the_input_file() {
        let (_, lines) = LineMap::strip_markers("int a;\n", Some("/tmp/x.h"));
        assert_eq!(lines.location(0).file.as_deref(), Some("/tmp/x.h"));
        assert_eq!(lines.location(42), Location::default());
    }
}
