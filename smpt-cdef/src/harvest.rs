// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Define harvester: pulls `#define NAME VALUE` constants out of raw header text.
//!
//! This runs on the raw files, independent of the parse stage, because the
//! preprocessor consumes every `#define` before the C front-end ever sees it.

use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    sync::LazyLock,
};

use regex::Regex;
use tracing::debug;

use crate::locator::IncludeRoot;

static DEFINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#define[ \t]+(\w+)[ \t]+\(?([\w<|.]+)\)?").expect("define pattern is valid")
});

/// Value of a harvested constant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DefineValue {
    /// An integer literal, kept in its original spelling.
    Literal(String),
    /// Anything else. Only the name matters downstream.
    Opaque,
}

/// One harvested constant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefineEntry {
    /// Macro name.
    pub name: String,
    /// Classified value.
    pub value: DefineValue,
}

impl fmt::Display for DefineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            DefineValue::Literal(text) => write!(f, "#define {} {}", self.name, text),
            DefineValue::Opaque => write!(f, "#define {} ...", self.name),
        }
    }
}

/// Returns `true` for decimal, hexadecimal (`0x`), binary (`0b`) and octal (`0`/`0o`)
/// integer literals without suffixes.
pub fn is_integer_literal(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };
    !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix))
}

/// Classifies a raw define value.
pub fn classify(value: &str) -> DefineValue {
    if is_integer_literal(value) {
        DefineValue::Literal(value.to_string())
    } else {
        DefineValue::Opaque
    }
}

/// Scans one header's text.
///
/// Names in `blacklist` or in `declared` are skipped; the result is appended to `out`.
pub fn harvest_text(
    text: &str,
    blacklist: &HashSet<String>,
    declared: &HashSet<String>,
    out: &mut BTreeSet<DefineEntry>,
) {
    for captures in DEFINE_PATTERN.captures_iter(text) {
        let name = &captures[1];
        if blacklist.contains(name) || declared.contains(name) {
            continue;
        }
        out.insert(DefineEntry {
            name: name.to_string(),
            value: classify(&captures[2]),
        });
    }
}

/// Scans every define-scan header that exists below `root`.
///
/// Missing or unreadable headers are skipped. The returned set is ordered by name and
/// then value so that repeated runs render identically.
pub fn harvest(
    root: &IncludeRoot,
    headers: &[String],
    blacklist: &HashSet<String>,
    declared: &HashSet<String>,
) -> BTreeSet<DefineEntry> {
    let mut defines = BTreeSet::new();
    for header in headers {
        let path = root.header_path(header);
        let Ok(bytes) = std::fs::read(&path) else {
            debug!(header = %header, "define-scan header not readable, skipping");
            continue;
        };
        harvest_text(
            &String::from_utf8_lossy(&bytes),
            blacklist,
            declared,
            &mut defines,
        );
    }
    defines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_classification() {
        assert!(is_integer_literal("1200"));
        assert!(is_integer_literal("0x1F"));
        assert!(is_integer_literal("017"));
        assert!(is_integer_literal("0"));
        assert!(!is_integer_literal("0x"));
        assert!(!is_integer_literal("089"));
        assert!(!is_integer_literal("12u"));
        assert!(!is_integer_literal("Smpt_Length_Points"));
    }

    #[test]
    fn skips_blacklisted_and_declared_names() {
        let text = "#define main 1\n#define Smpt_Ack 3\n#define SMPT_VERSION (0x10)\n#define SMPT_API __declspec\n";
        let blacklist = HashSet::from(["main".to_string()]);
        let declared = HashSet::from(["Smpt_Ack".to_string()]);
        let mut out = BTreeSet::new();
        harvest_text(text, &blacklist, &declared, &mut out);

        let rendered: Vec<String> = out.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["#define SMPT_API ...", "#define SMPT_VERSION 0x10"]
        );
    }
}
