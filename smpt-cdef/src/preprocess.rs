// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Running the C preprocessor, and the macro tables of each fallback tier.

use std::{
    env,
    path::{Path, PathBuf},
    process::Command,
    sync::LazyLock,
};

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::{Error, Result, locator::IncludeRoot, platform::Platform};

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("comment pattern is valid"));
static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\n]*").expect("comment pattern is valid"));
static BOOL_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:_Bool|bool)(\s+\w+\s*\[)").expect("bool array pattern is valid")
});

/// Boolean aliasing shared by both preprocessing tiers.
const BOOL_DEFINES: [&str; 5] = [
    "_Bool=unsigned char",
    "bool=unsigned char",
    "true=1",
    "false=0",
    "__bool_true_false_are_defined=1",
];

/// Export and visibility annotations.
const EXPORT_ERASURES: [&str; 5] = [
    "__attribute__(x)=",
    "__declspec(x)=",
    "SMPT_API=",
    "SMPT_EXPORTS=",
    "SMPT_DLL=",
];

/// Compiler extensions only erased by the full tier.
const EXTENSION_ERASURES: [&str; 17] = [
    "__inline=",
    "__inline__=",
    "__forceinline=",
    "__always_inline=",
    "__restrict=",
    "__extension__=",
    "__GNUC_VA_LIST=",
    "__builtin_va_list=char*",
    "__volatile__=volatile",
    "__signed__=signed",
    "__const=const",
    "__MINGW_NOTHROW=",
    "__nothrow__=",
    "__cdecl=",
    "__stdcall=",
    "CRTIMP=",
    "UC_MAIN=",
];

/// Something that can preprocess a header.
pub trait Preprocessor {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Preprocesses `header` with GCC-style arguments (`-DNAME=VALUE`, `-UNAME`, `-IDIR`).
    ///
    /// The output must keep line markers so that declarations can be attributed to the
    /// file they came from.
    fn preprocess(&self, header: &Path, args: &[String]) -> Result<String>;
}

/// Flavour of an external preprocessor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PreprocessorKind {
    /// Standalone `cpp`.
    Cpp,
    /// `gcc -E`.
    Gcc,
    /// `clang -E`.
    Clang,
    /// MSVC `cl /E`.
    Msvc,
}

/// An external preprocessor program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPreprocessor {
    program: PathBuf,
    kind: PreprocessorKind,
}

impl CommandPreprocessor {
    /// Wraps an explicit program, inferring its flavour from the file name.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let stem = program
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let kind = if stem == "cl" {
            PreprocessorKind::Msvc
        } else if stem.contains("clang") {
            PreprocessorKind::Clang
        } else if stem.contains("gcc") || stem == "cc" {
            PreprocessorKind::Gcc
        } else {
            PreprocessorKind::Cpp
        };
        Self { program, kind }
    }

    /// Searches `PATH` for `cpp`, `gcc`, `clang` and `cl`, in that order.
    pub fn discover() -> Option<Self> {
        let found = ["cpp", "gcc", "clang", "cl"]
            .into_iter()
            .find_map(find_on_path)
            .map(Self::new);
        match &found {
            Some(pp) => debug!(program = %pp.program.display(), kind = ?pp.kind, "found preprocessor"),
            None => debug!("no preprocessor on PATH"),
        }
        found
    }

    pub fn kind(&self) -> PreprocessorKind {
        self.kind
    }

    fn command_args(&self, header: &Path, args: &[String]) -> Vec<String> {
        let mut out: Vec<String> = match self.kind {
            PreprocessorKind::Cpp => Vec::new(),
            PreprocessorKind::Gcc | PreprocessorKind::Clang => vec!["-E".into()],
            PreprocessorKind::Msvc => vec!["/nologo".into(), "/E".into()],
        };
        out.extend(args.iter().map(|arg| match self.kind {
            PreprocessorKind::Msvc => match arg.get(..2) {
                Some("-D" | "-U" | "-I") => format!("/{}", &arg[1..]),
                _ => arg.clone(),
            },
            _ => arg.clone(),
        }));
        out.push(header.to_string_lossy().into_owned());
        out
    }
}

impl Preprocessor for CommandPreprocessor {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("preprocessor")
    }

    fn preprocess(&self, header: &Path, args: &[String]) -> Result<String> {
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .args(self.command_args(header, args))
            .output()
            .map_err(|source| Error::PreprocessorLaunch {
                program: program.clone(),
                source,
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::PreprocessorFailed {
                program,
                status: output.status.to_string(),
                stderr: stderr.trim().lines().take(5).collect::<Vec<_>>().join(" | "),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Stand-in used when no preprocessor exists; both preprocessing tiers fail fast.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreprocessor;

impl Preprocessor for NoPreprocessor {
    fn name(&self) -> &str {
        "none"
    }

    fn preprocess(&self, _header: &Path, _args: &[String]) -> Result<String> {
        Err(Error::PreprocessorUnavailable)
    }
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = candidate.with_extension("exe");
        exe.is_file().then_some(exe)
    })
}

fn include_args(root: &IncludeRoot) -> impl Iterator<Item = String> + '_ {
    root.include_dirs()
        .into_iter()
        .map(|dir| format!("-I{}", dir.display()))
}

fn defines<'a>(table: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    table.iter().map(|define| format!("-D{define}"))
}

/// Arguments of the first tier: every known extension erased, platform identity set.
pub fn full_tier_args(root: &IncludeRoot, platform: &Platform) -> Vec<String> {
    let mut args: Vec<String> = include_args(root).collect();
    args.push(format!("-D{}", platform.identity_macro));
    args.extend(defines(&BOOL_DEFINES));
    args.extend(defines(&EXPORT_ERASURES));
    args.extend(defines(&EXTENSION_ERASURES));
    args.push(format!("-D{}", platform.asm_erasure()));
    args.push("-U__GNUC__".into());
    if platform.is_windows() {
        args.push("-D_MSC_VER=1900".into());
    }
    args
}

/// Arguments of the second tier: include paths, boolean aliasing and export erasure.
pub fn minimal_tier_args(root: &IncludeRoot) -> Vec<String> {
    let mut args: Vec<String> = include_args(root).collect();
    args.extend(defines(&BOOL_DEFINES));
    args.extend(defines(&EXPORT_ERASURES));
    args
}

/// Rewrites `_Bool name[...]`/`bool name[...]` to `unsigned char name[...]`.
pub fn rewrite_bool_arrays(text: &str) -> String {
    BOOL_ARRAY.replace_all(text, "unsigned char$1").into_owned()
}

/// Prepares raw header text for parsing without a preprocessor.
///
/// Comments are stripped, boolean arrays rewritten and a prelude of `#define`s for the
/// boolean type and common GCC extensions is prepended. A line marker after the prelude
/// attributes the remaining text to `header`.
pub fn manual_preprocess(text: &str, header: &Path, platform: &Platform) -> String {
    let text = BLOCK_COMMENT.replace_all(text, " ");
    let text = LINE_COMMENT.replace_all(&text, "");
    let text = rewrite_bool_arrays(&text);

    let asm = if platform.is_windows() {
        "#define __asm__"
    } else {
        "#define __asm__(...)"
    };
    let prelude = [
        "#define _Bool unsigned char",
        "#define bool unsigned char",
        "#define true 1",
        "#define false 0",
        "#define __attribute__(x)",
        "#define __declspec(x)",
        "#define SMPT_API",
        "#define __restrict",
        "#define __extension__",
        "#define __inline",
        "#define __always_inline",
        "#define __builtin_va_list char*",
        asm,
    ];
    let marker = header.display().to_string().replace('\\', "\\\\");
    format!("{}\n# 1 \"{marker}\"\n{text}", prelude.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Os;

    #[test]
    fn msvc_arguments_are_translated() {
        let pp = CommandPreprocessor::new("C:/VS/bin/cl.exe");
        assert_eq!(pp.kind(), PreprocessorKind::Msvc);
        let args = pp.command_args(
            Path::new("a.h"),
            &["-DX=1".into(), "-Iinc".into(), "-UY".into()],
        );
        assert_eq!(args, ["/nologo", "/E", "/DX=1", "/Iinc", "/UY", "a.h"]);
    }

    #[test]
    fn full_tier_extends_minimal_tier() {
        let root = IncludeRoot::at("/nonexistent/include");
        let full = full_tier_args(&root, &Platform::for_os(Os::Linux));
        let minimal = minimal_tier_args(&root);
        assert!(minimal.iter().all(|arg| full.contains(arg)));
        assert!(full.contains(&"-D__linux__".to_string()));
        assert!(full.contains(&"-D__asm__(...)=".to_string()));
        assert!(!minimal.contains(&"-D__extension__=".to_string()));
    }

    #[test]
    fn manual_preprocessing_strips_comments() {
        let out = manual_preprocess(
            "/* a\n b */ bool flags[3]; // trailing\nint x;",
            Path::new("/inc/h.h"),
            &Platform::for_os(Os::Linux),
        );
        assert!(out.contains("# 1 \"/inc/h.h\""));
        assert!(out.contains("unsigned char flags[3];"));
        assert!(!out.contains("trailing"));
        assert!(out.ends_with("int x;"));
    }
}
