// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Alias and annotation macros in unpreprocessed header text.
//!
//! Two kinds of `#define` are applied to the lines that follow them: bodies made only of
//! type keywords (`#define bool unsigned char`) and empty bodies, object-like or
//! function-like, which erase an annotation. Other macros, numeric constants in
//! particular, stay symbolic. Row count is preserved so line numbers stay valid.

use std::sync::LazyLock;

use regex::Regex;

static DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*define\s+([A-Za-z_]\w*)(\([^)]*\))?(?:\s+(.*?))?\s*$")
        .expect("define pattern is valid")
});
static UNDEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*undef\s+([A-Za-z_]\w*)").expect("undef pattern is valid")
});

const TYPE_WORDS: [&str; 14] = [
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "bool", "const", "volatile", "*",
];

#[derive(Debug)]
enum Rewrite {
    /// Object-like alias, replaced wherever the name appears as a word.
    Alias(Regex, String),
    /// Function-like macro with an empty body, erased with its argument list.
    Erase(Regex),
}

#[derive(Debug)]
struct Macro {
    name: String,
    rewrite: Rewrite,
}

/// Applies alias and annotation macros to `source`.
pub fn expand(source: &str) -> String {
    let mut table: Vec<Macro> = Vec::new();
    let mut out = Vec::new();
    let mut continued = false;

    for line in source.split('\n') {
        let directive = continued || line.trim_start().starts_with('#');
        continued = directive && line.trim_end().ends_with('\\');
        if !directive {
            out.push(apply(&table, line));
            continue;
        }
        if let Some(define) = DEFINE.captures(line) {
            let name = define[1].to_string();
            table.retain(|m| m.name != name);
            let body = define.get(3).map_or("", |m| m.as_str());
            if let Some(rewrite) = rewrite(&name, define.get(2).is_some(), body) {
                table.push(Macro { name, rewrite });
            }
        } else if let Some(undef) = UNDEF.captures(line) {
            table.retain(|m| m.name != undef[1]);
        }
        out.push(line.to_string());
    }
    out.join("\n")
}

fn rewrite(name: &str, function_like: bool, body: &str) -> Option<Rewrite> {
    let word = regex::escape(name);
    if function_like {
        if !body.is_empty() {
            return None;
        }
        return Regex::new(&format!(r"\b{word}\s*\(")).ok().map(Rewrite::Erase);
    }
    let spaced = body.replace('*', " * ");
    if !spaced.split_whitespace().all(|w| TYPE_WORDS.contains(&w)) {
        return None;
    }
    Regex::new(&format!(r"\b{word}\b"))
        .ok()
        .map(|pattern| Rewrite::Alias(pattern, body.to_string()))
}

fn apply(table: &[Macro], line: &str) -> String {
    let mut line = line.to_string();
    for entry in table {
        line = match &entry.rewrite {
            Rewrite::Alias(pattern, body) => pattern.replace_all(&line, body.as_str()).into_owned(),
            Rewrite::Erase(pattern) => erase_calls(pattern, &line),
        };
    }
    line
}

/// Removes every `name(...)` with balanced parentheses. An invocation that does not close
/// on this line is left alone.
fn erase_calls(pattern: &Regex, line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(found) = pattern.find(rest) {
        let Some(close) = closing_paren(&rest[found.end()..]) else {
            break;
        };
        out.push_str(&rest[..found.start()]);
        rest = &rest[found.end() + close + 1..];
    }
    out.push_str(rest);
    out
}

/// Byte offset of the `)` closing an already opened parenthesis.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (at, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(at);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_and_annotations() {
        let source = "#define __attribute__(x)\n#define bool unsigned char\n#define SMPT_API\n\
                      SMPT_API bool f(void) __attribute__((unused));\n";
        let out = expand(source);
        assert_eq!(out.lines().nth(3), Some(" unsigned char f(void) ;"));
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn constants_stay_symbolic() {
        let out = expand("#define Smpt_Length_Points 16\nchar p[Smpt_Length_Points];");
        assert!(out.ends_with("char p[Smpt_Length_Points];"));
    }

    #[test]
    fn undef_and_order() {
        let out = expand("bool a;\n#define bool int\nbool b;\n#undef bool\nbool c;");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "bool a;");
        assert_eq!(lines[2], "int b;");
        assert_eq!(lines[4], "bool c;");
    }

    #[test]
    fn unbalanced_invocations_are_kept() {
        let out = expand("#define ATTR(x)\nint a ATTR((b);");
        assert!(out.ends_with("int a ATTR((b);"));
    }
}
