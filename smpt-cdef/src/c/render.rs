// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Renders declarations back to single-line C text.

use super::ast::{
    Declaration, Declarator, Direct, EnumType, Expr, Member, ParamList, Record, Suffix, TypeName,
    TypeSpec,
};

const BINARY: [&str; 19] = [
    "*", "+", "-", "/", "%", "<<", ">>", "|", "&", "^", "==", "!=", "<", ">", "<=", ">=", "&&",
    "||", "?",
];

/// Renders an expression with conventional spacing, e.g. `A * B` or `sizeof(x)`.
pub fn expr(expr: &Expr) -> String {
    let mut out = String::new();
    let mut previous: Option<&str> = None;
    for token in &expr.0 {
        let token = token.as_str();
        let space = match previous {
            None => false,
            Some(prev) => {
                let prev_is_operand = is_operand(prev) || prev == ")" || prev == "]";
                if matches!(token, ")" | "]" | ",") || matches!(prev, "(" | "[" | "~" | "!") {
                    false
                } else if prev == "," || prev == ":" {
                    true
                } else if token == "(" {
                    !(is_operand(prev) || prev == ")")
                } else if BINARY.contains(&token) || token == ":" {
                    prev_is_operand
                } else if BINARY.contains(&prev) {
                    // Unary operators bind to their operand.
                    expr.0.len() > 1 && binary_position(&expr.0, prev, token)
                } else {
                    is_operand(prev) && is_operand(token)
                }
            }
        };
        if space {
            out.push(' ');
        }
        out.push_str(token);
        previous = Some(token);
    }
    out
}

fn is_operand(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '\'' || c == '"')
        || token == "..."
}

/// Whether the operator `op` directly preceding `token` was used as a binary operator.
fn binary_position(tokens: &[String], op: &str, token: &str) -> bool {
    let Some(index) = tokens
        .windows(2)
        .position(|pair| pair[0] == op && pair[1] == token)
    else {
        return true;
    };
    index
        .checked_sub(1)
        .map(|before| {
            let before = tokens[before].as_str();
            is_operand(before) || before == ")" || before == "]"
        })
        .unwrap_or(false)
}

/// Renders a qualified type, including full record or enum bodies.
pub fn type_name(ty: &TypeName) -> String {
    let mut parts: Vec<String> = ty.qualifiers.clone();
    parts.push(match &ty.spec {
        TypeSpec::Builtin(words) => words.clone(),
        TypeSpec::Typedef(name) => name.clone(),
        TypeSpec::Record(record) => self::record(record),
        TypeSpec::Enum(enum_type) => self::enum_type(enum_type),
    });
    parts.join(" ")
}

pub fn record(record: &Record) -> String {
    let mut out = record.kind.keyword().to_string();
    if let Some(tag) = &record.tag {
        out.push(' ');
        out.push_str(tag);
    }
    if let Some(members) = &record.members {
        out.push_str(" {");
        for member in members {
            out.push(' ');
            out.push_str(&self::member(member));
        }
        out.push_str(" }");
    }
    out
}

fn member(member: &Member) -> String {
    let fields: Vec<String> = member
        .fields
        .iter()
        .map(|field| {
            let mut text = declarator(&field.declarator);
            if let Some(width) = &field.bit_width {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(": ");
                text.push_str(&expr(width));
            }
            text
        })
        .collect();
    join_type(&type_name(&member.ty), &fields.join(", ")) + ";"
}

pub fn enum_type(enum_type: &EnumType) -> String {
    let mut out = "enum".to_string();
    if let Some(tag) = &enum_type.tag {
        out.push(' ');
        out.push_str(tag);
    }
    if let Some(enumerators) = &enum_type.enumerators {
        let items: Vec<String> = enumerators
            .iter()
            .map(|e| match &e.value {
                Some(value) => format!("{} = {}", e.name, expr(value)),
                None => e.name.clone(),
            })
            .collect();
        if items.is_empty() {
            out.push_str(" { }");
        } else {
            out.push_str(&format!(" {{ {} }}", items.join(", ")));
        }
    }
    out
}

/// Renders a declarator, e.g. `*const name`, `(*cb)(int)` or `buf[16]`.
pub fn declarator(declarator: &Declarator) -> String {
    let mut out = String::new();
    for qualifiers in &declarator.pointers {
        out.push('*');
        for qualifier in qualifiers {
            out.push_str(qualifier);
            out.push(' ');
        }
    }
    match &declarator.direct {
        Direct::Abstract => {}
        Direct::Name(name) => out.push_str(name),
        Direct::Nested(inner) => {
            out.push('(');
            out.push_str(&self::declarator(inner));
            out.push(')');
        }
    }
    for suffix in &declarator.suffixes {
        match suffix {
            Suffix::Array(None) => out.push_str("[]"),
            Suffix::Array(Some(bound)) => {
                out.push('[');
                out.push_str(&expr(bound));
                out.push(']');
            }
            Suffix::Function(list) => out.push_str(&params(list)),
        }
    }
    out.trim_end().to_string()
}

fn params(list: &ParamList) -> String {
    let mut items: Vec<String> = list
        .params
        .iter()
        .map(|param| join_type(&type_name(&param.ty), &declarator(&param.declarator)))
        .collect();
    if list.variadic {
        items.push("...".to_string());
    }
    format!("({})", items.join(", "))
}

/// Renders a whole declaration terminated by `;`.
///
/// Storage classes other than `typedef` are dropped since they carry no binding
/// information.
pub fn declaration(declaration: &Declaration) -> String {
    let declarators: Vec<String> = declaration.declarators.iter().map(declarator).collect();
    let mut ty = type_name(&declaration.ty);
    if declaration.is_typedef() {
        ty = format!("typedef {ty}");
    }
    join_type(&ty, &declarators.join(", ")) + ";"
}

fn join_type(ty: &str, declarators: &str) -> String {
    if declarators.is_empty() {
        ty.to_string()
    } else {
        format!("{ty} {declarators}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c::{Mode, parse_source};

    fn roundtrip(source: &str) -> Vec<String> {
        parse_source(source, None, Mode::Preprocessed, |_| false)
            .unwrap()
            .declarations
            .iter()
            .map(declaration)
            .collect()
    }

    #[test]
    fn renders_single_lines() {
        assert_eq!(
            roundtrip("typedef struct Smpt_ack {\n unsigned char packet_number;\n unsigned short command_number;\n} Smpt_ack;"),
            vec!["typedef struct Smpt_ack { unsigned char packet_number; unsigned short command_number; } Smpt_ack;"]
        );
        assert_eq!(
            roundtrip("extern bool smpt_open(Smpt_device *const device, const char *const name);"),
            vec!["bool smpt_open(Smpt_device *const device, const char *const name);"]
        );
        assert_eq!(
            roundtrip("int printf(const char *fmt, ...);"),
            vec!["int printf(const char *fmt, ...);"]
        );
    }

    #[test]
    fn renders_expressions() {
        assert_eq!(
            roundtrip("char b[Rows * Size]; char c[sizeof(int) + 1]; enum { A = -1, B = 1 << 2 };"),
            vec![
                "char b[Rows * Size];",
                "char c[sizeof(int) + 1];",
                "enum { A = -1, B = 1 << 2 };"
            ]
        );
    }

    #[test]
    fn renders_function_pointers() {
        assert_eq!(
            roundtrip("typedef void (*callback)(int, void *);"),
            vec!["typedef void (*callback)(int, void *);"]
        );
    }
}
