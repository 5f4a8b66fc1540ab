// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Reading descriptor entries back: declared names and record layouts.
//!
//! The FFI crate uses this to allowlist what the descriptor declares when generating
//! bindings, and to check hand-written records against the parsed headers when it
//! cannot.

use serde::Serialize;

use crate::{
    assemble::BindingDescriptor,
    c::{
        Mode,
        ast::{Declaration, Declarator, Direct, Record, TypeName, TypeSpec},
        parse_source, render,
    },
};

/// Stands in for an erased `...` value so the entry stays valid C.
const ERASED: &str = "SMPT_ERASED_";

/// One field of a record: name, base type, pointer depth and array bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldLayout {
    pub name: String,
    pub ty: String,
    pub pointers: usize,
    pub bounds: Vec<String>,
}

/// Fields of a record in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
}

fn parse(entry: &str) -> Vec<Declaration> {
    let entry = entry
        .replace("[...]", &format!("[{ERASED}]"))
        .replace("= ...", &format!("= {ERASED}"));
    parse_source(&entry, None, Mode::Preprocessed, |_| false)
        .map(|unit| unit.declarations)
        .unwrap_or_default()
}

/// Names an entry introduces: typedef names, record and enum tags, and functions.
pub fn declared_names(entry: &str) -> Vec<String> {
    let mut names = Vec::new();
    for declaration in parse(entry) {
        match &declaration.ty.spec {
            TypeSpec::Record(record) => names.extend(record.tag.clone()),
            TypeSpec::Enum(enum_type) => names.extend(enum_type.tag.clone()),
            TypeSpec::Builtin(_) | TypeSpec::Typedef(_) => {}
        }
        names.extend(
            declaration
                .declarators
                .iter()
                .filter(|d| declaration.is_typedef() || d.is_function())
                .filter_map(|d| d.name().map(str::to_string)),
        );
    }
    names
}

/// Layout of the record an entry defines, named by its typedef name or tag.
pub fn record_layout(entry: &str) -> Option<RecordLayout> {
    parse(entry).into_iter().find_map(|declaration| {
        let TypeSpec::Record(record) = &declaration.ty.spec else {
            return None;
        };
        let members = record.members.as_ref()?;
        let name = declaration
            .declarators
            .iter()
            .find_map(|d| d.name().map(str::to_string))
            .or_else(|| record.tag.clone())?;
        let fields = members
            .iter()
            .flat_map(|member| {
                member.fields.iter().map(move |field| {
                    let mut declarator = field.declarator.clone();
                    let bounds = declarator
                        .array_bounds_mut()
                        .into_iter()
                        .map(|bound| match bound.as_ref().map(render::expr) {
                            Some(text) if text == ERASED => "...".to_string(),
                            Some(text) => text,
                            None => String::new(),
                        })
                        .collect();
                    FieldLayout {
                        name: field.declarator.name().unwrap_or_default().to_string(),
                        ty: base_type(&member.ty),
                        pointers: pointer_depth(&field.declarator),
                        bounds,
                    }
                })
            })
            .collect();
        Some(RecordLayout { name, fields })
    })
}

fn base_type(ty: &TypeName) -> String {
    match &ty.spec {
        TypeSpec::Builtin(name) | TypeSpec::Typedef(name) => name.clone(),
        TypeSpec::Record(record) => render::record(&Record {
            members: None,
            ..record.clone()
        }),
        TypeSpec::Enum(_) => "enum".to_string(),
    }
}

fn pointer_depth(declarator: &Declarator) -> usize {
    let nested = match &declarator.direct {
        Direct::Nested(inner) => pointer_depth(inner),
        _ => 0,
    };
    declarator.pointers.len() + nested
}

/// Storage size in bytes of the scalar types the records use, when known.
fn scalar_size(ty: &str) -> Option<u8> {
    Some(match ty {
        "char" | "signed char" | "unsigned char" | "bool" | "_Bool" | "uint8_t" | "int8_t" => 1,
        "short" | "unsigned short" | "short int" | "unsigned short int" | "uint16_t"
        | "int16_t" => 2,
        "int" | "unsigned int" | "unsigned" | "signed" | "uint32_t" | "int32_t" | "float" => 4,
        "long long" | "unsigned long long" | "uint64_t" | "int64_t" | "double" => 8,
        _ => return None,
    })
}

/// Differences between a hand-written record and the layout parsed from the headers.
///
/// Fields must agree in order, name, pointer depth and array bounds. Base types agree
/// when they are the same text or scalars of the same size.
pub fn mismatches(expected: &RecordLayout, actual: &RecordLayout) -> Vec<String> {
    let record = &expected.name;
    if expected.fields.len() != actual.fields.len() {
        let names = |layout: &RecordLayout| {
            layout
                .fields
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        return vec![format!(
            "{record}: headers declare [{}], hand-written record has [{}]",
            names(actual),
            names(expected)
        )];
    }
    let mut out = Vec::new();
    for (want, have) in expected.fields.iter().zip(&actual.fields) {
        if want.name != have.name {
            out.push(format!("{record}: field `{}` is `{}` in the headers", want.name, have.name));
            continue;
        }
        let same_type = want.ty == have.ty
            || matches!((scalar_size(&want.ty), scalar_size(&have.ty)), (Some(a), Some(b)) if a == b);
        if !same_type || want.pointers != have.pointers {
            out.push(format!(
                "{record}.{}: type `{}` is `{}` in the headers",
                want.name, want.ty, have.ty
            ));
        }
        if want.bounds != have.bounds {
            out.push(format!(
                "{record}.{}: bounds [{}] are [{}] in the headers",
                want.name,
                want.bounds.join("]["),
                have.bounds.join("][")
            ));
        }
    }
    out
}

/// Compares hand-written record entries with the records of the same name in
/// `descriptor`. Records the descriptor does not define are not compared.
pub fn check_records(descriptor: &BindingDescriptor, records: &[&str]) -> Vec<String> {
    records
        .iter()
        .filter_map(|entry| record_layout(entry))
        .flat_map(|expected| match descriptor.record_layout(&expected.name) {
            Some(actual) => mismatches(&expected, &actual),
            None => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_of_types_and_functions() {
        assert_eq!(
            declared_names("typedef struct Smpt_ack { unsigned char result; } Smpt_ack;"),
            ["Smpt_ack", "Smpt_ack"]
        );
        assert_eq!(
            declared_names("bool smpt_open_serial_port(Smpt_device *const device, const char *const device_name);"),
            ["smpt_open_serial_port"]
        );
        assert_eq!(
            declared_names("typedef enum { Smpt_Result_Successful = ... } Smpt_Result;"),
            ["Smpt_Result"]
        );
        assert!(declared_names("#define X 1").is_empty());
    }

    #[test]
    fn layouts_ignore_pruned_fields() {
        let layout = record_layout(
            "typedef struct { unsigned int packet_length; /* Windows only: HANDLE serial_port_handle_; */ char name[256]; unsigned char *buffer; } Smpt_device;",
        )
        .unwrap();
        assert_eq!(layout.name, "Smpt_device");
        let names: Vec<&str> = layout.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["packet_length", "name", "buffer"]);
        assert_eq!(layout.fields[1].bounds, ["256"]);
        assert_eq!(layout.fields[2].pointers, 1);
    }

    #[test]
    fn scalar_aliases_compare_equal() {
        let hand = record_layout("typedef struct { unsigned char a; unsigned short b; } R;").unwrap();
        let parsed = record_layout("typedef struct { uint8_t a; uint16_t b; } R;").unwrap();
        assert!(mismatches(&hand, &parsed).is_empty());

        let wider = record_layout("typedef struct { uint8_t a; Smpt_Cmd b; } R;").unwrap();
        assert_eq!(mismatches(&hand, &wider).len(), 1);

        let longer = record_layout("typedef struct { uint8_t a; uint16_t b; char c[4]; } R;").unwrap();
        assert!(mismatches(&hand, &longer)[0].contains("a, b, c"));
    }

    #[test]
    fn bounds_must_agree() {
        let hand = record_layout("typedef struct { char v[64]; } R;").unwrap();
        let erased = record_layout("typedef struct { char v[...]; } R;").unwrap();
        assert_eq!(mismatches(&hand, &erased), ["R.v: bounds [64] are [...] in the headers"]);
    }
}

