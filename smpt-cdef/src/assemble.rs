// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Descriptor assembler.
//!
//! Puts the result-code shim, harvested defines, type declarations and function
//! prototypes together, one entry per line, and applies the text-level fixups that the
//! parsed declarations still need: literal array bounds for known size macros, the
//! boolean array rewrite and pruning of fields that only exist on another platform.

use std::{
    collections::BTreeSet,
    fmt,
    sync::LazyLock,
};

use regex::{Captures, Regex};

use crate::{
    collector::Accumulator,
    harvest::DefineEntry,
    layout::{self, RecordLayout},
    platform::Platform,
    preprocess::rewrite_bool_arrays,
};

/// Size macros with the literal bounds of the compiled library layout.
pub const SIZE_MACROS: [(&str, u64); 7] = [
    ("Smpt_Length_Max_Packet_Size", 1200),
    ("Smpt_Length_Packet_Input_Buffer_Rows", 100),
    ("Smpt_Length_Serial_Port_Chars", 256),
    ("Smpt_Length_Number_Of_Acks", 100),
    ("Smpt_Length_Device_Id", 10),
    ("Smpt_Length_Points", 16),
    ("Smpt_Length_Number_Of_Channels", 8),
];

/// Result codes in declaration order; the value of each is its index.
pub const RESULT_CODES: [&str; 30] = [
    "Successful",
    "Transfer_Error",
    "Parameter_Error",
    "Protocol_Error",
    "Uc_Stim_Timeout_Error",
    "Emg_Timeout_Error",
    "Emg_Register_Error",
    "Not_Initialized_Error",
    "Hv_Error",
    "Demux_Timeout_Error",
    "Electrode_Error",
    "Invalid_Cmd_Error",
    "Demux_Parameter_Error",
    "Demux_Not_Initialized_Error",
    "Demux_Transfer_Error",
    "Demux_Unknown_Ack_Error",
    "Pulse_Timeout_Error",
    "Fuel_Gauge_Error",
    "Live_Signal_Error",
    "File_Transmission_Timeout",
    "File_Not_Found",
    "Busy",
    "File_Error",
    "Flash_Erase_Error",
    "Flash_Write_Error",
    "Unknown_Controller_Error",
    "Firmware_Too_Large_Error",
    "Fuel_Gauge_Not_Programmed",
    "Pulse_Low_Current_Error",
    "Last_Item",
];

const WINDOWS_HANDLE_FIELD: &str = "HANDLE serial_port_handle_;";
const POSIX_DESCRIPTOR_FIELD: &str = "int serial_port_descriptor;";

static ARRAY_BOUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("bound pattern is valid"));

/// The fully spelled result-code enumeration.
pub fn result_enum_shim() -> String {
    let items: Vec<String> = RESULT_CODES
        .iter()
        .enumerate()
        .map(|(value, name)| format!("Smpt_Result_{name} = {value}"))
        .collect();
    format!("typedef enum {{ {} }} Smpt_Result;", items.join(", "))
}

/// The assembled binding descriptor.
///
/// Rendered as shims, then defines, then types, then functions, one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingDescriptor {
    shims: Vec<String>,
    defines: Vec<String>,
    types: Vec<String>,
    functions: Vec<String>,
    minimal: bool,
}

impl BindingDescriptor {
    pub fn shims(&self) -> &[String] {
        &self.shims
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// `true` when built from the hand-written minimal declarations.
    pub fn is_minimal(&self) -> bool {
        self.minimal
    }

    /// Every entry in output order.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.shims
            .iter()
            .chain(&self.defines)
            .chain(&self.types)
            .chain(&self.functions)
            .map(String::as_str)
    }

    /// The descriptor text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in self.entries() {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }

    /// Finds the declaration of a type name (typedef name or record/enum tag).
    ///
    /// When several entries declare the same name the last one wins, so a definition
    /// parsed from the headers overrides the injected shim.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.shims
            .iter()
            .chain(&self.types)
            .rev()
            .map(String::as_str)
            .find(|entry| declares(entry, name))
    }

    /// Names of the declared functions, in descriptor order.
    pub fn function_names(&self) -> Vec<String> {
        self.functions
            .iter()
            .flat_map(|entry| layout::declared_names(entry))
            .collect()
    }

    /// Typedef names and tags declared by the shims and type entries, without repeats.
    pub fn type_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.shims
            .iter()
            .chain(&self.types)
            .flat_map(|entry| layout::declared_names(entry))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Field layout of the record `name` as the descriptor declares it.
    pub fn record_layout(&self, name: &str) -> Option<RecordLayout> {
        layout::record_layout(self.lookup(name)?)
    }
}

impl fmt::Display for BindingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn declares(entry: &str, name: &str) -> bool {
    let body = entry.trim_end().trim_end_matches(';').trim_end();
    if entry.starts_with("typedef ") {
        if let Some(prefix) = body.strip_suffix(name) {
            return prefix
                .chars()
                .last()
                .is_some_and(|c| !(c.is_ascii_alphanumeric() || c == '_'));
        }
    }
    ["struct ", "union ", "enum "].iter().any(|keyword| {
        entry
            .strip_prefix("typedef ")
            .unwrap_or(entry)
            .strip_prefix(keyword)
            .and_then(|rest| rest.strip_prefix(name))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', ';']))
    })
}

static BOUND_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(0[xX][0-9a-fA-F]+|\d+)[uUlL]*|([A-Za-z_]\w*)|(.))")
        .expect("bound token pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum BoundToken {
    Number(i128),
    Name(String),
    Op(char),
}

fn bound_tokens(bound: &str) -> Option<Vec<BoundToken>> {
    let mut tokens = Vec::new();
    let mut rest = bound.trim_end();
    while !rest.is_empty() {
        let caps = BOUND_TOKEN.captures(rest)?;
        let token = if let Some(number) = caps.get(1) {
            let text = number.as_str();
            let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex) => i128::from_str_radix(hex, 16).ok()?,
                None => text.parse().ok()?,
            };
            BoundToken::Number(value)
        } else if let Some(name) = caps.get(2) {
            BoundToken::Name(name.as_str().to_string())
        } else {
            BoundToken::Op(caps[3].chars().next()?)
        };
        tokens.push(token);
        rest = &rest[caps[0].len()..];
    }
    Some(tokens)
}

/// Integer evaluation of `+ - * /`, parentheses and unary minus over literals and
/// known size macros.
struct BoundEval<'t> {
    tokens: &'t [BoundToken],
    at: usize,
}

impl BoundEval<'_> {
    fn peek(&self) -> Option<&BoundToken> {
        self.tokens.get(self.at)
    }

    fn eat(&mut self, op: char) -> bool {
        if self.peek() == Some(&BoundToken::Op(op)) {
            self.at += 1;
            return true;
        }
        false
    }

    fn sum(&mut self) -> Option<i128> {
        let mut value = self.product()?;
        loop {
            if self.eat('+') {
                value = value.checked_add(self.product()?)?;
            } else if self.eat('-') {
                value = value.checked_sub(self.product()?)?;
            } else {
                return Some(value);
            }
        }
    }

    fn product(&mut self) -> Option<i128> {
        let mut value = self.unary()?;
        loop {
            if self.eat('*') {
                value = value.checked_mul(self.unary()?)?;
            } else if self.eat('/') {
                value = value.checked_div(self.unary()?)?;
            } else {
                return Some(value);
            }
        }
    }

    fn unary(&mut self) -> Option<i128> {
        if self.eat('-') {
            return self.unary()?.checked_neg();
        }
        if self.eat('+') {
            return self.unary();
        }
        if self.eat('(') {
            let value = self.sum()?;
            return self.eat(')').then_some(value);
        }
        let token = self.peek()?.clone();
        self.at += 1;
        match token {
            BoundToken::Number(value) => Some(value),
            BoundToken::Name(name) => size_macro(&name).map(i128::from),
            BoundToken::Op(_) => None,
        }
    }
}

fn size_macro(name: &str) -> Option<u64> {
    SIZE_MACROS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, value)| *value)
}

/// Folds an array bound that mentions a known size macro to its value.
fn fold_bound(bound: &str) -> Option<u64> {
    let tokens = bound_tokens(bound)?;
    if !tokens
        .iter()
        .any(|token| matches!(token, BoundToken::Name(name) if size_macro(name).is_some()))
    {
        return None;
    }
    let mut eval = BoundEval {
        tokens: &tokens,
        at: 0,
    };
    let value = eval.sum()?;
    if eval.at != tokens.len() {
        return None;
    }
    u64::try_from(value).ok()
}

static SIZE_MACRO_WORD: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = SIZE_MACROS.iter().map(|(name, _)| *name).collect();
    Regex::new(&format!(r"\b(?:{})\b", names.join("|"))).expect("size macro pattern is valid")
});

/// Literal for every known size macro in a bound that does not fold completely.
fn substitute_in_place(bound: &str) -> String {
    SIZE_MACRO_WORD
        .replace_all(bound, |caps: &Captures<'_>| {
            size_macro(&caps[0]).map_or_else(|| caps[0].to_string(), |value| value.to_string())
        })
        .into_owned()
}

/// Replaces array bounds built from known size macros with their literal value.
pub fn substitute_sizes(entry: &str) -> String {
    ARRAY_BOUND
        .replace_all(entry, |caps: &Captures<'_>| match fold_bound(&caps[1]) {
            Some(value) => format!("[{value}]"),
            None => format!("[{}]", substitute_in_place(&caps[1])),
        })
        .into_owned()
}

/// Comments out the record field that does not exist on `platform`.
pub fn prune_platform_fields(entry: &str, platform: &Platform) -> String {
    let mut entry = entry.to_string();
    if !platform.windows_handle_field && entry.contains(WINDOWS_HANDLE_FIELD) {
        entry = entry.replace(
            WINDOWS_HANDLE_FIELD,
            &format!("/* Windows only: {WINDOWS_HANDLE_FIELD} */"),
        );
    }
    if !platform.posix_descriptor_field && entry.contains(POSIX_DESCRIPTOR_FIELD) {
        entry = entry.replace(
            POSIX_DESCRIPTOR_FIELD,
            &format!("/* Linux/macOS only: {POSIX_DESCRIPTOR_FIELD} */"),
        );
    }
    entry
}

/// Builds descriptors for one platform.
#[derive(Debug, Clone)]
pub struct Assembler<'a> {
    platform: &'a Platform,
}

impl<'a> Assembler<'a> {
    pub fn new(platform: &'a Platform) -> Self {
        Self { platform }
    }

    /// Assembles the descriptor from harvested defines and collected declarations.
    ///
    /// Entries that become identical after the fixups are kept once.
    pub fn assemble(
        &self,
        defines: &BTreeSet<DefineEntry>,
        acc: &Accumulator,
        minimal: bool,
    ) -> BindingDescriptor {
        let mut seen = BTreeSet::new();
        let mut fix = |entries: &[String]| -> Vec<String> {
            entries
                .iter()
                .map(|entry| {
                    let entry = substitute_sizes(entry);
                    let entry = rewrite_bool_arrays(&entry);
                    prune_platform_fields(&entry, self.platform)
                })
                .filter(|entry| seen.insert(entry.clone()))
                .collect()
        };
        let types = fix(acc.types());
        let functions = fix(acc.functions());

        BindingDescriptor {
            shims: vec![result_enum_shim()],
            defines: defines.iter().map(ToString::to_string).collect(),
            types,
            functions,
            minimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Os;

    #[test]
    fn folds_products_of_size_macros() {
        assert_eq!(
            substitute_sizes(
                "typedef struct { unsigned char d[Smpt_Length_Packet_Input_Buffer_Rows * Smpt_Length_Max_Packet_Size]; char n[Smpt_Length_Serial_Port_Chars]; int o[Other]; } D;"
            ),
            "typedef struct { unsigned char d[120000]; char n[256]; int o[Other]; } D;"
        );
        assert_eq!(fold_bound("Smpt_Length_Points + 1"), Some(17));
        assert_eq!(fold_bound("Smpt_Length_Points * Unknown"), None);
    }

    #[test]
    fn folds_differences_and_groupings() {
        assert_eq!(
            substitute_sizes("typedef struct { unsigned char points[Smpt_Length_Points - 1]; } P;"),
            "typedef struct { unsigned char points[15]; } P;"
        );
        assert_eq!(fold_bound("(Smpt_Length_Points + 0x10u) / 2"), Some(16));
        assert_eq!(fold_bound("-Smpt_Length_Points"), None);
        assert_eq!(fold_bound("Smpt_Length_Points / 0"), None);
        assert_eq!(fold_bound("(Smpt_Length_Points"), None);
        assert_eq!(fold_bound("2 * 8"), None);
        assert_eq!(
            substitute_sizes("char n[Smpt_Length_Serial_Port_Chars + Other];"),
            "char n[256 + Other];"
        );
    }

    #[test]
    fn prunes_field_of_other_platform() {
        let entry = "typedef struct { HANDLE serial_port_handle_; int serial_port_descriptor; } Smpt_device;";
        let linux = prune_platform_fields(entry, &Platform::for_os(Os::Linux));
        assert!(linux.contains("/* Windows only: HANDLE serial_port_handle_; */"));
        assert!(linux.contains(" int serial_port_descriptor; }"));
        let windows = prune_platform_fields(entry, &Platform::for_os(Os::Windows));
        assert!(windows.contains("/* Linux/macOS only: int serial_port_descriptor; */"));
    }

    #[test]
    fn lookup_prefers_last_definition() {
        let platform = Platform::for_os(Os::Linux);
        let mut acc = Accumulator::new();
        acc.push_type("typedef enum { Smpt_Result_Successful = ... } Smpt_Result;".into());
        acc.push_type("struct Smpt_ack { unsigned char result; };".into());
        let descriptor = Assembler::new(&platform).assemble(&BTreeSet::new(), &acc, false);

        assert_eq!(
            descriptor.lookup("Smpt_Result"),
            Some("typedef enum { Smpt_Result_Successful = ... } Smpt_Result;")
        );
        assert_eq!(
            descriptor.lookup("Smpt_ack"),
            Some("struct Smpt_ack { unsigned char result; };")
        );
        assert!(descriptor.render().starts_with("typedef enum { Smpt_Result_Successful = 0,"));
        assert_eq!(descriptor.lookup("Smpt_Result_Successful"), None);
    }
}
