// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Lowering of tree-sitter C syntax trees into [`ast`](super::ast) declarations.
//!
//! Declarations that come from outside the vendor tree (system headers pulled in by the
//! preprocessor) may contain syntax errors or constructs the model has no room for. The
//! caller decides via a predicate whether such a declaration may be skipped; anything
//! else is an error.

use tracing::debug;
use tree_sitter::{Node, Parser};

use super::{
    LineMap, Mode,
    ast::{
        Declaration, Declarator, Direct, EnumType, Enumerator, Expr, Field, Location, Member,
        Param, ParamList, Record, RecordKind, Suffix, TypeName, TypeSpec,
    },
};
use crate::{Error, Result};

/// Qualifiers that carry no binding information.
const IGNORED_QUALIFIERS: [&str; 2] = ["__extension__", "_Noreturn"];

/// Result of parsing one translation unit.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub declarations: Vec<Declaration>,
    /// Foreign declarations that were skipped.
    pub skipped: usize,
}

type Lowered<T> = std::result::Result<T, String>;

/// Parses `text` and lowers its declarations.
///
/// `recoverable` is asked about the start location of every declaration that cannot be
/// lowered. When it returns `true` the declaration is skipped, otherwise an
/// [`Error::Syntax`] is returned.
pub fn lower<F>(text: &str, lines: &LineMap, mode: Mode, recoverable: F) -> Result<TranslationUnit>
where
    F: Fn(&Location) -> bool,
{
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c::LANGUAGE.into())
        .map_err(|error| Error::Grammar(error.to_string()))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| Error::Grammar("parser returned no tree".into()))?;

    let mut lowering = Lowering {
        source: text,
        lines,
        mode,
        recoverable,
        unit: TranslationUnit::default(),
    };
    lowering.items(tree.root_node())?;
    Ok(lowering.unit)
}

/// Children of `node` paired with their field names.
fn children<'t>(node: Node<'t>) -> Vec<(Option<&'static str>, Node<'t>)> {
    let mut cursor = node.walk();
    let mut out = Vec::new();
    if cursor.goto_first_child() {
        loop {
            out.push((cursor.field_name(), cursor.node()));
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    out
}

/// Named children, leaving out comments and the name or condition of a conditional
/// directive.
fn named<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    children(node)
        .into_iter()
        .filter(|(field, _)| !matches!(field, Some("name" | "condition")))
        .map(|(_, child)| child)
        .filter(|child| child.is_named() && !child.is_extra())
}

fn first_error<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    children(node)
        .into_iter()
        .filter(|(_, child)| child.has_error() || child.is_missing())
        .find_map(|(_, child)| first_error(child))
}

fn bare(direct: Direct) -> Declarator {
    Declarator {
        pointers: Vec::new(),
        direct,
        suffixes: Vec::new(),
    }
}

/// Appends an array or function suffix. A declarator that already has pointers is
/// parenthesized first, as in `(*name)[4]`.
fn suffixed(base: Option<Declarator>, suffix: Suffix) -> Declarator {
    let mut declarator = base.unwrap_or_else(|| bare(Direct::Abstract));
    if declarator.pointers.is_empty() {
        declarator.suffixes.push(suffix);
        declarator
    } else {
        Declarator {
            pointers: Vec::new(),
            direct: Direct::Nested(Box::new(declarator)),
            suffixes: vec![suffix],
        }
    }
}

struct Lowering<'s, F> {
    source: &'s str,
    lines: &'s LineMap,
    mode: Mode,
    recoverable: F,
    unit: TranslationUnit,
}

impl<F> Lowering<'_, F>
where
    F: Fn(&Location) -> bool,
{
    fn text(&self, node: Node) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    fn location(&self, node: Node) -> Location {
        self.lines.location(node.start_position().row)
    }

    fn describe(&self, node: Node) -> String {
        match first_error(node) {
            Some(error) if error.is_missing() => format!("missing `{}`", error.kind()),
            Some(error) => {
                let text: String = self
                    .text(error)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("unexpected `{}`", text.chars().take(40).collect::<String>())
            }
            None => "syntax error".into(),
        }
    }

    fn reject(&mut self, location: Location, message: String) -> Result<()> {
        if (self.recoverable)(&location) {
            debug!(file = ?location.file, line = location.line, %message, "skipping foreign declaration");
            self.unit.skipped += 1;
            return Ok(());
        }
        Err(Error::Syntax {
            file: location.file.as_deref().unwrap_or("<input>").to_string(),
            line: location.line,
            message,
        })
    }

    /// Top-level items, the bodies of `extern "C"` blocks and, for raw text, every
    /// conditional branch.
    fn items(&mut self, parent: Node) -> Result<()> {
        for (field, child) in children(parent) {
            if matches!(field, Some("name" | "condition" | "value")) {
                continue;
            }
            if child.is_missing() {
                let location = self.location(child);
                self.reject(location, format!("missing `{}`", child.kind()))?;
                continue;
            }
            if child.is_named() && !child.is_extra() {
                self.item(child)?;
            }
        }
        Ok(())
    }

    fn item(&mut self, node: Node) -> Result<()> {
        match node.kind() {
            "declaration" | "type_definition" | "function_definition" | "struct_specifier"
            | "union_specifier" | "enum_specifier" => self.declaration(node),
            "linkage_specification" | "declaration_list" => self.items(node),
            "preproc_if" | "preproc_ifdef" | "preproc_elif" | "preproc_elifdef"
            | "preproc_else" => match self.mode {
                Mode::Raw => self.items(node),
                Mode::Preprocessed => Ok(()),
            },
            "preproc_include" | "preproc_def" | "preproc_function_def" | "preproc_call" => Ok(()),
            "expression_statement" if named(node).next().is_none() => Ok(()),
            "ERROR" => {
                let location = self.location(node);
                let message = self.describe(node);
                self.reject(location, message)
            }
            other => {
                let location = self.location(node);
                self.reject(location, format!("unexpected {other}"))
            }
        }
    }

    fn declaration(&mut self, node: Node) -> Result<()> {
        let location = self.location(node);
        let lowered = if node.has_error() {
            Err(self.describe(node))
        } else {
            self.lower_declaration(node, location.clone())
        };
        match lowered {
            Ok(declaration) => {
                self.unit.declarations.push(declaration);
                Ok(())
            }
            Err(message) => self.reject(location, message),
        }
    }

    fn lower_declaration(&self, node: Node, location: Location) -> Lowered<Declaration> {
        let mut storage = Vec::new();
        let mut qualifiers = Vec::new();
        let mut spec = None;
        let mut declarators = Vec::new();
        let mut has_body = false;

        match node.kind() {
            "struct_specifier" | "union_specifier" | "enum_specifier" => {
                spec = Some(self.type_spec(node)?);
            }
            kind => {
                if kind == "type_definition" {
                    storage.push("typedef".to_string());
                }
                for (field, child) in children(node) {
                    match (field, child.kind()) {
                        (Some("type"), _) => spec = Some(self.type_spec(child)?),
                        (Some("declarator"), "gnu_asm_expression" | "ms_call_modifier") => {}
                        (Some("declarator"), _) => declarators.push(self.declarator(child)?),
                        (Some("body"), _) => has_body = true,
                        (_, "storage_class_specifier") => storage.push(self.text(child).to_string()),
                        (_, "type_qualifier") => self.qualifier(child, &mut qualifiers),
                        (_, "attribute_specifier" | "attribute_declaration" | "ms_declspec_modifier") => {}
                        // Old-style parameter declarations of a definition.
                        (_, "declaration") => {}
                        _ if !child.is_named() || child.is_extra() => {}
                        (_, other) => return Err(format!("unexpected {other} in declaration")),
                    }
                }
            }
        }

        let spec = spec.ok_or_else(|| "missing type specifier".to_string())?;
        Ok(Declaration {
            location,
            storage,
            ty: TypeName { qualifiers, spec },
            declarators,
            has_body,
        })
    }

    fn qualifier(&self, node: Node, qualifiers: &mut Vec<String>) {
        let text = self.text(node);
        if !IGNORED_QUALIFIERS.contains(&text) {
            qualifiers.push(text.to_string());
        }
    }

    fn type_spec(&self, node: Node) -> Lowered<TypeSpec> {
        Ok(match node.kind() {
            "primitive_type" => TypeSpec::Builtin(self.text(node).to_string()),
            "sized_type_specifier" => TypeSpec::Builtin(
                self.text(node).split_whitespace().collect::<Vec<_>>().join(" "),
            ),
            "type_identifier" => TypeSpec::Typedef(self.text(node).to_string()),
            "struct_specifier" => TypeSpec::Record(self.record(node, RecordKind::Struct)?),
            "union_specifier" => TypeSpec::Record(self.record(node, RecordKind::Union)?),
            "enum_specifier" => TypeSpec::Enum(self.enum_type(node)?),
            other => return Err(format!("unsupported type specifier {other}")),
        })
    }

    fn record(&self, node: Node, kind: RecordKind) -> Lowered<Record> {
        let tag = node
            .child_by_field_name("name")
            .map(|name| self.text(name).to_string());
        let members = match node.child_by_field_name("body") {
            Some(body) => {
                let mut members = Vec::new();
                self.members(body, &mut members)?;
                Some(members)
            }
            None => None,
        };
        if tag.is_none() && members.is_none() {
            return Err(format!("{} without tag or body", kind.keyword()));
        }
        Ok(Record { kind, tag, members })
    }

    fn members(&self, list: Node, out: &mut Vec<Member>) -> Lowered<()> {
        for child in named(list) {
            match child.kind() {
                "field_declaration" => out.push(self.member(child)?),
                kind if kind.starts_with("preproc_") => self.conditional(child, |branch| {
                    self.members(branch, out)
                })?,
                other => return Err(format!("unexpected {other} in record body")),
            }
        }
        Ok(())
    }

    /// Descends into conditional branches of raw text. Other directives are ignored.
    fn conditional<G>(&self, node: Node, mut descend: G) -> Lowered<()>
    where
        G: FnMut(Node) -> Lowered<()>,
    {
        let is_branch = matches!(
            node.kind(),
            "preproc_if" | "preproc_ifdef" | "preproc_elif" | "preproc_elifdef" | "preproc_else"
        );
        if is_branch && self.mode == Mode::Raw {
            descend(node)?;
        }
        Ok(())
    }

    fn member(&self, node: Node) -> Lowered<Member> {
        let mut qualifiers = Vec::new();
        let mut spec = None;
        let mut fields: Vec<Field> = Vec::new();

        for (field, child) in children(node) {
            match (field, child.kind()) {
                (Some("type"), _) => spec = Some(self.type_spec(child)?),
                (Some("declarator"), _) => fields.push(Field {
                    declarator: self.declarator(child)?,
                    bit_width: None,
                }),
                (_, "bitfield_clause") => {
                    let width = named(child)
                        .next()
                        .map(|expr| self.expr(expr))
                        .ok_or_else(|| "empty bit-field width".to_string())?;
                    match fields.last_mut() {
                        Some(last) if last.bit_width.is_none() => last.bit_width = Some(width),
                        _ => fields.push(Field {
                            declarator: bare(Direct::Abstract),
                            bit_width: Some(width),
                        }),
                    }
                }
                (_, "type_qualifier") => self.qualifier(child, &mut qualifiers),
                (_, "storage_class_specifier" | "attribute_specifier" | "attribute_declaration" | "ms_declspec_modifier") => {}
                _ if !child.is_named() || child.is_extra() => {}
                (_, other) => return Err(format!("unexpected {other} in field")),
            }
        }

        let spec = spec.ok_or_else(|| "field without type".to_string())?;
        Ok(Member {
            ty: TypeName { qualifiers, spec },
            fields,
        })
    }

    fn enum_type(&self, node: Node) -> Lowered<EnumType> {
        let tag = node
            .child_by_field_name("name")
            .map(|name| self.text(name).to_string());
        let enumerators = match node.child_by_field_name("body") {
            Some(body) => {
                let mut enumerators = Vec::new();
                self.enumerators(body, &mut enumerators)?;
                Some(enumerators)
            }
            None => None,
        };
        Ok(EnumType { tag, enumerators })
    }

    fn enumerators(&self, list: Node, out: &mut Vec<Enumerator>) -> Lowered<()> {
        for child in named(list) {
            match child.kind() {
                "enumerator" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|name| self.text(name).to_string())
                        .ok_or_else(|| "enumerator without name".to_string())?;
                    let value = child.child_by_field_name("value").map(|v| self.expr(v));
                    out.push(Enumerator { name, value });
                }
                kind if kind.starts_with("preproc_") => self.conditional(child, |branch| {
                    self.enumerators(branch, out)
                })?,
                other => return Err(format!("unexpected {other} in enum body")),
            }
        }
        Ok(())
    }

    fn optional_declarator(&self, node: Node) -> Lowered<Option<Declarator>> {
        node.child_by_field_name("declarator")
            .map(|inner| self.declarator(inner))
            .transpose()
    }

    fn declarator(&self, node: Node) -> Lowered<Declarator> {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "primitive_type" => {
                Ok(bare(Direct::Name(self.text(node).to_string())))
            }
            "init_declarator" => self
                .optional_declarator(node)?
                .ok_or_else(|| "initializer without declarator".to_string()),
            "attributed_declarator" => {
                let inner = named(node)
                    .find(|child| child.kind() != "attribute_declaration")
                    .ok_or_else(|| "attributes without declarator".to_string())?;
                self.declarator(inner)
            }
            "pointer_declarator" | "abstract_pointer_declarator" => {
                let qualifiers: Vec<String> = named(node)
                    .filter(|child| child.kind() == "type_qualifier")
                    .map(|child| self.text(child).to_string())
                    .collect();
                let mut inner = self
                    .optional_declarator(node)?
                    .unwrap_or_else(|| bare(Direct::Abstract));
                inner.pointers.insert(0, qualifiers);
                Ok(inner)
            }
            "array_declarator" | "abstract_array_declarator" => {
                let size = node.child_by_field_name("size").map(|size| match size.kind() {
                    "*" => Expr(vec!["*".to_string()]),
                    _ => self.expr(size),
                });
                Ok(suffixed(self.optional_declarator(node)?, Suffix::Array(size)))
            }
            "function_declarator" | "abstract_function_declarator" => {
                for (field, child) in children(node) {
                    if field.is_none() && matches!(child.kind(), "identifier" | "call_expression") {
                        return Err(format!("unknown annotation `{}`", self.text(child)));
                    }
                }
                let parameters = node
                    .child_by_field_name("parameters")
                    .ok_or_else(|| "function without parameter list".to_string())?;
                let params = self.params(parameters)?;
                Ok(suffixed(
                    self.optional_declarator(node)?,
                    Suffix::Function(params),
                ))
            }
            "parenthesized_declarator" | "abstract_parenthesized_declarator" => {
                let inner = named(node)
                    .find(|child| child.kind() != "ms_call_modifier")
                    .ok_or_else(|| "empty parentheses in declarator".to_string())?;
                Ok(bare(Direct::Nested(Box::new(self.declarator(inner)?))))
            }
            other => Err(format!("unsupported declarator {other}")),
        }
    }

    fn params(&self, list: Node) -> Lowered<ParamList> {
        let mut params = ParamList {
            params: Vec::new(),
            variadic: false,
        };
        for child in named(list) {
            match child.kind() {
                "parameter_declaration" => params.params.push(self.param(child)?),
                "variadic_parameter" => params.variadic = true,
                other => return Err(format!("unsupported parameter {other}")),
            }
        }
        Ok(params)
    }

    fn param(&self, node: Node) -> Lowered<Param> {
        let mut qualifiers = Vec::new();
        let mut spec = None;
        let mut declarator = None;
        for (field, child) in children(node) {
            match (field, child.kind()) {
                (Some("type"), _) => spec = Some(self.type_spec(child)?),
                (Some("declarator"), _) => declarator = Some(self.declarator(child)?),
                (_, "type_qualifier") => self.qualifier(child, &mut qualifiers),
                _ => {}
            }
        }
        let spec = spec.ok_or_else(|| "parameter without type".to_string())?;
        Ok(Param {
            ty: TypeName { qualifiers, spec },
            declarator: declarator.unwrap_or_else(|| bare(Direct::Abstract)),
        })
    }

    /// An expression as its token texts. Literals stay whole.
    fn expr(&self, node: Node) -> Expr {
        let mut tokens = Vec::new();
        self.tokens(node, &mut tokens);
        Expr(tokens)
    }

    fn tokens(&self, node: Node, out: &mut Vec<String>) {
        if node.is_extra() {
            return;
        }
        let literal = matches!(node.kind(), "string_literal" | "char_literal" | "number_literal");
        if literal || node.child_count() == 0 {
            let text = self.text(node);
            if !text.is_empty() {
                out.push(text.to_string());
            }
            return;
        }
        for (_, child) in children(node) {
            self.tokens(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c::parse_source;

    fn parse_strict(source: &str) -> Result<TranslationUnit> {
        parse_source(source, Some("/inc/h.h"), Mode::Preprocessed, |_| false)
    }

    #[test]
    fn function_pointer_is_not_a_function() {
        let unit = parse_strict("void (*handler)(int); int f(void); char *g(void);").unwrap();
        assert!(!unit.declarations[0].declarators[0].is_function());
        assert!(unit.declarations[1].declarators[0].is_function());
        assert!(unit.declarations[2].declarators[0].is_function());
    }

    #[test]
    fn bodies_and_initializers_are_dropped() {
        let unit =
            parse_strict("static int x = { 1, 2 }; static inline int g(int a) { return a; }")
                .unwrap();
        assert_eq!(unit.declarations.len(), 2);
        assert!(unit.declarations[1].has_body);
        assert_eq!(unit.declarations[0].declarators[0].name(), Some("x"));
    }

    #[test]
    fn recovers_only_where_allowed() {
        let source = "# 1 \"/usr/include/x.h\"\nint a @@;\n# 1 \"/inc/h.h\"\nint c;\n";
        let unit = parse_source(source, None, Mode::Preprocessed, |loc| {
            loc.file.as_deref().is_some_and(|f| f.starts_with("/usr"))
        })
        .unwrap();
        assert!(unit.skipped >= 1);
        assert_eq!(unit.declarations.len(), 1);
        assert_eq!(unit.declarations[0].declarators[0].name(), Some("c"));

        let error = parse_source(source, None, Mode::Preprocessed, |_| false).unwrap_err();
        assert!(error.to_string().starts_with("/usr/include/x.h:1:"), "{error}");
    }

    #[test]
    fn unknown_annotations_fail() {
        assert!(parse_strict("SMPT_API bool smpt_check(const char *name);").is_err());
        assert!(parse_strict("bool smpt_check(const char *name) SMPT_DEPRECATED;").is_err());
    }

    #[test]
    fn raw_text_reads_every_branch() {
        let source = "#ifndef H\n#define H\n#ifdef _WIN32\ntypedef void *port;\n#else\ntypedef int port;\n#endif\n#endif\n";
        let unit = parse_source(source, Some("/inc/h.h"), Mode::Raw, |_| false).unwrap();
        assert_eq!(unit.declarations.len(), 2);
        assert_eq!(unit.declarations[1].location.line, 6);
        assert_eq!(
            parse_source(source, Some("/inc/h.h"), Mode::Preprocessed, |_| false)
                .unwrap()
                .declarations
                .len(),
            0
        );
    }

    #[test]
    fn bit_fields_and_nested_records() {
        let unit = parse_strict(
            "struct flags { unsigned int a : 1, b : 2; struct { int x; } inner; };",
        )
        .unwrap();
        let TypeSpec::Record(record) = &unit.declarations[0].ty.spec else {
            panic!("expected a record");
        };
        let members = record.members.as_ref().unwrap();
        assert_eq!(members[0].fields.len(), 2);
        assert!(members[0].fields.iter().all(|f| f.bit_width.is_some()));
        assert!(matches!(members[1].ty.spec, TypeSpec::Record(_)));
    }
}
