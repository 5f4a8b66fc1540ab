// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Declaration collector.
//!
//! Walks the declarations of one parsed root header, keeps those that belong to the
//! vendor tree, normalizes them and appends their rendered text to an [`Accumulator`].
//! The accumulator is passed in and handed back by every call so that no collection
//! state outlives a pipeline run.

use std::{
    collections::{BTreeSet, HashSet},
    path::Path,
};

use crate::{
    c::{
        TranslationUnit,
        ast::{
            Declaration, Declarator, Derivation, Expr, Location, Member, TypeName, TypeSpec,
        },
        render,
    },
    locator::IncludeRoot,
};

/// Parameter types that stand for a variadic argument list.
const VA_LIST_TYPES: [&str; 3] = ["va_list", "__gnuc_va_list", "__builtin_va_list"];

/// Rendered declarations gathered so far, deduplicated by exact text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulator {
    types: Vec<String>,
    functions: Vec<String>,
    seen: HashSet<String>,
    declared: BTreeSet<String>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type declarations in first-seen order.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Function prototypes in first-seen order.
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Every name introduced by a collected declaration.
    pub fn declared_names(&self) -> &BTreeSet<String> {
        &self.declared
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.functions.is_empty()
    }

    /// Appends a type declaration unless the same text is already present.
    pub fn push_type(&mut self, text: String) -> bool {
        if self.seen.insert(text.clone()) {
            self.types.push(text);
            true
        } else {
            false
        }
    }

    /// Appends a function prototype unless the same text is already present.
    pub fn push_function(&mut self, text: String) -> bool {
        if self.seen.insert(text.clone()) {
            self.functions.push(text);
            true
        } else {
            false
        }
    }

    pub fn declare(&mut self, name: impl Into<String>) {
        self.declared.insert(name.into());
    }
}

/// Visits parsed headers on behalf of one include root.
#[derive(Debug, Clone)]
pub struct Collector<'a> {
    root: &'a IncludeRoot,
    exclusions: &'a HashSet<String>,
}

impl<'a> Collector<'a> {
    /// Creates a collector that drops functions named in `exclusions`.
    pub fn new(root: &'a IncludeRoot, exclusions: &'a HashSet<String>) -> Self {
        Self { root, exclusions }
    }

    /// Whether a declaration at `location` belongs to the vendor tree.
    ///
    /// Text without a location (or from a `<built-in>` pseudo file) was injected by the
    /// preprocessor and is kept too.
    pub fn owns(&self, location: &Location) -> bool {
        match location.file.as_deref() {
            None => true,
            Some(file) if file.starts_with('<') => true,
            Some(file) => self.root.contains(Path::new(file)),
        }
    }

    /// Whether a parse error at `location` may be skipped.
    pub fn is_foreign(&self, location: &Location) -> bool {
        !self.owns(location)
    }

    /// Adds the vendor declarations of `unit` to `acc` and returns it.
    pub fn collect(&self, unit: &TranslationUnit, mut acc: Accumulator) -> Accumulator {
        for declaration in &unit.declarations {
            if self.owns(&declaration.location) {
                acc = self.visit(declaration, acc);
            }
        }
        acc
    }

    fn visit(&self, declaration: &Declaration, mut acc: Accumulator) -> Accumulator {
        let mut declaration = declaration.clone();
        normalize_type(&mut declaration.ty);
        for declarator in &mut declaration.declarators {
            normalize_declarator(declarator);
        }
        rewrite_bool_arrays(&mut declaration.ty, &declaration.declarators);
        declare_type_names(&declaration.ty, &mut acc);

        if declaration.is_typedef() {
            for name in declaration.declarators.iter().filter_map(Declarator::name) {
                acc.declare(name);
            }
            acc.push_type(render::declaration(&declaration));
            return acc;
        }

        if let Some(definition) = standalone_type(&declaration.ty) {
            acc.push_type(definition);
        }

        for declarator in declaration.declarators.iter().filter(|d| d.is_function()) {
            let Some(name) = declarator.name() else {
                continue;
            };
            if self.exclusions.contains(name) {
                continue;
            }
            acc.declare(name);
            let prototype = Declaration {
                location: declaration.location.clone(),
                storage: Vec::new(),
                ty: declaration.ty.clone(),
                declarators: vec![declarator.clone()],
                has_body: false,
            };
            acc.push_function(render::declaration(&prototype));
        }
        acc
    }
}

/// The `struct Tag {...};`, `struct Tag;` or `enum {...};` line a non-typedef
/// declaration contributes, if any.
fn standalone_type(ty: &TypeName) -> Option<String> {
    let bare = TypeName {
        qualifiers: Vec::new(),
        spec: ty.spec.clone(),
    };
    match &ty.spec {
        TypeSpec::Record(record) if record.tag.is_some() => {
            Some(render::type_name(&bare) + ";")
        }
        TypeSpec::Enum(enum_type) if enum_type.tag.is_some() || enum_type.enumerators.is_some() => {
            Some(render::type_name(&bare) + ";")
        }
        _ => None,
    }
}

fn normalize_type(ty: &mut TypeName) {
    match &mut ty.spec {
        TypeSpec::Record(record) => {
            for member in record.members.iter_mut().flatten() {
                normalize_member(member);
            }
        }
        TypeSpec::Enum(enum_type) => {
            for enumerator in enum_type.enumerators.iter_mut().flatten() {
                if enumerator.value.is_some() {
                    enumerator.value = Some(Expr::placeholder());
                }
            }
        }
        TypeSpec::Builtin(_) | TypeSpec::Typedef(_) => {}
    }
}

fn normalize_member(member: &mut Member) {
    normalize_type(&mut member.ty);
    for field in &mut member.fields {
        normalize_declarator(&mut field.declarator);
    }
    let declarators: Vec<Declarator> = member.fields.iter().map(|f| f.declarator.clone()).collect();
    rewrite_bool_arrays(&mut member.ty, &declarators);
}

fn normalize_declarator(declarator: &mut Declarator) {
    for bound in declarator.array_bounds_mut() {
        if bound.as_ref().is_some_and(|b| b.mentions("sizeof")) {
            *bound = Some(Expr::placeholder());
        }
    }
    for list in declarator.param_lists_mut() {
        let before = list.params.len();
        list.params.retain(|param| {
            !(param.declarator.pointers.is_empty()
                && param.declarator.suffixes.is_empty()
                && spec_name(&param.ty.spec).is_some_and(|name| VA_LIST_TYPES.contains(&name)))
        });
        if list.params.len() != before {
            list.variadic = true;
        }
        for param in &mut list.params {
            normalize_type(&mut param.ty);
            normalize_declarator(&mut param.declarator);
        }
    }
}

/// Arrays of `_Bool`/`bool` become arrays of `unsigned char`.
fn rewrite_bool_arrays(ty: &mut TypeName, declarators: &[Declarator]) {
    let is_bool = matches!(spec_name(&ty.spec), Some("bool" | "_Bool"));
    if is_bool
        && declarators
            .iter()
            .any(|d| d.first_derivation() == Some(Derivation::Array))
    {
        ty.spec = TypeSpec::Builtin("unsigned char".to_string());
    }
}

/// The keyword or typedef name of a non-record type.
fn spec_name(spec: &TypeSpec) -> Option<&str> {
    match spec {
        TypeSpec::Builtin(name) | TypeSpec::Typedef(name) => Some(name),
        TypeSpec::Record(_) | TypeSpec::Enum(_) => None,
    }
}

fn declare_type_names(ty: &TypeName, acc: &mut Accumulator) {
    match &ty.spec {
        TypeSpec::Record(record) => {
            if let Some(tag) = &record.tag {
                acc.declare(tag.clone());
            }
            for member in record.members.iter().flatten() {
                declare_type_names(&member.ty, acc);
            }
        }
        TypeSpec::Enum(enum_type) => {
            if let Some(tag) = &enum_type.tag {
                acc.declare(tag.clone());
            }
            for enumerator in enum_type.enumerators.iter().flatten() {
                acc.declare(enumerator.name.clone());
            }
        }
        TypeSpec::Builtin(_) | TypeSpec::Typedef(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c::{Mode, parse_source};

    fn collect(source: &str) -> Accumulator {
        let dir = tempfile::tempdir().unwrap();
        let root = IncludeRoot::at(dir.path());
        let header = root.header_path("h.h");
        let exclusions = HashSet::from(["smpt_hidden".to_string()]);
        let collector = Collector::new(&root, &exclusions);
        let unit = parse_source(
            source,
            Some(&header.to_string_lossy()),
            Mode::Preprocessed,
            |loc| collector.is_foreign(loc),
        )
        .unwrap();
        collector.collect(&unit, Accumulator::new())
    }

    #[test]
    fn erases_enum_values_and_sizeof_bounds() {
        let acc = collect(
            "typedef enum { A = 1 << 3, B, C = 7 } E;\nstruct S { char name[sizeof(int) * 2]; bool flags[4]; };",
        );
        assert_eq!(
            acc.types(),
            [
                "typedef enum { A = ..., B, C = ... } E;",
                "struct S { char name[...]; unsigned char flags[4]; };"
            ]
        );
        assert!(acc.declared_names().contains("A"));
        assert!(acc.declared_names().contains("E"));
    }

    #[test]
    fn collapses_va_list_and_drops_excluded() {
        let acc = collect(
            "void smpt_log(const char *fmt, va_list args);\nvoid smpt_hidden(void);\nint smpt_x(int a), smpt_y;",
        );
        assert_eq!(
            acc.functions(),
            ["void smpt_log(const char *fmt, ...);", "int smpt_x(int a);"]
        );
        assert!(!acc.declared_names().contains("smpt_hidden"));
    }

    #[test]
    fn deduplicates_by_text() {
        let acc = collect("struct S { unsigned char x; };\nstruct S { unsigned char x; };");
        assert_eq!(acc.types().len(), 1);
    }
}
