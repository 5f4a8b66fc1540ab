// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Structured form of the top-level declarations found in a header.
//!
//! Only the shape of declarations is kept. Expressions (array bounds, enumerator values,
//! bit widths) stay as token text because nothing downstream evaluates them.

use std::sync::Arc;

/// Where a declaration started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// File from the most recent line marker, `None` for injected text.
    pub file: Option<Arc<str>>,
    /// One-based line.
    pub line: usize,
}

/// An unevaluated constant expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr(pub Vec<String>);

impl Expr {
    /// The `...` placeholder used for erased values.
    pub fn placeholder() -> Self {
        Expr(vec!["...".to_string()])
    }

    /// Whether any token of the expression equals `word`.
    pub fn mentions(&self, word: &str) -> bool {
        self.0.iter().any(|token| token == word)
    }
}

/// `struct` or `union`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Struct,
    Union,
}

impl RecordKind {
    pub fn keyword(self) -> &'static str {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::Union => "union",
        }
    }
}

/// A struct or union, either a definition (`members` is `Some`) or a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub kind: RecordKind,
    pub tag: Option<String>,
    pub members: Option<Vec<Member>>,
}

/// One member declaration, possibly declaring several fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    pub ty: TypeName,
    pub fields: Vec<Field>,
}

/// A field declarator with an optional bit width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub declarator: Declarator,
    pub bit_width: Option<Expr>,
}

/// An enum, either a definition (`enumerators` is `Some`) or a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub tag: Option<String>,
    pub enumerators: Option<Vec<Enumerator>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<Expr>,
}

/// Base type of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    /// Builtin keywords as written, e.g. `unsigned char`.
    Builtin(String),
    /// A name introduced by `typedef` (or assumed to be one).
    Typedef(String),
    Record(Record),
    Enum(EnumType),
}

/// Qualified base type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub qualifiers: Vec<String>,
    pub spec: TypeSpec,
}

/// Innermost part of a declarator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Direct {
    Abstract,
    Name(String),
    Nested(Box<Declarator>),
}

/// Array or function suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Suffix {
    Array(Option<Expr>),
    Function(ParamList),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamList {
    pub params: Vec<Param>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub ty: TypeName,
    pub declarator: Declarator,
}

/// What a declarator does to its name first, reading C's inside-out rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Pointer,
    Array,
    Function,
}

/// A C declarator: pointers, a name or nested declarator, then suffixes.
///
/// Each entry of `pointers` holds the qualifiers following one `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declarator {
    pub pointers: Vec<Vec<String>>,
    pub direct: Direct,
    pub suffixes: Vec<Suffix>,
}

impl Declarator {
    /// The declared name, if any.
    pub fn name(&self) -> Option<&str> {
        match &self.direct {
            Direct::Abstract => None,
            Direct::Name(name) => Some(name),
            Direct::Nested(inner) => inner.name(),
        }
    }

    /// First derivation applied to the declared name.
    pub fn first_derivation(&self) -> Option<Derivation> {
        if let Direct::Nested(inner) = &self.direct {
            if let Some(derivation) = inner.first_derivation() {
                return Some(derivation);
            }
        }
        match self.suffixes.first() {
            Some(Suffix::Function(_)) => Some(Derivation::Function),
            Some(Suffix::Array(_)) => Some(Derivation::Array),
            None if !self.pointers.is_empty() => Some(Derivation::Pointer),
            None => None,
        }
    }

    /// Whether this declares a function (not a pointer to one).
    pub fn is_function(&self) -> bool {
        self.first_derivation() == Some(Derivation::Function)
    }

    /// Mutable access to every parameter list reachable from this declarator.
    pub fn param_lists_mut(&mut self) -> Vec<&mut ParamList> {
        let mut lists = Vec::new();
        if let Direct::Nested(inner) = &mut self.direct {
            lists.extend(inner.param_lists_mut());
        }
        for suffix in &mut self.suffixes {
            if let Suffix::Function(list) = suffix {
                lists.push(list);
            }
        }
        lists
    }

    /// Mutable access to every array bound reachable from this declarator.
    pub fn array_bounds_mut(&mut self) -> Vec<&mut Option<Expr>> {
        let mut bounds = Vec::new();
        if let Direct::Nested(inner) = &mut self.direct {
            bounds.extend(inner.array_bounds_mut());
        }
        for suffix in &mut self.suffixes {
            if let Suffix::Array(bound) = suffix {
                bounds.push(bound);
            }
        }
        bounds
    }
}

/// One top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub location: Location,
    /// Storage class and function specifiers, e.g. `typedef`, `extern`, `static`.
    pub storage: Vec<String>,
    pub ty: TypeName,
    pub declarators: Vec<Declarator>,
    /// Set for function definitions whose body was skipped.
    pub has_body: bool,
}

impl Declaration {
    pub fn is_typedef(&self) -> bool {
        self.storage.iter().any(|s| s == "typedef")
    }
}
