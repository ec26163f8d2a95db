//! Compiler diagnostics.

use std::fmt;
use std::path::PathBuf;

use crate::ast::Span;

/// Numeric problem identifier. Values follow the category bits of the
/// Eclipse batch compiler so downstream tooling can share filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProblemId(pub u32);

const TYPE_RELATED: u32 = 0x0100_0000;
const FIELD_RELATED: u32 = 0x0200_0000;
const METHOD_RELATED: u32 = 0x0400_0000;
const CONSTRUCTOR_RELATED: u32 = 0x0800_0000;
const IMPORT_RELATED: u32 = 0x1000_0000;
const INTERNAL: u32 = 0x2000_0000;
const SYNTAX: u32 = 0x4000_0000;

impl ProblemId {
    pub const UNDEFINED_TYPE: ProblemId = ProblemId(TYPE_RELATED + 2);
    pub const SUPERCLASS_MUST_BE_A_CLASS: ProblemId = ProblemId(TYPE_RELATED + 311);
    pub const SUPERINTERFACE_MUST_BE_AN_INTERFACE: ProblemId = ProblemId(TYPE_RELATED + 312);
    pub const HIERARCHY_CIRCULARITY: ProblemId = ProblemId(TYPE_RELATED + 313);
    pub const DUPLICATE_TYPES: ProblemId = ProblemId(TYPE_RELATED + 323);
    pub const DUPLICATE_FIELD: ProblemId = ProblemId(FIELD_RELATED + 60);
    pub const UNDEFINED_FIELD: ProblemId = ProblemId(FIELD_RELATED + 70);
    pub const UNDEFINED_METHOD: ProblemId = ProblemId(METHOD_RELATED + 100);
    pub const DUPLICATE_METHOD: ProblemId = ProblemId(METHOD_RELATED + 355);
    pub const UNDEFINED_ANNOTATION_MEMBER: ProblemId = ProblemId(METHOD_RELATED + 615);
    pub const UNDEFINED_CONSTRUCTOR: ProblemId = ProblemId(CONSTRUCTOR_RELATED + 130);
    pub const IMPORT_NOT_FOUND: ProblemId = ProblemId(IMPORT_RELATED + 391);
    pub const LOCAL_VARIABLE_IS_NEVER_USED: ProblemId = ProblemId(INTERNAL + 60);
    pub const UNDEFINED_NAME: ProblemId = ProblemId(INTERNAL + FIELD_RELATED + 50);
    pub const PARSING_ERROR: ProblemId = ProblemId(SYNTAX + INTERNAL + 200);

    /// Symbolic name from the static table, `Unknown` when not listed.
    pub fn name(self) -> &'static str {
        lookup(self).map(|(_, name, _)| *name).unwrap_or("Unknown")
    }

    fn template(self) -> &'static str {
        lookup(self).map(|(_, _, t)| *t).unwrap_or("{0}")
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// `(id, name, message template)`, sorted by id.
static PROBLEM_TABLE: &[(u32, &str, &str)] = &[
    (TYPE_RELATED + 2, "UndefinedType", "{0} cannot be resolved to a type"),
    (
        TYPE_RELATED + 311,
        "SuperclassMustBeAClass",
        "The type {0} cannot be the superclass of {1}; a superclass must be a class",
    ),
    (
        TYPE_RELATED + 312,
        "SuperInterfaceMustBeAnInterface",
        "The type {0} cannot be a superinterface of {1}; a superinterface must be an interface",
    ),
    (
        TYPE_RELATED + 313,
        "HierarchyCircularity",
        "Cycle detected: the type {0} cannot extend/implement itself or one of its own member types",
    ),
    (TYPE_RELATED + 323, "DuplicateTypes", "The type {0} is already defined"),
    (FIELD_RELATED + 60, "DuplicateField", "Duplicate field {0}.{1}"),
    (FIELD_RELATED + 70, "UndefinedField", "{0} cannot be resolved or is not a field"),
    (
        METHOD_RELATED + 100,
        "UndefinedMethod",
        "The method {0} is undefined for the type {1}",
    ),
    (METHOD_RELATED + 355, "DuplicateMethod", "Duplicate method {0} in type {1}"),
    (
        METHOD_RELATED + 615,
        "UndefinedAnnotationMember",
        "The attribute {0} is undefined for the annotation type {1}",
    ),
    (
        CONSTRUCTOR_RELATED + 130,
        "UndefinedConstructor",
        "The constructor {0} is undefined",
    ),
    (IMPORT_RELATED + 391, "ImportNotFound", "The import {0} cannot be resolved"),
    (
        INTERNAL + 60,
        "LocalVariableIsNeverUsed",
        "The value of the local variable {0} is not used",
    ),
    (
        INTERNAL + FIELD_RELATED + 50,
        "UndefinedName",
        "{0} cannot be resolved",
    ),
    (SYNTAX + INTERNAL + 200, "ParsingError", "Syntax error on token \"{0}\""),
];

fn lookup(id: ProblemId) -> Option<&'static (u32, &'static str, &'static str)> {
    PROBLEM_TABLE
        .binary_search_by_key(&id.0, |(key, _, _)| *key)
        .ok()
        .map(|i| &PROBLEM_TABLE[i])
}

/// Severity bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProblemSeverity(u8);

impl ProblemSeverity {
    pub const ERROR: ProblemSeverity = ProblemSeverity(1);
    pub const WARNING: ProblemSeverity = ProblemSeverity(1 << 1);
    pub const IGNORE: ProblemSeverity = ProblemSeverity(1 << 2);

    pub fn is_error(self) -> bool {
        self.0 & Self::ERROR.0 != 0
    }

    pub fn is_warning(self) -> bool {
        self.0 & Self::WARNING.0 != 0
    }

    /// Clears the error bit, keeping the problem as a warning.
    pub fn downgrade(self) -> Self {
        ProblemSeverity((self.0 & !Self::ERROR.0) | Self::WARNING.0)
    }

    pub fn label(self) -> &'static str {
        if self.is_error() {
            "ERROR"
        } else if self.is_warning() {
            "WARNING"
        } else {
            "IGNORE"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub id: ProblemId,
    pub severity: ProblemSeverity,
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub arguments: Vec<String>,
    /// Only computed when the factory was asked to.
    pub message: Option<String>,
}

impl Problem {
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    /// Message text, rendering it on demand when it was not computed.
    pub fn render(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format_template(self.id.template(), &self.arguments))
    }
}

/// Creates problems, deciding whether warnings are kept and whether message
/// text is rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemFactory {
    pub compute_messages: bool,
    pub report_warnings: bool,
}

impl ProblemFactory {
    pub fn new(compute_messages: bool, report_warnings: bool) -> Self {
        Self {
            compute_messages,
            report_warnings,
        }
    }

    pub fn error(
        &self,
        id: ProblemId,
        file: &std::path::Path,
        span: Span,
        arguments: Vec<String>,
    ) -> Problem {
        self.build(id, ProblemSeverity::ERROR, file, span, arguments)
    }

    /// `None` when warnings are not reported.
    pub fn warning(
        &self,
        id: ProblemId,
        file: &std::path::Path,
        span: Span,
        arguments: Vec<String>,
    ) -> Option<Problem> {
        self.report_warnings
            .then(|| self.build(id, ProblemSeverity::WARNING, file, span, arguments))
    }

    fn build(
        &self,
        id: ProblemId,
        severity: ProblemSeverity,
        file: &std::path::Path,
        span: Span,
        arguments: Vec<String>,
    ) -> Problem {
        let message = self
            .compute_messages
            .then(|| format_template(id.template(), &arguments));
        Problem {
            id,
            severity,
            file: file.to_path_buf(),
            line: span.line,
            column: span.column,
            arguments,
            message,
        }
    }
}

fn format_template(template: &str, arguments: &[String]) -> String {
    let mut out = template.to_string();
    for (i, arg) in arguments.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), arg);
    }
    out
}
