//! Java front-end used by the lintbridge resolution bridge.
//!
//! Sources are parsed with tree-sitter into a native arena tree
//! ([`CompilationUnit`]); scope building and attribution then populate a
//! [`LookupEnvironment`] holding every binding, and record per-node bindings
//! in the tree's side table. The [`Compiler`] drives the passes and hands
//! each unit to a [`UnitProcessor`] hook.

use std::path::PathBuf;

use thiserror::Error;

pub mod ast;
mod attribution;
pub mod binding;
pub mod compiler;
pub mod constant;
mod flow;
pub mod lookup;
pub mod name_env;
pub mod names;
pub mod parser;
pub mod problem;
pub mod scope;
pub mod source;

pub use ast::{
    CompilationUnit, Import, Modifiers, NativeNode, NodeId, NodeKind, Span, TypeKind, VariableDecl,
};
pub use binding::{
    AnnotationBinding, AnnotationId, Binding, DeclRef, ElementValue, FieldBinding, FieldId,
    LocalBinding, LocalId, MethodBinding, MethodId, PackageBinding, PackageId, ProblemReason,
    Substitution, TypeBinding, TypeId, TypeOrigin, TypeSig,
};
pub use compiler::{
    CodeGenerator, Compiler, CompilerOptions, CompilerRequestor, ResultCollector,
    SkipCodeGeneration, StandardProcessor, UnitContext, UnitProcessor, UnitResult,
};
pub use constant::{Constant, PrimitiveType};
pub use lookup::LookupEnvironment;
pub use name_env::{ClasspathEntry, NameEnvironment};
pub use problem::{Problem, ProblemFactory, ProblemId, ProblemSeverity};
pub use source::SourceUnit;

#[cfg(test)]
mod tests;

/// Faults that abort work on a unit or on the whole batch.
#[derive(Debug, Error)]
pub enum CompileFault {
    /// The batch ran past its memory budget. Fatal for the whole batch.
    #[error("out of memory while compiling {}", describe(.file))]
    OutOfMemory { file: Option<PathBuf> },
    /// The front-end failed on one unit.
    #[error("internal compiler error in {}: {message}", describe(.file))]
    Internal {
        file: Option<PathBuf>,
        message: String,
    },
}

impl CompileFault {
    pub fn file(&self) -> Option<&std::path::Path> {
        match self {
            CompileFault::OutOfMemory { file } | CompileFault::Internal { file, .. } => {
                file.as_deref()
            }
        }
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, CompileFault::OutOfMemory { .. })
    }
}

fn describe(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) => path.display().to_string(),
        None => "<batch>".to_string(),
    }
}
