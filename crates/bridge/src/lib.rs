//! Resolution bridge between analysis rules and the Java front-end.
//!
//! The orchestrator compiles a batch of sources into a [`CompilationResult`];
//! the [`SourceRegistry`] keeps it alive between queries and converts native
//! trees into generic [`ir::FileAst`] trees on demand. Rules holding a
//! generic node use the locator to get back to the native node, then a
//! [`Resolver`] to turn its binding into a [`ResolvedSymbol`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub mod convert;
pub mod external;
pub mod facade;
pub mod locator;
pub mod orchestrator;
pub mod registry;
pub mod result;
pub mod symbol;
pub mod unique;

pub use external::{ExternalAnnotation, ExternalAnnotationRepository, JsonAnnotations};
pub use facade::Resolver;
pub use orchestrator::{compile, BridgeOptions};
pub use registry::SourceRegistry;
pub use result::CompilationResult;
pub use symbol::{
    AnnotationValue, ResolvedAnnotation, ResolvedClass, ResolvedField, ResolvedMethod,
    ResolvedPackage, ResolvedSymbol, ResolvedVariable, Value,
};
pub use unique::{ensure_unique, Named};

#[cfg(test)]
mod tests;

/// Files already reported as crashing the front-end. Owned by the caller so
/// that separate runs in one process do not share it.
#[derive(Debug, Default, Clone)]
pub struct WarnedFiles(HashSet<PathBuf>);

impl WarnedFiles {
    /// Records `path`; true the first time it is seen.
    pub fn warn_once(&mut self, path: &Path) -> bool {
        self.0.insert(path.to_path_buf())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
