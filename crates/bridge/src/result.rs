//! Outcome of one compile pass.

use std::collections::HashMap;
use std::path::Path;

use frontend::{CompilationUnit, LookupEnvironment, NameEnvironment, Problem, SourceUnit};
use tracing::debug;

/// Trees keyed by source identity plus the environments they were
/// attributed against. The lookup environment may outlive individual trees.
#[derive(Debug, Default)]
pub struct CompilationResult {
    pub(crate) trees: HashMap<SourceUnit, CompilationUnit>,
    pub(crate) names: Option<NameEnvironment>,
    pub(crate) env: Option<LookupEnvironment>,
    pub(crate) problems: Vec<Problem>,
    pub(crate) had_errors: bool,
    disposed: bool,
}

impl CompilationResult {
    pub(crate) fn new(
        trees: HashMap<SourceUnit, CompilationUnit>,
        names: NameEnvironment,
        env: LookupEnvironment,
        problems: Vec<Problem>,
        had_errors: bool,
    ) -> Self {
        Self {
            trees,
            names: Some(names),
            env: Some(env),
            problems,
            had_errors,
            disposed: false,
        }
    }

    /// Result of a pass that was aborted: nothing is queryable.
    pub(crate) fn degraded(problems: Vec<Problem>) -> Self {
        Self {
            problems,
            had_errors: true,
            ..Self::default()
        }
    }

    pub fn had_errors(&self) -> bool {
        self.had_errors
    }

    /// Problems of every unit, in delivery order.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn tree(&self, path: &Path) -> Option<&CompilationUnit> {
        if self.disposed {
            return None;
        }
        self.trees.get(path)
    }

    pub fn source(&self, path: &Path) -> Option<&SourceUnit> {
        self.trees.get_key_value(path).map(|(unit, _)| unit)
    }

    pub fn trees(&self) -> impl Iterator<Item = (&SourceUnit, &CompilationUnit)> + '_ {
        self.trees.iter()
    }

    pub fn env(&self) -> Option<&LookupEnvironment> {
        if self.disposed {
            return None;
        }
        self.env.as_ref()
    }

    pub fn names(&self) -> Option<&NameEnvironment> {
        self.names.as_ref().filter(|n| !n.is_released())
    }

    /// Evicts the tree of `path`. Trees declaring an annotation type are
    /// retained because annotation values are reconstructed from them.
    /// Returns whether the tree was dropped.
    pub fn remove(&mut self, path: &Path) -> bool {
        match self.trees.get(path) {
            Some(tree) if tree.declares_annotation_type() => {
                debug!(file = %path.display(), "keeping tree declaring an annotation type");
                false
            }
            Some(_) => self.trees.remove(path).is_some(),
            None => false,
        }
    }

    /// Releases the name environment, resets the lookup environment and
    /// drops every tree. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(names) = self.names.as_mut() {
            names.cleanup();
        }
        if let Some(env) = self.env.as_mut() {
            env.reset();
        }
        self.trees.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
