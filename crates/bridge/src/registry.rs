//! Source units and compiled trees kept between queries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use frontend::{CompilationUnit, NodeId, SourceUnit};
use ir::FileAst;
use tracing::debug;

use crate::convert::convert;
use crate::external::ExternalAnnotationRepository;
use crate::facade::Resolver;
use crate::orchestrator::{self, BridgeOptions};
use crate::result::CompilationResult;
use crate::WarnedFiles;

/// Path-keyed registry of source units, the last compilation result and
/// the generic trees converted from it.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    units: HashMap<PathBuf, SourceUnit>,
    order: Vec<PathBuf>,
    result: Option<CompilationResult>,
    converted: RefCell<HashMap<PathBuf, Rc<FileAst>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit for `path`, created from `contents` when it is not registered
    /// yet. An existing unit keeps its contents.
    pub fn unit(&mut self, path: impl Into<PathBuf>, contents: &str) -> &SourceUnit {
        let path = path.into();
        if !self.units.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.units
            .entry(path.clone())
            .or_insert_with(|| SourceUnit::new(path, contents))
    }

    /// Registers an already built unit, unless its path is taken.
    pub fn insert(&mut self, unit: SourceUnit) -> &SourceUnit {
        let path = unit.path().to_path_buf();
        if !self.units.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.units.entry(path).or_insert(unit)
    }

    pub fn get(&self, path: &Path) -> Option<&SourceUnit> {
        self.units.get(path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Registered units in registration order.
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> + '_ {
        self.order.iter().filter_map(|p| self.units.get(p))
    }

    /// Compiles every registered unit, replacing the previous result.
    pub fn compile(
        &mut self,
        classpath: &[PathBuf],
        options: &BridgeOptions,
        warned: &mut WarnedFiles,
    ) -> &CompilationResult {
        if let Some(mut previous) = self.result.take() {
            previous.dispose();
        }
        self.converted.borrow_mut().clear();
        let units: Vec<SourceUnit> = self.units().cloned().collect();
        let result = orchestrator::compile(units, classpath, options, warned);
        self.result.insert(result)
    }

    pub fn result(&self) -> Option<&CompilationResult> {
        self.result.as_ref().filter(|r| !r.is_disposed())
    }

    pub fn tree(&self, path: &Path) -> Option<&CompilationUnit> {
        self.result()?.tree(path)
    }

    /// Evicts the unit and its tree. Units whose tree declares an annotation
    /// type stay registered. Returns whether anything was evicted.
    pub fn remove(&mut self, path: &Path) -> bool {
        if let Some(result) = self.result.as_mut() {
            if result.tree(path).is_some() && !result.remove(path) {
                return false;
            }
        }
        self.converted.borrow_mut().remove(path);
        self.order.retain(|p| p != path);
        let removed = self.units.remove(path).is_some();
        if removed {
            debug!(file = %path.display(), "evicted source unit");
        }
        removed
    }

    /// Full disposal: environments released, trees and units dropped.
    /// Afterwards every query answers `None`.
    pub fn dispose(&mut self) {
        if let Some(result) = self.result.as_mut() {
            result.dispose();
        }
        self.converted.borrow_mut().clear();
        self.units.clear();
        self.order.clear();
    }

    /// Partial disposal: drops converted generic trees only.
    pub fn dispose_caches(&self) {
        self.converted.borrow_mut().clear();
    }

    pub fn cached_conversions(&self) -> usize {
        self.converted.borrow().len()
    }

    /// File and node declaring the type named `qualified`.
    pub fn find_type_declaration(&self, qualified: &str) -> Option<(&Path, NodeId)> {
        let result = self.result()?;
        let env = result.env()?;
        let declaration = env.type_binding(env.get_type(qualified)?)?.declaration()?;
        let (unit, _) = result.trees.get_key_value(declaration.file.as_path())?;
        Some((unit.path(), declaration.node))
    }

    /// Generic tree of `path`, converted on first request.
    pub fn convert(&self, path: &Path) -> Option<Rc<FileAst>> {
        if let Some(ast) = self.converted.borrow().get(path) {
            return Some(Rc::clone(ast));
        }
        let ast = Rc::new(convert(self.tree(path)?));
        self.converted
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&ast));
        Some(ast)
    }

    pub fn resolver<'a>(
        &'a self,
        external: Option<&'a dyn ExternalAnnotationRepository>,
    ) -> Option<Resolver<'a>> {
        let resolver = Resolver::new(self.result()?)?;
        Some(match external {
            Some(external) => resolver.with_external(external),
            None => resolver,
        })
    }
}
