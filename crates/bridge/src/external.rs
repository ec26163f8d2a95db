//! Annotations supplied from outside the sources.
//!
//! The JSON database maps qualified class names to their annotations:
//!
//! ```json
//! {
//!   "classes": {
//!     "p.A": {
//!       "annotations": [{ "name": "javax.annotation.Nonnull" }],
//!       "methods": {
//!         "run(java.lang.String)": {
//!           "annotations": [],
//!           "parameters": { "0": [{ "name": "javax.annotation.Nullable" }] }
//!         }
//!       },
//!       "fields": { "X": [{ "name": "Deprecated", "values": { "since": "1" } }] }
//!     }
//!   }
//! }
//! ```
//!
//! Method keys use [`crate::ResolvedMethod::signature`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalAnnotation {
    /// Qualified annotation type name.
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<String, JsonValue>,
}

impl ExternalAnnotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }
}

pub trait ExternalAnnotationRepository {
    fn class_annotations(&self, class: &str) -> Vec<ExternalAnnotation>;
    fn method_annotations(&self, class: &str, signature: &str) -> Vec<ExternalAnnotation>;
    fn parameter_annotations(
        &self,
        class: &str,
        signature: &str,
        index: usize,
    ) -> Vec<ExternalAnnotation>;
    fn field_annotations(&self, class: &str, field: &str) -> Vec<ExternalAnnotation>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct MethodEntry {
    #[serde(default)]
    annotations: Vec<ExternalAnnotation>,
    #[serde(default)]
    parameters: HashMap<String, Vec<ExternalAnnotation>>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct ClassEntry {
    #[serde(default)]
    annotations: Vec<ExternalAnnotation>,
    #[serde(default)]
    methods: HashMap<String, MethodEntry>,
    #[serde(default)]
    fields: HashMap<String, Vec<ExternalAnnotation>>,
}

/// Repository backed by a JSON document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct JsonAnnotations {
    #[serde(default)]
    classes: HashMap<String, ClassEntry>,
}

impl JsonAnnotations {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing external annotations")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading external annotations {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    fn method(&self, class: &str, signature: &str) -> Option<&MethodEntry> {
        self.classes.get(class)?.methods.get(signature)
    }
}

impl ExternalAnnotationRepository for JsonAnnotations {
    fn class_annotations(&self, class: &str) -> Vec<ExternalAnnotation> {
        self.classes
            .get(class)
            .map(|c| c.annotations.clone())
            .unwrap_or_default()
    }

    fn method_annotations(&self, class: &str, signature: &str) -> Vec<ExternalAnnotation> {
        self.method(class, signature)
            .map(|m| m.annotations.clone())
            .unwrap_or_default()
    }

    fn parameter_annotations(
        &self,
        class: &str,
        signature: &str,
        index: usize,
    ) -> Vec<ExternalAnnotation> {
        self.method(class, signature)
            .and_then(|m| m.parameters.get(&index.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn field_annotations(&self, class: &str, field: &str) -> Vec<ExternalAnnotation> {
        self.classes
            .get(class)
            .and_then(|c| c.fields.get(field))
            .cloned()
            .unwrap_or_default()
    }
}
