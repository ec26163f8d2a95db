use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Build metadata of one project, as exported by the build tool.
///
/// Relative paths are resolved against the directory holding the metadata
/// file when it is loaded with [`ProjectMetadata::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    pub name: Option<String>,
    /// Source level, e.g. `"17"`.
    pub source_level: Option<String>,
    /// Charset of the sources. UTF-8 when absent.
    pub encoding: Option<String>,
    /// Runtime jar of the target platform.
    pub platform_jar: Option<PathBuf>,
    pub source_folders: Vec<PathBuf>,
    pub generated_folders: Vec<PathBuf>,
    pub class_folders: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
    pub dependencies: Vec<Dependency>,
}

/// Another project this one depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependency {
    pub name: String,
    pub class_folders: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
}

impl ProjectMetadata {
    /// Reads a `.yaml`/`.yml` or `.json` metadata file.
    ///
    /// ```no_run
    /// use loader::ProjectMetadata;
    /// let meta = ProjectMetadata::load(std::path::Path::new("project.yaml")).unwrap();
    /// assert!(!meta.source_folders.is_empty());
    /// ```
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project metadata: {}", path.display()))?;
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        let mut meta: ProjectMetadata = if name.ends_with(".yaml") || name.ends_with(".yml") {
            serde_yaml::from_str(&data).with_context(|| {
                format!("Failed to parse project metadata: {}", path.display())
            })?
        } else if name.ends_with(".json") {
            serde_json::from_str(&data).with_context(|| {
                format!("Failed to parse project metadata: {}", path.display())
            })?
        } else {
            bail!("Unsupported project metadata format: {}", path.display());
        };
        if let Some(base) = path.parent() {
            meta.rebase(base);
        }
        debug!(
            file = %path.display(),
            sources = meta.source_folders.len(),
            libraries = meta.libraries.len(),
            dependencies = meta.dependencies.len(),
            "Loaded project metadata"
        );
        Ok(meta)
    }

    /// Source and generated-source folders, in that order.
    pub fn source_roots(&self) -> Vec<PathBuf> {
        self.source_folders
            .iter()
            .chain(&self.generated_folders)
            .cloned()
            .collect()
    }

    /// Resolves every relative path against `base`.
    pub fn rebase(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(jar) = self.platform_jar.as_mut() {
            fix(jar);
        }
        self.source_folders
            .iter_mut()
            .chain(&mut self.generated_folders)
            .chain(&mut self.class_folders)
            .chain(&mut self.libraries)
            .for_each(fix);
        for dep in &mut self.dependencies {
            dep.class_folders
                .iter_mut()
                .chain(&mut dep.libraries)
                .for_each(fix);
        }
    }
}
