//! Classpath lookups for types that are not part of the compiled sources.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum ClasspathEntry {
    /// Root of a `pkg/Name.class` tree.
    Directory(PathBuf),
    /// Jar with its class entries indexed as binary names (`a/b/C$D`).
    Jar {
        path: PathBuf,
        classes: HashSet<String>,
    },
}

impl ClasspathEntry {
    pub fn path(&self) -> &Path {
        match self {
            ClasspathEntry::Directory(p) => p,
            ClasspathEntry::Jar { path, .. } => path,
        }
    }

    fn contains(&self, binary_name: &str) -> bool {
        match self {
            ClasspathEntry::Directory(root) => root.join(format!("{binary_name}.class")).is_file(),
            ClasspathEntry::Jar { classes, .. } => classes.contains(binary_name),
        }
    }

    fn has_package(&self, package_path: &str) -> bool {
        match self {
            ClasspathEntry::Directory(root) => root.join(package_path).is_dir(),
            ClasspathEntry::Jar { classes, .. } => {
                let prefix = format!("{package_path}/");
                classes.iter().any(|c| c.starts_with(&prefix))
            }
        }
    }
}

/// A type located on the classpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryType {
    pub package: String,
    /// Outermost first: `Outer$Inner` gives `["Outer", "Inner"]`.
    pub nesting: Vec<String>,
    pub location: PathBuf,
}

/// Resolves qualified names against an ordered classpath. Earlier entries
/// win.
#[derive(Debug, Default)]
pub struct NameEnvironment {
    entries: Vec<ClasspathEntry>,
    released: bool,
}

impl NameEnvironment {
    pub fn new(classpath: &[PathBuf]) -> Self {
        let mut entries = Vec::with_capacity(classpath.len());
        for path in classpath {
            if path.is_dir() {
                entries.push(ClasspathEntry::Directory(path.clone()));
            } else if path.is_file() {
                match index_jar(path) {
                    Ok(classes) => {
                        debug!(jar = %path.display(), classes = classes.len(), "indexed classpath jar");
                        entries.push(ClasspathEntry::Jar {
                            path: path.clone(),
                            classes,
                        });
                    }
                    Err(err) => warn!(jar = %path.display(), error = %err, "unreadable classpath jar"),
                }
            } else {
                debug!(entry = %path.display(), "skipping missing classpath entry");
            }
        }
        Self {
            entries,
            released: false,
        }
    }

    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Finds a type by dotted name. Trailing segments are tried as nested
    /// types (`a.b.C.D` probes `a/b/C/D`, then `a/b/C$D`, then `a/B$C$D`...).
    pub fn find_type(&self, qualified: &str) -> Option<BinaryType> {
        if self.released || qualified.is_empty() {
            return None;
        }
        let segments: Vec<&str> = qualified.split('.').collect();
        for split in (0..segments.len()).rev() {
            let package = segments[..split].join("/");
            let nesting = &segments[split..];
            let binary = if package.is_empty() {
                nesting.join("$")
            } else {
                format!("{package}/{}", nesting.join("$"))
            };
            if let Some(entry) = self.entries.iter().find(|e| e.contains(&binary)) {
                return Some(BinaryType {
                    package: segments[..split].join("."),
                    nesting: nesting.iter().map(|s| s.to_string()).collect(),
                    location: entry.path().to_path_buf(),
                });
            }
        }
        None
    }

    pub fn is_package(&self, name: &str) -> bool {
        if self.released {
            return false;
        }
        let path = name.replace('.', "/");
        self.entries.iter().any(|e| e.has_package(&path))
    }

    /// Releases the classpath index. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.released {
            return;
        }
        self.entries.clear();
        self.released = true;
    }
}

fn index_jar(path: &Path) -> zip::result::ZipResult<HashSet<String>> {
    let file = File::open(path)?;
    let archive = zip::ZipArchive::new(file)?;
    Ok(archive
        .file_names()
        .filter_map(|name| name.strip_suffix(".class"))
        .filter(|name| !name.ends_with("module-info") && !name.ends_with("package-info"))
        .map(str::to_string)
        .collect())
}
