//! Compiler-ready source buffers.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Source text plus the identity of the file it came from.
///
/// Two units are the same unit when their paths are equal; the contents take
/// no part in identity. A unit built twice for the same file with different
/// text still addresses the same registry slot.
#[derive(Clone)]
pub struct SourceUnit {
    path: PathBuf,
    contents: Arc<str>,
    encoding: Arc<str>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            encoding: Arc::from(DEFAULT_ENCODING),
        }
    }

    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = Arc::from(encoding);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Name of the public type the file is expected to declare, taken from
    /// the file stem (`Foo.java` -> `Foo`).
    pub fn main_type_name(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    pub fn is_package_info(&self) -> bool {
        self.main_type_name() == Some("package-info")
    }
}

impl PartialEq for SourceUnit {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for SourceUnit {}

impl Hash for SourceUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.as_path().hash(state);
    }
}

impl Borrow<Path> for SourceUnit {
    fn borrow(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceUnit")
            .field("path", &self.path)
            .field("encoding", &self.encoding)
            .field("len", &self.contents.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn identity_ignores_contents() {
        let a = SourceUnit::new("src/A.java", "class A {}");
        let b = SourceUnit::new("src/A.java", "class A { int x; }");
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        map.insert(b, 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(Path::new("src/A.java")), Some(&2));
    }

    #[test]
    fn main_type_name_comes_from_stem() {
        let unit = SourceUnit::new("p/Foo.java", "");
        assert_eq!(unit.main_type_name(), Some("Foo"));
        assert!(!unit.is_package_info());
        assert!(SourceUnit::new("p/package-info.java", "").is_package_info());
    }
}
