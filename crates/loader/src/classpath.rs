//! Ordered classpath of a project.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::ProjectMetadata;

/// Classpath for compiling `meta`: the platform jar, the project's class
/// folders, its libraries, then the class folders and libraries of each
/// dependency. Duplicates keep their first position and paths that do not
/// exist are dropped.
pub fn assemble(meta: &ProjectMetadata) -> Vec<PathBuf> {
    dedup_existing(
        meta.platform_jar
            .iter()
            .chain(&meta.class_folders)
            .chain(&meta.libraries)
            .chain(
                meta.dependencies
                    .iter()
                    .flat_map(|d| d.class_folders.iter().chain(&d.libraries)),
            ),
    )
}

/// Keeps the first occurrence of every existing path, in order.
pub fn dedup_existing<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut classpath = Vec::new();
    for path in paths {
        if !seen.insert(path) {
            continue;
        }
        if !path.exists() {
            debug!(entry = %path.display(), "Dropping missing classpath entry");
            continue;
        }
        classpath.push(path.clone());
    }
    classpath
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dependency;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn keeps_order_and_first_occurrences() {
        let dir = tempdir().unwrap();
        let p = |name: &str| dir.path().join(name);
        for file in ["rt.jar", "a.jar", "dep.jar"] {
            fs::write(p(file), b"").unwrap();
        }
        for folder in ["classes", "dep-classes"] {
            fs::create_dir(p(folder)).unwrap();
        }
        let meta = ProjectMetadata {
            platform_jar: Some(p("rt.jar")),
            class_folders: vec![p("classes")],
            libraries: vec![p("a.jar"), p("missing.jar"), p("rt.jar")],
            dependencies: vec![Dependency {
                name: "dep".into(),
                class_folders: vec![p("dep-classes"), p("classes")],
                libraries: vec![p("dep.jar")],
            }],
            ..Default::default()
        };
        assert_eq!(
            assemble(&meta),
            vec![
                p("rt.jar"),
                p("classes"),
                p("a.jar"),
                p("dep-classes"),
                p("dep.jar")
            ]
        );
    }

    #[test]
    fn empty_metadata_gives_an_empty_classpath() {
        assert!(assemble(&ProjectMetadata::default()).is_empty());
    }
}
