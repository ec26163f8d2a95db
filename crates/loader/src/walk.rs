use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Directory names never searched for sources.
const SKIPPED_DIRS: &[&str] = &[".git", ".svn", ".hg", ".idea"];

/// Outcome of an I/O step: permission errors skip the path, anything else
/// aborts the walk.
fn or_skip<T>(res: io::Result<T>, path: &Path) -> anyhow::Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "Permission denied");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Breadth-first walk under `path` calling `callback` for every regular
/// file. Symlinks are never followed.
pub fn visit<F, C>(path: &Path, excludes: &F, callback: &mut C) -> anyhow::Result<()>
where
    F: Fn(&Path) -> bool,
    C: FnMut(&Path) -> anyhow::Result<()>,
{
    let mut pending: VecDeque<PathBuf> = VecDeque::from([path.to_path_buf()]);
    let mut visited: HashSet<PathBuf> = HashSet::new();

    while let Some(current) = pending.pop_front() {
        if !visited.insert(current.clone()) || excludes(&current) {
            continue;
        }
        let Some(metadata) = or_skip(fs::symlink_metadata(&current), &current)? else {
            continue;
        };
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            debug!(path = %current.display(), "Symlink skipped");
        } else if file_type.is_file() {
            callback(&current)?;
        } else if file_type.is_dir() {
            let Some(entries) = or_skip(fs::read_dir(&current), &current)? else {
                continue;
            };
            for entry in entries {
                if let Some(entry) = or_skip(entry, &current)? {
                    pending.push_back(entry.path());
                }
            }
        }
    }
    Ok(())
}

/// `.java` files under each root, sorted. Missing roots are skipped;
/// `package-info.java` files are kept.
pub fn java_sources(roots: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let skip = |p: &Path| {
        p.file_name()
            .and_then(|name| name.to_str())
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
    };
    let mut found = Vec::new();
    for root in roots {
        if !root.exists() {
            debug!(root = %root.display(), "Source root does not exist");
            continue;
        }
        visit(root, &skip, &mut |path| {
            if path.extension().and_then(|e| e.to_str()) == Some("java") {
                found.push(path.to_path_buf());
            }
            Ok(())
        })?;
    }
    found.sort();
    found.dedup();
    debug!(files = found.len(), "Discovered Java sources");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn relative(base: &Path, files: Vec<PathBuf>) -> BTreeSet<PathBuf> {
        files
            .into_iter()
            .map(|p| p.strip_prefix(base).unwrap().to_path_buf())
            .collect()
    }

    #[test]
    fn finds_java_files_in_every_root() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("src/p/q")).unwrap();
        fs::create_dir_all(base.join("gen/.git")).unwrap();
        fs::write(base.join("src/p/A.java"), b"").unwrap();
        fs::write(base.join("src/p/package-info.java"), b"").unwrap();
        fs::write(base.join("src/p/q/B.java"), b"").unwrap();
        fs::write(base.join("src/p/notes.txt"), b"").unwrap();
        fs::write(base.join("gen/G.java"), b"").unwrap();
        fs::write(base.join("gen/.git/H.java"), b"").unwrap();

        let roots = [base.join("src"), base.join("gen"), base.join("missing")];
        let found = relative(base, java_sources(&roots).unwrap());
        let expected: BTreeSet<PathBuf> = [
            "src/p/A.java",
            "src/p/package-info.java",
            "src/p/q/B.java",
            "gen/G.java",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(found, expected);
    }

    #[cfg(unix)]
    #[test]
    fn terminates_on_symlink_loop() {
        use std::os::unix::fs as unix_fs;

        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("a")).unwrap();
        fs::write(base.join("a/A.java"), b"").unwrap();
        unix_fs::symlink(base, base.join("a/loop")).unwrap();

        let found = relative(base, java_sources(&[base.to_path_buf()]).unwrap());
        assert_eq!(found, BTreeSet::from([PathBuf::from("a/A.java")]));
    }

    #[cfg(unix)]
    #[test]
    fn skips_permission_denied_paths() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("a/private")).unwrap();
        fs::write(base.join("a/Public.java"), b"").unwrap();
        fs::write(base.join("a/private/Secret.java"), b"").unwrap();
        fs::set_permissions(base.join("a/private"), fs::Permissions::from_mode(0o000)).unwrap();

        let mut seen = Vec::new();
        let result = visit(base, &|_| false, &mut |p: &Path| {
            seen.push(p.to_path_buf());
            Ok(())
        });
        fs::set_permissions(base.join("a/private"), fs::Permissions::from_mode(0o755)).unwrap();

        result.unwrap();
        assert!(seen.contains(&base.join("a/Public.java")));
    }
}
