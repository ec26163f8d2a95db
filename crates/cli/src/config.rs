use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

#[cfg(windows)]
pub fn config_dir() -> PathBuf {
    std::env::var("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("lintbridge")
}

#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join("lintbridge")
}

fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// User defaults; command-line flags take precedence.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Classpath entries appended after the project's.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    /// External annotation database used when `--annotations` is absent.
    pub annotations: Option<PathBuf>,
    /// Default report format: `text`, `json` or `sarif`.
    pub format: Option<String>,
    pub encoding: Option<String>,
    pub max_tree_nodes: Option<usize>,
}

pub fn load_config() -> Result<Config> {
    let path = config_file_path();
    if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).context("failed to parse config")
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_is_optional() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(cfg.classpath.is_empty());
        assert!(cfg.format.is_none());

        let cfg: Config = toml::from_str(
            "classpath = [\"/opt/lib/a.jar\"]\nformat = \"sarif\"\nmax_tree_nodes = 1000\n",
        )
        .unwrap();
        assert_eq!(cfg.classpath, vec![PathBuf::from("/opt/lib/a.jar")]);
        assert_eq!(cfg.format.as_deref(), Some("sarif"));
        assert_eq!(cfg.max_tree_nodes, Some(1000));
    }
}
