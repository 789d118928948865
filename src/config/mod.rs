//! Project configuration.
//!
//! Spider reads its project settings from the nearest `spider.toml`, searching the
//! project root and then each parent directory. The file is optional: without it the
//! built-in defaults apply (ignore `.svn`, `.git` and `.spider`; no backend URL).
//!
//! # File Format
//!
//! ```toml
//! [project]
//! backend_url = "svn://assets.example.com/film/trunk"
//! ignore = ["render_cache", "*.bak"]
//!
//! [project.kinds]
//! blend1 = "scene"
//! psd = "texture"
//! ```
//!
//! The same `[project]` table is embedded in the manifest, so a manifest always records
//! the configuration it was built with. When a manifest is loaded the current `spider.toml`
//! is applied on top of the recorded table (see [`ProjectConfig::apply`]).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_IGNORE_PATTERNS};
use crate::core::SpiderError;

/// Project-level configuration: root, backend URL, ignore rules and kind mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute project root. Not read from `spider.toml`; filled in by the loader.
    #[serde(default, skip_serializing_if = "path_is_empty")]
    pub root: PathBuf,

    /// Repository URL the working copy is checked out from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    /// Directory-name patterns (exact names or globs) never descended into by a walk.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// File extension (without dot, lowercase) to file kind overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kinds: BTreeMap<String, String>,

    /// Fields written by newer versions, kept so they survive a rewrite.
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    project: Option<ProjectConfig>,
    /// Top-level `[kinds]`, merged under `[project.kinds]` which wins on conflict.
    #[serde(default)]
    kinds: BTreeMap<String, String>,
}

fn path_is_empty(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(|s| (*s).to_string()).collect()
}

impl ProjectConfig {
    /// Default configuration for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backend_url: None,
            ignore: default_ignore(),
            kinds: BTreeMap::new(),
            extra: toml::Table::new(),
        }
    }

    /// Set the backend URL.
    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Add ignore patterns, skipping ones already present.
    pub fn add_ignore_patterns<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pattern in patterns {
            let pattern = pattern.into();
            if !self.ignore.contains(&pattern) {
                self.ignore.push(pattern);
            }
        }
    }

    /// Apply the settings of a freshly read `spider.toml` on top of this configuration.
    ///
    /// A backend URL in `file` replaces the recorded one, its kinds override recorded kinds,
    /// and its ignore patterns are added. Settings `file` does not mention keep their
    /// recorded values, so patterns added with `crawl --ignore` survive.
    pub fn apply(&mut self, file: ProjectConfig) {
        if file.backend_url.is_some() {
            self.backend_url = file.backend_url;
        }
        self.kinds.extend(file.kinds);
        self.extra.extend(file.extra);
        self.add_ignore_patterns(file.ignore);
    }

    /// Load the configuration for `project_root` from the nearest `spider.toml`.
    ///
    /// Patterns from the file extend the built-in ignore list rather than replacing it,
    /// so version-control metadata directories stay pruned.
    ///
    /// # Errors
    ///
    /// [`SpiderError::ConfigError`] when a `spider.toml` exists but cannot be parsed.
    pub fn discover(project_root: &Path) -> Result<Self> {
        let Some(path) = find_config_file(project_root) else {
            debug!(root = %project_root.display(), "No {} found, using defaults", CONFIG_FILE_NAME);
            return Ok(Self::new(project_root));
        };

        let mut config = Self::load_from(&path)?;
        config.root = project_root.to_path_buf();
        Ok(config)
    }

    /// Parse a `spider.toml` file. The returned config has an empty root.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project config from {}", path.display()))?;

        let file: ConfigFile = toml::from_str(&content).map_err(|e| SpiderError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;

        debug!(config = %path.display(), "Loaded project configuration");

        let mut config = Self::new(PathBuf::new());
        config.kinds = file.kinds;
        if let Some(project) = file.project {
            config.backend_url = project.backend_url;
            config.kinds.extend(project.kinds);
            config.extra = project.extra;
            config.add_ignore_patterns(project.ignore);
        }
        Ok(config)
    }
}

/// Finds the nearest `spider.toml` at or above `start`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let config = ProjectConfig::discover(temp.path()).unwrap();

        assert_eq!(config.root, temp.path());
        assert!(config.backend_url.is_none());
        assert!(config.ignore.iter().any(|p| p == ".svn"));
    }

    #[test]
    fn test_discover_searches_parent_directories() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            r#"
[project]
backend_url = "svn://example/trunk"
ignore = ["render_cache"]

[project.kinds]
psd = "texture"
"#,
        )
        .unwrap();
        let root = temp.path().join("shots/010");
        fs::create_dir_all(&root).unwrap();

        let config = ProjectConfig::discover(&root).unwrap();

        assert_eq!(config.root, root);
        assert_eq!(config.backend_url.as_deref(), Some("svn://example/trunk"));
        assert!(config.ignore.iter().any(|p| p == "render_cache"));
        assert!(config.ignore.iter().any(|p| p == ".svn"));
        assert_eq!(config.kinds.get("psd").map(String::as_str), Some("texture"));
    }

    #[test]
    fn test_top_level_kinds_table() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[kinds]\nblend1 = \"scene\"\npsd = \"texture\"\n\n[project.kinds]\npsd = \"paint\"\n",
        )
        .unwrap();

        let config = ProjectConfig::discover(temp.path()).unwrap();

        assert_eq!(config.kinds.get("blend1").map(String::as_str), Some("scene"));
        assert_eq!(config.kinds.get("psd").map(String::as_str), Some("paint"));
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "[project\nbroken").unwrap();

        let err = ProjectConfig::discover(temp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpiderError>(),
            Some(SpiderError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_apply_file_over_recorded_config() {
        let mut recorded = ProjectConfig::new("/proj").with_backend_url("svn://old/trunk");
        recorded.add_ignore_patterns(["render_*"]);
        recorded.kinds.insert("psd".to_string(), "texture".to_string());

        let mut file = ProjectConfig::new(PathBuf::new()).with_backend_url("svn://new/trunk");
        file.add_ignore_patterns(["cache"]);
        file.kinds.insert("psd".to_string(), "layered".to_string());
        recorded.apply(file);

        assert_eq!(recorded.root, Path::new("/proj"));
        assert_eq!(recorded.backend_url.as_deref(), Some("svn://new/trunk"));
        assert!(recorded.ignore.contains(&"render_*".to_string()));
        assert!(recorded.ignore.contains(&"cache".to_string()));
        assert_eq!(recorded.kinds["psd"], "layered");

        recorded.apply(ProjectConfig::new(PathBuf::new()));
        assert_eq!(recorded.backend_url.as_deref(), Some("svn://new/trunk"));
    }

    #[test]
    fn test_add_ignore_patterns_deduplicates() {
        let mut config = ProjectConfig::new("/proj");
        config.add_ignore_patterns([".svn", "cache"]);
        assert_eq!(config.ignore.iter().filter(|p| *p == ".svn").count(), 1);
        assert!(config.ignore.contains(&"cache".to_string()));
    }
}
