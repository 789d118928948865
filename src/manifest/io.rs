//! Loading and saving the manifest.
//!
//! The on-disk form is a flat list of node records and edge records under a `version`
//! key. Loading validates everything the in-memory [`Manifest`] assumes: canonical node
//! paths, unique nodes and edges that only point at recorded nodes. Anything else is
//! reported as [`SpiderError::ManifestCorrupt`] rather than silently repaired.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::{ProjectConfig, find_config_file};
use crate::constants::{MANIFEST_FILE_NAME, MANIFEST_FORMAT_VERSION};
use crate::core::{AssetNode, DependencyEdge, SpiderError};
use crate::utils::fs::atomic_write;
use crate::utils::paths::{absolute_root, normalize_relative, to_absolute};

use super::Manifest;

const MANIFEST_HEADER: &str = "# Auto-generated by spider - records discovered asset dependencies.\n\
     # Safe to delete: it is rebuilt by the next resolve or crawl.\n\n";

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    version: u32,
    project: ProjectConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<NodeRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    edges: Vec<EdgeRecord>,
    #[serde(flatten)]
    extra: toml::Table,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    path: String,
    kind: String,
    #[serde(default)]
    checked_out: bool,
    #[serde(default)]
    discovered: bool,
    #[serde(flatten)]
    extra: toml::Table,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeRecord {
    from: String,
    to: String,
    #[serde(flatten)]
    extra: toml::Table,
}

fn corrupt(path: &Path, reason: impl Into<String>) -> SpiderError {
    SpiderError::ManifestCorrupt {
        file: path.display().to_string(),
        reason: reason.into(),
    }
}

impl Manifest {
    /// Load the manifest for `project_root`.
    ///
    /// A missing manifest is not an error: a fresh one is returned, configured from the
    /// nearest `spider.toml`. After loading, `checked_out` is cleared for every node whose
    /// file is no longer present in the working copy.
    ///
    /// # Errors
    ///
    /// [`SpiderError::ManifestCorrupt`] when the file is empty, unparsable, written by a
    /// newer format version, or violates a manifest invariant.
    ///
    /// ```rust,no_run
    /// use spider_cli::manifest::Manifest;
    /// use std::path::Path;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let manifest = Manifest::load(Path::new("/proj"))?;
    /// println!("{} nodes, {} edges", manifest.node_count(), manifest.edge_count());
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(project_root: &Path) -> Result<Self> {
        let project_root = absolute_root(project_root)?;
        let project_root = project_root.as_path();
        let path = project_root.join(MANIFEST_FILE_NAME);
        if !path.exists() {
            debug!(root = %project_root.display(), "No manifest found, starting fresh");
            return Ok(Self::new(ProjectConfig::discover(project_root)?));
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read manifest: {}", path.display()))?;

        if content.trim().is_empty() {
            return Err(corrupt(&path, "file is empty").into());
        }

        let file: ManifestFile =
            toml::from_str(&content).map_err(|e| corrupt(&path, e.to_string()))?;

        if file.version > MANIFEST_FORMAT_VERSION {
            return Err(corrupt(
                &path,
                format!(
                    "format version {} is newer than supported version {}",
                    file.version, MANIFEST_FORMAT_VERSION
                ),
            )
            .into());
        }

        let mut project = file.project;
        if project.root != project_root {
            if !project.root.as_os_str().is_empty() {
                warn!(
                    recorded = %project.root.display(),
                    actual = %project_root.display(),
                    "Manifest was written for a different project root, using the actual root"
                );
            }
            project.root = project_root.to_path_buf();
        }

        if let Some(config_path) = find_config_file(project_root) {
            project.apply(ProjectConfig::load_from(&config_path)?);
        }

        let mut manifest = Self::new(project);
        manifest.extra = file.extra;

        for record in file.nodes {
            let canonical = normalize_relative(&record.path)
                .map_err(|e| corrupt(&path, format!("invalid node path: {e}")))?;
            if canonical.is_empty() || canonical != record.path {
                return Err(corrupt(
                    &path,
                    format!("node path '{}' is not a canonical relative path", record.path),
                )
                .into());
            }

            let node = AssetNode {
                relative_path: record.path,
                file_kind: record.kind,
                checked_out: record.checked_out,
                discovered: record.discovered,
            };
            let key = node.relative_path.clone();
            if !manifest.add_node(node) {
                return Err(corrupt(&path, format!("duplicate node '{key}'")).into());
            }
            if !record.extra.is_empty() {
                manifest.node_extra.insert(key, record.extra);
            }
        }

        for record in file.edges {
            let edge = DependencyEdge::new(record.from, record.to);
            manifest
                .add_edge(edge.clone())
                .map_err(|e| corrupt(&path, format!("edge {edge}: {e}")))?;
            if !record.extra.is_empty() {
                manifest.edge_extra.insert(edge, record.extra);
            }
        }

        manifest.revalidate_checkouts();

        debug!(
            nodes = manifest.node_count(),
            edges = manifest.edge_count(),
            "Loaded manifest"
        );
        Ok(manifest)
    }

    /// Write the manifest atomically to `{root}/spider.manifest.toml`.
    pub fn save(&self) -> Result<()> {
        let path = self.file_path();
        let content = self.to_toml_string()?;

        atomic_write(&path, content.as_bytes())
            .with_context(|| format!("Cannot write manifest: {}", path.display()))?;

        debug!(
            nodes = self.node_count(),
            edges = self.edge_count(),
            path = %path.display(),
            "Saved manifest"
        );
        Ok(())
    }

    /// Serialize the manifest, header comment included.
    pub fn to_toml_string(&self) -> Result<String> {
        let file = ManifestFile {
            version: MANIFEST_FORMAT_VERSION,
            project: self.project.clone(),
            nodes: self
                .nodes
                .values()
                .map(|node| NodeRecord {
                    path: node.relative_path.clone(),
                    kind: node.file_kind.clone(),
                    checked_out: node.checked_out,
                    discovered: node.discovered,
                    extra: self.node_extra.get(&node.relative_path).cloned().unwrap_or_default(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|edge| EdgeRecord {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    extra: self.edge_extra.get(edge).cloned().unwrap_or_default(),
                })
                .collect(),
            extra: self.extra.clone(),
        };

        let body = toml::to_string(&file).map_err(SpiderError::from)?;
        Ok(format!("{MANIFEST_HEADER}{body}"))
    }

    /// Clear `checked_out` for nodes whose file is missing from the working copy.
    fn revalidate_checkouts(&mut self) {
        let root = self.project.root.clone();
        let stale: Vec<String> = self
            .nodes
            .values()
            .filter(|node| node.checked_out)
            .filter(|node| {
                to_absolute(&node.relative_path, &root).map(|p| !p.exists()).unwrap_or(true)
            })
            .map(|node| node.relative_path.clone())
            .collect();

        for relative_path in stale {
            debug!(path = %relative_path, "Checked-out asset missing from working copy");
            if let Some(node) = self.nodes.get_mut(&relative_path) {
                node.checked_out = false;
            }
        }
    }
}
