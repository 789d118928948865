//! The dependency manifest (`spider.manifest.toml`).
//!
//! The manifest is the persistent cache of everything spider has learned about a project:
//! which assets exist, which of them have been crawled, which are materialized in the
//! working copy, and which assets each one requires. The resolver consults it before any
//! crawl or extraction and saves it at the end of every resolution, successful or not.
//!
//! # Structure
//!
//! ```toml
//! version = 1
//!
//! [project]
//! root = "/proj"
//! backend_url = "svn://host/repo/trunk"
//! ignore = [".svn", ".git", ".spider"]
//!
//! [[nodes]]
//! path = "scene.blend"
//! kind = "scene"
//! checked_out = true
//! discovered = true
//!
//! [[nodes]]
//! path = "tex/wood.png"
//! kind = "texture"
//! checked_out = true
//! discovered = true
//!
//! [[edges]]
//! from = "scene.blend"
//! to = "tex/wood.png"
//! ```
//!
//! # Invariants
//!
//! - Node paths are canonical project-relative paths (see [`crate::utils::paths`])
//! - Every edge endpoint is a recorded node
//! - Nodes and edges are sets: adding an existing one is a no-op
//! - Unknown fields anywhere in the file survive a load/save cycle
//!
//! Loading and saving live in [`io`].

pub mod io;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::constants::MANIFEST_FILE_NAME;
use crate::core::{AssetNode, DependencyEdge, SpiderError};

/// In-memory form of the manifest: nodes, edges and project configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Configuration the manifest was built with.
    pub project: ProjectConfig,
    nodes: BTreeMap<String, AssetNode>,
    edges: BTreeSet<DependencyEdge>,
    extra: toml::Table,
    node_extra: BTreeMap<String, toml::Table>,
    edge_extra: BTreeMap<DependencyEdge, toml::Table>,
}

impl Manifest {
    /// Create an empty manifest for the given project configuration.
    pub fn new(project: ProjectConfig) -> Self {
        Self {
            project,
            nodes: BTreeMap::new(),
            edges: BTreeSet::new(),
            extra: toml::Table::new(),
            node_extra: BTreeMap::new(),
            edge_extra: BTreeMap::new(),
        }
    }

    /// Absolute project root.
    pub fn project_root(&self) -> &Path {
        &self.project.root
    }

    /// Location of the manifest file for this project.
    pub fn file_path(&self) -> PathBuf {
        self.project.root.join(MANIFEST_FILE_NAME)
    }

    /// Add a node. Returns `false` if a node with the same path is already recorded, in
    /// which case the existing node is left untouched.
    pub fn add_node(&mut self, node: AssetNode) -> bool {
        if self.nodes.contains_key(&node.relative_path) {
            return false;
        }
        self.nodes.insert(node.relative_path.clone(), node);
        true
    }

    /// Add an edge. Returns `false` if the edge is already recorded.
    ///
    /// # Errors
    ///
    /// [`SpiderError::UnknownNode`] if either endpoint is not a recorded node.
    pub fn add_edge(&mut self, edge: DependencyEdge) -> Result<bool, SpiderError> {
        for endpoint in [&edge.from, &edge.to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(SpiderError::UnknownNode {
                    path: endpoint.clone(),
                });
            }
        }
        Ok(self.edges.insert(edge))
    }

    /// Look up a node by its project-relative path.
    pub fn get_node(&self, relative_path: &str) -> Option<&AssetNode> {
        self.nodes.get(relative_path)
    }

    /// Whether a node with this path is recorded.
    pub fn contains_node(&self, relative_path: &str) -> bool {
        self.nodes.contains_key(relative_path)
    }

    /// Record that dependency extraction has run for `relative_path`.
    pub fn mark_discovered(&mut self, relative_path: &str) -> Result<(), SpiderError> {
        self.node_mut(relative_path)?.discovered = true;
        Ok(())
    }

    /// Record whether `relative_path` is materialized in the working copy.
    pub fn set_checked_out(
        &mut self,
        relative_path: &str,
        checked_out: bool,
    ) -> Result<(), SpiderError> {
        self.node_mut(relative_path)?.checked_out = checked_out;
        Ok(())
    }

    /// Change the file kind of a recorded node.
    pub fn set_file_kind(
        &mut self,
        relative_path: &str,
        file_kind: impl Into<String>,
    ) -> Result<(), SpiderError> {
        self.node_mut(relative_path)?.file_kind = file_kind.into();
        Ok(())
    }

    /// Direct dependencies of `relative_path`, in ascending path order.
    pub fn dependencies_of<'a>(&'a self, relative_path: &'a str) -> impl Iterator<Item = &'a str> {
        self.edges
            .range(DependencyEdge::new(relative_path, "")..)
            .take_while(move |edge| edge.from == relative_path)
            .map(|edge| edge.to.as_str())
    }

    /// All nodes in ascending path order.
    pub fn nodes(&self) -> impl Iterator<Item = &AssetNode> {
        self.nodes.values()
    }

    /// All edges in ascending `(from, to)` order.
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter()
    }

    /// Number of recorded nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of recorded edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn node_mut(&mut self, relative_path: &str) -> Result<&mut AssetNode, SpiderError> {
        self.nodes.get_mut(relative_path).ok_or_else(|| SpiderError::UnknownNode {
            path: relative_path.to_string(),
        })
    }
}
