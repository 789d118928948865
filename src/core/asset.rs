//! Asset nodes and dependency edges.
//!
//! An [`AssetNode`] is one file in the project tree, keyed by its project-relative
//! path. A [`DependencyEdge`] records that one asset requires another to be present
//! before it can be opened.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::KIND_UNKNOWN;

/// One file participating in the dependency graph.
///
/// Paths are unique within a project so `relative_path` doubles as the node id. The
/// derived ordering compares `relative_path` first, which is the tie-break order used
/// wherever nodes are listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetNode {
    /// Project-relative path with `/` separators and no `..` segments.
    #[serde(rename = "path")]
    pub relative_path: String,
    /// Tag selecting the dependency extractor (`scene`, `texture`, `unknown`, ...).
    #[serde(rename = "kind")]
    pub file_kind: String,
    /// Whether the working copy has this path materialized.
    #[serde(default)]
    pub checked_out: bool,
    /// Whether dependency extraction has run. A discovered node without edges is a leaf.
    #[serde(default)]
    pub discovered: bool,
}

impl AssetNode {
    /// Create an undiscovered, not checked out node.
    pub fn new(relative_path: impl Into<String>, file_kind: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            file_kind: file_kind.into(),
            checked_out: false,
            discovered: false,
        }
    }

    /// Create a node of kind `unknown`.
    pub fn unknown(relative_path: impl Into<String>) -> Self {
        Self::new(relative_path, KIND_UNKNOWN)
    }

    /// Directory part of the relative path, empty for files at the project root.
    pub fn parent_dir(&self) -> &str {
        match self.relative_path.rfind('/') {
            Some(idx) => &self.relative_path[..idx],
            None => "",
        }
    }
}

impl fmt::Display for AssetNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.relative_path, self.file_kind)
    }
}

/// Directed "from requires to" relation between two assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The dependent asset.
    pub from: String,
    /// The asset it requires.
    pub to: String,
}

impl DependencyEdge {
    /// Create an edge from `from` to `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
