//! Core types for spider
//!
//! This module holds the vocabulary every other module speaks:
//!
//! - [`SpiderError`] and [`DependencyCycle`] - the error taxonomy
//! - [`ErrorContext`] and [`user_friendly_error`] - CLI-facing error presentation
//! - [`AssetNode`] and [`DependencyEdge`] - the nodes and edges of the dependency graph
//!
//! # Examples
//!
//! ```rust,no_run
//! use spider_cli::core::{AssetNode, DependencyEdge};
//!
//! let scene = AssetNode::new("scene.blend", "scene");
//! let edge = DependencyEdge::new("scene.blend", "tex/wood.png");
//! assert_eq!(edge.from, scene.relative_path);
//! ```

pub mod asset;
pub mod error;

pub use asset::{AssetNode, DependencyEdge};
pub use error::{DependencyCycle, ErrorContext, SpiderError, user_friendly_error};
