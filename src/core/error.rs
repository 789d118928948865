//! Error handling for spider
//!
//! This module provides the error types shared by every component together with the
//! user-facing error reporting used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** ([`SpiderError`]) so callers can tell a corrupt manifest
//!    from a dependency cycle from a backend failure
//! 2. **User-friendly messages** ([`ErrorContext`]) with details and an actionable suggestion
//!
//! # Error Categories
//!
//! - **Input validation**: [`SpiderError::PathOutsideProject`], [`SpiderError::InvalidPath`]
//! - **Manifest**: [`SpiderError::ManifestCorrupt`], [`SpiderError::UnknownNode`]
//! - **Discovery**: [`SpiderError::ExtractionFailed`] (recovered per asset by the crawler)
//! - **Ordering**: [`SpiderError::CyclicDependency`]
//! - **Backend**: [`SpiderError::BackendCommandError`], [`SpiderError::BackendNotFound`]
//! - **Environment**: [`SpiderError::ConfigError`], [`SpiderError::LockTimeout`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use spider_cli::core::{SpiderError, user_friendly_error};
//!
//! let error = SpiderError::InvalidPath {
//!     path: "../outside.blend".to_string(),
//!     reason: "parent directory traversal".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// A dependency cycle, as the ordered list of project-relative paths that form it.
///
/// The first node depends on the second, the second on the third, and the last
/// depends on the first again.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DependencyCycle {
    /// Paths along the cycle, without repeating the first node at the end.
    pub path: Vec<String>,
}

impl DependencyCycle {
    /// Create a cycle from the nodes along it.
    pub fn new(path: Vec<String>) -> Self {
        Self {
            path,
        }
    }

    /// Whether the given project-relative path participates in the cycle.
    pub fn contains(&self, relative_path: &str) -> bool {
        self.path.iter().any(|p| p == relative_path)
    }
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = self.path.iter().map(String::as_str).collect();
        if let Some(first) = self.path.first() {
            parts.push(first);
        }
        write!(f, "{}", parts.join(" → "))
    }
}

/// The main error type for spider operations.
///
/// Pure components (path mapping, graph ordering) return this type directly; the
/// orchestration layers wrap it in [`anyhow::Error`] so it can be recovered with
/// `downcast_ref::<SpiderError>()`.
#[derive(Error, Debug)]
pub enum SpiderError {
    /// An absolute path does not lie under the project root.
    #[error("Path '{path}' is outside the project root '{root}'")]
    PathOutsideProject {
        /// The offending path
        path: String,
        /// The project root it was checked against
        root: String,
    },

    /// A project-relative path is malformed (parent traversal, absolute, empty segment).
    #[error("Invalid project path '{path}': {reason}")]
    InvalidPath {
        /// The offending path
        path: String,
        /// Why the path was rejected
        reason: String,
    },

    /// The manifest exists but cannot be trusted.
    ///
    /// Spider never replaces a corrupt manifest with a fresh one on its own; the caller
    /// decides whether to delete it and rebuild.
    #[error("Manifest {file} is corrupt: {reason}")]
    ManifestCorrupt {
        /// Path to the manifest file
        file: String,
        /// What is wrong with it
        reason: String,
    },

    /// An edge was added for a node the manifest does not know.
    #[error("Asset '{path}' is not recorded in the manifest")]
    UnknownNode {
        /// Project-relative path of the missing node
        path: String,
    },

    /// A dependency extractor could not read an asset.
    #[error("Failed to extract dependencies from '{path}' ({kind}): {reason}")]
    ExtractionFailed {
        /// Project-relative path of the asset
        path: String,
        /// File kind the extractor was selected for
        kind: String,
        /// Extractor error message
        reason: String,
    },

    /// The dependency graph contains a cycle.
    #[error("Circular dependency detected: {cycle}")]
    CyclicDependency {
        /// The cycle that was found
        cycle: DependencyCycle,
    },

    /// A version-control command returned a failure.
    #[error("Version control operation failed: {operation}")]
    BackendCommandError {
        /// The operation that failed (e.g., "checkout", "update", "info")
        operation: String,
        /// Error output from the backend
        stderr: String,
    },

    /// The version-control client executable is not installed.
    #[error("Version control client '{command}' is not installed or not found in PATH")]
    BackendNotFound {
        /// Name of the missing executable
        command: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Another process holds the project lock.
    #[error("Timed out after {seconds}s waiting for the project lock at {path}")]
    LockTimeout {
        /// Lock file path
        path: String,
        /// How long we waited
        seconds: u64,
    },

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for SpiderError {
    fn clone(&self) -> Self {
        match self {
            Self::PathOutsideProject {
                path,
                root,
            } => Self::PathOutsideProject {
                path: path.clone(),
                root: root.clone(),
            },
            Self::InvalidPath {
                path,
                reason,
            } => Self::InvalidPath {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ManifestCorrupt {
                file,
                reason,
            } => Self::ManifestCorrupt {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::UnknownNode {
                path,
            } => Self::UnknownNode {
                path: path.clone(),
            },
            Self::ExtractionFailed {
                path,
                kind,
                reason,
            } => Self::ExtractionFailed {
                path: path.clone(),
                kind: kind.clone(),
                reason: reason.clone(),
            },
            Self::CyclicDependency {
                cycle,
            } => Self::CyclicDependency {
                cycle: cycle.clone(),
            },
            Self::BackendCommandError {
                operation,
                stderr,
            } => Self::BackendCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::BackendNotFound {
                command,
            } => Self::BackendNotFound {
                command: command.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::LockTimeout {
                path,
                seconds,
            } => Self::LockTimeout {
                path: path.clone(),
                seconds: *seconds,
            },
            // For errors that don't implement Clone, convert to Other
            Self::TomlSerError(e) => Self::Other {
                message: format!("TOML serialization error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper with a user-facing suggestion and details.
///
/// ```rust,no_run
/// use spider_cli::core::{ErrorContext, SpiderError};
///
/// let context = ErrorContext::new(SpiderError::BackendNotFound { command: "svn".into() })
///     .with_suggestion("Install Subversion and make sure `svn` is in your PATH")
///     .with_details("Spider drives the working copy through the svn command line client");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: SpiderError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: SpiderError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for CLI display.
///
/// [`SpiderError`] values get tailored suggestions, IO errors get filesystem hints,
/// everything else is shown with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(spider_error) = error.downcast_ref::<SpiderError>() {
        return create_error_context(spider_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(SpiderError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check ownership and permissions of the project directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(SpiderError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the project directory and target path exist");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(SpiderError::Other {
        message,
    })
}

fn create_error_context(error: SpiderError) -> ErrorContext {
    match &error {
        SpiderError::PathOutsideProject {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Pass a path inside the project, or point --project at the right root"),
        SpiderError::InvalidPath {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use a project-relative path without '..' segments")
            .with_details("Targets are named relative to the project root, e.g. 'shots/010/scene.blend'"),
        SpiderError::ManifestCorrupt {
            ..
        } => ErrorContext::new(error)
            .with_suggestion(
                "Fix the manifest by hand, or delete it and run 'spider crawl' to rebuild it",
            )
            .with_details("Spider never overwrites a corrupt manifest because that would hide data loss"),
        SpiderError::CyclicDependency {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Break the cycle by removing one of the links between these assets")
            .with_details("Assets that require each other cannot be fetched in a valid order"),
        SpiderError::BackendNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Install Subversion and make sure 'svn' is in your PATH"),
        SpiderError::BackendCommandError {
            stderr,
            ..
        } => {
            let details = stderr.clone();
            ErrorContext::new(error)
                .with_suggestion("Check network access and repository credentials, then retry")
                .with_details(details)
        }
        SpiderError::ConfigError {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Set backend_url under [project] in spider.toml or pass --backend-url",
        ),
        SpiderError::LockTimeout {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Wait for the other spider run to finish, then retry"),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_closes_loop() {
        let cycle = DependencyCycle::new(vec!["a.blend".into(), "b.blend".into()]);
        assert_eq!(cycle.to_string(), "a.blend → b.blend → a.blend");
        assert!(cycle.contains("b.blend"));
        assert!(!cycle.contains("c.blend"));
    }

    #[test]
    fn test_user_friendly_error_recognizes_spider_errors() {
        let err = anyhow::Error::from(SpiderError::CyclicDependency {
            cycle: DependencyCycle::new(vec!["a".into()]),
        });
        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, SpiderError::CyclicDependency { .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_user_friendly_error_keeps_cause_chain() {
        let err = anyhow::anyhow!("root cause").context("outer");
        let ctx = user_friendly_error(err);
        let text = ctx.to_string();
        assert!(text.contains("outer"));
        assert!(text.contains("root cause"));
    }

    #[test]
    fn test_clone_converts_serialization_error() {
        let err = SpiderError::from(<toml::ser::Error as serde::ser::Error>::custom("bad key"));
        match err.clone() {
            SpiderError::Other {
                message,
            } => assert!(message.contains("bad key")),
            other => panic!("unexpected clone result: {other:?}"),
        }
    }
}
