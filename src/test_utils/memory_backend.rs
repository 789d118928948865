//! In-memory version-control backend.
//!
//! The "repository" is a map of project-relative file paths to contents. Updates copy
//! the requested part of it into the working copy on disk, so extractors read real
//! files. Like Subversion, an update fails when the parent directory is not in the
//! working copy yet.

use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::SpiderError;
use crate::vcs::{RepoInfo, VcsBackend};

/// One recorded backend call. Paths are project-relative, `.` for the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `checkout(url, path, shallow)`
    Checkout {
        url: String,
        path: String,
        shallow: bool,
    },
    /// `update(path, shallow)`
    Update {
        path: String,
        shallow: bool,
    },
    /// `info(path)`
    Info {
        path: String,
    },
}

/// Fake [`VcsBackend`] over an in-memory repository.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    root: PathBuf,
    url: String,
    remote: BTreeMap<String, Vec<u8>>,
    calls: Vec<BackendCall>,
    fail_on: BTreeSet<String>,
    has_working_copy: bool,
}

impl MemoryBackend {
    /// Backend serving `url` into the working copy at `root`.
    pub fn new(root: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url: url.into(),
            remote: BTreeMap::new(),
            calls: Vec::new(),
            fail_on: BTreeSet::new(),
            has_working_copy: false,
        }
    }

    /// Add a file to the repository.
    #[must_use]
    pub fn with_file(mut self, relative_path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.remote.insert(relative_path.to_string(), content.into());
        self
    }

    /// Treat `root` as an existing working copy.
    #[must_use]
    pub fn with_working_copy(mut self) -> Self {
        self.has_working_copy = true;
        self
    }

    /// Make every update of `relative_path` fail.
    #[must_use]
    pub fn failing_on(mut self, relative_path: &str) -> Self {
        self.fail_on.insert(relative_path.to_string());
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Paths passed to full (non-shallow) updates, in order.
    pub fn full_updates(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Update {
                    path,
                    shallow: false,
                } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether a checkout or update has been issued.
    pub fn touched_repository(&self) -> bool {
        self.calls.iter().any(|call| !matches!(call, BackendCall::Info { .. }))
    }

    fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let relative = relative.to_string_lossy().replace('\\', "/");
        if relative.is_empty() {
            ".".to_string()
        } else {
            relative
        }
    }

    fn is_remote_dir(&self, relative: &str) -> bool {
        relative == "." || {
            let prefix = format!("{relative}/");
            self.remote.keys().any(|key| key.starts_with(&prefix))
        }
    }

    fn write_file(&self, relative: &str, content: &[u8]) -> Result<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(())
    }

    fn write_tree(&self, relative_dir: &str) -> Result<()> {
        for (file, content) in &self.remote {
            if relative_dir == "." || file.starts_with(&format!("{relative_dir}/")) {
                self.write_file(file, content)?;
            }
        }
        Ok(())
    }

    fn fail(operation: &str, message: String) -> anyhow::Error {
        SpiderError::BackendCommandError {
            operation: operation.to_string(),
            stderr: message,
        }
        .into()
    }
}

impl VcsBackend for MemoryBackend {
    fn checkout(&mut self, url: &str, path: &Path, shallow: bool) -> Result<()> {
        let relative = self.relative(path);
        self.calls.push(BackendCall::Checkout {
            url: url.to_string(),
            path: relative.clone(),
            shallow,
        });

        if url != self.url {
            return Err(Self::fail("checkout", format!("unknown repository '{url}'")));
        }
        fs::create_dir_all(path)?;
        if !shallow {
            self.write_tree(&relative)?;
        }
        self.has_working_copy = true;
        Ok(())
    }

    fn update(&mut self, path: &Path, shallow: bool) -> Result<()> {
        let relative = self.relative(path);
        self.calls.push(BackendCall::Update {
            path: relative.clone(),
            shallow,
        });

        if self.fail_on.contains(&relative) {
            return Err(Self::fail("update", format!("E170013: unable to update '{relative}'")));
        }
        if !self.has_working_copy {
            return Err(Self::fail("update", format!("'{relative}' is not a working copy")));
        }
        let parent_missing = path.parent().is_some_and(|parent| !parent.is_dir());
        if relative != "." && parent_missing {
            return Err(Self::fail(
                "update",
                format!("E155007: parent of '{relative}' is not a working copy"),
            ));
        }

        if let Some(content) = self.remote.get(&relative) {
            return self.write_file(&relative, content);
        }
        if self.is_remote_dir(&relative) {
            fs::create_dir_all(path)?;
            if !shallow {
                self.write_tree(&relative)?;
            }
            return Ok(());
        }
        Err(Self::fail("update", format!("'{relative}' does not exist in the repository")))
    }

    fn info(&mut self, path: &Path) -> Result<RepoInfo> {
        let relative = self.relative(path);
        self.calls.push(BackendCall::Info {
            path: relative.clone(),
        });

        if self.has_working_copy && path.exists() {
            Ok(RepoInfo {
                url: self.url.clone(),
            })
        } else {
            Err(anyhow!("'{relative}' is not a working copy"))
        }
    }
}
