//! Test fixtures for project trees
//!
//! A [`ProjectFixture`] owns a temporary project root. Files added with
//! [`remote_file`](ProjectFixture::remote_file) live only in the fake repository and reach
//! the disk through [`MemoryBackend`] updates; files added with
//! [`write_local`](ProjectFixture::write_local) are written straight into the project.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::{MemoryBackend, blend_file};
use crate::constants::{CONFIG_FILE_NAME, MANIFEST_FILE_NAME};
use crate::manifest::Manifest;

/// Repository URL written to the fixture's `spider.toml`.
pub const FIXTURE_URL: &str = "svn://fixture.example/assets/trunk";

/// Temporary project with a fake repository behind it.
#[derive(Debug)]
pub struct ProjectFixture {
    temp_dir: TempDir,
    remote: BTreeMap<String, Vec<u8>>,
}

impl ProjectFixture {
    /// Empty project whose `spider.toml` points at [`FIXTURE_URL`].
    pub fn new() -> Result<Self> {
        Self::with_temp_dir(TempDir::new().context("Failed to create fixture directory")?)
    }

    /// Like [`new`](Self::new), with the project root created inside `parent`.
    pub fn new_in(parent: &Path) -> Result<Self> {
        let temp_dir = TempDir::new_in(parent)
            .with_context(|| format!("Failed to create fixture directory in {}", parent.display()))?;
        Self::with_temp_dir(temp_dir)
    }

    fn with_temp_dir(temp_dir: TempDir) -> Result<Self> {
        let fixture = Self {
            temp_dir,
            remote: BTreeMap::new(),
        };
        fixture.write_config(&format!("[project]\nbackend_url = \"{FIXTURE_URL}\"\n"))?;
        Ok(fixture)
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.root().join(MANIFEST_FILE_NAME)
    }

    /// Add a file to the fake repository.
    #[must_use]
    pub fn remote_file(mut self, relative_path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.remote.insert(relative_path.to_string(), content.into());
        self
    }

    /// Add a `.blend` file to the fake repository.
    #[must_use]
    pub fn remote_blend(self, relative_path: &str, references: &[&str]) -> Self {
        self.remote_file(relative_path, blend_file(references))
    }

    /// Write a file directly into the project.
    pub fn write_local(&self, relative_path: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.root().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Replace the project's `spider.toml`.
    pub fn write_config(&self, content: &str) -> Result<()> {
        self.write_local(CONFIG_FILE_NAME, content)?;
        Ok(())
    }

    /// A backend over the fixture's repository with no working copy yet.
    pub fn backend(&self) -> MemoryBackend {
        self.remote.iter().fold(
            MemoryBackend::new(self.root(), FIXTURE_URL),
            |backend, (path, content)| backend.with_file(path, content.clone()),
        )
    }

    /// A backend that treats the project root as an existing working copy.
    pub fn checked_out_backend(&self) -> MemoryBackend {
        self.backend().with_working_copy()
    }

    /// Load the manifest currently on disk.
    pub fn load_manifest(&self) -> Result<Manifest> {
        Manifest::load(self.root())
    }
}
