//! Version-control backend capability.
//!
//! Spider never talks to a repository directly. Everything it needs from version control
//! fits in three operations, captured by [`VcsBackend`]:
//!
//! - `checkout(url, path, shallow)` - create a working copy at `path`
//! - `update(path, shallow)` - bring `path` up to date; a shallow update materializes a
//!   directory without its children
//! - `info(path)` - the repository URL a working copy path was checked out from
//!
//! The bundled implementation is [`SvnBackend`], which drives the system `svn` client
//! through [`command_builder::SvnCommand`]. Tests use the in-memory fake from
//! `test_utils`.

pub mod command_builder;
pub mod svn;

use anyhow::Result;
use std::path::Path;

pub use svn::SvnBackend;

/// What the backend reports about a working-copy path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Repository URL of the path.
    pub url: String,
}

/// Narrow interface to a version-control client.
///
/// Methods take `&mut self` so fakes can record calls without interior mutability.
/// Failures are reported unchanged to the caller; a backend does not retry.
pub trait VcsBackend {
    /// Create a working copy of `url` at `path`. A shallow checkout has empty depth.
    fn checkout(&mut self, url: &str, path: &Path, shallow: bool) -> Result<()>;

    /// Update `path`. A shallow update sets the directory depth to empty; a full update
    /// fetches the file or the whole directory.
    fn update(&mut self, path: &Path, shallow: bool) -> Result<()>;

    /// Repository information for a working-copy path.
    fn info(&mut self, path: &Path) -> Result<RepoInfo>;
}

impl<B: VcsBackend + ?Sized> VcsBackend for Box<B> {
    fn checkout(&mut self, url: &str, path: &Path, shallow: bool) -> Result<()> {
        (**self).checkout(url, path, shallow)
    }

    fn update(&mut self, path: &Path, shallow: bool) -> Result<()> {
        (**self).update(path, shallow)
    }

    fn info(&mut self, path: &Path) -> Result<RepoInfo> {
        (**self).info(path)
    }
}
