//! Subversion backend over the system `svn` client.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use super::command_builder::SvnCommand;
use super::{RepoInfo, VcsBackend};

/// [`VcsBackend`] that shells out to `svn`.
///
/// Authentication, proxies and certificates come from the user's Subversion configuration.
/// Commands run with `--non-interactive`, so a missing credential fails the command.
#[derive(Debug, Default, Clone)]
pub struct SvnBackend {
    context: Option<String>,
}

impl SvnBackend {
    /// Create a backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every command's log lines with `context`.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn command(&self, cmd: SvnCommand) -> SvnCommand {
        match &self.context {
            Some(ctx) => cmd.with_context(ctx.clone()),
            None => cmd,
        }
    }
}

impl VcsBackend for SvnBackend {
    fn checkout(&mut self, url: &str, path: &Path, shallow: bool) -> Result<()> {
        debug!(url, path = %path.display(), shallow, "svn checkout");
        self.command(SvnCommand::checkout(url, path, shallow)).execute_success()
    }

    fn update(&mut self, path: &Path, shallow: bool) -> Result<()> {
        debug!(path = %path.display(), shallow, "svn update");
        // --set-depth empty on a populated directory would prune its materialized children
        let cmd = if shallow && path.is_dir() {
            SvnCommand::refresh_dir(path)
        } else {
            SvnCommand::update(path, shallow)
        };
        self.command(cmd).execute_success()
    }

    fn info(&mut self, path: &Path) -> Result<RepoInfo> {
        let url = self.command(SvnCommand::info_url(path)).execute_stdout()?;
        Ok(RepoInfo {
            url,
        })
    }
}
