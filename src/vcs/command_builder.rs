//! Builder for Subversion command lines.
//!
//! Provides a fluent API for building and running `svn` commands with consistent logging
//! and error mapping. Commands run synchronously and without a timeout; the caller owns
//! scheduling. Every command is non-interactive so a credential prompt fails instead of
//! hanging.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

use crate::core::SpiderError;
use crate::utils::platform::{command_exists, get_svn_command};

/// Fluent builder for one `svn` invocation.
///
/// ```rust,no_run
/// use spider_cli::vcs::command_builder::SvnCommand;
///
/// # fn example() -> anyhow::Result<()> {
/// let url = SvnCommand::info_url("/proj").execute_stdout()?;
/// SvnCommand::update("/proj/tex", false).execute_success()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SvnCommand {
    /// Arguments after the executable (e.g., `["update", "--set-depth", "empty", path]`).
    args: Vec<String>,

    /// Environment variables to set for the process.
    env_vars: Vec<(String, String)>,

    /// Optional context string included in log lines.
    context: Option<String>,
}

/// Captured output of a successful command.
#[derive(Debug, Clone)]
pub struct SvnCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl SvnCommand {
    /// Creates an empty command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for the process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Set a context for logging (e.g., the asset being materialized).
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The subcommand name, used in errors and perf logs.
    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    /// Full argument list, `--non-interactive` included.
    pub fn full_args(&self) -> Vec<String> {
        let mut full_args = self.args.clone();
        if !full_args.iter().any(|a| a == "--non-interactive") {
            full_args.push("--non-interactive".to_string());
        }
        full_args
    }

    /// Execute the command and return its output.
    ///
    /// # Errors
    ///
    /// - [`SpiderError::BackendNotFound`] when the `svn` client is not installed
    /// - [`SpiderError::BackendCommandError`] when the command exits unsuccessfully
    pub fn execute(self) -> Result<SvnCommandOutput> {
        let start = Instant::now();
        let svn_command = get_svn_command();
        let full_args = self.full_args();
        let operation = self.operation();
        let ctx = self.context.as_deref().map(|c| format!("({c}) ")).unwrap_or_default();

        tracing::debug!(target: "svn", "{}Executing command: {} {}", ctx, svn_command, full_args.join(" "));

        let mut cmd = Command::new(svn_command);
        cmd.args(&full_args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "svn", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !command_exists(svn_command) => {
                return Err(SpiderError::BackendNotFound {
                    command: svn_command.to_string(),
                }
                .into());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to execute svn {}", full_args.join(" ")));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(target: "svn", "{}Command failed with exit code: {:?}", ctx, output.status.code());
            if !stderr.is_empty() {
                tracing::debug!(target: "svn", "{}Error: {}", ctx, stderr.trim());
            }
            return Err(SpiderError::BackendCommandError {
                operation,
                stderr: if stderr.trim().is_empty() {
                    stdout
                } else {
                    stderr
                },
            }
            .into());
        }

        if !stdout.is_empty() {
            tracing::trace!(target: "svn", "{}{}", ctx, stdout.trim());
        }
        if !stderr.is_empty() {
            tracing::debug!(target: "svn", "{}{}", ctx, stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "svn::perf", "{}svn {} took {:.2}s", ctx, operation, elapsed.as_secs_f64());
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "svn::perf", "{}svn {} took {}ms", ctx, operation, elapsed.as_millis());
        }

        Ok(SvnCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Execute the command and return only stdout as a trimmed string.
    pub fn execute_stdout(self) -> Result<String> {
        let output = self.execute()?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command and check for success.
    pub fn execute_success(self) -> Result<()> {
        self.execute()?;
        Ok(())
    }
}

// Convenience builders for the operations spider needs

fn depth(shallow: bool) -> &'static str {
    if shallow {
        "empty"
    } else {
        "infinity"
    }
}

impl SvnCommand {
    /// `svn checkout --depth <empty|infinity> <url> <path>`
    pub fn checkout(url: &str, path: impl AsRef<Path>, shallow: bool) -> Self {
        Self::new()
            .args(["checkout", "--depth", depth(shallow)])
            .arg(url)
            .arg(path.as_ref().display().to_string())
    }

    /// `svn update --set-depth empty <path>` when shallow, plain `svn update <path>` otherwise.
    ///
    /// A plain update fetches a file, or a directory at the depth already recorded in the
    /// working copy.
    pub fn update(path: impl AsRef<Path>, shallow: bool) -> Self {
        let cmd = Self::new().arg("update");
        let cmd = if shallow {
            cmd.args(["--set-depth", "empty"])
        } else {
            cmd
        };
        cmd.arg(path.as_ref().display().to_string())
    }

    /// `svn update --depth empty <path>`: refresh a directory that is already in the working
    /// copy without changing its recorded depth, so materialized children are kept.
    pub fn refresh_dir(path: impl AsRef<Path>) -> Self {
        Self::new().args(["update", "--depth", "empty"]).arg(path.as_ref().display().to_string())
    }

    /// `svn info --show-item url <path>`, with a fixed locale so the output is parseable.
    pub fn info_url(path: impl AsRef<Path>) -> Self {
        Self::new()
            .args(["info", "--show-item", "url"])
            .arg(path.as_ref().display().to_string())
            .env("LC_ALL", "C")
    }
}
