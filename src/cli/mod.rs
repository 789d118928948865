//! Command-line interface for spider.
//!
//! # Available Commands
//!
//! - `resolve` - Fetch an asset and everything it transitively requires
//! - `crawl` - Discover dependencies of every file already in the working copy
//! - `tree` - Display the dependency tree of an asset recorded in the manifest
//! - `validate` - Check the manifest for dependency cycles
//!
//! # Global Options
//!
//! - `-C, --project <DIR>` - Project root (defaults to the current directory)
//! - `-v, --verbose` - Debug logging
//! - `-q, --quiet` - Errors only
//! - `--no-progress` - Disable progress bars (also `SPIDER_NO_PROGRESS`)
//!
//! Logging goes to stderr so `--format json` output on stdout stays machine-readable.
//! `RUST_LOG` is honoured when neither `--verbose` nor `--quiet` is given.
//!
//! # Examples
//!
//! ```bash
//! spider resolve shots/010/scene.blend
//! spider -C /work/film crawl --ignore render_cache
//! spider tree shots/010/scene.blend
//! spider validate --format json
//! ```

mod crawl;
mod resolve;
mod tree;
mod validate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::core::SpiderError;
use crate::utils::paths::{normalize_relative, to_relative};

/// Settings shared by every command, built once from the global flags.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Absolute project root.
    pub project: PathBuf,

    /// Log filter directive; `None` defers to `RUST_LOG`.
    pub log_level: Option<String>,

    /// Disable progress bars.
    pub no_progress: bool,
}

impl CliConfig {
    /// Install the global tracing subscriber. A second call is a no-op.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Output format shared by the commands that print results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// Structured JSON for automation.
    Json,
}

/// Sparse-checkout dependency resolver for asset repositories.
#[derive(Parser)]
#[command(
    name = "spider",
    about = "Fetch an asset and exactly the files it depends on from a sparse working copy",
    version,
    long_about = "spider discovers the files an asset references (textures, linked libraries, ...), \
                  records them in a manifest, and materializes only that closure from a \
                  Subversion repository, dependencies first."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (defaults to the current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an asset and its full dependency closure
    Resolve(resolve::ResolveCommand),

    /// Discover dependencies of every file already on disk
    Crawl(crawl::CrawlCommand),

    /// Show the recorded dependency tree of an asset
    Tree(tree::TreeCommand),

    /// Check the manifest for dependency cycles
    Validate(validate::ValidateCommand),
}

impl Cli {
    /// Run the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config()?;
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Build the shared configuration from the global flags.
    pub fn build_config(&self) -> Result<CliConfig> {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        Ok(CliConfig {
            project: resolve_project_dir(self.project.as_deref())?,
            log_level,
            no_progress: self.no_progress,
        })
    }

    /// Run the selected command with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Resolve(cmd) => cmd.execute(&config).await,
            Commands::Crawl(cmd) => cmd.execute(&config).await,
            Commands::Tree(cmd) => cmd.execute(&config).await,
            Commands::Validate(cmd) => cmd.execute(&config).await,
        }
    }
}

fn resolve_project_dir(project: Option<&Path>) -> Result<PathBuf> {
    let dir = match project {
        Some(dir) => std::path::absolute(dir)
            .with_context(|| format!("Invalid project directory: {}", dir.display()))?,
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };

    if !dir.is_dir() {
        return Err(SpiderError::ConfigError {
            message: format!("project directory {} does not exist", dir.display()),
        }
        .into());
    }
    Ok(dir)
}

/// Canonical project-relative form of a target given on the command line.
fn canonical_target(project: &Path, target: &str) -> Result<String, SpiderError> {
    let path = Path::new(target);
    if path.is_absolute() {
        to_relative(path, project)
    } else {
        normalize_relative(target)
    }
}
