//! Resolve an asset and materialize its dependency closure.
//!
//! Holds the project lock for the whole run, resolves through the system `svn` client
//! and prints the assets in the order they were fetched.
//!
//! # Examples
//!
//! ```bash
//! spider resolve shots/010/scene.blend
//! spider resolve scene.blend --backend-url svn://assets.example.com/film/trunk
//! spider resolve scene.blend --format json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{CliConfig, OutputFormat};
use crate::constants::MANIFEST_LOCK_NAME;
use crate::core::SpiderError;
use crate::resolver::{ResolutionResult, Resolver};
use crate::utils::progress::ProgressBar;
use crate::utils::project_lock::ProjectLock;
use crate::vcs::SvnBackend;

/// Fetch an asset and everything it transitively requires.
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Asset to resolve, relative to the project root
    target: String,

    /// Repository URL used when the working copy does not exist yet
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ResolveCommand {
    /// Run the resolution on the blocking pool and print the outcome.
    ///
    /// A dependency cycle is printed and then returned as an error so the process exits
    /// non-zero.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let project = config.project.clone();
        let target = self.target.clone();
        let backend_url = self.backend_url.clone();
        let show_progress = !config.no_progress && self.format == OutputFormat::Text;

        let result = tokio::task::spawn_blocking(move || -> Result<ResolutionResult> {
            let _lock = ProjectLock::acquire(&project, MANIFEST_LOCK_NAME)?;

            let backend = SvnBackend::new().with_context(target.clone());
            let mut resolver = Resolver::new(&project, backend);
            if let Some(url) = backend_url {
                resolver = resolver.with_backend_url(url);
            }
            if show_progress {
                resolver = resolver.with_progress(ProgressBar::new(0));
            }
            resolver.resolve(&target)
        })
        .await
        .context("Resolution task failed")??;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            OutputFormat::Text => print_text(&result),
        }

        match result.error {
            Some(cycle) => Err(SpiderError::CyclicDependency {
                cycle,
            }
            .into()),
            None => Ok(()),
        }
    }
}

fn print_text(result: &ResolutionResult) {
    for failure in &result.extraction_failures {
        println!(
            "{} {} ({}): {}",
            "⚠".yellow(),
            failure.path.yellow(),
            failure.kind,
            failure.reason
        );
    }

    if result.error.is_some() {
        println!("{} Nothing fetched for {}", "✗".red(), result.target.bold());
        return;
    }

    println!(
        "{} Resolved {} ({} assets)",
        "✓".green(),
        result.target.bold(),
        result.ordered_nodes.len()
    );
    for (i, path) in result.ordered_nodes.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, path);
    }
}
