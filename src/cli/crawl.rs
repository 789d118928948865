//! Discover dependencies of every file already in the working copy.
//!
//! Walks the project root, pruning ignored directories, runs the extractor for each file
//! and saves the manifest. Patterns passed with `--ignore` are added to the project's
//! ignore list and recorded in the manifest.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{CliConfig, OutputFormat};
use crate::constants::MANIFEST_LOCK_NAME;
use crate::crawler::{CrawlReport, ProjectCrawler};
use crate::extractor::ExtractorRegistry;
use crate::manifest::Manifest;
use crate::utils::progress::ProgressBar;
use crate::utils::project_lock::ProjectLock;

/// Eagerly crawl the project.
#[derive(Args, Debug)]
pub struct CrawlCommand {
    /// Additional file or directory name pattern to skip (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct CrawlSummary {
    #[serde(flatten)]
    report: CrawlReport,
    nodes: usize,
    edges: usize,
}

impl CrawlCommand {
    /// Walk the project on the blocking pool and print a summary.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let project = config.project.clone();
        let ignore = self.ignore.clone();
        let spinner = if config.no_progress || self.format == OutputFormat::Json {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        spinner.set_prefix("Crawling");
        spinner.set_message(project.display().to_string());

        let summary = tokio::task::spawn_blocking(move || -> Result<CrawlSummary> {
            let _lock = ProjectLock::acquire(&project, MANIFEST_LOCK_NAME)?;

            let mut manifest = Manifest::load(&project)?;
            manifest.project.add_ignore_patterns(ignore);

            let registry = ExtractorRegistry::from_config(&manifest.project);
            let crawler = ProjectCrawler::for_manifest(&registry, &manifest)?;
            let report = crawler.walk_project(&mut manifest)?;
            manifest.save()?;

            Ok(CrawlSummary {
                report,
                nodes: manifest.node_count(),
                edges: manifest.edge_count(),
            })
        })
        .await
        .context("Crawl task failed");
        spinner.finish_and_clear();
        let summary = summary??;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Text => print_text(&summary),
        }
        Ok(())
    }
}

fn print_text(summary: &CrawlSummary) {
    let report = &summary.report;
    println!(
        "{} Crawled {} files, {} newly discovered",
        "✓".green(),
        report.files_visited,
        report.newly_discovered
    );
    println!("  Manifest: {} assets, {} dependencies", summary.nodes, summary.edges);

    if !report.skipped_references.is_empty() {
        println!("  {} references outside the project skipped", report.skipped_references.len());
    }

    if !report.failures.is_empty() {
        println!("\n{} Extraction failed for {} files:", "⚠".yellow(), report.failures.len());
        for failure in &report.failures {
            println!("  {} ({}): {}", failure.path.yellow(), failure.kind, failure.reason);
        }
    }
}
