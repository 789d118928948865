//! Validate the project manifest.
//!
//! Loading already rejects a corrupt manifest (bad paths, dangling edges, unsupported
//! format version). On top of that the whole dependency graph is checked for cycles,
//! since an asset on a cycle can never be resolved.
//!
//! Exits non-zero when the manifest is corrupt or contains a cycle.
//!
//! # Examples
//!
//! ```bash
//! spider validate
//! spider validate --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{CliConfig, OutputFormat};
use crate::core::{DependencyCycle, SpiderError};
use crate::manifest::Manifest;
use crate::resolver::DependencyGraph;

/// Check the manifest for dependency cycles.
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Validation results, as printed by `--format json`.
#[derive(Debug, Serialize)]
struct ValidationReport {
    valid: bool,
    nodes: usize,
    edges: usize,
    undiscovered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    cycle: Option<DependencyCycle>,
}

impl ValidateCommand {
    /// Load the manifest, check it and print the result.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let manifest = Manifest::load(&config.project)?;
        let report = validate(&manifest);

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_text(&report),
        }

        match report.cycle {
            Some(cycle) => Err(SpiderError::CyclicDependency {
                cycle,
            }
            .into()),
            None => Ok(()),
        }
    }
}

fn validate(manifest: &Manifest) -> ValidationReport {
    let graph = DependencyGraph::from_manifest(manifest);
    let cycle = graph.detect_cycle();

    ValidationReport {
        valid: cycle.is_none(),
        nodes: manifest.node_count(),
        edges: manifest.edge_count(),
        undiscovered: manifest.nodes().filter(|node| !node.discovered).count(),
        cycle,
    }
}

fn print_text(report: &ValidationReport) {
    if let Some(cycle) = &report.cycle {
        println!("{} Dependency cycle: {}", "✗".red(), cycle);
        return;
    }

    println!(
        "{} Manifest is valid ({} assets, {} dependencies)",
        "✓".green(),
        report.nodes,
        report.edges
    );
    if report.undiscovered > 0 {
        println!("  {} assets not discovered yet", report.undiscovered);
    }
}
