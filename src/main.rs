//! spider CLI entry point
//!
//! Parses the command line, runs the selected command and turns errors into
//! user-facing messages with suggestions.
//!
//! Commands:
//! - `resolve` - Fetch an asset and its dependency closure
//! - `crawl` - Discover dependencies of every file on disk
//! - `tree` - Show the recorded dependency tree of an asset
//! - `validate` - Check the manifest for cycles

use anyhow::Result;
use clap::Parser;
use spider_cli::cli;
use spider_cli::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
