//! spider - sparse-checkout dependency resolver
//!
//! Large asset repositories (films, games, design libraries) are too big to check out
//! whole. spider answers one question: given a requested asset, which files must be
//! present for it to open, and in what order should they be fetched? It then
//! materializes exactly that closure into a sparse Subversion working copy.
//!
//! # Architecture Overview
//!
//! - A **manifest** (`spider.manifest.toml` at the project root) records every asset
//!   seen so far as a node, every "requires" relation as an edge, and whether each asset
//!   has been discovered and checked out. It is the cache consulted before any file is
//!   fetched or parsed.
//! - **Extractors**, selected by file kind, read an asset and return the files it
//!   references.
//! - The **crawler** runs extractors and grows the manifest, either on demand for one
//!   asset or eagerly over everything on disk.
//! - The **resolver** discovers the closure of a target to a fixed point, orders it
//!   dependencies-first and hands it to the **checkout controller**, which drives a
//!   version-control backend at empty depth so nothing outside the closure is
//!   downloaded.
//!
//! # Core Modules
//!
//! - [`manifest`] - Manifest model and its TOML persistence
//! - [`extractor`] - Extractor trait, registry and the built-in extractors
//! - [`crawler`] - On-demand and eager dependency discovery
//! - [`resolver`] - Resolution orchestration and the [`resolver::DependencyGraph`]
//! - [`checkout`] - Sparse materialization of resolved assets
//! - [`vcs`] - Version-control backend trait and the `svn` implementation
//!
//! ## Supporting Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - Project configuration (`spider.toml`)
//! - [`constants`] - File names, defaults and timeouts
//! - [`core`] - Asset types and error handling
//! - [`utils`] - Path canonicalisation, atomic writes, locking and progress bars
//!
//! # Manifest Format
//!
//! ```toml
//! # Auto-generated by spider - records discovered asset dependencies.
//! version = 1
//!
//! [project]
//! root = "/work/film"
//! backend_url = "svn://assets.example.com/film/trunk"
//! ignore = [".svn", ".git", ".spider"]
//!
//! [[nodes]]
//! path = "rig/arm.blend"
//! kind = "scene"
//! checked_out = true
//! discovered = true
//!
//! [[nodes]]
//! path = "tex/wood.png"
//! kind = "texture"
//! checked_out = true
//! discovered = true
//!
//! [[edges]]
//! from = "rig/arm.blend"
//! to = "tex/wood.png"
//! ```
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use spider_cli::resolver::Resolver;
//! use spider_cli::vcs::SvnBackend;
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut resolver = Resolver::new("/work/film", SvnBackend::new())
//!     .with_backend_url("svn://assets.example.com/film/trunk");
//! let result = resolver.resolve("shots/010/scene.blend")?;
//! match &result.error {
//!     Some(cycle) => eprintln!("cannot resolve: {cycle}"),
//!     None => println!("fetched {} assets", result.materialized.len()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The resolver is synchronous. Applications with an event loop should run it on a
//! blocking thread, as the bundled CLI does with `tokio::task::spawn_blocking`.

// Core functionality modules
pub mod checkout;
pub mod crawler;
pub mod extractor;
pub mod manifest;
pub mod resolver;
pub mod vcs;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
