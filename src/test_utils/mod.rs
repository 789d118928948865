//! Test utilities for spider
//!
//! This module provides helpers for writing tests against spider without a real
//! Subversion server:
//! - [`MemoryBackend`]: an in-memory [`VcsBackend`](crate::vcs::VcsBackend) that records
//!   every call and writes "remote" files into the working copy on update
//! - [`ProjectFixture`]: a temporary project root plus the remote content it resolves from
//! - [`BlendFileBuilder`]: minimal `.blend` files with linked libraries and images
//! - [`init_test_logging`]: once-guarded tracing setup for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use spider_cli::resolver::Resolver;
//! use spider_cli::test_utils::ProjectFixture;
//!
//! # fn example() -> anyhow::Result<()> {
//! let fixture = ProjectFixture::new()?
//!     .remote_blend("scene.blend", &["//tex/wood.png"])
//!     .remote_file("tex/wood.png", b"png");
//!
//! let mut resolver = Resolver::new(fixture.root(), fixture.backend());
//! let result = resolver.resolve("scene.blend")?;
//! assert_eq!(result.ordered_nodes, vec!["tex/wood.png", "scene.blend"]);
//! # Ok(())
//! # }
//! ```

pub mod blend_writer;
pub mod fixtures;
pub mod memory_backend;

pub use blend_writer::{BlendFileBuilder, blend_file};
pub use fixtures::ProjectFixture;
pub use memory_backend::{BackendCall, MemoryBackend};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise `RUST_LOG`;
/// with neither, tests run without a subscriber.
///
/// ```rust,no_run
/// use tracing::Level;
///
/// spider_cli::test_utils::init_test_logging(Some(Level::DEBUG));
/// ```
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true) // Show module targets like "svn"
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
