//! Utilities shared across spider
//!
//! # Modules
//!
//! - [`paths`] - absolute/project-relative path conversion (the path mapper)
//! - [`fs`] - atomic file writes
//! - [`platform`] - locating external tools
//! - [`progress`] - progress bars for materialization
//! - [`project_lock`] - exclusive per-project lock file
//!
//! # Example
//!
//! ```rust,no_run
//! use spider_cli::utils::{atomic_write, to_relative};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let rel = to_relative(Path::new("/proj/tex/wood.png"), Path::new("/proj"))?;
//! atomic_write(Path::new("/proj/notes.txt"), rel.as_bytes())?;
//! # Ok(())
//! # }
//! ```

pub mod fs;
pub mod paths;
pub mod platform;
pub mod progress;
pub mod project_lock;

pub use fs::{atomic_write, ensure_dir};
pub use paths::{
    absolute_root, ancestor_dirs, normalize_path, normalize_relative, to_absolute, to_relative,
};
pub use platform::{command_exists, get_svn_command, is_windows};
pub use progress::ProgressBar;
pub use project_lock::ProjectLock;
