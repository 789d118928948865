//! Project-level file locking for cross-process coordination.
//!
//! The manifest assumes a single writer. Entry points that load, mutate and save it hold
//! a [`ProjectLock`] for the whole run so two spider processes against the same project
//! root are serialized. The lock is released when the value is dropped.
//!
//! The lock file itself stays on disk. Every acquirer locks the same inode, so a waiter
//! that opened the file before the previous holder released it still excludes later
//! callers.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

use crate::constants::{
    MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, STATE_DIR_NAME, default_lock_timeout,
};
use crate::core::SpiderError;

/// An exclusive lock on a project, stored at `{project}/.spider/locks/{name}.lock`.
///
/// ```rust,no_run
/// use spider_cli::utils::project_lock::ProjectLock;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let _lock = ProjectLock::acquire(Path::new("/proj"), "manifest")?;
/// // load, resolve, save ...
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ProjectLock {
    /// The file handle - lock is released when this is dropped
    _file: File,
    lock_name: String,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        debug!(lock_name = %self.lock_name, "Project lock released");
    }
}

impl ProjectLock {
    /// Acquires the named lock, waiting up to the default timeout.
    pub fn acquire(project_dir: &Path, lock_name: &str) -> Result<Self> {
        Self::acquire_with_timeout(project_dir, lock_name, default_lock_timeout())
    }

    /// Acquires the named lock, retrying with exponential backoff until `timeout`.
    ///
    /// # Errors
    ///
    /// [`SpiderError::LockTimeout`] if another process keeps the lock for longer than
    /// `timeout`; IO errors creating the lock directory or file.
    pub fn acquire_with_timeout(
        project_dir: &Path,
        lock_name: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let display_name = format!("project:{lock_name}");
        debug!(lock_name = %display_name, "Waiting for project lock");

        let locks_dir = project_dir.join(STATE_DIR_NAME).join("locks");
        std::fs::create_dir_all(&locks_dir).with_context(|| {
            format!("Failed to create project locks directory: {}", locks_dir.display())
        })?;

        let lock_path = locks_dir.join(format!("{lock_name}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        let start = Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            match file.try_lock_exclusive() {
                Ok(true) => {
                    debug!(
                        lock_name = %display_name,
                        wait_ms = start.elapsed().as_millis(),
                        "Project lock acquired"
                    );
                    return Ok(Self {
                        _file: file,
                        lock_name: display_name,
                    });
                }
                Ok(false) | Err(_) => {
                    let remaining = timeout.saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        break;
                    }
                    std::thread::sleep(delay.min(remaining));
                }
            }
        }

        Err(SpiderError::LockTimeout {
            path: lock_path.display().to_string(),
            seconds: timeout.as_secs(),
        }
        .into())
    }
}
