//! Platform helpers for locating external tools.

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Name of the Subversion client executable for this platform.
#[must_use]
pub const fn get_svn_command() -> &'static str {
    if is_windows() {
        "svn.exe"
    } else {
        "svn"
    }
}

/// Checks whether `cmd` can be found in the system PATH.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}
