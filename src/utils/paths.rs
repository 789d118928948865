//! Conversion between absolute paths and project-relative asset paths.
//!
//! Project-relative paths are the primary keys of the manifest, so they have exactly one
//! spelling: `/`-separated, no `.` or empty segments, no `..`, never absolute. Every path
//! entering the manifest goes through [`to_relative`] or [`normalize_relative`].
//!
//! All functions here are lexical. They never touch the filesystem and never resolve
//! symbolic links.
//!
//! # Round trip
//!
//! For every `p` under `root`:
//!
//! ```rust,no_run
//! use spider_cli::utils::paths::{normalize_path, to_absolute, to_relative};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), spider_cli::core::SpiderError> {
//! let root = Path::new("/proj");
//! let p = Path::new("/proj/./rig/../tex/wood.png");
//! let rel = to_relative(p, root)?;
//! assert_eq!(rel, "tex/wood.png");
//! assert_eq!(to_absolute(&rel, root)?, normalize_path(p));
//! # Ok(())
//! # }
//! ```

use std::path::{Component, Path, PathBuf};

use crate::core::SpiderError;

/// Normalizes a path by resolving `.` and `..` components.
///
/// Logical resolution only: `..` removes the previous component, `.` is dropped, and
/// the absolute or relative nature of the path is preserved.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Anchors a project root at the current directory when it is relative.
///
/// The result is lexically normalized like [`normalize_path`].
///
/// # Errors
///
/// [`SpiderError::InvalidPath`] for an empty root, or when the current directory cannot be
/// determined.
pub fn absolute_root(root: &Path) -> Result<PathBuf, SpiderError> {
    if root.is_absolute() {
        return Ok(normalize_path(root));
    }
    std::path::absolute(root).map(|path| normalize_path(&path)).map_err(|e| {
        SpiderError::InvalidPath {
            path: root.display().to_string(),
            reason: format!("cannot resolve project root: {e}"),
        }
    })
}

/// Converts an absolute path into a project-relative asset path.
///
/// # Errors
///
/// - [`SpiderError::InvalidPath`] if `absolute_path` is not absolute or is not valid UTF-8
/// - [`SpiderError::PathOutsideProject`] if the normalized path is not under the
///   normalized `project_root`
pub fn to_relative(absolute_path: &Path, project_root: &Path) -> Result<String, SpiderError> {
    if !absolute_path.is_absolute() {
        return Err(SpiderError::InvalidPath {
            path: absolute_path.display().to_string(),
            reason: "expected an absolute path".to_string(),
        });
    }

    let path = normalize_path(absolute_path);
    let root = normalize_path(project_root);

    let stripped = path.strip_prefix(&root).map_err(|_| SpiderError::PathOutsideProject {
        path: absolute_path.display().to_string(),
        root: project_root.display().to_string(),
    })?;

    let mut segments = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| SpiderError::InvalidPath {
                    path: absolute_path.display().to_string(),
                    reason: "path is not valid UTF-8".to_string(),
                })?;
                segments.push(segment);
            }
            // normalize_path leaves no other components below the root
            _ => {
                return Err(SpiderError::PathOutsideProject {
                    path: absolute_path.display().to_string(),
                    root: project_root.display().to_string(),
                });
            }
        }
    }

    Ok(segments.join("/"))
}

/// Converts a project-relative asset path into an absolute path under `project_root`.
///
/// # Errors
///
/// [`SpiderError::InvalidPath`] if the relative path contains `..` or is absolute.
pub fn to_absolute(relative_path: &str, project_root: &Path) -> Result<PathBuf, SpiderError> {
    let canonical = normalize_relative(relative_path)?;
    let mut absolute = normalize_path(project_root);
    for segment in canonical.split('/').filter(|s| !s.is_empty()) {
        absolute.push(segment);
    }
    Ok(absolute)
}

/// Brings a user-supplied relative path into its canonical manifest spelling.
///
/// Accepts both `/` and `\` separators and drops `.` and empty segments. The empty
/// string denotes the project root.
///
/// # Errors
///
/// [`SpiderError::InvalidPath`] for `..` segments, absolute paths and drive prefixes.
pub fn normalize_relative(relative_path: &str) -> Result<String, SpiderError> {
    let unified = relative_path.replace('\\', "/");

    let invalid = |reason: &str| SpiderError::InvalidPath {
        path: relative_path.to_string(),
        reason: reason.to_string(),
    };

    if unified.starts_with('/') {
        return Err(invalid("absolute paths are not project-relative"));
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(invalid("parent directory traversal ('..') is not allowed")),
            s if segments.is_empty() && is_drive_prefix(s) => {
                return Err(invalid("absolute paths are not project-relative"));
            }
            s => segments.push(s),
        }
    }

    Ok(segments.join("/"))
}

/// Project-relative directories that contain `relative_path`, outermost first.
///
/// The project root itself is represented by the empty string and always comes first.
#[must_use]
pub fn ancestor_dirs(relative_path: &str) -> Vec<String> {
    let mut dirs = vec![String::new()];
    let segments: Vec<&str> = relative_path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 {
        for end in 1..segments.len() {
            dirs.push(segments[..end].join("/"));
        }
    }
    dirs
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_resolves_dots() {
        assert_eq!(normalize_path(Path::new("/foo/./bar/../baz")), PathBuf::from("/foo/baz"));
        assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn test_to_relative_inside_root() {
        let rel = to_relative(Path::new("/proj/tex/wood.png"), Path::new("/proj")).unwrap();
        assert_eq!(rel, "tex/wood.png");
    }

    #[test]
    fn test_to_relative_with_redundant_segments() {
        let rel = to_relative(Path::new("/proj/rig/./../tex//wood.png"), Path::new("/proj/"))
            .unwrap();
        assert_eq!(rel, "tex/wood.png");
    }

    #[test]
    fn test_to_relative_outside_root() {
        let err = to_relative(Path::new("/other/scene.blend"), Path::new("/proj")).unwrap_err();
        assert!(matches!(err, SpiderError::PathOutsideProject { .. }));

        // Escaping through `..` is caught after normalization
        let err = to_relative(Path::new("/proj/../etc/passwd"), Path::new("/proj")).unwrap_err();
        assert!(matches!(err, SpiderError::PathOutsideProject { .. }));
    }

    #[test]
    fn test_to_relative_sibling_prefix_is_outside() {
        // "/project2" shares a string prefix with "/proj" but is not under it
        let err = to_relative(Path::new("/project2/a.blend"), Path::new("/proj")).unwrap_err();
        assert!(matches!(err, SpiderError::PathOutsideProject { .. }));
    }

    #[test]
    fn test_to_relative_rejects_relative_input() {
        let err = to_relative(Path::new("tex/wood.png"), Path::new("/proj")).unwrap_err();
        assert!(matches!(err, SpiderError::InvalidPath { .. }));
    }

    #[test]
    fn test_to_absolute_rejects_traversal() {
        let err = to_absolute("../secret.blend", Path::new("/proj")).unwrap_err();
        assert!(matches!(err, SpiderError::InvalidPath { .. }));

        let err = to_absolute("tex/../../x", Path::new("/proj")).unwrap_err();
        assert!(matches!(err, SpiderError::InvalidPath { .. }));
    }

    #[test]
    fn test_to_absolute_rejects_absolute_input() {
        assert!(to_absolute("/etc/passwd", Path::new("/proj")).is_err());
        assert!(to_absolute("C:/Windows", Path::new("/proj")).is_err());
    }

    #[test]
    fn test_normalize_relative_unifies_separators() {
        assert_eq!(normalize_relative("tex\\.\\wood.png").unwrap(), "tex/wood.png");
        assert_eq!(normalize_relative("./rig//arm.blend").unwrap(), "rig/arm.blend");
        assert_eq!(normalize_relative("").unwrap(), "");
    }

    #[test]
    fn test_round_trip() {
        let root = Path::new("/proj");
        let samples = [
            "/proj/scene.blend",
            "/proj/tex/wood.png",
            "/proj/./rig/../rig/arm.blend",
            "/proj/a/b/c/d/e.exr",
            "/proj",
        ];
        for sample in samples {
            let p = Path::new(sample);
            let rel = to_relative(p, root).unwrap();
            assert_eq!(to_absolute(&rel, root).unwrap(), normalize_path(p), "round trip of {sample}");
        }
    }

    #[test]
    fn test_absolute_root() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_root(Path::new("proj/./assets")).unwrap(), cwd.join("proj/assets"));
        assert_eq!(absolute_root(&cwd.join("a/../b")).unwrap(), cwd.join("b"));
        assert!(matches!(absolute_root(Path::new("")), Err(SpiderError::InvalidPath { .. })));
    }

    #[test]
    fn test_ancestor_dirs() {
        assert_eq!(ancestor_dirs("scene.blend"), vec![""]);
        assert_eq!(ancestor_dirs("a/b/c.png"), vec!["", "a", "a/b"]);
    }
}
