//! Global constants used throughout the spider codebase.
//!
//! File names, default ignore rules, lock timing and the built-in file kinds live
//! here so that the manifest, crawler and CLI agree on them.

use std::time::Duration;

/// Name of the persisted manifest at the project root.
pub const MANIFEST_FILE_NAME: &str = "spider.manifest.toml";

/// Name of the project configuration file, searched from the project root upwards.
pub const CONFIG_FILE_NAME: &str = "spider.toml";

/// Directory holding spider's own working state (locks) inside the project.
pub const STATE_DIR_NAME: &str = ".spider";

/// Current on-disk manifest format version.
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Directory names never descended into by a project walk unless configured otherwise.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[".svn", ".git", STATE_DIR_NAME];

/// File kind for Blender scene and library files.
pub const KIND_SCENE: &str = "scene";

/// File kind for image textures.
pub const KIND_TEXTURE: &str = "texture";

/// File kind for anything without a known extractor, including assets whose extraction failed.
pub const KIND_UNKNOWN: &str = "unknown";

/// Built-in extension to file kind mapping. Project configuration may extend or override it.
pub const DEFAULT_KIND_EXTENSIONS: &[(&str, &str)] = &[
    ("blend", KIND_SCENE),
    ("png", KIND_TEXTURE),
    ("jpg", KIND_TEXTURE),
    ("jpeg", KIND_TEXTURE),
    ("tga", KIND_TEXTURE),
    ("tif", KIND_TEXTURE),
    ("tiff", KIND_TEXTURE),
    ("exr", KIND_TEXTURE),
    ("hdr", KIND_TEXTURE),
    ("bmp", KIND_TEXTURE),
    ("webp", KIND_TEXTURE),
];

/// Default timeout for acquiring the project lock (30 seconds).
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Maximum backoff delay while waiting for the project lock (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for the lock backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Environment variable that disables progress bars when set.
pub const NO_PROGRESS_ENV: &str = "SPIDER_NO_PROGRESS";

/// Name of the project lock held while a run reads and writes the manifest.
pub const MANIFEST_LOCK_NAME: &str = "manifest";
