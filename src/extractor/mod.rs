//! Pluggable dependency extraction.
//!
//! Every asset has a *file kind* (`scene`, `texture`, ...) chosen from its extension. The
//! [`ExtractorRegistry`] maps each kind to an [`Extractor`] that reads a file and returns
//! the paths it references. Kinds without a registered extractor are leaves.
//!
//! # Built-in extractors
//!
//! | Kind      | Extractor                  | Extensions |
//! |-----------|----------------------------|------------|
//! | `scene`   | [`blend::BlendExtractor`]  | `blend` |
//! | `texture` | [`LeafExtractor`]          | `png`, `jpg`, `jpeg`, `tga`, `tif`, `tiff`, `exr`, `hdr`, `bmp`, `webp` |
//!
//! Additional extension mappings come from `[project.kinds]` in `spider.toml`, and
//! callers can register their own extractors, closures included:
//!
//! ```rust
//! use spider_cli::extractor::{ExtractionError, ExtractorRegistry};
//! use std::collections::BTreeSet;
//! use std::path::{Path, PathBuf};
//!
//! let mut registry = ExtractorRegistry::with_defaults();
//! registry.map_extension("list", "listing");
//! registry.register("listing", |file: &Path| -> Result<BTreeSet<PathBuf>, ExtractionError> {
//!     let content = std::fs::read_to_string(file)?;
//!     Ok(content.lines().filter(|l| !l.is_empty()).map(PathBuf::from).collect())
//! });
//! assert_eq!(registry.kind_for(Path::new("shots/a.list")), "listing");
//! ```

pub mod blend;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ProjectConfig;
use crate::constants::{DEFAULT_KIND_EXTENSIONS, KIND_SCENE, KIND_TEXTURE, KIND_UNKNOWN};

pub use blend::BlendExtractor;

/// Why an extractor could not produce a dependency list.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The file could not be read.
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not have the structure its kind promises.
    #[error("malformed file: {0}")]
    Malformed(String),

    /// The file is valid but stored in a variant this extractor cannot read.
    #[error("unsupported file: {0}")]
    Unsupported(String),
}

/// Reads one file and returns the paths it references.
///
/// Returned paths are either absolute or relative to the directory of `file`. They do not
/// need to exist and may point outside the project; the crawler filters them.
pub trait Extractor: Send + Sync {
    /// Extract the set of referenced paths from `file`.
    fn extract_dependencies(&self, file: &Path) -> Result<BTreeSet<PathBuf>, ExtractionError>;

    /// Whether the file must be present locally before extraction. Leaf extractors
    /// answer `false` so discovery does not download files it never reads.
    fn reads_content(&self) -> bool {
        true
    }
}

impl<F> Extractor for F
where
    F: Fn(&Path) -> Result<BTreeSet<PathBuf>, ExtractionError> + Send + Sync,
{
    fn extract_dependencies(&self, file: &Path) -> Result<BTreeSet<PathBuf>, ExtractionError> {
        self(file)
    }
}

/// Extractor for file kinds that never reference other files.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeafExtractor;

impl Extractor for LeafExtractor {
    fn extract_dependencies(&self, _file: &Path) -> Result<BTreeSet<PathBuf>, ExtractionError> {
        Ok(BTreeSet::new())
    }

    fn reads_content(&self) -> bool {
        false
    }
}

/// Kind and extension lookup tables plus the extractor for each kind.
pub struct ExtractorRegistry {
    extractors: BTreeMap<String, Box<dyn Extractor>>,
    extensions: BTreeMap<String, String>,
}

impl ExtractorRegistry {
    /// A registry with no extractors and no extension mappings.
    pub fn new() -> Self {
        Self {
            extractors: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// The built-in extractors and extension mappings.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for &(extension, kind) in DEFAULT_KIND_EXTENSIONS {
            registry.map_extension(extension, kind);
        }
        registry.register(KIND_SCENE, BlendExtractor);
        registry.register(KIND_TEXTURE, LeafExtractor);
        registry
    }

    /// The built-in registry with `[project.kinds]` overrides applied.
    pub fn from_config(config: &ProjectConfig) -> Self {
        let mut registry = Self::with_defaults();
        for (extension, kind) in &config.kinds {
            registry.map_extension(extension, kind);
        }
        registry
    }

    /// Register `extractor` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, extractor: impl Extractor + 'static) {
        self.extractors.insert(kind.into(), Box::new(extractor));
    }

    /// Map a file extension (with or without the leading dot) to a kind.
    pub fn map_extension(&mut self, extension: &str, kind: impl Into<String>) {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extensions.insert(extension, kind.into());
    }

    /// The kind for `path`, from its extension. `unknown` when nothing matches.
    pub fn kind_for(&self, path: &Path) -> String {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.extensions.get(&ext.to_ascii_lowercase()))
            .cloned()
            .unwrap_or_else(|| KIND_UNKNOWN.to_string())
    }

    /// The extractor for `kind`, if one is registered.
    pub fn extractor_for(&self, kind: &str) -> Option<&dyn Extractor> {
        self.extractors.get(kind).map(|extractor| &**extractor)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("kinds", &self.extractors.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions)
            .finish()
    }
}
