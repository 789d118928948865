//! Dependency extraction for `.blend` files.
//!
//! A `.blend` file is a `BLENDER` header, a stream of data blocks and an SDNA block that
//! describes the struct layout of every block. The [`blend`] crate decodes that structure;
//! this module reads the file path of every ID block that points at an external file
//! (linked libraries, images, sounds, movie clips, fonts, caches and volumes).
//!
//! Only paths carrying Blender's `//` prefix are returned. They are relative to the blend
//! file. Absolute paths cannot be part of a versioned project, packed files are stored
//! inside the blend itself, and strings outside ID blocks (render output paths, for
//! example) are never read.
//!
//! Compressed blend files (gzip or zstd) and the large-header layout written by
//! Blender 5.0 are reported as unsupported.

use blend::Blend;
use std::collections::BTreeSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::trace;

use super::{ExtractionError, Extractor};

const BLEND_MAGIC: &[u8] = b"BLENDER";
const LARGE_HEADER_MAGIC: &[u8] = b"BLENDER17";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Codes of the ID blocks that reference an external file.
const FILE_BLOCK_CODES: &[[u8; 2]] = &[*b"LI", *b"IM", *b"SO", *b"MC", *b"VF", *b"CF", *b"VO"];

/// Blender's prefix for paths relative to the blend file.
const RELATIVE_PREFIX: &str = "//";

/// Extractor for the `scene` kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlendExtractor;

impl Extractor for BlendExtractor {
    fn extract_dependencies(&self, file: &Path) -> Result<BTreeSet<PathBuf>, ExtractionError> {
        let data = fs::read(file)?;
        check_format(&data)?;

        // The block decoder panics on some malformed layouts instead of returning an error
        let references = panic::catch_unwind(AssertUnwindSafe(|| read_references(&data)))
            .map_err(|_| {
                ExtractionError::Malformed("blend data blocks could not be decoded".to_string())
            })??;

        trace!(file = %file.display(), count = references.len(), "Read blend file references");
        Ok(references)
    }
}

/// Rejects data the block decoder cannot read.
fn check_format(data: &[u8]) -> Result<(), ExtractionError> {
    if data.starts_with(GZIP_MAGIC) {
        return Err(ExtractionError::Unsupported("gzip-compressed blend file".to_string()));
    }
    if data.starts_with(ZSTD_MAGIC) {
        return Err(ExtractionError::Unsupported("zstd-compressed blend file".to_string()));
    }
    if !data.starts_with(BLEND_MAGIC) {
        return Err(ExtractionError::Malformed("missing BLENDER header".to_string()));
    }
    if data.starts_with(LARGE_HEADER_MAGIC) {
        return Err(ExtractionError::Unsupported(
            "large-header blend file (Blender 5.0 or newer)".to_string(),
        ));
    }
    Ok(())
}

fn read_references(data: &[u8]) -> Result<BTreeSet<PathBuf>, ExtractionError> {
    let blend = Blend::new(data).map_err(|e| ExtractionError::Malformed(format!("{e:?}")))?;
    let mut found = BTreeSet::new();

    for &code in FILE_BLOCK_CODES {
        for instance in blend.instances_with_code(code) {
            if instance.is_valid("packedfile") {
                continue;
            }
            // Files older than 2.93 keep the path as written in `name` and the absolute
            // path in `filepath`; newer ones only have `filepath`
            let path = if instance.is_valid("name") {
                instance.get_string("name")
            } else if instance.is_valid("filepath") {
                instance.get_string("filepath")
            } else {
                continue;
            };

            if let Some(reference) = as_reference(&path) {
                found.insert(reference);
            }
        }
    }

    Ok(found)
}

/// The file a `//`-prefixed path points at, relative to the blend file's directory.
fn as_reference(path: &str) -> Option<PathBuf> {
    let relative = path.strip_prefix(RELATIVE_PREFIX)?;
    let normalized = relative.replace('\\', "/");
    let trimmed = normalized.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return None;
    }
    Some(PathBuf::from(trimmed))
}
