//! Dependency discovery.
//!
//! The [`ProjectCrawler`] turns files into manifest nodes and edges. It works in two
//! modes that converge on the same manifest:
//!
//! - **On demand** ([`ProjectCrawler::ensure_discovered`]): discover a single asset,
//!   fetching it through a [`FileFetcher`] first when it is not in the working copy. The
//!   resolver uses this to discover exactly the closure of a target.
//! - **Eager** ([`ProjectCrawler::walk_project`]): walk every file already on disk,
//!   skipping ignored directories.
//!
//! Extraction failures never abort a crawl. The asset is recorded as `unknown`, marked
//! discovered with no dependencies, and the failure is reported back to the caller.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::constants::{CONFIG_FILE_NAME, KIND_UNKNOWN, MANIFEST_FILE_NAME};
use crate::core::{AssetNode, DependencyEdge, SpiderError};
use crate::extractor::ExtractorRegistry;
use crate::manifest::Manifest;
use crate::utils::paths::{absolute_root, normalize_relative, to_absolute, to_relative};

/// Capability to bring one project-relative file into the working copy.
pub trait FileFetcher {
    /// Make `relative_path` present on disk.
    fn fetch(&mut self, relative_path: &str) -> Result<()>;
}

/// Fetcher for files that are already on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFiles;

impl FileFetcher for LocalFiles {
    fn fetch(&mut self, _relative_path: &str) -> Result<()> {
        Ok(())
    }
}

/// An asset whose dependencies could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionFailure {
    /// Project-relative path of the asset
    pub path: String,
    /// Kind the extractor was selected for
    pub kind: String,
    /// Why extraction failed
    pub reason: String,
}

impl From<ExtractionFailure> for SpiderError {
    fn from(failure: ExtractionFailure) -> Self {
        Self::ExtractionFailed {
            path: failure.path,
            kind: failure.kind,
            reason: failure.reason,
        }
    }
}

/// A reference that was not turned into an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReference {
    /// The asset holding the reference
    pub from: String,
    /// The reference as the extractor returned it
    pub reference: String,
    /// Why it was skipped
    pub reason: String,
}

/// Outcome of discovering a single asset.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Whether extraction ran during this call (`false` when the manifest already had it).
    pub newly_discovered: bool,
    /// Direct dependencies of the asset, ascending.
    pub dependencies: Vec<String>,
    /// Set when extraction failed and the asset was recorded as `unknown`.
    pub failure: Option<ExtractionFailure>,
    /// References dropped because they leave the project.
    pub skipped: Vec<SkippedReference>,
}

/// Summary of an eager walk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    /// Files seen on disk.
    pub files_visited: usize,
    /// Files whose dependencies were extracted during this walk.
    pub newly_discovered: usize,
    /// Assets recorded as `unknown` because extraction failed.
    pub failures: Vec<ExtractionFailure>,
    /// References dropped because they leave the project.
    pub skipped_references: Vec<SkippedReference>,
}

/// Populates a manifest with nodes and edges by running extractors.
#[derive(Debug)]
pub struct ProjectCrawler<'a> {
    registry: &'a ExtractorRegistry,
    root: PathBuf,
    ignore: Vec<glob::Pattern>,
}

impl<'a> ProjectCrawler<'a> {
    /// Create a crawler for `root`.
    ///
    /// `ignore` holds exact names or glob patterns matched against each file and
    /// directory name.
    ///
    /// A relative `root` is taken relative to the current directory.
    ///
    /// # Errors
    ///
    /// [`SpiderError::ConfigError`] for an invalid glob pattern, [`SpiderError::InvalidPath`]
    /// for a root that cannot be made absolute.
    pub fn new(
        registry: &'a ExtractorRegistry,
        root: impl Into<PathBuf>,
        ignore: &[String],
    ) -> Result<Self> {
        let ignore = ignore
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| SpiderError::ConfigError {
                    message: format!("invalid ignore pattern '{p}': {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            registry,
            root: absolute_root(&root.into())?,
            ignore,
        })
    }

    /// Create a crawler using the root and ignore list recorded in `manifest`.
    pub fn for_manifest(registry: &'a ExtractorRegistry, manifest: &Manifest) -> Result<Self> {
        Self::new(registry, manifest.project_root(), &manifest.project.ignore)
    }

    /// Whether a file or directory name matches an ignore pattern.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|pattern| pattern.matches(name))
    }

    /// Discover the dependencies of `relative_path`, recording the results in `manifest`.
    ///
    /// Adds the node when it is not recorded yet. Does nothing for nodes already
    /// discovered. Otherwise the file is fetched through `fetcher` when its extractor
    /// needs the content and it is not checked out, its references are resolved against
    /// the file's directory, and the resulting nodes and edges are added.
    ///
    /// # Errors
    ///
    /// Invalid paths and fetch failures. Extraction failures are reported in the returned
    /// [`Discovery`] instead.
    pub fn ensure_discovered(
        &self,
        manifest: &mut Manifest,
        relative_path: &str,
        fetcher: &mut dyn FileFetcher,
    ) -> Result<Discovery> {
        let relative = normalize_relative(relative_path)?;
        if relative.is_empty() {
            return Err(SpiderError::InvalidPath {
                path: relative_path.to_string(),
                reason: "the project root is not an asset".to_string(),
            }
            .into());
        }

        self.ensure_node(manifest, &relative);
        let Some(node) = manifest.get_node(&relative).cloned() else {
            return Err(SpiderError::UnknownNode {
                path: relative,
            }
            .into());
        };

        if node.discovered {
            return Ok(Discovery {
                dependencies: manifest.dependencies_of(&relative).map(str::to_string).collect(),
                ..Discovery::default()
            });
        }

        let mut discovery = Discovery {
            newly_discovered: true,
            ..Discovery::default()
        };

        let Some(extractor) = self.registry.extractor_for(&node.file_kind) else {
            debug!(path = %relative, kind = %node.file_kind, "No extractor, recording leaf");
            manifest.mark_discovered(&relative)?;
            return Ok(discovery);
        };

        let absolute = to_absolute(&relative, &self.root)?;
        if extractor.reads_content() && (!node.checked_out || !absolute.exists()) {
            debug!(path = %relative, "Fetching asset for discovery");
            fetcher.fetch(&relative)?;
            manifest.set_checked_out(&relative, true)?;
        }

        match extractor.extract_dependencies(&absolute) {
            Ok(references) => {
                let base = absolute.parent().unwrap_or(self.root.as_path()).to_path_buf();
                for reference in references {
                    match self.resolve_reference(&base, &reference) {
                        Ok(dep) if dep == relative => {
                            debug!(path = %relative, "Dropping self reference");
                        }
                        Ok(dep) => {
                            self.ensure_node(manifest, &dep);
                            manifest.add_edge(DependencyEdge::new(relative.clone(), dep))?;
                        }
                        Err(reason) => {
                            warn!(
                                from = %relative,
                                reference = %reference.display(),
                                "Skipping reference: {}",
                                reason
                            );
                            discovery.skipped.push(SkippedReference {
                                from: relative.clone(),
                                reference: reference.display().to_string(),
                                reason,
                            });
                        }
                    }
                }
            }
            Err(e) => {
                let failure = ExtractionFailure {
                    path: relative.clone(),
                    kind: node.file_kind.clone(),
                    reason: e.to_string(),
                };
                warn!("{}, recording as unknown", SpiderError::from(failure.clone()));
                manifest.set_file_kind(&relative, KIND_UNKNOWN)?;
                discovery.failure = Some(failure);
            }
        }

        manifest.mark_discovered(&relative)?;
        discovery.dependencies = manifest.dependencies_of(&relative).map(str::to_string).collect();
        debug!(path = %relative, dependencies = discovery.dependencies.len(), "Discovered asset");
        Ok(discovery)
    }

    /// Walk every file under the root and discover it.
    ///
    /// Files found on disk are recorded as checked out. Ignored names are pruned, so an
    /// ignored directory is never descended into. The manifest and config files are not
    /// assets.
    pub fn walk_project(&self, manifest: &mut Manifest) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_name().to_str().is_some_and(|name| self.is_ignored(name))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.depth() == 1
                && matches!(
                    entry.file_name().to_str(),
                    Some(MANIFEST_FILE_NAME) | Some(CONFIG_FILE_NAME)
                )
            {
                continue;
            }

            let relative = match to_relative(entry.path(), &self.root) {
                Ok(relative) => relative,
                Err(e) => {
                    warn!(path = %entry.path().display(), "Skipping file: {}", e);
                    continue;
                }
            };

            report.files_visited += 1;
            self.ensure_node(manifest, &relative);
            manifest.set_checked_out(&relative, true)?;

            let discovery = self.ensure_discovered(manifest, &relative, &mut LocalFiles)?;
            if discovery.newly_discovered {
                report.newly_discovered += 1;
            }
            report.failures.extend(discovery.failure);
            report.skipped_references.extend(discovery.skipped);
        }

        info!(
            files = report.files_visited,
            discovered = report.newly_discovered,
            failures = report.failures.len(),
            "Project walk complete"
        );
        Ok(report)
    }

    fn ensure_node(&self, manifest: &mut Manifest, relative: &str) {
        if !manifest.contains_node(relative) {
            let kind = self.registry.kind_for(Path::new(relative));
            manifest.add_node(AssetNode::new(relative, kind));
        }
    }

    /// Map an extractor result to a project-relative path, or explain why it is skipped.
    fn resolve_reference(&self, base: &Path, reference: &Path) -> Result<String, String> {
        let absolute = if reference.is_absolute() {
            reference.to_path_buf()
        } else {
            base.join(reference)
        };

        match to_relative(&absolute, &self.root) {
            Ok(dep) if dep.is_empty() => Err("reference points at the project root".to_string()),
            Ok(dep) => Ok(dep),
            Err(SpiderError::PathOutsideProject { .. }) => {
                Err("reference points outside the project".to_string())
            }
            Err(e) => Err(e.to_string()),
        }
    }
}
