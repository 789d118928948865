//! Resolution of a target asset into a materialized dependency closure.
//!
//! The [`Resolver`] ties the other components together. One call to
//! [`Resolver::resolve`] walks through these states:
//!
//! 1. **ManifestLoaded**: the manifest for the project root is loaded (or started fresh)
//! 2. **NodeEnsured**: the target is recorded as a node
//! 3. **Discovered**: every asset reachable from the target has had its dependencies
//!    extracted, fetching files on demand. Discovery repeats until no reachable node is
//!    left undiscovered
//! 4. **ClosureComputed**: the target plus everything it transitively requires
//! 5. **Ordered**: the closure in dependency-first order. A cycle ends the request here:
//!    nothing is fetched and the cycle is returned in [`ResolutionResult::error`]
//! 6. **Materialized**: every asset in the order is fetched through the
//!    [`SparseCheckoutController`]
//! 7. **Saved**: the manifest is written back
//!
//! The manifest is saved on every exit path after it was loaded, so discovery work is never
//! lost. When the backend fails mid-way the manifest records exactly the assets that were
//! confirmed materialized before the failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use spider_cli::resolver::Resolver;
//! use spider_cli::vcs::SvnBackend;
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut resolver = Resolver::new("/proj", SvnBackend::new());
//! let result = resolver.resolve("scene.blend")?;
//! for path in &result.ordered_nodes {
//!     println!("{path}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod dependency_graph;

use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::checkout::SparseCheckoutController;
use crate::core::{DependencyCycle, SpiderError};
use crate::crawler::{ExtractionFailure, FileFetcher, ProjectCrawler};
use crate::extractor::ExtractorRegistry;
use crate::manifest::Manifest;
use crate::utils::paths::{absolute_root, normalize_relative, to_relative};
use crate::utils::progress::ProgressBar;
use crate::vcs::VcsBackend;

pub use dependency_graph::DependencyGraph;

/// Outcome of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// The target, as a canonical project-relative path.
    pub target: String,
    /// The closure of the target in dependency-first order. Empty when a cycle was found.
    pub ordered_nodes: Vec<String>,
    /// Assets fetched by this resolution, in order.
    pub materialized: Vec<String>,
    /// The cycle that stopped this resolution, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DependencyCycle>,
    /// Assets in the closure whose dependencies could not be extracted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extraction_failures: Vec<ExtractionFailure>,
}

impl ResolutionResult {
    /// Whether the closure was ordered and materialized.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Orchestrates discovery, ordering and materialization for one project.
pub struct Resolver<B> {
    root: PathBuf,
    registry: Option<ExtractorRegistry>,
    checkout: SparseCheckoutController<B>,
    progress: Option<ProgressBar>,
}

impl<B: VcsBackend> Resolver<B> {
    /// Create a resolver for the project at `root`. A relative `root` is taken relative to
    /// the current directory.
    ///
    /// Extractors come from the project configuration unless
    /// [`with_registry`](Self::with_registry) is used.
    pub fn new(root: impl Into<PathBuf>, backend: B) -> Self {
        let root = root.into();
        // A root that cannot be made absolute is rejected by `Manifest::load` in `resolve`
        let root = absolute_root(&root).unwrap_or(root);
        Self {
            checkout: SparseCheckoutController::new(backend, root.clone(), None),
            root,
            registry: None,
            progress: None,
        }
    }

    /// Use `url` when the working copy has to be created, overriding the configured one.
    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.checkout.set_default_url(Some(url.into()));
        self
    }

    /// Use a custom extractor registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Report materialization progress on `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The checkout controller, for inspecting the backend.
    pub fn checkout(&self) -> &SparseCheckoutController<B> {
        &self.checkout
    }

    /// Resolve `target` and materialize its dependency closure.
    ///
    /// `target` is a project-relative path, or an absolute path under the project root.
    ///
    /// # Errors
    ///
    /// - [`SpiderError::InvalidPath`] / [`SpiderError::PathOutsideProject`] for a bad target
    /// - [`SpiderError::ManifestCorrupt`] when the stored manifest cannot be trusted
    /// - Backend failures, unchanged, after the manifest was saved
    ///
    /// A dependency cycle is not an error: it is returned in [`ResolutionResult::error`].
    pub fn resolve(&mut self, target: &str) -> Result<ResolutionResult> {
        let mut manifest = Manifest::load(&self.root)?;
        let target = self.canonical_target(target)?;
        info!(target = %target, "Resolving dependencies");

        self.checkout.set_default_url(manifest.project.backend_url.clone());

        let config_registry;
        let registry = match &self.registry {
            Some(registry) => registry,
            None => {
                config_registry = ExtractorRegistry::from_config(&manifest.project);
                &config_registry
            }
        };
        let crawler = ProjectCrawler::for_manifest(registry, &manifest)?;

        if let Some(pb) = &self.progress {
            pb.set_prefix("Discovering");
        }
        let discovered = discover_closure(
            &crawler,
            &mut manifest,
            &target,
            &mut self.checkout,
            self.progress.as_ref(),
        );
        let failures = match discovered {
            Ok(failures) => failures,
            Err(e) => {
                save_after_failure(&manifest);
                return Err(e);
            }
        };

        let graph = DependencyGraph::from_manifest(&manifest);
        let closure = graph.transitive_closure(&target);
        debug!(target = %target, size = closure.len(), "Computed dependency closure");

        let ordered = match graph.topological_order(&closure) {
            Ok(ordered) => ordered,
            Err(SpiderError::CyclicDependency {
                cycle,
            }) => {
                warn!(target = %target, cycle = %cycle, "Dependency cycle, nothing materialized");
                if let Some(pb) = &self.progress {
                    pb.finish_and_clear();
                }
                manifest.save()?;
                return Ok(ResolutionResult {
                    target,
                    error: Some(cycle),
                    extraction_failures: failures,
                    ..ResolutionResult::default()
                });
            }
            Err(e) => {
                save_after_failure(&manifest);
                return Err(e.into());
            }
        };

        if let Some(pb) = &self.progress {
            pb.set_length(ordered.len() as u64);
            pb.set_prefix("Materializing");
        }

        let materialized = self.checkout.materialize_closure(
            &ordered,
            |path| {
                manifest.set_checked_out(path, true)?;
                Ok(())
            },
            self.progress.as_ref(),
        );
        let materialized = match materialized {
            Ok(materialized) => materialized,
            Err(e) => {
                save_after_failure(&manifest);
                return Err(e);
            }
        };

        if let Some(pb) = &self.progress {
            pb.finish_with_message(format!("Materialized {} assets", materialized.len()));
        }

        manifest.save()?;
        info!(target = %target, assets = materialized.len(), "Resolution complete");

        Ok(ResolutionResult {
            target,
            ordered_nodes: ordered,
            materialized,
            error: None,
            extraction_failures: failures,
        })
    }

    fn canonical_target(&self, target: &str) -> Result<String> {
        let target_path = Path::new(target);
        let relative = if target_path.is_absolute() {
            to_relative(target_path, &self.root)?
        } else {
            normalize_relative(target)?
        };

        if relative.is_empty() {
            return Err(SpiderError::InvalidPath {
                path: target.to_string(),
                reason: "the project root is not an asset".to_string(),
            }
            .into());
        }
        Ok(relative)
    }
}

/// Discover `target` and everything reachable from it until no reachable node is left
/// undiscovered. Returns the extraction failures met along the way.
fn discover_closure(
    crawler: &ProjectCrawler<'_>,
    manifest: &mut Manifest,
    target: &str,
    fetcher: &mut dyn FileFetcher,
    progress: Option<&ProgressBar>,
) -> Result<Vec<ExtractionFailure>> {
    let mut failures = Vec::new();
    let mut visited: HashSet<String> = HashSet::from([target.to_string()]);
    let mut stack = vec![target.to_string()];

    while let Some(path) = stack.pop() {
        if let Some(pb) = progress {
            pb.set_message(path.clone());
        }
        let discovery = crawler.ensure_discovered(manifest, &path, fetcher)?;
        failures.extend(discovery.failure);
        for dep in discovery.dependencies.into_iter().rev() {
            if visited.insert(dep.clone()) {
                stack.push(dep);
            }
        }
    }

    debug!(target = %target, nodes = visited.len(), "Discovery reached a fixed point");
    Ok(failures)
}

fn save_after_failure(manifest: &Manifest) {
    if let Err(e) = manifest.save() {
        warn!("Failed to save manifest after an error: {:#}", e);
    }
}
