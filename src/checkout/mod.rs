//! Sparse materialization of resolved assets.
//!
//! The working copy starts as an empty-depth checkout of the project root. To materialize
//! `a/b/c.png` the controller brings each ancestor directory in at empty depth (`""`, `a`,
//! `a/b`) and then fetches `a/b/c.png` in full. Nothing else in the repository is
//! downloaded.
//!
//! The controller never assumes the working copy is fresh: every requested path is
//! updated through the backend, even when it already exists on disk. The one exception is
//! discovery: ancestor directories refreshed by [`FileFetcher::fetch`] are not refreshed
//! again by later fetches until the next [`SparseCheckoutController::materialize_closure`].

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::SpiderError;
use crate::crawler::FileFetcher;
use crate::utils::paths::{ancestor_dirs, to_absolute};
use crate::utils::progress::ProgressBar;
use crate::vcs::VcsBackend;

/// Drives a [`VcsBackend`] to materialize individual project paths.
#[derive(Debug)]
pub struct SparseCheckoutController<B> {
    backend: B,
    root: PathBuf,
    url: Option<String>,
    working_copy_known: bool,
    /// Ancestor directories refreshed by discovery fetches since the last materialization.
    fetched_dirs: HashSet<String>,
}

impl<B: VcsBackend> SparseCheckoutController<B> {
    /// Create a controller for the working copy at `root`.
    ///
    /// `url` is only needed when the working copy does not exist yet.
    pub fn new(backend: B, root: impl Into<PathBuf>, url: Option<String>) -> Self {
        Self {
            backend,
            root: root.into(),
            url,
            working_copy_known: false,
            fetched_dirs: HashSet::new(),
        }
    }

    /// Use `url` for a fresh checkout unless a URL was given at construction.
    pub fn set_default_url(&mut self, url: Option<String>) {
        if self.url.is_none() {
            self.url = url;
        }
    }

    /// The backend, for inspection.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Project root of the working copy.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make every ancestor directory of `relative_path` present at empty depth.
    ///
    /// The project root is checked out at empty depth when no working copy exists yet and
    /// updated at empty depth otherwise.
    pub fn ensure_path_shallow(&mut self, relative_path: &str) -> Result<()> {
        for dir in ancestor_dirs(relative_path) {
            self.ensure_dir_shallow(&dir)?;
        }
        Ok(())
    }

    /// Fetch `relative_path` in full. Its ancestors must already be present.
    pub fn ensure_path_full(&mut self, relative_path: &str) -> Result<()> {
        let absolute = to_absolute(relative_path, &self.root)?;
        debug!(path = %relative_path, "Fetching asset");
        self.backend.update(&absolute, false)
    }

    /// Materialize `ordered` assets in order.
    ///
    /// For each asset its ancestors are brought in shallow, then the asset is fetched in
    /// full, then `on_materialized` is called with its path. Within one call each ancestor
    /// directory is updated at most once. Returns the paths materialized, in order.
    ///
    /// # Errors
    ///
    /// The first backend or callback failure stops the run; assets reported to
    /// `on_materialized` before the failure stay materialized.
    pub fn materialize_closure<F>(
        &mut self,
        ordered: &[String],
        mut on_materialized: F,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<String>>
    where
        F: FnMut(&str) -> Result<()>,
    {
        self.fetched_dirs.clear();
        let mut updated_dirs: HashSet<String> = HashSet::new();
        let mut materialized = Vec::with_capacity(ordered.len());

        for relative_path in ordered {
            if let Some(pb) = progress {
                pb.set_message(relative_path.clone());
            }

            for dir in ancestor_dirs(relative_path) {
                if updated_dirs.insert(dir.clone()) {
                    self.ensure_dir_shallow(&dir)?;
                }
            }
            self.ensure_path_full(relative_path)?;
            on_materialized(relative_path)?;
            materialized.push(relative_path.clone());

            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        info!(count = materialized.len(), "Materialized assets");
        Ok(materialized)
    }

    fn ensure_dir_shallow(&mut self, relative_dir: &str) -> Result<()> {
        if relative_dir.is_empty() {
            return self.ensure_root();
        }

        let absolute = to_absolute(relative_dir, &self.root)?;
        debug!(dir = %relative_dir, "Shallow update");
        self.backend.update(&absolute, true)
    }

    fn ensure_root(&mut self) -> Result<()> {
        if !self.working_copy_known && self.backend.info(&self.root).is_err() {
            let url = self.url.clone().ok_or_else(|| SpiderError::ConfigError {
                message: format!(
                    "{} is not a working copy and no backend URL is configured",
                    self.root.display()
                ),
            })?;
            info!(url = %url, root = %self.root.display(), "Creating sparse working copy");
            let root = self.root.clone();
            self.backend.checkout(&url, &root, true)?;
        } else {
            debug!(root = %self.root.display(), "Shallow update of project root");
            let root = self.root.clone();
            self.backend.update(&root, true)?;
        }
        self.working_copy_known = true;
        Ok(())
    }
}

impl<B: VcsBackend> FileFetcher for SparseCheckoutController<B> {
    fn fetch(&mut self, relative_path: &str) -> Result<()> {
        for dir in ancestor_dirs(relative_path) {
            if !self.fetched_dirs.contains(&dir) {
                self.ensure_dir_shallow(&dir)?;
                self.fetched_dirs.insert(dir);
            }
        }
        self.ensure_path_full(relative_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::RepoInfo;
    use anyhow::anyhow;

    /// Records calls as strings; `info` fails until a checkout happened.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Vec<String>,
        has_working_copy: bool,
        fail_on: Option<String>,
    }

    impl RecordingBackend {
        fn rel(path: &Path) -> String {
            let s = path.strip_prefix("/proj").unwrap_or(path).display().to_string();
            if s.is_empty() { ".".to_string() } else { s.replace('\\', "/") }
        }
    }

    impl VcsBackend for RecordingBackend {
        fn checkout(&mut self, url: &str, path: &Path, shallow: bool) -> Result<()> {
            self.calls.push(format!("checkout {url} {} shallow={shallow}", Self::rel(path)));
            self.has_working_copy = true;
            Ok(())
        }

        fn update(&mut self, path: &Path, shallow: bool) -> Result<()> {
            let rel = Self::rel(path);
            if self.fail_on.as_deref() == Some(rel.as_str()) {
                return Err(anyhow!("update of {rel} failed"));
            }
            self.calls.push(format!("update {rel} shallow={shallow}"));
            Ok(())
        }

        fn info(&mut self, _path: &Path) -> Result<RepoInfo> {
            if self.has_working_copy {
                Ok(RepoInfo {
                    url: "svn://host/repo".to_string(),
                })
            } else {
                Err(anyhow!("not a working copy"))
            }
        }
    }

    fn controller(has_working_copy: bool) -> SparseCheckoutController<RecordingBackend> {
        let backend = RecordingBackend {
            has_working_copy,
            ..Default::default()
        };
        SparseCheckoutController::new(backend, "/proj", Some("svn://host/repo".to_string()))
    }

    #[test]
    fn test_shallow_checkout_when_no_working_copy() {
        let mut ctl = controller(false);
        ctl.ensure_path_shallow("a/b/c.png").unwrap();

        assert_eq!(ctl.backend().calls, vec![
            "checkout svn://host/repo . shallow=true",
            "update a shallow=true",
            "update a/b shallow=true",
        ]);
    }

    #[test]
    fn test_shallow_update_of_existing_root() {
        let mut ctl = controller(true);
        ctl.ensure_path_shallow("scene.blend").unwrap();
        assert_eq!(ctl.backend().calls, vec!["update . shallow=true"]);
    }

    #[test]
    fn test_missing_url_without_working_copy_is_config_error() {
        let mut ctl = SparseCheckoutController::new(RecordingBackend::default(), "/proj", None);
        let err = ctl.ensure_path_shallow("scene.blend").unwrap_err();
        assert!(matches!(err.downcast_ref::<SpiderError>(), Some(SpiderError::ConfigError { .. })));
    }

    #[test]
    fn test_materialize_closure_updates_each_ancestor_once() {
        let mut ctl = controller(true);
        let ordered = vec![
            "tex/wood.png".to_string(),
            "tex/metal.png".to_string(),
            "scene.blend".to_string(),
        ];
        let mut confirmed = Vec::new();
        let done = ctl
            .materialize_closure(
                &ordered,
                |path| {
                    confirmed.push(path.to_string());
                    Ok(())
                },
                None,
            )
            .unwrap();

        assert_eq!(done, ordered);
        assert_eq!(confirmed, ordered);
        assert_eq!(ctl.backend().calls, vec![
            "update . shallow=true",
            "update tex shallow=true",
            "update tex/wood.png shallow=false",
            "update tex/metal.png shallow=false",
            "update scene.blend shallow=false",
        ]);
    }

    #[test]
    fn test_materialize_closure_stops_at_first_failure() {
        let mut ctl = controller(true);
        ctl.backend.fail_on = Some("b.png".to_string());
        let ordered = vec!["a.png".to_string(), "b.png".to_string(), "c.png".to_string()];
        let mut confirmed = Vec::new();

        let result = ctl.materialize_closure(
            &ordered,
            |path| {
                confirmed.push(path.to_string());
                Ok(())
            },
            None,
        );

        assert!(result.is_err());
        assert_eq!(confirmed, vec!["a.png"]);
    }

    #[test]
    fn test_fetch_is_shallow_then_full() {
        let mut ctl = controller(true);
        ctl.fetch("rig/arm.blend").unwrap();
        assert_eq!(ctl.backend().calls, vec![
            "update . shallow=true",
            "update rig shallow=true",
            "update rig/arm.blend shallow=false",
        ]);
    }

    #[test]
    fn test_fetches_share_ancestor_updates_until_materialization() {
        let mut ctl = controller(true);
        ctl.fetch("tex/wood.png").unwrap();
        ctl.fetch("tex/metal.png").unwrap();
        ctl.fetch("scene.blend").unwrap();
        assert_eq!(ctl.backend().calls, vec![
            "update . shallow=true",
            "update tex shallow=true",
            "update tex/wood.png shallow=false",
            "update tex/metal.png shallow=false",
            "update scene.blend shallow=false",
        ]);

        ctl.backend.calls.clear();
        ctl.materialize_closure(&["tex/wood.png".to_string()], |_| Ok(()), None).unwrap();
        ctl.fetch("tex/metal.png").unwrap();
        assert_eq!(ctl.backend().calls, vec![
            "update . shallow=true",
            "update tex shallow=true",
            "update tex/wood.png shallow=false",
            "update . shallow=true",
            "update tex shallow=true",
            "update tex/metal.png shallow=false",
        ]);
    }
}
