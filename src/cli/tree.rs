//! Display the dependency tree of an asset as recorded in the manifest.
//!
//! Reads the manifest only. Nothing is discovered or fetched, so the tree shows what
//! earlier `resolve` or `crawl` runs found.
//!
//! ```text
//! scene.blend (scene)
//! ├── rig/arm.blend (scene)
//! │   └── tex/wood.png (texture)
//! └── tex/wood.png (texture)
//! ```

use anyhow::{Result, bail};
use clap::Args;

use super::{CliConfig, canonical_target};
use crate::manifest::Manifest;
use crate::resolver::DependencyGraph;

/// Show the recorded dependency tree of an asset.
#[derive(Args, Debug)]
pub struct TreeCommand {
    /// Asset whose tree to show, relative to the project root
    target: String,
}

impl TreeCommand {
    /// Load the manifest and print the tree.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let manifest = Manifest::load(&config.project)?;
        let target = canonical_target(&config.project, &self.target)?;

        if !manifest.contains_node(&target) {
            bail!(
                "'{}' is not in the manifest. Run 'spider resolve {}' or 'spider crawl' first",
                target,
                target
            );
        }

        let graph = DependencyGraph::from_manifest(&manifest);
        print!("{}", graph.to_tree_string(&target));
        Ok(())
    }
}
