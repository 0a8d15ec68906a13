use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::SnapdiffContext;
use crate::diff::DiffOptions;
use crate::storage::SnapshotStore;
use crate::tracking::{BuildMode, SnapshotBuilder};

/// Trait providing common operations for command modules
pub trait CommandContext {
    /// Turns a user-supplied root into the absolute path used as its key
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty or the working directory is unknown
    fn resolve_root(&self, root: &str) -> Result<PathBuf>;

    /// Creates the snapshot store for a root
    fn store_for(&self, root: &Path) -> SnapshotStore;

    /// Creates a `SnapshotBuilder` from the tracking config
    ///
    /// # Errors
    ///
    /// Returns an error if an ignore pattern is invalid
    fn snapshot_builder(&self, mode: Option<BuildMode>) -> Result<SnapshotBuilder>;

    /// Differ options from the tracking config
    fn diff_options(&self) -> DiffOptions;
}

impl CommandContext for SnapdiffContext {
    fn resolve_root(&self, root: &str) -> Result<PathBuf> {
        let expanded = crate::utils::expand_tilde(root)?;
        // A missing root keeps its absolute form so the build reports it.
        match expanded.canonicalize() {
            Ok(path) => Ok(path),
            Err(_) => std::path::absolute(&expanded)
                .with_context(|| format!("Cannot resolve root: {}", expanded.display())),
        }
    }

    fn store_for(&self, root: &Path) -> SnapshotStore {
        SnapshotStore::new(self.root_state_dir(root))
    }

    fn snapshot_builder(&self, mode: Option<BuildMode>) -> Result<SnapshotBuilder> {
        let tracking = &self.config.tracking;
        Ok(
            SnapshotBuilder::new(mode.unwrap_or(tracking.build_mode))
                .with_reserved(tracking.reserved())
                .with_ignore(tracking.ignore_set()?),
        )
    }

    fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            compare_size: self.config.tracking.compare_size,
        }
    }
}
