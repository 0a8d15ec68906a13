#![warn(missing_docs)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Simple counters cannot overflow
#![allow(clippy::float_arithmetic)] // Required for file size formatting

//! # Snapdiff - Snapshot-based Directory Change Tracking
//!
//! Snapdiff records the metadata of every entry under a directory tree,
//! keeps the previous and current snapshot on disk, and reports what changed
//! between them. Entries are matched by inode, so a rename or move inside the
//! tree is reported as one `Renamed` change instead of a delete plus an add.
//!
//! ## Features
//!
//! - **Identity-keyed diffing**: Added, Removed, Renamed, Modified and kind changes
//! - **Strict or lenient builds**: abort on the first unreadable entry, or skip it
//! - **Atomic store**: snapshots are written to a temp file and renamed into place
//! - **Concurrent roots**: one worker per root, results collected over a channel
//! - **Content scan**: keyword and non-ASCII heuristics with optional quarantine
//!
//! ## Architecture
//!
//! - [`storage`]: data model, metadata extractor and the two-file snapshot store
//! - [`tracking`]: snapshot builder
//! - [`diff`]: the identity-keyed differ
//! - [`scanner`]: multi-root coordinator
//! - [`analysis`]: per-file content analyzer and quarantine mover
//! - [`commands`]: `track`, `scan` and `show`
//! - [`config`]: TOML configuration
//! - [`output`]: terminal output
//! - [`utils`]: helpers
//!
//! ## Example Usage
//!
//! ```no_run
//! use snapdiff::diff::diff;
//! use snapdiff::storage::SnapshotStore;
//! use snapdiff::tracking::{BuildMode, SnapshotBuilder};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = SnapshotStore::new("/tmp/snapdiff-state".into());
//! let previous = store.load_previous()?;
//! let current = SnapshotBuilder::new(BuildMode::Lenient)
//!     .build(Path::new("/srv/data"))?
//!     .snapshot;
//! store.save_current(&current)?;
//!
//! for change in &diff(&previous, &current).changes {
//!     println!("{change}");
//! }
//! store.rotate()?;
//! # Ok(())
//! # }
//! ```

#[cfg(not(unix))]
compile_error!("snapdiff relies on inode numbers and only supports Unix platforms");

/// Per-file content analysis and quarantine.
pub mod analysis;

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Configuration parsing, validation, and management.
pub mod config;

/// Identity-keyed snapshot comparison.
pub mod diff;

/// Error kinds shared by the core components.
pub mod error;

/// State directory locking to prevent concurrent runs.
pub mod lock;

/// Output formatting.
pub mod output;

/// Concurrent multi-root scanning.
pub mod scanner;

/// Data model, metadata extraction and the snapshot store.
pub mod storage;

/// Snapshot building.
pub mod tracking;

/// Utility functions and helpers.
pub mod utils;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Current version of the snapdiff binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default state directory name within the home directory.
pub const DEFAULT_STATE_DIR: &str = ".snapdiff";

/// Default configuration file path relative to home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/snapdiff/config.toml";

/// File holding the baseline snapshot.
pub const PREVIOUS_SNAPSHOT_FILE: &str = "snapshot.prev";

/// File holding the most recent snapshot.
pub const CURRENT_SNAPSHOT_FILE: &str = "snapshot.curr";

/// Lock file created in the state directory while a run is active.
pub const LOCK_FILE: &str = "snapdiff.lock";

/// Central context for all snapdiff operations.
///
/// Holds the state directory, the loaded configuration and the path it was
/// loaded from.
///
/// # Examples
///
/// ```no_run
/// use snapdiff::SnapdiffContext;
///
/// # fn main() -> anyhow::Result<()> {
/// // Create context with default paths
/// let ctx = SnapdiffContext::new()?;
///
/// // Create context with custom paths (for testing)
/// let ctx = SnapdiffContext::new_explicit(
///     "/tmp/test_state".into(),
///     "/tmp/test_config.toml".into()
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SnapdiffContext {
    /// Directory holding per-root snapshot stores and the lock file.
    pub state_dir: PathBuf,

    /// Path to the configuration file.
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,
}

impl SnapdiffContext {
    /// Creates a new `SnapdiffContext` by loading the configuration from the default path.
    ///
    /// `SNAPDIFF_CONFIG_PATH` overrides the config location and
    /// `SNAPDIFF_STATE_DIR` overrides the configured state directory.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or if the configuration
    /// file cannot be read or created.
    pub fn new() -> Result<Self> {
        // Check environment variable for config path first
        let config_path = if let Ok(path) = std::env::var("SNAPDIFF_CONFIG_PATH") {
            PathBuf::from(path)
        } else {
            let home = dirs::home_dir().context("Could not find home directory")?;
            home.join(DEFAULT_CONFIG_PATH)
        };

        let config = config::Config::load(&config_path)?;

        // Allow environment variable to override config state_dir
        let state_dir = if let Ok(path) = std::env::var("SNAPDIFF_STATE_DIR") {
            utils::expand_tilde(&path)?
        } else {
            config.core.state_dir.clone()
        };

        // Configure thread pool based on config
        if let Err(e) = utils::thread_pool::configure_from_config(&config) {
            tracing::warn!(error = %e, "Failed to configure thread pool");
        }

        Ok(Self {
            state_dir,
            config_path,
            config,
        })
    }

    /// Creates a new `SnapdiffContext` with explicit paths.
    /// This avoids the need for environment variable manipulation.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or created.
    pub fn new_explicit(state_dir: PathBuf, config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            config::Config::load(&config_path)?
        } else {
            // Create a default config with the provided state dir
            let mut config = config::Config::default();
            config.core.state_dir.clone_from(&state_dir);
            config.save(&config_path)?;
            config
        };

        Ok(Self {
            state_dir,
            config_path,
            config,
        })
    }

    /// Replace the state directory, e.g. from `--state-dir`.
    ///
    /// A leading `~` is expanded the same way as for `SNAPDIFF_STATE_DIR`.
    ///
    /// # Errors
    /// Returns an error if the path is empty or `~` cannot be resolved.
    pub fn with_state_dir(mut self, state_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = state_dir {
            self.state_dir = utils::expand_tilde(&dir.to_string_lossy())?;
        }
        Ok(self)
    }

    /// Directory holding the snapshot pair for `root`.
    #[must_use]
    pub fn root_state_dir(&self, root: &Path) -> PathBuf {
        self.state_dir.join(utils::state_key(root))
    }

    /// Ensures that the state directory exists.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_state_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir).with_context(|| {
            format!(
                "Failed to create state directory: {}",
                self.state_dir.display()
            )
        })
    }
}
