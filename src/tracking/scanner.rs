//! Snapshot builder: walks a directory tree and records every entry.
//!
//! The walk is depth-first in directory listing order and never follows
//! symlinks, so link cycles cannot occur. It does not cross filesystem
//! boundaries, which keeps inode numbers unique within one snapshot.

use crate::error::{Result, SnapshotError};
use crate::storage::metadata::{self, ReservedNames};
use crate::storage::{MetadataRecord, Snapshot};
use crate::utils::IgnoreSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{Level, debug, span};
use walkdir::WalkDir;

/// How the builder reacts to an entry or subtree it cannot read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Abort the whole build on the first failure
    Strict,
    /// Record the failure, skip the entry or subtree, and keep walking
    #[default]
    Lenient,
}

/// An entry or subtree left out of a lenient build.
#[derive(Debug)]
pub struct SkippedEntry {
    /// Path relative to the build root
    pub path: PathBuf,
    /// Why it was skipped
    pub error: SnapshotError,
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutcome {
    /// The captured snapshot
    pub snapshot: Snapshot,
    /// Everything that could not be read (always empty in strict mode)
    pub skipped: Vec<SkippedEntry>,
}

impl BuildOutcome {
    /// Relative paths whose state is unknown for this capture.
    #[must_use]
    pub fn unreadable_paths(&self) -> Vec<PathBuf> {
        self.skipped.iter().map(|s| s.path.clone()).collect()
    }

    /// Returns true when every entry was captured.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Builds snapshots of directory trees.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    mode: BuildMode,
    reserved: ReservedNames,
    ignore: IgnoreSet,
}

impl SnapshotBuilder {
    /// Create a builder with the given failure policy.
    #[must_use]
    pub fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            reserved: ReservedNames::default(),
            ignore: IgnoreSet::default(),
        }
    }

    /// Use a custom set of reserved artifact names.
    #[must_use]
    pub fn with_reserved(mut self, reserved: ReservedNames) -> Self {
        self.reserved = reserved;
        self
    }

    /// Leave out entries matching `ignore`; ignored directories are not entered.
    #[must_use]
    pub fn with_ignore(mut self, ignore: IgnoreSet) -> Self {
        self.ignore = ignore;
        self
    }

    /// The failure policy in use.
    #[must_use]
    pub const fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Walk `root` and capture every entry below it.
    ///
    /// Recorded paths are relative to `root`; the root itself is not recorded.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryUnavailable` if `root` itself cannot be listed, in
    /// either mode. In strict mode the first `NotAccessible` or
    /// `DirectoryUnavailable` below the root is returned as well.
    pub fn build(&self, root: &Path) -> Result<BuildOutcome> {
        let span = span!(Level::DEBUG, "build_snapshot", root = %root.display());
        let _guard = span.enter();
        let start = Instant::now();

        ensure_listable(root)?;

        let mut records: Vec<MetadataRecord> = Vec::new();
        let mut skipped: Vec<SkippedEntry> = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .same_file_system(true)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !self.ignore.is_ignored(relative_to(entry.path(), root)));

        for item in walker {
            match item {
                Ok(entry) => match metadata::extract(entry.path(), &self.reserved) {
                    Ok(record) => {
                        let relative = relative_to(entry.path(), root).to_path_buf();
                        records.push(record.with_path(relative));
                    }
                    Err(error) => self.skip_or_abort(root, entry.path(), error, &mut skipped)?,
                },
                Err(err) => {
                    let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
                    let error = SnapshotError::DirectoryUnavailable {
                        path: path.clone(),
                        source,
                    };
                    if path == root {
                        return Err(error);
                    }
                    self.skip_or_abort(root, &path, error, &mut skipped)?;
                }
            }
        }

        debug!(
            records = records.len(),
            skipped = skipped.len(),
            elapsed = ?start.elapsed(),
            "Snapshot build complete"
        );

        Ok(BuildOutcome {
            snapshot: Snapshot::new(records),
            skipped,
        })
    }

    /// Apply the failure policy to one failed entry.
    fn skip_or_abort(
        &self,
        root: &Path,
        path: &Path,
        error: SnapshotError,
        skipped: &mut Vec<SkippedEntry>,
    ) -> Result<()> {
        match self.mode {
            BuildMode::Strict => Err(error),
            BuildMode::Lenient => {
                debug!(path = %path.display(), error = %error, "Skipping unreadable entry");
                skipped.push(SkippedEntry {
                    path: relative_to(path, root).to_path_buf(),
                    error,
                });
                Ok(())
            }
        }
    }
}

/// Fail early with `DirectoryUnavailable` if `root` cannot be listed.
fn ensure_listable(root: &Path) -> Result<()> {
    let unavailable = |source: io::Error| SnapshotError::DirectoryUnavailable {
        path: root.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(root).map_err(unavailable)?;
    if !metadata.is_dir() {
        return Err(unavailable(io::Error::from(io::ErrorKind::NotADirectory)));
    }
    fs::read_dir(root).map_err(unavailable)?;
    Ok(())
}

fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
