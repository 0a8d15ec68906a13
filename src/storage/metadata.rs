//! Metadata extraction for a single path.
//!
//! Metadata is always taken from the entry itself (`lstat`), never from a
//! symlink target. Whether a failed extraction is fatal is decided by the
//! caller, not here.

use super::{EntryKind, MetadataRecord};
use crate::error::{Result, SnapshotError};
use crate::{CURRENT_SNAPSHOT_FILE, LOCK_FILE, PREVIOUS_SNAPSHOT_FILE};
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Prefix of temporary files created while a snapshot is written atomically.
pub const TEMP_SNAPSHOT_PREFIX: &str = ".snapdiff-";

/// Suffix of temporary snapshot files.
pub const TEMP_SNAPSHOT_SUFFIX: &str = ".tmp";

/// Base names that identify files written by snapdiff itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedNames {
    names: Vec<String>,
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self::new([PREVIOUS_SNAPSHOT_FILE, CURRENT_SNAPSHOT_FILE, LOCK_FILE])
    }
}

impl ReservedNames {
    /// Build a set from explicit base names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true when `name` is one of the reserved base names or an
    /// in-flight temporary snapshot.
    #[must_use]
    pub fn matches(&self, name: &OsStr) -> bool {
        let Some(name) = name.to_str() else {
            return false;
        };
        if name.starts_with(TEMP_SNAPSHOT_PREFIX) && name.ends_with(TEMP_SNAPSHOT_SUFFIX) {
            return true;
        }
        self.names.iter().any(|reserved| reserved == name)
    }

    /// Returns true when the last component of `path` is reserved.
    #[must_use]
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.matches(name))
    }
}

/// Capture the metadata of `path` without following symlinks.
///
/// The returned record carries `path` as given; callers that store
/// root-relative paths replace it with [`MetadataRecord::with_path`].
///
/// # Errors
///
/// Returns [`SnapshotError::NotAccessible`] if the entry cannot be stat'd
/// (permission denied, removed concurrently, ...).
pub fn extract(path: &Path, reserved: &ReservedNames) -> Result<MetadataRecord> {
    let metadata = fs::symlink_metadata(path).map_err(|source| SnapshotError::NotAccessible {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(from_metadata(path, &metadata, reserved))
}

/// Build a record from metadata that was already fetched.
#[must_use]
pub fn from_metadata(
    path: &Path,
    metadata: &fs::Metadata,
    reserved: &ReservedNames,
) -> MetadataRecord {
    let kind = if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    MetadataRecord {
        path: path.to_path_buf(),
        identity: metadata.ino(),
        kind,
        mode: metadata.mode() & 0o7777,
        size: if kind == EntryKind::File { metadata.len() } else { 0 },
        modified_at: metadata.mtime(),
        is_reserved_artifact: kind == EntryKind::File && reserved.matches_path(path),
    }
}
