/// Metadata extraction for single filesystem entries
pub mod metadata;
/// Snapshot persistence with previous/current rotation
pub mod snapshots;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub use metadata::{ReservedNames, extract};
pub use snapshots::SnapshotStore;

/// Kind of a filesystem entry.
///
/// Anything that is not a directory (regular files, symlinks, fifos, sockets)
/// is recorded as a file. Symlinks are never followed, so they are objects in
/// their own right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file or any other non-directory entry
    File,
    /// Directory
    Directory,
}

impl EntryKind {
    /// Single-character tag used in the persisted line format.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::File => 'f',
            Self::Directory => 'd',
        }
    }

    /// Parse the single-character tag.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'f' => Some(Self::File),
            'd' => Some(Self::Directory),
            _ => None,
        }
    }
}

/// Immutable metadata for one filesystem entry.
///
/// `identity` is the inode number: it survives an in-place rename on the same
/// filesystem but not a copy or a cross-volume move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Path at capture time, relative to the snapshot root
    pub path: PathBuf,
    /// Inode number of the underlying filesystem object
    pub identity: u64,
    /// File or directory
    pub kind: EntryKind,
    /// Unix permission bits (`st_mode & 0o7777`)
    pub mode: u32,
    /// Size in bytes, only meaningful for files
    pub size: u64,
    /// Modification time in whole seconds since the Unix epoch
    pub modified_at: i64,
    /// Whether this entry is a snapshot artifact written by snapdiff itself
    pub is_reserved_artifact: bool,
}

impl MetadataRecord {
    /// Replace the recorded path, keeping every other field.
    #[must_use]
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Returns true if this record is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Point-in-time capture of a directory tree.
///
/// Records are kept in traversal order. Nothing downstream depends on that
/// order; it is preserved so that persisted snapshots are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Capture time in seconds since the Unix epoch (0 for an empty baseline)
    pub captured_at: i64,
    /// Records in capture order
    pub records: Vec<MetadataRecord>,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time.
    #[must_use]
    pub fn new(records: Vec<MetadataRecord>) -> Self {
        Self {
            captured_at: crate::utils::get_current_timestamp(),
            records,
        }
    }

    /// The empty baseline used on a first run.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records that take part in diffing.
    pub fn tracked(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.iter().filter(|r| !r.is_reserved_artifact)
    }

    /// Copy records from `previous` that live at or below any of `unreadable`
    /// and are missing from this snapshot.
    ///
    /// Used after a lenient build: a subtree that could not be read this time
    /// keeps its last known state instead of being reported as removed.
    /// Returns the number of records carried forward.
    pub fn carry_forward(&mut self, previous: &Self, unreadable: &[PathBuf]) -> usize {
        if unreadable.is_empty() {
            return 0;
        }

        let mut present: HashSet<u64> = self.records.iter().map(|r| r.identity).collect();
        let before = self.records.len();

        for record in &previous.records {
            if is_under_any(&record.path, unreadable) && present.insert(record.identity) {
                self.records.push(record.clone());
            }
        }

        self.records.len() - before
    }
}

/// Returns true when `path` equals or is a descendant of one of `prefixes`.
fn is_under_any(path: &Path, prefixes: &[PathBuf]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, identity: u64, kind: EntryKind) -> MetadataRecord {
        MetadataRecord {
            path: PathBuf::from(path),
            identity,
            kind,
            mode: 0o644,
            size: 0,
            modified_at: 100,
            is_reserved_artifact: false,
        }
    }

    #[test]
    fn test_kind_char_roundtrip() {
        for kind in [EntryKind::File, EntryKind::Directory] {
            assert_eq!(EntryKind::from_char(kind.as_char()), Some(kind));
        }
        assert_eq!(EntryKind::from_char('x'), None);
    }

    #[test]
    fn test_tracked_skips_reserved() {
        let mut reserved = record("snapshot.curr", 9, EntryKind::File);
        reserved.is_reserved_artifact = true;
        let snapshot = Snapshot::new(vec![record("a", 1, EntryKind::File), reserved]);

        let tracked: Vec<_> = snapshot.tracked().map(|r| r.identity).collect();
        assert_eq!(tracked, vec![1]);
    }

    #[test]
    fn test_carry_forward_unreadable_subtree() {
        let previous = Snapshot::new(vec![
            record("locked", 10, EntryKind::Directory),
            record("locked/inner.txt", 11, EntryKind::File),
            record("locked/deeper/x", 12, EntryKind::File),
            record("gone.txt", 13, EntryKind::File),
        ]);
        let mut current = Snapshot::new(vec![record("locked", 10, EntryKind::Directory)]);

        let carried = current.carry_forward(&previous, &[PathBuf::from("locked")]);

        assert_eq!(carried, 2);
        assert_eq!(current.len(), 3);
        assert!(!current.records.iter().any(|r| r.identity == 13));
    }

    #[test]
    fn test_carry_forward_noop_without_unreadable() {
        let previous = Snapshot::new(vec![record("a", 1, EntryKind::File)]);
        let mut current = Snapshot::empty();
        assert_eq!(current.carry_forward(&previous, &[]), 0);
        assert!(current.is_empty());
    }
}
