//! Identity-based comparison of two snapshots.
//!
//! Records are joined on their inode number, not their path: a rename keeps
//! the inode and changes the path, so joining on paths would report every
//! rename as a removal plus an addition. The comparison is a single indexed
//! pass over each snapshot.
//!
//! Classification for each identity:
//!
//! | previous | current | result |
//! |---|---|---|
//! | absent | present | `Added` |
//! | present | absent | `Removed` |
//! | kind differs | | `KindChanged` |
//! | path differs | | `Renamed` |
//! | mtime or size differs | | `Modified` |
//!
//! Reserved artifacts are ignored on both sides.

use crate::storage::{EntryKind, MetadataRecord, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Classification of a single change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Identity only present in the current snapshot
    Added,
    /// Identity only present in the previous snapshot
    Removed,
    /// Same identity, different path
    Renamed,
    /// Same identity and path, different mtime or size
    Modified,
    /// Same identity, but a file became a directory or the reverse
    KindChanged,
}

impl ChangeKind {
    /// Single-character status marker.
    #[must_use]
    pub const fn status_char(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Removed => 'D',
            Self::Renamed => 'R',
            Self::Modified => 'M',
            Self::KindChanged => 'T',
        }
    }

    /// Lowercase label used in long output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Renamed => "renamed",
            Self::Modified => "modified",
            Self::KindChanged => "kind changed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One detected change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// What happened
    pub kind: ChangeKind,
    /// Inode of the entry the change concerns
    pub identity: u64,
    /// Path in the previous snapshot, if the entry existed there
    pub previous_path: Option<PathBuf>,
    /// Path in the current snapshot, if the entry exists now
    pub current_path: Option<PathBuf>,
    /// Extra detail, e.g. which attributes changed
    pub reason: Option<String>,
}

impl ChangeRecord {
    /// The path most relevant for display: current if present, else previous.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.current_path
            .as_deref()
            .or(self.previous_path.as_deref())
            .unwrap_or_else(|| Path::new(""))
    }

    fn added(current: &MetadataRecord) -> Self {
        Self {
            kind: ChangeKind::Added,
            identity: current.identity,
            previous_path: None,
            current_path: Some(current.path.clone()),
            reason: None,
        }
    }

    fn removed(previous: &MetadataRecord) -> Self {
        Self {
            kind: ChangeKind::Removed,
            identity: previous.identity,
            previous_path: Some(previous.path.clone()),
            current_path: None,
            reason: None,
        }
    }

    fn between(
        kind: ChangeKind,
        previous: &MetadataRecord,
        current: &MetadataRecord,
        reason: Option<String>,
    ) -> Self {
        Self {
            kind,
            identity: current.identity,
            previous_path: Some(previous.path.clone()),
            current_path: Some(current.path.clone()),
            reason,
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.previous_path, &self.current_path) {
            (Some(prev), Some(curr)) if prev != curr => {
                write!(f, "{} -> {}", prev.display(), curr.display())?;
            }
            _ => write!(f, "{}", self.path().display())?,
        }
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

/// Ordered result of one comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeReport {
    /// Changes in discovery order: current-side changes first, then removals
    pub changes: Vec<ChangeRecord>,
}

impl ChangeReport {
    /// Returns true if at least one change was detected.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if no change was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Count of changes of the given kind.
    #[must_use]
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }

    /// Changes of the given kind.
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &ChangeRecord> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }
}

/// Which attributes decide `Modified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Compare sizes in addition to modification times
    pub compare_size: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { compare_size: true }
    }
}

/// Compare `previous` against `current` with default options.
#[must_use]
pub fn diff(previous: &Snapshot, current: &Snapshot) -> ChangeReport {
    diff_with(previous, current, DiffOptions::default())
}

/// Compare `previous` against `current`.
///
/// Identities are assumed unique within each snapshot. If a damaged
/// snapshot repeats one, the last record indexed for it wins.
#[must_use]
pub fn diff_with(previous: &Snapshot, current: &Snapshot, options: DiffOptions) -> ChangeReport {
    let previous_index: HashMap<u64, &MetadataRecord> =
        previous.tracked().map(|r| (r.identity, r)).collect();

    let mut changes = Vec::new();
    let mut current_ids: HashSet<u64> = HashSet::with_capacity(current.len());

    for record in current.tracked() {
        current_ids.insert(record.identity);
        match previous_index.get(&record.identity) {
            None => changes.push(ChangeRecord::added(record)),
            Some(prev) => {
                if let Some(change) = classify(prev, record, options) {
                    changes.push(change);
                }
            }
        }
    }

    for record in previous.tracked() {
        if !current_ids.contains(&record.identity) {
            changes.push(ChangeRecord::removed(record));
        }
    }

    ChangeReport { changes }
}

/// Classify a pair of records sharing an identity.
fn classify(
    previous: &MetadataRecord,
    current: &MetadataRecord,
    options: DiffOptions,
) -> Option<ChangeRecord> {
    if previous.kind != current.kind {
        let reason = format!(
            "{} became {}",
            kind_name(previous.kind),
            kind_name(current.kind)
        );
        return Some(ChangeRecord::between(
            ChangeKind::KindChanged,
            previous,
            current,
            Some(reason),
        ));
    }

    let modified = modification_reason(previous, current, options);

    if previous.path != current.path {
        let reason = modified.map(|r| format!("also {r}"));
        return Some(ChangeRecord::between(
            ChangeKind::Renamed,
            previous,
            current,
            reason,
        ));
    }

    modified.map(|reason| {
        ChangeRecord::between(ChangeKind::Modified, previous, current, Some(reason))
    })
}

/// Describe which tracked attributes differ, if any.
fn modification_reason(
    previous: &MetadataRecord,
    current: &MetadataRecord,
    options: DiffOptions,
) -> Option<String> {
    let mtime_changed = previous.modified_at != current.modified_at;
    let size_changed = options.compare_size && previous.size != current.size;

    match (mtime_changed, size_changed) {
        (false, false) => None,
        (true, false) => Some("mtime changed".to_string()),
        (false, true) => Some(format!("size {} -> {}", previous.size, current.size)),
        (true, true) => Some(format!(
            "mtime changed, size {} -> {}",
            previous.size, current.size
        )),
    }
}

const fn kind_name(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::File => "file",
        EntryKind::Directory => "directory",
    }
}
