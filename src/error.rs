//! Error kinds raised by the snapshot engine.
//!
//! Per-entry failures (`NotAccessible`, `DirectoryUnavailable`) are recoverable: the
//! snapshot builder decides whether to skip or abort. Store failures are always fatal
//! to the run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for snapshot engine operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Failure raised by the extractor, builder, or store.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A single entry could not be stat'd.
    #[error("cannot access {}: {source}", path.display())]
    NotAccessible {
        /// Entry that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A directory could not be listed.
    #[error("cannot list directory {}: {source}", path.display())]
    DirectoryUnavailable {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing or renaming a snapshot file failed.
    #[error("failed to write snapshot {}: {source}", path.display())]
    StoreWriteFailed {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An existing snapshot file could not be read.
    #[error("failed to read snapshot {}: {source}", path.display())]
    StoreReadFailed {
        /// Snapshot file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A persisted snapshot line does not parse into a record.
    #[error("corrupt snapshot {} at line {line}: {reason}", path.display())]
    StoreCorrupt {
        /// Snapshot file being read.
        path: PathBuf,
        /// One-based line number of the bad record.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

impl SnapshotError {
    /// Whether the failure concerns a single entry or subtree and may be skipped.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotAccessible { .. } | Self::DirectoryUnavailable { .. }
        )
    }

    /// Short machine-friendly name of the error kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::NotAccessible { .. } => "NotAccessible",
            Self::DirectoryUnavailable { .. } => "DirectoryUnavailable",
            Self::StoreWriteFailed { .. } => "StoreWriteFailed",
            Self::StoreReadFailed { .. } => "StoreReadFailed",
            Self::StoreCorrupt { .. } => "StoreCorrupt",
        }
    }
}
