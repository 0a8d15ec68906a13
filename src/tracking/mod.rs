//! Building snapshots of a directory tree.
//!
//! [`SnapshotBuilder`] walks a root and asks the metadata extractor for one
//! record per entry. In [`BuildMode::Strict`] the first unreadable entry
//! aborts the build; in [`BuildMode::Lenient`] it is listed in
//! [`BuildOutcome::skipped`] and the walk continues.
//!
//! ```no_run
//! use snapdiff::tracking::{BuildMode, SnapshotBuilder};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let outcome = SnapshotBuilder::new(BuildMode::Lenient).build(Path::new("/srv/data"))?;
//! println!("{} entries, {} skipped", outcome.snapshot.len(), outcome.skipped.len());
//! # Ok(())
//! # }
//! ```

pub mod scanner;

pub use scanner::{BuildMode, BuildOutcome, SkippedEntry, SnapshotBuilder};
