//! Per-file analysis used by `scan`.
//!
//! The coordinator only sees the [`Analyzer`] trait: a path goes in, a
//! flagged/not-flagged answer comes out. [`ContentAnalyzer`] is the built-in
//! heuristic and [`quarantine`] relocates whatever was flagged.

pub mod content;
pub mod quarantine;

pub use content::ContentAnalyzer;

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Decides whether a single file should be flagged.
///
/// Implementations are called from several threads at once. Failing to
/// read a file is the analyzer's concern; it should answer `false`.
pub trait Analyzer: Sync {
    /// Returns true if `path` is suspicious.
    fn is_flagged(&self, path: &Path) -> bool;
}

impl<F> Analyzer for F
where
    F: Fn(&Path) -> bool + Sync,
{
    fn is_flagged(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Run `analyzer` over `files` on the analysis pool and return the flagged
/// paths in input order.
pub fn flag_files<A>(analyzer: &A, files: &[PathBuf]) -> Vec<PathBuf>
where
    A: Analyzer + ?Sized,
{
    let check = || {
        files
            .par_iter()
            .filter(|path| analyzer.is_flagged(path))
            .cloned()
            .collect::<Vec<_>>()
    };

    match crate::utils::thread_pool::get_thread_pool() {
        Ok(pool) => pool.install(check),
        Err(e) => {
            warn!(error = %e, "Analysis pool unavailable, checking sequentially");
            files
                .iter()
                .filter(|path| analyzer.is_flagged(path))
                .cloned()
                .collect()
        }
    }
}
