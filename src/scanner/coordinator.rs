//! Concurrent per-root workers with a single result channel.
//!
//! One scoped thread is spawned per root. Each worker sends exactly one
//! message before it exits, errors included, so the drain loop always
//! terminates after `roots.len()` messages. Workers share nothing but the
//! sending half of the channel.

use crate::analysis::{self, Analyzer};
use crate::error::SnapshotError;
use crate::storage::EntryKind;
use crate::tracking::SnapshotBuilder;
use crossbeam_channel::{Sender, unbounded};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

/// The single message a worker sends back.
#[derive(Debug)]
pub struct WorkerReport<T> {
    /// Position of the root in the input slice
    pub index: usize,
    /// Root the worker was given
    pub root: PathBuf,
    /// What the worker produced
    pub result: Result<T, SnapshotError>,
}

/// Run `work` once per root, each on its own thread, and collect one report
/// per root.
///
/// Reports are returned in input order; nothing about completion order is
/// assumed while draining.
pub fn run_workers<T, F>(roots: &[PathBuf], work: F) -> Vec<WorkerReport<T>>
where
    T: Send,
    F: Fn(&Path) -> Result<T, SnapshotError> + Sync,
{
    let (tx, rx) = unbounded::<WorkerReport<T>>();
    let expected = roots.len();
    let work = &work;

    let mut reports = thread::scope(|scope| {
        for (index, root) in roots.iter().enumerate() {
            let worker_tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("snapdiff-worker-{index}"))
                .spawn_scoped(scope, move || run_one(index, root, work, &worker_tx));

            if let Err(e) = spawned {
                warn!(root = %root.display(), error = %e, "Could not spawn worker, running inline");
                run_one(index, root, work, &tx);
            }
        }
        drop(tx);

        let mut received = Vec::with_capacity(expected);
        while received.len() < expected {
            match rx.recv() {
                Ok(report) => received.push(report),
                Err(_) => break,
            }
        }
        received
    });

    reports.sort_by_key(|r| r.index);
    reports
}

fn run_one<T, F>(index: usize, root: &Path, work: &F, tx: &Sender<WorkerReport<T>>)
where
    F: Fn(&Path) -> Result<T, SnapshotError>,
{
    let start = Instant::now();
    let result = work(root);
    debug!(
        root = %root.display(),
        ok = result.is_ok(),
        elapsed = ?start.elapsed(),
        "Worker finished"
    );
    // The receiver outlives every worker inside the scope.
    let _ = tx.send(WorkerReport {
        index,
        root: root.to_path_buf(),
        result,
    });
}

/// Outcome of analysing one root.
#[derive(Debug)]
pub struct ScanResult {
    /// Root that was scanned
    pub root: PathBuf,
    /// Number of flagged files
    pub flagged_count: usize,
    /// Absolute paths of the flagged files
    pub flagged: Vec<PathBuf>,
    /// Number of files handed to the analyzer
    pub files_checked: usize,
    /// Entries or subtrees that could not be read (lenient builds only)
    pub skipped: usize,
    /// Set when the root could not be scanned at all
    pub error: Option<SnapshotError>,
}

/// Combined results of a multi-root scan.
#[derive(Debug, Default)]
pub struct AggregateResult {
    /// One result per root, in input order
    pub results: Vec<ScanResult>,
}

impl AggregateResult {
    /// Sum of flagged files over all roots.
    #[must_use]
    pub fn total_flagged(&self) -> usize {
        self.results.iter().map(|r| r.flagged_count).sum()
    }

    /// Sum of analysed files over all roots.
    #[must_use]
    pub fn total_checked(&self) -> usize {
        self.results.iter().map(|r| r.files_checked).sum()
    }

    /// Results of roots that failed.
    pub fn failed(&self) -> impl Iterator<Item = &ScanResult> {
        self.results.iter().filter(|r| r.error.is_some())
    }

    /// Results of roots that were scanned.
    pub fn succeeded(&self) -> impl Iterator<Item = &ScanResult> {
        self.results.iter().filter(|r| r.error.is_none())
    }

    /// Every flagged path across all roots.
    pub fn flagged_paths(&self) -> impl Iterator<Item = &Path> {
        self.results
            .iter()
            .flat_map(|r| r.flagged.iter().map(PathBuf::as_path))
    }
}

/// Scan every root concurrently, run `analyzer` on each captured file, and
/// aggregate the flagged counts.
///
/// A root that cannot be listed yields a `ScanResult` with `error` set; it
/// never removes a result from the aggregate.
pub fn scan<A>(roots: &[PathBuf], builder: &SnapshotBuilder, analyzer: &A) -> AggregateResult
where
    A: Analyzer + ?Sized,
{
    let reports = run_workers(roots, |root| {
        let outcome = builder.build(root)?;
        let files: Vec<PathBuf> = outcome
            .snapshot
            .tracked()
            .filter(|r| r.kind == EntryKind::File)
            .map(|r| root.join(&r.path))
            .collect();
        let flagged = analysis::flag_files(analyzer, &files);
        Ok((files.len(), outcome.skipped.len(), flagged))
    });

    let results = reports
        .into_iter()
        .map(|report| match report.result {
            Ok((files_checked, skipped, flagged)) => ScanResult {
                root: report.root,
                flagged_count: flagged.len(),
                flagged,
                files_checked,
                skipped,
                error: None,
            },
            Err(error) => ScanResult {
                root: report.root,
                flagged_count: 0,
                flagged: Vec::new(),
                files_checked: 0,
                skipped: 0,
                error: Some(error),
            },
        })
        .collect();

    AggregateResult { results }
}
