use super::context::CommandContext;
use crate::SnapdiffContext;
use crate::diff::{self, ChangeKind, ChangeRecord, ChangeReport, DiffOptions};
use crate::error::Result as SnapshotResult;
use crate::lock::StateLock;
use crate::output;
use crate::scanner::run_workers;
use crate::storage::SnapshotStore;
use crate::tracking::{BuildMode, BuildOutcome};
use anyhow::{Result, bail};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{Level, debug, span};

/// Options for `snapdiff track`
#[derive(Debug, Clone, Default)]
pub struct TrackOptions {
    /// Store the snapshot pair directly in this directory (single root only)
    pub output: Option<PathBuf>,
    /// Abort a root's build on the first unreadable entry
    pub strict: bool,
    /// One line per change
    pub short: bool,
}

/// What a `track` run found across all roots.
#[derive(Debug, Default)]
pub struct TrackSummary {
    /// Number of roots tracked successfully
    pub tracked: usize,
    /// Roots with at least one change
    pub changed_roots: usize,
    /// Sum of changes over all roots
    pub total_changes: usize,
}

impl TrackSummary {
    /// Returns true if any root changed.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.total_changes > 0
    }
}

/// Execute track command - snapshot each root and report what changed
///
/// All roots are built concurrently. Each successfully built root then goes
/// through load, save, diff and rotate in turn; a root whose build failed
/// keeps its stored state untouched.
///
/// # Errors
///
/// Returns an error if:
/// - No roots are given, or `--output` is used with several roots
/// - The state directory is locked by another run
/// - Any root could not be built or its store could not be updated
pub fn execute(
    ctx: &SnapdiffContext,
    roots: &[String],
    options: &TrackOptions,
) -> Result<TrackSummary> {
    if roots.is_empty() {
        bail!("No roots specified");
    }
    if options.output.is_some() && roots.len() > 1 {
        bail!("--output can only be used with a single root");
    }

    let mut resolved: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        let path = ctx.resolve_root(root)?;
        if !resolved.contains(&path) {
            resolved.push(path);
        }
    }

    let lock_dir = options.output.as_deref().unwrap_or(ctx.state_dir.as_path());
    let _lock = StateLock::acquire(lock_dir)?;

    let mode = options.strict.then_some(BuildMode::Strict);
    let builder = ctx.snapshot_builder(mode)?;
    let diff_options = ctx.diff_options();

    let reports = run_workers(&resolved, |root| builder.build(root));

    let show_headers = reports.len() > 1;
    let mut summary = TrackSummary::default();
    let mut failed = 0usize;

    for report in reports {
        let root = report.root;
        let outcome = match report.result {
            Ok(outcome) => outcome,
            Err(e) => {
                output::error(&format!("{}: {e}", root.display()));
                failed += 1;
                continue;
            }
        };

        for skipped in &outcome.skipped {
            output::warning(&format!(
                "Skipped {}: {}",
                root.join(&skipped.path).display(),
                skipped.error
            ));
        }

        let store = options
            .output
            .as_ref()
            .map_or_else(|| ctx.store_for(&root), |dir| SnapshotStore::new(dir.clone()));

        match record_and_diff(&store, outcome, diff_options) {
            Ok(changes) => {
                if show_headers {
                    println!("{}", root.display().to_string().bold());
                }
                print_report(&changes, options.short);
                if !options.short {
                    output::info(&format!(
                        "{}: {}",
                        root.display(),
                        output::change_summary(&changes)
                    ));
                }
                summary.tracked += 1;
                if changes.has_changes() {
                    summary.changed_roots += 1;
                    summary.total_changes += changes.len();
                }
            }
            Err(e) => {
                output::error(&format!("{}: {e}", root.display()));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!(
            "{failed} of {} root(s) could not be tracked",
            summary.tracked + failed
        );
    }
    Ok(summary)
}

/// Persist a fresh build and compare it against the stored baseline.
///
/// The baseline is read before anything is written, so a corrupt "previous"
/// aborts with the store untouched. Subtrees a lenient build could not read
/// keep their last known records. After a successful diff "current" is
/// rotated into "previous".
///
/// # Errors
///
/// Returns the store error that stopped the run.
pub fn record_and_diff(
    store: &SnapshotStore,
    outcome: BuildOutcome,
    options: DiffOptions,
) -> SnapshotResult<ChangeReport> {
    let span = span!(Level::DEBUG, "record_and_diff", state = %store.state_dir().display());
    let _guard = span.enter();

    let previous = store.load_previous()?;
    let unreadable = outcome.unreadable_paths();
    let mut current = outcome.snapshot;

    let carried = current.carry_forward(&previous, &unreadable);
    if carried > 0 {
        debug!(carried, "Kept previous records for unreadable subtrees");
    }

    store.save_current(&current)?;
    let report = diff::diff_with(&previous, &current, options);
    store.rotate()?;

    debug!(changes = report.len(), "Diff complete");
    Ok(report)
}

fn print_report(report: &ChangeReport, short: bool) {
    if report.is_empty() {
        println!("no changes");
        return;
    }

    let mut changes: Vec<&ChangeRecord> = report.changes.iter().collect();
    changes.sort_by(|a, b| (a.kind, a.path()).cmp(&(b.kind, b.path())));

    if short {
        for change in changes {
            println!("{} {}", change.kind.status_char(), change);
        }
        return;
    }

    for (kind, header) in [
        (ChangeKind::Added, "Added"),
        (ChangeKind::Removed, "Removed"),
        (ChangeKind::Renamed, "Renamed"),
        (ChangeKind::Modified, "Modified"),
        (ChangeKind::KindChanged, "Kind changed"),
    ] {
        print_change_group(&changes, kind, header);
    }
}

fn print_change_group(changes: &[&ChangeRecord], kind: ChangeKind, header: &str) {
    let filtered: Vec<&&ChangeRecord> = changes.iter().filter(|c| c.kind == kind).collect();

    if !filtered.is_empty() {
        println!("\n{}:", header.bold());
        for change in filtered {
            let label = kind.label();
            let color_label = match kind {
                ChangeKind::Added => label.green(),
                ChangeKind::Removed => label.red(),
                ChangeKind::Renamed => label.cyan(),
                ChangeKind::Modified => label.yellow(),
                ChangeKind::KindChanged => label.magenta(),
            };
            println!("  {color_label}: {change}");
        }
    }
}
