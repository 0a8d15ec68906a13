use super::context::CommandContext;
use crate::SnapdiffContext;
use crate::output;
use crate::storage::snapshots::escape_path;
use crate::utils::{format_size, format_timestamp};
use anyhow::{Context, Result};
use colored::Colorize;

/// Execute show command - print a stored snapshot of a root
///
/// # Errors
///
/// Returns an error if:
/// - The root cannot be resolved
/// - The stored snapshot cannot be read or parsed
pub fn execute(ctx: &SnapdiffContext, root: &str, previous: bool) -> Result<()> {
    let root = ctx.resolve_root(root)?;
    let store = ctx.store_for(&root);

    let (label, snapshot) = if previous {
        ("previous", store.load_previous())
    } else {
        ("current", store.load_current())
    };
    let snapshot =
        snapshot.with_context(|| format!("Failed to load {label} snapshot of {}", root.display()))?;

    println!("{} {}", "root".yellow(), root.display());
    println!("{}: {}", "Snapshot".bold(), label);
    println!("{}: {}", "Captured".bold(), format_timestamp(snapshot.captured_at));
    println!("{}: {}", "Entries".bold(), snapshot.tracked().count());

    if snapshot.is_empty() {
        output::info("No snapshot recorded yet");
        return Ok(());
    }

    println!();
    let mut records: Vec<_> = snapshot.tracked().collect();
    records.sort_by(|a, b| a.path.cmp(&b.path));
    for record in records {
        let size = if record.is_dir() {
            "-".to_string()
        } else {
            format_size(record.size)
        };
        println!(
            "{}{:04o} {:>10} {} {:>12} {}",
            record.kind.as_char(),
            record.mode,
            size,
            format_timestamp(record.modified_at).dimmed(),
            record.identity,
            escape_path(&record.path)
        );
    }

    Ok(())
}
