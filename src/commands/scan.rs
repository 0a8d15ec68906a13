use super::context::CommandContext;
use crate::SnapdiffContext;
use crate::analysis::{ContentAnalyzer, quarantine};
use crate::output;
use crate::scanner::{self, AggregateResult};
use crate::tracking::BuildMode;
use anyhow::{Result, bail};
use colored::Colorize;
use std::path::PathBuf;

/// Execute scan command - run the content analyzer over every root
///
/// Roots are scanned concurrently with lenient builds, so an unreadable
/// subtree only reduces what is checked. Flagged files are moved to the
/// quarantine directory when one is given here or in the config.
///
/// # Errors
///
/// Returns an error if:
/// - No roots are given
/// - An ignore pattern in the config is invalid
/// - Every root failed to scan
pub fn execute(
    ctx: &SnapdiffContext,
    roots: &[String],
    quarantine_dir: Option<PathBuf>,
) -> Result<AggregateResult> {
    if roots.is_empty() {
        bail!("No roots specified");
    }

    let resolved = roots
        .iter()
        .map(|r| ctx.resolve_root(r))
        .collect::<Result<Vec<_>>>()?;

    let builder = ctx.snapshot_builder(Some(BuildMode::Lenient))?;
    let analyzer = ContentAnalyzer::from_config(&ctx.config.analysis);

    let aggregate = scanner::scan(&resolved, &builder, &analyzer);

    for result in &aggregate.results {
        if let Some(error) = &result.error {
            output::error(&format!("{}: {error}", result.root.display()));
            continue;
        }

        println!(
            "{}: {} flagged of {} file(s)",
            result.root.display().to_string().bold(),
            result.flagged_count.to_string().yellow(),
            result.files_checked
        );
        for path in &result.flagged {
            println!("  {}", path.display());
        }
        if result.skipped > 0 {
            output::warning(&format!(
                "{}: {} unreadable entr{} skipped",
                result.root.display(),
                result.skipped,
                if result.skipped == 1 { "y" } else { "ies" }
            ));
        }
    }

    println!(
        "{} {} flagged across {} root(s)",
        "Total:".bold(),
        aggregate.total_flagged(),
        aggregate.results.len()
    );

    let target = quarantine_dir.or_else(|| ctx.config.analysis.quarantine_dir.clone());
    if let Some(target) = target
        && aggregate.total_flagged() > 0
    {
        let moved = quarantine::quarantine_all(aggregate.flagged_paths(), &target);
        output::success(&format!(
            "Moved {moved} file(s) to {}",
            target.display()
        ));
    }

    if aggregate.succeeded().next().is_none() {
        bail!("No root could be scanned");
    }
    Ok(aggregate)
}
