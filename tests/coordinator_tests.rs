mod common;

use anyhow::Result;
use common::TestEnv;
use snapdiff::analysis::ContentAnalyzer;
use snapdiff::error::SnapshotError;
use snapdiff::scanner::{run_workers, scan};
use snapdiff::tracking::{BuildMode, SnapshotBuilder};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[test]
fn test_three_roots_one_unavailable() -> Result<()> {
    let env = TestEnv::new()?;
    let a = env.make_root("a", &[("one.txt", Some("malicious payload"))])?;
    let b = env.path().join("b-does-not-exist");
    let c = env.make_root(
        "c",
        &[("two.txt", Some("attack")), ("three.txt", Some("benign"))],
    )?;

    let builder = SnapshotBuilder::new(BuildMode::Lenient);
    let analyzer = ContentAnalyzer::default();
    let aggregate = scan(&[a.clone(), b.clone(), c.clone()], &builder, &analyzer);

    assert_eq!(aggregate.results.len(), 3);
    assert_eq!(aggregate.succeeded().count(), 2);

    let failed: Vec<_> = aggregate.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].root, b);
    assert!(matches!(
        failed[0].error,
        Some(SnapshotError::DirectoryUnavailable { .. })
    ));

    assert_eq!(aggregate.total_flagged(), 2);
    Ok(())
}

#[test]
fn test_aggregate_independent_of_completion_order() {
    let roots: Vec<PathBuf> = (0..6).map(|i| PathBuf::from(format!("root-{i}"))).collect();

    // Later roots finish first.
    let reports = run_workers(&roots, |root| {
        let index: u64 = root
            .to_string_lossy()
            .trim_start_matches("root-")
            .parse()
            .unwrap_or(0);
        std::thread::sleep(Duration::from_millis(60 - index * 10));
        Ok::<_, SnapshotError>(index)
    });

    let total: u64 = reports.iter().filter_map(|r| r.result.as_ref().ok()).sum();
    assert_eq!(total, 15);
    let order: Vec<&Path> = reports.iter().map(|r| r.root.as_path()).collect();
    let expected: Vec<&Path> = roots.iter().map(PathBuf::as_path).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_every_worker_runs_concurrently() {
    let roots: Vec<PathBuf> = (0..4).map(|i| PathBuf::from(format!("r{i}"))).collect();
    let arrived = AtomicUsize::new(0);

    // Each worker waits until all four have started; a serial run would
    // never see the count reach four.
    let reports = run_workers(&roots, |_| {
        arrived.fetch_add(1, Ordering::SeqCst);
        let start = std::time::Instant::now();
        while arrived.load(Ordering::SeqCst) < 4 {
            if start.elapsed() > Duration::from_secs(5) {
                return Ok(false);
            }
            std::thread::yield_now();
        }
        Ok::<_, SnapshotError>(true)
    });

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| matches!(r.result, Ok(true))));
}

#[test]
fn test_strict_builder_failure_carried_in_result() -> Result<()> {
    let env = TestEnv::new()?;
    let file_root = env.path().join("plain-file");
    std::fs::write(&file_root, "not a dir")?;

    let builder = SnapshotBuilder::new(BuildMode::Strict);
    let analyzer = |_: &Path| true;
    let aggregate = scan(&[file_root], &builder, &analyzer);

    assert_eq!(aggregate.results.len(), 1);
    assert!(aggregate.results[0].error.is_some());
    assert_eq!(aggregate.total_flagged(), 0);
    Ok(())
}
