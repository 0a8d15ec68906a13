use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use snapdiff::diff::diff;
use snapdiff::storage::snapshots::{decode_snapshot, encode_snapshot};
use snapdiff::storage::{EntryKind, MetadataRecord, Snapshot};
use snapdiff::tracking::{BuildMode, SnapshotBuilder};
use std::fs;
use std::hint::black_box;
use std::path::PathBuf;
use tempfile::tempdir;

fn synthetic_snapshot(count: u64) -> Snapshot {
    Snapshot {
        captured_at: 1_700_000_000,
        records: (0..count)
            .map(|i| MetadataRecord {
                path: PathBuf::from(format!("dir_{}/file_{i}.txt", i % 100)),
                identity: 1_000 + i,
                kind: EntryKind::File,
                mode: 0o644,
                size: i * 17,
                modified_at: 1_700_000_000,
                is_reserved_artifact: false,
            })
            .collect(),
    }
}

/// Rename every tenth entry, touch every seventh and drop every thirteenth.
fn churned(base: &Snapshot) -> Snapshot {
    let records = base
        .records
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 13 != 0)
        .map(|(i, r)| {
            let mut r = r.clone();
            if i % 10 == 0 {
                r.path = PathBuf::from(format!("moved/{}", r.path.display()));
            }
            if i % 7 == 0 {
                r.modified_at += 60;
            }
            r
        })
        .collect();
    Snapshot {
        captured_at: base.captured_at + 60,
        records,
    }
}

fn benchmark_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");

    for size in [1_000u64, 10_000, 100_000] {
        let previous = synthetic_snapshot(size);
        let current = churned(&previous);

        group.bench_with_input(BenchmarkId::new("churned", size), &size, |b, _| {
            b.iter(|| diff(black_box(&previous), black_box(&current)));
        });
        group.bench_with_input(BenchmarkId::new("identical", size), &size, |b, _| {
            b.iter(|| diff(black_box(&previous), black_box(&previous)));
        });
    }

    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    let snapshot = synthetic_snapshot(10_000);
    let encoded = encode_snapshot(&snapshot);

    let mut group = c.benchmark_group("snapshot_codec");
    group.bench_function("encode_10k", |b| b.iter(|| encode_snapshot(black_box(&snapshot))));
    group.bench_function("decode_10k", |b| {
        b.iter(|| decode_snapshot(black_box(encoded.as_bytes())));
    });
    group.finish();
}

fn benchmark_build(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    for d in 0..20 {
        let sub = dir.path().join(format!("dir_{d}"));
        fs::create_dir_all(&sub).unwrap();
        for f in 0..50 {
            fs::write(sub.join(format!("file_{f}.txt")), "content").unwrap();
        }
    }
    let builder = SnapshotBuilder::new(BuildMode::Lenient);

    c.bench_function("build_1k_entries", |b| {
        b.iter(|| builder.build(black_box(dir.path())).unwrap());
    });
}

criterion_group!(benches, benchmark_diff, benchmark_codec, benchmark_build);
criterion_main!(benches);
