#![allow(dead_code)]

use anyhow::Result;
use snapdiff::SnapdiffContext;
use snapdiff::storage::{EntryKind, MetadataRecord, Snapshot};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated state directory, config file and scratch space for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub ctx: SnapdiffContext,
}

impl TestEnv {
    /// Create a new environment with a default config
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let state_dir = temp_dir.path().join(".snapdiff");
        let config_path = temp_dir.path().join(".config/snapdiff/config.toml");

        let ctx = SnapdiffContext::new_explicit(state_dir, config_path)?;
        ctx.ensure_state_dir()?;

        Ok(Self { temp_dir, ctx })
    }

    /// Get the temporary directory path
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a directory tree under the scratch space from `(path, content)`
    /// pairs; a `None` content creates a directory.
    pub fn make_root(&self, name: &str, entries: &[(&str, Option<&str>)]) -> Result<PathBuf> {
        let root = self.path().join(name);
        fs::create_dir_all(&root)?;
        for (path, content) in entries {
            let full = root.join(path);
            match content {
                Some(text) => {
                    if let Some(parent) = full.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&full, text)?;
                }
                None => fs::create_dir_all(&full)?,
            }
        }
        Ok(root)
    }
}

/// Synthetic file record
pub fn file(identity: u64, path: &str, modified_at: i64, size: u64) -> MetadataRecord {
    MetadataRecord {
        path: PathBuf::from(path),
        identity,
        kind: EntryKind::File,
        mode: 0o644,
        size,
        modified_at,
        is_reserved_artifact: false,
    }
}

/// Synthetic directory record
pub fn dir(identity: u64, path: &str, modified_at: i64) -> MetadataRecord {
    MetadataRecord {
        path: PathBuf::from(path),
        identity,
        kind: EntryKind::Directory,
        mode: 0o755,
        size: 0,
        modified_at,
        is_reserved_artifact: false,
    }
}

/// Snapshot with a fixed capture time
pub fn snapshot(records: Vec<MetadataRecord>) -> Snapshot {
    Snapshot {
        captured_at: 1_700_000_000,
        records,
    }
}
