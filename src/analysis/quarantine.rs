//! Moves flagged files into an isolation directory.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Move `path` into `target_dir`, returning the new location.
///
/// The target directory is created if needed. An existing file with the same
/// name is not overwritten; a numeric suffix is appended instead. Moves across
/// filesystems fall back to copy and remove.
///
/// # Errors
///
/// Returns an error if the target cannot be created or the file cannot be
/// moved.
pub fn quarantine(path: &Path, target_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(target_dir).with_context(|| {
        format!(
            "Failed to create quarantine directory: {}",
            target_dir.display()
        )
    })?;

    let name = path
        .file_name()
        .with_context(|| format!("Cannot quarantine path without a name: {}", path.display()))?;
    let destination = free_destination(target_dir, Path::new(name));

    match fs::rename(path, &destination) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(path = %path.display(), "Cross-device move, copying");
            fs::copy(path, &destination).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    path.display(),
                    destination.display()
                )
            })?;
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove original: {}", path.display()))?;
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    path.display(),
                    destination.display()
                )
            });
        }
    }

    debug!(from = %path.display(), to = %destination.display(), "Quarantined");
    Ok(destination)
}

/// Quarantine every path, continuing past individual failures.
///
/// Returns the number of files moved.
pub fn quarantine_all<'a, I>(paths: I, target_dir: &Path) -> usize
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut moved = 0;
    for path in paths {
        match quarantine(path, target_dir) {
            Ok(_) => moved += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Quarantine failed"),
        }
    }
    moved
}

fn free_destination(dir: &Path, name: &Path) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let name = name.to_string_lossy();
    (1..)
        .map(|n| dir.join(format!("{name}.{n}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
