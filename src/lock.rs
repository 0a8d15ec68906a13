//! State directory locking to prevent concurrent runs
//!
//! Two `track` runs writing the same snapshot pair would interleave their
//! rotate and save steps. A run holds an exclusive lock on `snapdiff.lock` in
//! the state directory; the lock is released when the guard is dropped.
//!
//! The lock file itself is never removed. Unlinking it would let a waiter
//! that already opened the old inode lock it while a newer run locks a fresh
//! file at the same path. The OS drops the lock when its holder exits, so a
//! file left behind by a crashed run does not block the next one.

use anyhow::{Context, Result, bail};
use fs4::fs_std::FileExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Holds an exclusive lock on a state directory
///
/// The lock is automatically released when this struct is dropped.
#[derive(Debug)]
pub struct StateLock {
    /// Lock file handle
    lock_file: File,
    /// Path to the lock file (for error messages)
    lock_path: PathBuf,
}

impl StateLock {
    /// Acquire the lock for `state_dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create the state directory
    /// - Another run holds the lock past the timeout
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        fs::create_dir_all(state_dir).with_context(|| {
            format!("Failed to create state directory: {}", state_dir.display())
        })?;

        let lock_path = state_dir.join(crate::LOCK_FILE);
        let lock_file = Self::try_acquire_lock(&lock_path)?;
        debug!(path = %lock_path.display(), "State lock acquired");

        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    /// Path of the held lock file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    /// Try to acquire the lock file
    fn try_acquire_lock(lock_path: &Path) -> Result<File> {
        // Use shorter timeouts in test mode for faster test execution
        let lock_timeout = if cfg!(test) {
            Duration::from_millis(100)
        } else {
            Duration::from_secs(2)
        };
        let retry_interval = Duration::from_millis(10);

        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        let start = Instant::now();

        loop {
            match file.try_lock_exclusive() {
                Ok(true) => {
                    // Write run info to lock file for debugging
                    let mut file_ref = &file;
                    let _ = file.set_len(0);
                    let _ = writeln!(
                        file_ref,
                        "pid={}\ntime={}",
                        std::process::id(),
                        humantime::format_rfc3339(SystemTime::now())
                    );
                    return Ok(file);
                }
                Ok(false) | Err(_) if start.elapsed() < lock_timeout => {
                    std::thread::sleep(retry_interval);
                }
                Ok(false) | Err(_) => {
                    bail!(
                        "Another snapdiff run is using this state directory: {}",
                        lock_path.display()
                    );
                }
            }
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock_file) {
            warn!(path = %self.lock_path.display(), error = %e, "Failed to unlock state");
        }
    }
}
