//! Utility functions and helpers.
//!
//! - Path manipulation (tilde expansion, stable state keys)
//! - Ignore pattern matching
//! - File size formatting
//! - Timestamp utilities
//!
//! # Submodules
//!
//! - [`thread_pool`]: Thread pool configuration
//!
//! # Examples
//!
//! ```
//! use snapdiff::utils::{expand_tilde, format_size};
//!
//! # fn main() -> anyhow::Result<()> {
//! let path = expand_tilde("~/.snapdiff")?;
//! let size_str = format_size(1024 * 1024); // "1.00 MB"
//! # Ok(())
//! # }
//! ```

/// Thread pool configuration for parallel operations
pub mod thread_pool;

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Expands a path starting with `~` to the user's home directory.
///
/// # Errors
///
/// Returns an error if the path is empty.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        anyhow::bail!("Path cannot be empty");
    }
    if path == "~" {
        return dirs::home_dir().context("Could not find home directory");
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(path))
}

/// Derive the per-root state directory name.
///
/// The key combines the root's base name (for humans) with a hash of the
/// full path (for uniqueness), e.g. `photos-1a2b3c4d5e6f7081`.
#[must_use]
pub fn state_key(root: &Path) -> String {
    use std::os::unix::ffi::OsStrExt;

    let base: String = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let hash = xxh3_64(root.as_os_str().as_bytes());
    format!("{base}-{hash:016x}")
}

/// Compiled set of glob patterns for entries that should not be recorded.
///
/// A pattern matches if it matches either the entry's base name or its
/// root-relative path, so `*.log` and `build/cache` both work.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compile `patterns`.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid glob.
    pub fn new(patterns: &[String]) -> std::result::Result<Self, glob::PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if no patterns are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true if `relative` should be left out of a snapshot.
    #[must_use]
    pub fn is_ignored(&self, relative: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let name = relative.file_name().map(Path::new);

        self.patterns.iter().any(|pattern| {
            pattern.matches_path_with(relative, options)
                || name.is_some_and(|n| pattern.matches_path_with(n, options))
        })
    }
}

/// Formats a file size in bytes into a human-readable string with appropriate units.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size.round() as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Returns the current timestamp as seconds since the Unix epoch.
#[must_use]
pub fn get_current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Render a Unix timestamp in local time, or `never` for the empty baseline.
#[must_use]
pub fn format_timestamp(secs: i64) -> String {
    if secs == 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(secs, 0).map_or_else(
        || secs.to_string(),
        |utc| {
            utc.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
    }

    #[test]
    fn test_expand_tilde_passthrough() -> Result<()> {
        assert_eq!(expand_tilde("/tmp/x")?, PathBuf::from("/tmp/x"));
        assert!(expand_tilde("").is_err());
        Ok(())
    }

    #[test]
    fn test_state_key_is_stable_and_distinct() {
        let a = state_key(Path::new("/data/photos"));
        let b = state_key(Path::new("/backup/photos"));
        assert_eq!(a, state_key(Path::new("/data/photos")));
        assert_ne!(a, b);
        assert!(a.starts_with("photos-"));
    }

    #[test]
    fn test_state_key_sanitizes_name() {
        let key = state_key(Path::new("/srv/my files"));
        assert!(key.starts_with("my_files-"));
    }

    #[test]
    fn test_ignore_set_matches_name_and_path() -> Result<()> {
        let ignore = IgnoreSet::new(&["*.log".to_string(), "build/cache".to_string()])?;

        assert!(ignore.is_ignored(Path::new("debug.log")));
        assert!(ignore.is_ignored(Path::new("deep/dir/trace.log")));
        assert!(ignore.is_ignored(Path::new("build/cache")));
        assert!(!ignore.is_ignored(Path::new("build/output")));
        assert!(!ignore.is_ignored(Path::new("notes.txt")));
        Ok(())
    }

    #[test]
    fn test_ignore_set_rejects_bad_glob() {
        assert!(IgnoreSet::new(&["[".to_string()]).is_err());
    }

    #[test]
    fn test_format_timestamp_never() {
        assert_eq!(format_timestamp(0), "never");
    }
}
