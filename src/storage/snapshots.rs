//! Persistent previous/current snapshot pair for one tracked location.
//!
//! Each snapshot is a line-oriented text file. The first line is a header
//! carrying the capture time, then one record per line with whitespace
//! separated fields in a fixed order:
//!
//! ```text
//! # snapdiff snapshot v1 captured_at=1718000000
//! <path> <mtime> <kind+mode> <size> <inode> <reserved>
//! docs/a.txt 1718000000 f0644 10 131075 0
//! docs 1717999000 d0755 0 131074 0
//! ```
//!
//! Paths are percent-escaped so that a value never contains the field
//! delimiter and a record never looks like a header: `%`, `#`, whitespace,
//! control bytes and non-ASCII bytes are written as `%XX`.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the destination, so an interrupted run never leaves a half-written
//! snapshot behind.

use super::{EntryKind, MetadataRecord, Snapshot};
use crate::error::{Result, SnapshotError};
use crate::storage::metadata::{TEMP_SNAPSHOT_PREFIX, TEMP_SNAPSHOT_SUFFIX};
use crate::{CURRENT_SNAPSHOT_FILE, PREVIOUS_SNAPSHOT_FILE};
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Header prefix written on the first line of every snapshot file.
const HEADER_PREFIX: &str = "# snapdiff snapshot v1";

/// Number of whitespace separated fields in a record line.
const FIELD_COUNT: usize = 6;

/// Owns the on-disk snapshot pair inside one state directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    state_dir: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `state_dir`. Nothing is touched on disk until
    /// the first save.
    #[must_use]
    pub const fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Directory holding the snapshot pair.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of the "previous" snapshot file.
    #[must_use]
    pub fn previous_path(&self) -> PathBuf {
        self.state_dir.join(PREVIOUS_SNAPSHOT_FILE)
    }

    /// Path of the "current" snapshot file.
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.state_dir.join(CURRENT_SNAPSHOT_FILE)
    }

    /// Load the baseline of the last run.
    ///
    /// A missing file is a first run and yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreReadFailed` if the file exists but cannot be read, and
    /// `StoreCorrupt` if a line does not parse.
    pub fn load_previous(&self) -> Result<Snapshot> {
        load_snapshot_file(&self.previous_path())
    }

    /// Load the most recently written "current" snapshot.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load_previous`].
    pub fn load_current(&self) -> Result<Snapshot> {
        load_snapshot_file(&self.current_path())
    }

    /// Atomically write `snapshot` as the new "current".
    ///
    /// # Errors
    ///
    /// Returns `StoreWriteFailed` if the state directory cannot be created or
    /// the temporary file cannot be written or renamed into place.
    pub fn save_current(&self, snapshot: &Snapshot) -> Result<()> {
        let target = self.current_path();
        let encoded = encode_snapshot(snapshot);
        self.write_atomic(&target, encoded.as_bytes())?;
        debug!(
            path = %target.display(),
            records = snapshot.len(),
            "Saved current snapshot"
        );
        Ok(())
    }

    /// Promote "current" to "previous" by copying it.
    ///
    /// "current" stays in place so it remains readable until the next run
    /// overwrites it. Returns `false` when there is no current snapshot yet.
    ///
    /// # Errors
    ///
    /// Returns `StoreReadFailed` if "current" cannot be read and
    /// `StoreWriteFailed` if "previous" cannot be replaced.
    pub fn rotate(&self) -> Result<bool> {
        let source = self.current_path();
        let data = match fs::read(&source) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(source_err) => {
                return Err(SnapshotError::StoreReadFailed {
                    path: source,
                    source: source_err,
                });
            }
        };

        let target = self.previous_path();
        self.write_atomic(&target, &data)?;
        debug!(from = %source.display(), to = %target.display(), "Rotated snapshot");
        Ok(true)
    }

    /// Returns true if a "previous" baseline exists.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.previous_path().exists()
    }

    /// Write `data` to `target` through a temporary file in the same directory.
    fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<()> {
        let write_failed = |source: io::Error| SnapshotError::StoreWriteFailed {
            path: target.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.state_dir).map_err(write_failed)?;

        let temp = tempfile::Builder::new()
            .prefix(TEMP_SNAPSHOT_PREFIX)
            .suffix(TEMP_SNAPSHOT_SUFFIX)
            .tempfile_in(&self.state_dir)
            .map_err(write_failed)?;

        write_and_sync(&temp, data).map_err(write_failed)?;

        temp.persist(target)
            .map_err(|persist_err| write_failed(persist_err.error))?;
        Ok(())
    }
}

/// Write all bytes and flush them to stable storage.
fn write_and_sync(temp: &NamedTempFile, data: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::new(temp.as_file());
    writer.write_all(data)?;
    writer.flush()?;
    drop(writer);
    temp.as_file().sync_all()
}

/// Read and decode a snapshot file; a missing file is an empty snapshot.
fn load_snapshot_file(path: &Path) -> Result<Snapshot> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::empty()),
        Err(source) => {
            return Err(SnapshotError::StoreReadFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    decode_snapshot(&contents).map_err(|(line, reason)| SnapshotError::StoreCorrupt {
        path: path.to_path_buf(),
        line,
        reason,
    })
}

/// Serialize a snapshot into its text form.
#[must_use]
pub fn encode_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::with_capacity(64 + snapshot.len() * 48);
    out.push_str(HEADER_PREFIX);
    out.push_str(&format!(" captured_at={}\n", snapshot.captured_at));
    for record in &snapshot.records {
        out.push_str(&encode_record(record));
        out.push('\n');
    }
    out
}

/// Parse the text form of a snapshot.
///
/// # Errors
///
/// Returns the one-based line number and a reason for the first line that
/// does not parse.
pub fn decode_snapshot(data: &[u8]) -> std::result::Result<Snapshot, (usize, String)> {
    let mut snapshot = Snapshot::empty();

    for (index, raw) in data.split(|&b| b == b'\n').enumerate() {
        let line_no = index + 1;
        let line = std::str::from_utf8(raw)
            .map_err(|_| (line_no, "line is not valid UTF-8".to_string()))?
            .trim_end_matches('\r');

        if line.trim().is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('#') {
            if let Some(ts) = parse_captured_at(header) {
                snapshot.captured_at = ts;
            }
            continue;
        }

        let record = decode_record(line).map_err(|reason| (line_no, reason))?;
        snapshot.records.push(record);
    }

    Ok(snapshot)
}

fn parse_captured_at(header: &str) -> Option<i64> {
    header
        .split_whitespace()
        .find_map(|field| field.strip_prefix("captured_at="))
        .and_then(|value| value.parse().ok())
}

/// Encode one record as a single line without the trailing newline.
#[must_use]
pub fn encode_record(record: &MetadataRecord) -> String {
    format!(
        "{} {} {}{:04o} {} {} {}",
        escape_path(&record.path),
        record.modified_at,
        record.kind.as_char(),
        record.mode,
        record.size,
        record.identity,
        u8::from(record.is_reserved_artifact),
    )
}

/// Decode a single record line.
///
/// # Errors
///
/// Returns a human-readable reason when the field count or any field value
/// is invalid.
pub fn decode_record(line: &str) -> std::result::Result<MetadataRecord, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != FIELD_COUNT {
        return Err(format!(
            "expected {FIELD_COUNT} fields, found {}",
            fields.len()
        ));
    }

    let path = unescape_path(fields[0])?;
    let modified_at: i64 = fields[1]
        .parse()
        .map_err(|_| format!("invalid modification time '{}'", fields[1]))?;

    let mut kind_mode = fields[2].chars();
    let kind = kind_mode
        .next()
        .and_then(EntryKind::from_char)
        .ok_or_else(|| format!("invalid kind in '{}'", fields[2]))?;
    let mode = u32::from_str_radix(kind_mode.as_str(), 8)
        .map_err(|_| format!("invalid mode in '{}'", fields[2]))?;

    let size: u64 = fields[3]
        .parse()
        .map_err(|_| format!("invalid size '{}'", fields[3]))?;
    let identity: u64 = fields[4]
        .parse()
        .map_err(|_| format!("invalid identity '{}'", fields[4]))?;
    let is_reserved_artifact = match fields[5] {
        "0" => false,
        "1" => true,
        other => return Err(format!("invalid reserved flag '{other}'")),
    };

    Ok(MetadataRecord {
        path,
        identity,
        kind,
        mode,
        size,
        modified_at,
        is_reserved_artifact,
    })
}

/// Percent-escape a path so it contains no whitespace or `#` and only ASCII.
#[must_use]
pub fn escape_path(path: &Path) -> String {
    let bytes = path.as_os_str().as_bytes();
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b == b'%' || b == b'#' || b <= b' ' || b >= 0x7f {
            out.push_str(&format!("%{b:02X}"));
        } else {
            out.push(char::from(b));
        }
    }
    out
}

/// Reverse of [`escape_path`].
///
/// # Errors
///
/// Returns a reason if a `%` is not followed by two hex digits or the path
/// is empty.
pub fn unescape_path(field: &str) -> std::result::Result<PathBuf, String> {
    if field.is_empty() {
        return Err("empty path".to_string());
    }

    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = field
                .get(i + 1..i + 3)
                .ok_or_else(|| format!("truncated escape in path '{field}'"))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| format!("invalid escape '%{hex}' in path '{field}'"))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Ok(PathBuf::from(OsString::from_vec(out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(path: &str, identity: u64) -> MetadataRecord {
        MetadataRecord {
            path: PathBuf::from(path),
            identity,
            kind: EntryKind::File,
            mode: 0o644,
            size: 10,
            modified_at: 100,
            is_reserved_artifact: false,
        }
    }

    #[test]
    fn test_load_previous_missing_is_empty() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = SnapshotStore::new(temp.path().join("state"));
        let snapshot = store.load_previous()?;
        assert!(snapshot.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_empty_file_has_zero_records() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = SnapshotStore::new(temp.path().to_path_buf());
        fs::write(store.previous_path(), "")?;
        assert!(store.load_previous()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_save_then_load_current() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = SnapshotStore::new(temp.path().join("state"));
        let snapshot = Snapshot {
            captured_at: 1_700_000_000,
            records: vec![record("a.txt", 1), record("dir/b c.txt", 2)],
        };

        store.save_current(&snapshot)?;
        let loaded = store.load_current()?;

        assert_eq!(loaded, snapshot);
        Ok(())
    }

    #[test]
    fn test_rotate_copies_current() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = SnapshotStore::new(temp.path().to_path_buf());
        assert!(!store.rotate()?);

        let snapshot = Snapshot::new(vec![record("a.txt", 1)]);
        store.save_current(&snapshot)?;
        assert!(store.rotate()?);

        assert!(store.current_path().exists());
        assert_eq!(store.load_previous()?, store.load_current()?);
        Ok(())
    }

    #[test]
    fn test_save_leaves_no_temp_files() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = SnapshotStore::new(temp.path().to_path_buf());
        store.save_current(&Snapshot::new(vec![record("a", 1)]))?;
        store.rotate()?;

        let leftovers: Vec<_> = fs::read_dir(temp.path())?
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(TEMP_SNAPSHOT_SUFFIX))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    #[test]
    fn test_corrupt_line_reports_line_number() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = SnapshotStore::new(temp.path().to_path_buf());
        fs::write(
            store.previous_path(),
            "# snapdiff snapshot v1 captured_at=5\na.txt 100 f0644 10 1 0\nbroken line\n",
        )?;

        match store.load_previous() {
            Err(SnapshotError::StoreCorrupt { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected StoreCorrupt, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_header_timestamp_is_parsed() {
        let data = b"# snapdiff snapshot v1 captured_at=42\n";
        let snapshot = decode_snapshot(data).expect("valid header");
        assert_eq!(snapshot.captured_at, 42);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_escape_whitespace_and_percent() {
        let escaped = escape_path(Path::new("my dir/100%\tdone"));
        assert_eq!(escaped, "my%20dir/100%25%09done");
        assert_eq!(
            unescape_path(&escaped).expect("valid escape"),
            PathBuf::from("my dir/100%\tdone")
        );
    }

    #[test]
    fn test_hash_prefixed_path_survives_reload() {
        let snapshot = Snapshot {
            captured_at: 9,
            records: vec![record("#notes.txt#", 7), record("dir/#draft", 8)],
        };

        let encoded = encode_snapshot(&snapshot);
        assert!(encoded.contains("%23notes.txt%23 "));

        let decoded = decode_snapshot(encoded.as_bytes()).expect("valid snapshot");
        assert_eq!(decoded, snapshot);
        assert!(crate::diff::diff(&decoded, &snapshot).is_empty());
    }

    #[test]
    fn test_unescape_rejects_truncated_escape() {
        assert!(unescape_path("abc%4").is_err());
        assert!(unescape_path("abc%zz").is_err());
    }

    #[test]
    fn test_decode_record_rejects_bad_kind() {
        let err = decode_record("a 1 x0644 1 1 0").expect_err("bad kind");
        assert!(err.contains("kind"));
    }
}
