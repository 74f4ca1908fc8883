//! Flat-file persistence primitives.
//!
//! Two layouts share the same contract ("a named sequence of records on a
//! filesystem path"):
//!
//! - **Document**: one pretty-printed JSON array per file, replaced in full
//!   on every write. Used for small reference tables (users, roles,
//!   objectives, knowledge).
//! - **Log**: one compact JSON object per line, `\n`-terminated. Additions
//!   are O(1) appends; updates rewrite every line in original order. Used
//!   for issues, tasks, and the audit log.
//!
//! All full-file writes go through a temp-file-and-rename replace so that a
//! process killed mid-write never leaves a truncated file visible. Appends
//! are a single `write_all` of one line; offset atomicity of `O_APPEND`
//! below the filesystem block size is an assumed environment guarantee, not
//! something this module arbitrates.

use crate::core::error::StoreError;
use colored::Colorize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// Read a document file as a typed sequence.
///
/// A missing file or an unparseable payload reads as empty: a corrupt or
/// absent reference table degrades to "nothing registered" instead of taking
/// the caller down. Any other I/O failure propagates.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::Io(e)),
    };
    match serde_json::from_str(&raw) {
        Ok(records) => Ok(records),
        Err(e) => {
            warn_skip(path, &format!("unparseable document ({e}), reading as empty"));
            Ok(Vec::new())
        }
    }
}

/// Replace a document file with the full ordered sequence, pretty-printed.
pub fn write_document<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    let mut body = serde_json::to_string_pretty(records)?;
    body.push('\n');
    replace_file(path, body.as_bytes())
}

/// Read a log file line by line.
///
/// Blank lines are ignored and malformed lines are skipped with a warning; a
/// torn final line from a crashed append must not take the rest of the file
/// with it. A missing file reads as empty.
pub fn read_log<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::Io(e)),
    };
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(StoreError::Io)?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(_) => warn_skip(path, &format!("skipped malformed line {}", idx + 1)),
        }
    }
    Ok(records)
}

/// Append one record as a new final line, in a single write call. No read of
/// existing content occurs.
pub fn append_log<T: Serialize>(path: &Path, record: &T) -> Result<(), StoreError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Replace a log file with the full ordered sequence, one line per record.
pub fn rewrite_log<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    let mut body = String::new();
    for record in records {
        body.push_str(&serde_json::to_string(record)?);
        body.push('\n');
    }
    replace_file(path, body.as_bytes())
}

/// Create an empty log file if absent. Idempotent.
pub fn ensure_log(path: &Path) -> Result<(), StoreError> {
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

/// Write `bytes` to a sibling temp file and rename it over `path`.
///
/// The old content stays visible until the new content is complete on disk;
/// an interruption leaves at worst a stale `.tmp` file behind, which the
/// next replace overwrites.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::PathError(format!("{} has no parent directory", path.display())))?;
    let name = path
        .file_name()
        .ok_or_else(|| StoreError::PathError(format!("{} has no file name", path.display())))?;
    let tmp = dir.join(format!(".{}.tmp", name.to_string_lossy()));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn warn_skip(path: &Path, detail: &str) {
    eprintln!(
        "{} {}: {}",
        "warn:".yellow(),
        path.display().to_string().dimmed(),
        detail
    );
}
