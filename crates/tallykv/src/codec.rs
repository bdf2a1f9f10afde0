//! Backing file codec.
//!
//! The file is plain text with one `key,value` record per line. Fields are
//! whitespace-trimmed on load. Saving writes every record joined by `\n`
//! with no trailing newline, replacing the whole file.

use crate::error::{Result, StoreError};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Field separator within a record line.
pub const FIELD_SEPARATOR: char = ',';

/// Record separator between lines.
pub const RECORD_SEPARATOR: char = '\n';

/// Load records from `path`.
///
/// A missing file yields an empty mapping. The file handle is closed
/// before this returns.
///
/// # Errors
///
/// Returns `StoreError::Load` if the file exists but cannot be read, and
/// `StoreError::MalformedRecord` for any non-blank line that is not a
/// two-field record.
pub fn load(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Backing file {} not found, starting empty", path.display());
            return Ok(BTreeMap::new());
        }
        Err(source) => {
            return Err(StoreError::Load {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let records = decode(path, &content)?;
    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Decode file content into a record mapping.
///
/// Later occurrences of a key overwrite earlier ones. `path` is only used
/// for error reporting.
///
/// # Errors
///
/// Returns `StoreError::MalformedRecord` for a line without exactly two
/// non-empty fields.
pub fn decode(path: &Path, content: &str) -> Result<BTreeMap<String, String>> {
    let mut records = BTreeMap::new();

    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let malformed = |reason: &str| StoreError::MalformedRecord {
            path: path.to_path_buf(),
            line: number + 1,
            reason: reason.to_string(),
        };

        let mut fields = line.split(FIELD_SEPARATOR);
        let (Some(key), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(malformed("expected exactly two comma-separated fields"));
        };

        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() {
            return Err(malformed("empty key"));
        }
        if value.is_empty() {
            return Err(malformed("empty value"));
        }

        records.insert(key.to_string(), value.to_string());
    }

    Ok(records)
}

/// Encode records as file content.
pub fn encode<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut out = String::new();
    for (key, value) in records {
        if !out.is_empty() {
            out.push(RECORD_SEPARATOR);
        }
        out.push_str(key);
        out.push(FIELD_SEPARATOR);
        out.push_str(value);
    }
    out
}

/// Overwrite `path` with the encoded records.
///
/// # Errors
///
/// Returns `StoreError::Save` if the file cannot be written.
pub fn save(path: &Path, records: &BTreeMap<String, String>) -> Result<()> {
    std::fs::write(path, encode(records)).map_err(|source| StoreError::Save {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}
