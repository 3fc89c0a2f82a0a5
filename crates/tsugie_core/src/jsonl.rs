//! Generic newline-delimited JSON helpers shared by every stage's
//! persisted run artifacts (§6: `events_fused.jsonl`, `events_content.jsonl`,
//! the scoring stage's JSONL, …).

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CoreError;

/// Writes `records` as one JSON object per line, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`CoreError`] on I/O or serialization failure.
pub fn write<T: Serialize>(path: &Path, records: &[T]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    for record in records {
        serde_json::to_writer(&mut file, record)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Reads every well-formed line of `path` as `T`, skipping blank lines.
/// A missing file yields an empty vec rather than an error, matching
/// `RawRecord::read_site_file`'s "absence is silently skipped" policy.
///
/// # Errors
///
/// Returns [`CoreError`] if a non-blank line fails to parse.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CoreError> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push(serde_json::from_str(trimmed)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Row {
        id: String,
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        let rows = vec![Row { id: "a".into() }, Row { id: "b".into() }];
        write(&path, &rows).unwrap();
        let read_back: Vec<Row> = read(&path).unwrap();
        assert_eq!(read_back, rows);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let rows: Vec<Row> = read(std::path::Path::new("/nonexistent/rows.jsonl")).unwrap();
        assert!(rows.is_empty());
    }
}
