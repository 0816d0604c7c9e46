//! Crash-safe document writes and append-only record logs.

use crate::{fsync_dir, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// Serialization happens before anything touches the filesystem, and the
/// final rename is the only mutation of `path`: a reader sees either the
/// previous document or the new one.
pub fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    write_bytes(path, content.as_bytes())
}

/// Atomically replace `path` with `data` via a temp file in the same directory.
pub fn write_bytes(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(dir)?;

    tracing::trace!("wrote {} ({} bytes)", path.display(), data.len());
    Ok(())
}

/// Read and parse a JSON document. `Ok(None)` when the file does not exist.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

/// Append one newline-terminated JSON record to `path`.
///
/// Not atomic against other appenders; callers hold the store lock.
pub fn append_event<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');

    fs::create_dir_all(parent_dir(path))?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.sync_data()?;
    Ok(())
}

/// Read every record of a JSON-lines log. Blank lines are ignored and
/// malformed lines are skipped with a warning. A missing log reads as empty.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("skipping malformed record {}:{}: {e}", path.display(), idx + 1);
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
        tags: Vec<String>,
        nested: HashMap<String, Option<bool>>,
    }

    fn sample() -> Doc {
        let mut nested = HashMap::new();
        nested.insert("yes".to_owned(), Some(true));
        nested.insert("unknown".to_owned(), None);
        Doc {
            name: "mascot \"quoted\" \u{1F408}".to_owned(),
            count: 7,
            tags: vec!["a".to_owned(), String::new()],
            nested,
        }
    }

    #[test]
    fn document_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &sample()).unwrap();
        let back: Doc = read_document(&path).unwrap().unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn document_ends_with_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &serde_json::json!({"states": {}})).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with("}\n"));
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c/doc.json");
        write_document(&path, &sample()).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn read_missing_document_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing: Option<Doc> = read_document(&dir.path().join("nope.json")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn read_corrupt_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "{ not json").unwrap();
        let result: Result<Option<Doc>, _> = read_document(&path);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn abandoned_temp_file_leaves_prior_version_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &sample()).unwrap();

        // A writer killed after creating and filling its temp file but
        // before the rename leaves a stray file behind and nothing else.
        let mut tmp = NamedTempFile::new_in(dir.path()).unwrap();
        tmp.write_all(b"{\"name\": \"half").unwrap();
        let _stray = tmp.into_temp_path().keep().unwrap();

        let back: Doc = read_document(&path).unwrap().unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn failed_serialization_does_not_touch_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &sample()).unwrap();
        let before = fs::read(&path).unwrap();

        // Non-string map keys cannot be rendered as JSON.
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        assert!(write_document(&path, &bad).is_err());

        assert_eq!(fs::read(&path).unwrap(), before);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "no temp file may be created before serialization succeeds");
    }

    #[test]
    fn overwrite_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &serde_json::json!({"a": 1, "b": 2})).unwrap();
        write_document(&path, &serde_json::json!({"c": 3})).unwrap();
        let back: serde_json::Value = read_document(&path).unwrap().unwrap();
        assert_eq!(back, serde_json::json!({"c": 3}));
    }

    #[test]
    fn append_preserves_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals/events.jsonl");
        append_event(&path, &serde_json::json!({"type": "a", "n": 1})).unwrap();
        append_event(&path, &serde_json::json!({"type": "b", "n": 2})).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.ends_with('\n'));

        let records: Vec<serde_json::Value> = read_records(&path).unwrap();
        assert_eq!(records[0]["type"], "a");
        assert_eq!(records[1]["n"], 2);
    }

    #[test]
    fn read_records_skips_malformed_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        fs::write(&path, "{\"n\":1}\n\ngarbage\n{\"n\":2}\n").unwrap();
        let records: Vec<serde_json::Value> = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn read_records_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<serde_json::Value> =
            read_records(&dir.path().join("events.jsonl")).unwrap();
        assert!(records.is_empty());
    }
}
