//! Loads vector records from a production output directory.

use crate::corpus::record::{DocumentVector, VECTOR_FILE_SUFFIX};
use crate::error::{AnalysisError, RunResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reads every `*_vector.json` record in `dir`, sorted by file name.
///
/// A missing directory yields an empty list. Files that cannot be read or
/// do not parse as a record are skipped with a warning. Nothing is cached;
/// every call re-reads the directory.
///
/// # Errors
/// Returns [`AnalysisError::FileRead`] when the directory exists but
/// cannot be listed.
pub fn load_document_vectors(dir: &Path) -> RunResult<Vec<DocumentVector>> {
    if !dir.exists() {
        debug!("Vector directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| AnalysisError::FileRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_vector_file(path))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut records = Vec::with_capacity(files.len());
    for path in files {
        match read_record(&path) {
            Ok(record) => records.push(record),
            Err(reason) => warn!("Failed to load {}: {reason}", file_label(&path)),
        }
    }

    Ok(records)
}

fn is_vector_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(VECTOR_FILE_SUFFIX))
}

fn read_record(path: &Path) -> Result<DocumentVector, String> {
    let json = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&json).map_err(|e| e.to_string())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let records = load_document_vectors(&temp_dir.path().join("nope")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_loads_sorted_and_filters_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "0002_b_vector.json", r#"{"document_id": "b"}"#);
        write(dir, "0001_a_vector.json", r#"{"document_id": "a"}"#);
        write(dir, "0003_c_summary.json", r#"{"document_id": "c"}"#);
        write(dir, "notes.txt", "not a record");

        let records = load_document_vectors(dir).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_malformed_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "0001_a_vector.json", r#"{"document_id": "a"}"#);
        write(dir, "0002_b_vector.json", "{ not json");
        write(dir, "0003_c_vector.json", r#"{"index": 3}"#);
        write(dir, "0004_d_vector.json", r#"{"document_id": "d", "vector": {"embedding": null}}"#);

        let records = load_document_vectors(dir).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_directory_named_like_vector_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("0001_x_vector.json")).unwrap();
        assert!(load_document_vectors(temp_dir.path()).unwrap().is_empty());
    }
}
