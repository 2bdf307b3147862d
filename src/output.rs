//! Flat-file outputs: discovered-name/URL lists, sentinel markers for
//! top-level failures, and the signature-directory walk.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};
use walkdir::WalkDir;

use crate::fetch::FetchError;

/// Appends lines to a text file, creating it if needed.
///
/// Each call writes its batch newline-terminated so consecutive batches
/// never run together.
///
/// # Errors
///
/// Returns the underlying IO error if the file cannot be opened or written.
pub fn append_lines(path: &Path, lines: &[String]) -> io::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut batch = lines.join("\n");
    batch.push('\n');
    file.write_all(batch.as_bytes())
}

/// Maps a top-level discovery failure to its sentinel marker name.
///
/// Only the three triage categories get a marker: authorization failure,
/// not-found, and body-read failure.
#[must_use]
pub fn sentinel_name(error: &FetchError) -> Option<&'static str> {
    match error {
        FetchError::HttpStatus { status: 401, .. } => Some("401"),
        FetchError::HttpStatus { status: 404, .. } => Some("404"),
        FetchError::BodyRead { .. } => Some("body error"),
        _ => None,
    }
}

/// Records a top-level discovery failure as an empty marker file in the
/// output directory, for later batch triage.
///
/// Failures outside the three triage categories leave no marker.
///
/// # Errors
///
/// Returns the underlying IO error if the marker cannot be written.
pub fn record_discovery_failure(output_dir: &Path, error: &FetchError) -> io::Result<()> {
    let Some(name) = sentinel_name(error) else {
        return Ok(());
    };
    warn!(marker = name, "recording discovery failure marker");
    std::fs::write(output_dir.join(name), b"")
}

/// Recursively collects every regular file under a directory.
///
/// Unreadable entries are logged and skipped; a partial walk is still
/// useful output.
#[must_use]
pub fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => paths.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => error!(error = %e, "error walking signature directory"),
        }
    }
    paths
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_append_lines_batches_are_separated() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("names.txt");
        append_lines(&path, &["a.txt".to_string(), "b.txt".to_string()]).unwrap();
        append_lines(&path, &["c.txt".to_string()]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "a.txt\nb.txt\nc.txt\n"
        );
    }

    #[test]
    fn test_append_lines_empty_batch_creates_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("names.txt");
        append_lines(&path, &[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_sentinel_classification() {
        assert_eq!(
            sentinel_name(&FetchError::http_status("http://dp/x", 401)),
            Some("401")
        );
        assert_eq!(
            sentinel_name(&FetchError::http_status("http://dp/x", 404)),
            Some("404")
        );
        assert_eq!(
            sentinel_name(&FetchError::http_status("http://dp/x", 500)),
            None
        );
        assert_eq!(sentinel_name(&FetchError::timeout("http://dp/x")), None);
    }

    #[test]
    fn test_record_discovery_failure_writes_empty_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        let error = FetchError::http_status("http://dp/Datalib", 404);
        record_discovery_failure(dir.path(), &error).unwrap();
        let marker = dir.path().join("404");
        assert!(marker.exists());
        assert_eq!(std::fs::metadata(&marker).unwrap().len(), 0);
    }

    #[test]
    fn test_walk_files_recurses_and_skips_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        std::fs::write(dir.path().join("top.tar"), b"x").unwrap();
        std::fs::write(dir.path().join("nested/deeper/inner.tar"), b"y").unwrap();

        let mut found = walk_files(dir.path());
        found.sort();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.is_file()));
    }
}
