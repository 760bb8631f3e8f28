//! Delivery of finished PDFs
//!
//! A [`DocumentSink`] receives the PDF bytes under a generated file name.
//! [`DirectorySink`] writes into a directory through a temporary file so a
//! failed write never leaves a partial PDF behind.

use crate::output::AssemblyError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Prefix of every exported file name
pub const FILE_NAME_PREFIX: &str = "markdown-document";

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("Failed to write {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Export task did not complete: {0}")]
    Interrupted(String),
}

/// Where finished documents go
pub trait DocumentSink: Send + Sync {
    /// Store `bytes` under `file_name` and return where it ended up
    fn persist(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, PersistError>;
}

/// Writes documents into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DocumentSink for DirectorySink {
    fn persist(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(PersistError::InvalidName(file_name.to_string()));
        }

        let io_error = |source| PersistError::Io {
            path: self.dir.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_error)?;

        let mut file = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        file.write_all(bytes).map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;

        let target = self.dir.join(file_name);
        file.persist(&target).map_err(|e| PersistError::Io {
            path: target.clone(),
            source: e.error,
        })?;

        log::info!("Wrote {} ({} bytes)", target.display(), bytes.len());
        Ok(target)
    }
}

/// File name for an export started at `millis` since the Unix epoch
pub fn export_file_name(millis: u128) -> String {
    format!("{FILE_NAME_PREFIX}-{millis}.pdf")
}

/// Milliseconds since the Unix epoch
pub fn current_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(1_700_000_000_000),
            "markdown-document-1700000000000.pdf"
        );
    }

    #[test]
    fn test_current_millis_is_recent() {
        // 2020-01-01
        assert!(current_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));

        let path = sink.persist("doc.pdf", b"%PDF-1.7").unwrap();

        assert_eq!(path, dir.path().join("out").join("doc.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        // Only the final file remains
        assert_eq!(std::fs::read_dir(dir.path().join("out")).unwrap().count(), 1);
    }

    #[test]
    fn test_directory_sink_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());

        for name in ["", "../escape.pdf", "a/b.pdf", ".hidden"] {
            let err = sink.persist(name, b"x").unwrap_err();
            assert!(matches!(err, PersistError::InvalidName(_)), "{name}");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_directory_sink_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let sink = DirectorySink::new(&blocker);

        let err = sink.persist("doc.pdf", b"x").unwrap_err();

        assert!(matches!(err, PersistError::Io { .. }));
    }
}
