//! Where the original document bytes come from

use crate::FormFillError;
use std::path::{Path, PathBuf};

/// Supplies the bytes of the document that widgets are added to.
///
/// Fetching happens only after inference found at least one field.
pub trait DocumentSource {
    fn fetch(&self) -> Result<Vec<u8>, FormFillError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Document stored on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DocumentSource for FileSource {
    fn fetch(&self) -> Result<Vec<u8>, FormFillError> {
        std::fs::read(&self.path)
            .map_err(|e| FormFillError::Retrieval(format!("{}: {}", self.path.display(), e)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Document already held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl DocumentSource for MemorySource {
    fn fetch(&self) -> Result<Vec<u8>, FormFillError> {
        if self.bytes.is_empty() {
            return Err(FormFillError::Retrieval("document is empty".into()));
        }
        Ok(self.bytes.clone())
    }

    fn describe(&self) -> String {
        format!("<memory, {} bytes>", self.bytes.len())
    }
}
