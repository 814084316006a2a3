// Document loading - resolves a document reference into raw bytes
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::{ExtractionError, MediaType, RawDocument};

/// Resolves an opaque document reference into a `RawDocument`.
pub trait DocumentLoader {
    fn fetch(&self, reference: &str) -> Result<RawDocument, ExtractionError>;
}

/// Loads documents from the local filesystem, optionally relative to a root.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    root: Option<PathBuf>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, reference: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(reference),
            None => PathBuf::from(reference),
        }
    }
}

impl DocumentLoader for FileLoader {
    fn fetch(&self, reference: &str) -> Result<RawDocument, ExtractionError> {
        let path = self.resolve(reference);
        let bytes = std::fs::read(&path)?;
        let media_type = detect_media_type(&path, &bytes);
        debug!(
            "Loaded {} ({} bytes, {:?})",
            path.display(),
            bytes.len(),
            media_type
        );
        Ok(RawDocument::new(bytes, media_type, reference))
    }
}

/// Magic bytes win; the extension is only consulted when they say nothing.
pub fn detect_media_type(path: &Path, bytes: &[u8]) -> MediaType {
    match MediaType::sniff(bytes) {
        MediaType::Unknown => path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(MediaType::from_extension)
            .unwrap_or(MediaType::Unknown),
        known => known,
    }
}
