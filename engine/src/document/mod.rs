//! Document text extraction
//!
//! The doc agent needs the full text of a loaded document before it can ask
//! about it. PDFs go through `pdf-extract`; plain text and markdown files are
//! read as-is.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Error reading PDF: {0}")]
    Pdf(String),

    #[error("Error reading document: {0}")]
    Io(String),

    #[error("Error reading document: unsupported file type '{0}'")]
    Unsupported(String),
}

/// Extracts raw text from a document on disk
pub trait DocumentReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<String, DocumentError>;
}

/// Reads PDF, text and markdown files from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDocumentReader;

impl DocumentReader for FileDocumentReader {
    fn read(&self, path: &Path) -> Result<String, DocumentError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => {
                let bytes = std::fs::read(path)
                    .map_err(|e| DocumentError::Pdf(format!("{}: {}", path.display(), e)))?;
                let text = pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| DocumentError::Pdf(e.to_string()))?;
                tracing::debug!("Extracted {} chars from {}", text.len(), path.display());
                Ok(text)
            }
            "txt" | "md" => std::fs::read_to_string(path)
                .map_err(|e| DocumentError::Io(format!("{}: {}", path.display(), e))),
            other => Err(DocumentError::Unsupported(other.to_string())),
        }
    }
}
