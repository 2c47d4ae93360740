//! docqa Parser - Document loading and chunking
//!
//! Loads plain text and Markdown files into [`Document`]s and splits them
//! into bounded, sentence-aligned [`Chunk`]s ready for embedding.

use docqa_core::Document;
use std::path::Path;
use thiserror::Error;

pub mod chunker;

pub use chunker::{chunk_document, chunk_text, split_sentences, SENTENCE_DELIMITER};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading a document
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid UTF-8
    #[error("Text encoding error: {0}")]
    EncodingError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// File Types
// ============================================================================

/// Supported file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Markdown,
    PlainText,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" => Self::Markdown,
            "txt" | "text" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Get MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown",
            Self::PlainText => "text/plain",
            Self::Unknown => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::PlainText => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Default document identity for a path: its file name
pub fn document_id_for(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a text document from disk.
///
/// `id` overrides the document identity; by default the file name is used so
/// that re-ingesting the same file addresses the same records.
pub fn load_document(path: &Path, id: Option<&str>) -> Result<Document> {
    let file_type = FileType::from_path(path);
    if file_type == FileType::Unknown {
        return Err(ParserError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("none")
                .to_string(),
        ));
    }

    let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    let text = String::from_utf8(bytes)
        .map_err(|e| ParserError::EncodingError(format!("{}: {e}", path.display())))?;
    let text = text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text);

    let id = id.map(str::to_string).unwrap_or_else(|| document_id_for(path));
    tracing::debug!(
        document_id = %id,
        file_type = %file_type,
        chars = text.chars().count(),
        "Loaded document"
    );

    Ok(Document::new(id, text))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("txt"), FileType::PlainText);
        assert_eq!(FileType::from_extension("MD"), FileType::Markdown);
        assert_eq!(FileType::from_extension("pdf"), FileType::Unknown);
        assert_eq!(
            FileType::from_path(Path::new("notes/vault.txt")),
            FileType::PlainText
        );
        assert_eq!(FileType::from_path(Path::new("README")), FileType::Unknown);
    }

    #[test]
    fn test_load_document_defaults_id_to_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "\u{feff}Cats are mammals. Dogs are mammals too.").unwrap();

        let doc = load_document(&path, None).unwrap();
        assert_eq!(doc.id, "vault.txt");
        assert_eq!(doc.text, "Cats are mammals. Dogs are mammals too.");

        let doc = load_document(&path, Some("pets")).unwrap();
        assert_eq!(doc.id, "pets");
    }

    #[test]
    fn test_load_document_rejects_unknown_format() {
        let err = load_document(Path::new("report.pdf"), None).unwrap_err();
        assert!(matches!(err, ParserError::UnsupportedFormat(ext) if ext == "pdf"));
    }

    #[test]
    fn test_load_document_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("missing.txt"), None).unwrap_err();
        assert!(matches!(err, ParserError::IoError { .. }));
    }

    #[test]
    fn test_load_document_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let err = load_document(&path, None).unwrap_err();
        assert!(matches!(err, ParserError::EncodingError(_)));
    }
}
