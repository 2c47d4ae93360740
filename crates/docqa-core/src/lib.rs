//! docqa Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout docqa:
//! - Document, chunk and answer models
//! - Common error types
//! - The completion collaborator trait
//! - Configuration management
//! - Retry policy for collaborator calls

pub mod config;
pub mod retry;

pub use config::{
    AppConfig, ConfigError, Distance, LlmConfig, LoggingConfig, RagConfig, RetryConfig,
    StoreBackend, StoreConfig,
};
pub use retry::RetryPolicy;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// External services the pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Embedding,
    Completion,
    VectorStore,
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedding => write!(f, "embedding service"),
            Self::Completion => write!(f, "completion service"),
            Self::VectorStore => write!(f, "vector store"),
        }
    }
}

/// Core error types for docqa operations
#[derive(Error, Debug)]
pub enum DocqaError {
    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: Collaborator,
        message: String,
    },

    #[error("{collaborator} timed out after {timeout:?}")]
    Timeout {
        collaborator: Collaborator,
        timeout: Duration,
    },

    #[error("{collaborator} returned HTTP {status}: {body}")]
    HttpStatus {
        collaborator: Collaborator,
        status: u16,
        body: String,
    },

    #[error("Malformed {collaborator} response: {message}")]
    MalformedResponse {
        collaborator: Collaborator,
        message: String,
    },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocqaError {
    /// Shorthand for a transport-level failure of a collaborator
    pub fn unavailable(collaborator: Collaborator, message: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator,
            message: message.into(),
        }
    }

    /// Shorthand for an unparseable collaborator response
    pub fn malformed(collaborator: Collaborator, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            collaborator,
            message: message.into(),
        }
    }

    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CollaboratorUnavailable { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// The collaborator that caused this error, if any
    pub fn collaborator(&self) -> Option<Collaborator> {
        match self {
            Self::CollaboratorUnavailable { collaborator, .. }
            | Self::Timeout { collaborator, .. }
            | Self::HttpStatus { collaborator, .. }
            | Self::MalformedResponse { collaborator, .. } => Some(*collaborator),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DocqaError>;

// ============================================================================
// Document Models
// ============================================================================

/// A raw corpus document, the unit of ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable document identity (part of every record id)
    pub id: String,

    /// Full text content
    pub text: String,
}

impl Document {
    /// Create a new document
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A bounded, sentence-aligned segment of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position within the document (0-based)
    pub index: usize,

    /// Text content
    pub text: String,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Derive the store id of a chunk.
///
/// The id is a name-based UUID of the document identity and chunk index, so
/// re-ingesting an unchanged document addresses the same records.
pub fn chunk_record_id(document_id: &str, chunk_index: usize) -> Uuid {
    let name = format!("docqa:{document_id}:{chunk_index}");
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}

// ============================================================================
// Retrieval and Answer Types
// ============================================================================

/// Chunk texts ranked by descending similarity to a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunks: Vec<String>,
}

impl RetrievalResult {
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }
}

/// Sentinel text shown when no answer could be extracted
pub const NO_ANSWER: &str = "no answer available";

/// Synthesized answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Answer {
    /// Text extracted from the completion response
    Text(String),
    /// The completion response carried no recognizable answer
    Unavailable,
}

impl Answer {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Unavailable => NO_ANSWER,
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Unavailable => write!(f, "[{NO_ANSWER}]"),
        }
    }
}

/// RAG response for a single question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Synthesized answer
    pub answer: Answer,

    /// Context the answer was generated from
    pub context: RetrievalResult,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for text-completion clients
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a prompt and return the raw response body.
    ///
    /// Interpreting the body is left to the caller because its schema
    /// varies across backends.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model name used for completions
    fn model(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_is_deterministic() {
        assert_eq!(chunk_record_id("vault.txt", 3), chunk_record_id("vault.txt", 3));
        assert_eq!(chunk_record_id("vault.txt", 3).get_version_num(), 5);
    }

    #[test]
    fn test_record_id_distinguishes_index_and_document() {
        let base = chunk_record_id("vault.txt", 0);
        assert_ne!(base, chunk_record_id("vault.txt", 1));
        assert_ne!(base, chunk_record_id("notes.txt", 0));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(DocqaError::unavailable(Collaborator::Embedding, "refused").is_retryable());
        assert!(DocqaError::Timeout {
            collaborator: Collaborator::Completion,
            timeout: Duration::from_secs(1),
        }
        .is_retryable());
        assert!(DocqaError::HttpStatus {
            collaborator: Collaborator::VectorStore,
            status: 503,
            body: String::new(),
        }
        .is_retryable());
        assert!(!DocqaError::HttpStatus {
            collaborator: Collaborator::VectorStore,
            status: 404,
            body: String::new(),
        }
        .is_retryable());
        assert!(!DocqaError::DimensionMismatch {
            expected: 4,
            actual: 3
        }
        .is_retryable());
        assert!(!DocqaError::malformed(Collaborator::Embedding, "no field").is_retryable());
    }

    #[test]
    fn test_answer_display() {
        assert_eq!(Answer::Text("Paris".to_string()).to_string(), "Paris");
        assert_eq!(Answer::Unavailable.to_string(), "[no answer available]");
        assert_eq!(Answer::Unavailable.as_str(), NO_ANSWER);
        assert!(!Answer::Unavailable.is_available());
    }

    #[test]
    fn test_answer_serialization() {
        assert_eq!(
            serde_json::to_value(Answer::Text("Paris".to_string())).unwrap(),
            serde_json::json!({"kind": "text", "text": "Paris"})
        );
        assert_eq!(
            serde_json::to_value(Answer::Unavailable).unwrap(),
            serde_json::json!({"kind": "unavailable"})
        );
    }

    #[test]
    fn test_chunk_len_counts_chars() {
        let chunk = Chunk::new(0, "héllo");
        assert_eq!(chunk.len(), 5);
    }
}
