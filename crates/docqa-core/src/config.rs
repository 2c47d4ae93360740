//! docqa Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with defaults suited to a local Ollama + vector store setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Vector store connection
    pub store: StoreConfig,

    /// Embedding and completion services
    pub llm: LlmConfig,

    /// Chunking and retrieval settings
    pub rag: RagConfig,

    /// Timeouts and retries for collaborator calls
    pub retry: RetryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with process environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Vector store
        if let Some(backend) = lookup("VECTOR_STORE") {
            self.store.backend = backend.parse()?;
        }
        if let Some(url) = lookup("VECTOR_STORE_URL") {
            self.store.url = url;
        }
        if let Some(collection) = lookup("VECTOR_COLLECTION") {
            self.store.collection = collection;
        }
        if let Some(dimension) = lookup("VECTOR_DIMENSION") {
            self.store.vector_dimension = parse_var("VECTOR_DIMENSION", dimension)?;
        }
        if let Some(distance) = lookup("VECTOR_DISTANCE") {
            self.store.distance = distance.parse()?;
        }

        // Embedding / completion services
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }
        if let Some(endpoint) = lookup("EMBEDDING_ENDPOINT") {
            self.llm.embedding_endpoint = endpoint;
        }
        if let Some(model) = lookup("COMPLETION_MODEL") {
            self.llm.completion_model = model;
        }
        if let Some(endpoint) = lookup("COMPLETION_ENDPOINT") {
            self.llm.completion_endpoint = endpoint;
        }
        if let Some(max_tokens) = lookup("MAX_TOKENS") {
            self.llm.max_tokens = parse_var("MAX_TOKENS", max_tokens)?;
        }
        if let Some(temperature) = lookup("TEMPERATURE") {
            self.llm.temperature = parse_var("TEMPERATURE", temperature)?;
        }

        // RAG
        if let Some(length) = lookup("CHUNK_MAX_LENGTH") {
            self.rag.chunk_max_length = parse_var("CHUNK_MAX_LENGTH", length)?;
        }
        if let Some(top_k) = lookup("TOP_K") {
            self.rag.top_k = parse_var("TOP_K", top_k)?;
        }
        if let Some(concurrency) = lookup("INGEST_CONCURRENCY") {
            self.rag.ingest_concurrency = parse_var("INGEST_CONCURRENCY", concurrency)?;
        }

        // Retry
        if let Some(attempts) = lookup("RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_var("RETRY_MAX_ATTEMPTS", attempts)?;
        }
        if let Some(timeout) = lookup("REQUEST_TIMEOUT_SECS") {
            self.retry.timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", timeout)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_var("LOG_JSON", json)?;
        }

        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::MissingRequired("store.collection".to_string()));
        }
        if self.store.vector_dimension == 0 {
            return Err(invalid("store.vector_dimension", 0));
        }
        if self.llm.embedding_model.trim().is_empty() {
            return Err(ConfigError::MissingRequired("llm.embedding_model".to_string()));
        }
        if self.llm.completion_model.trim().is_empty() {
            return Err(ConfigError::MissingRequired("llm.completion_model".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("llm.temperature", self.llm.temperature));
        }
        if self.llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens", 0));
        }
        if self.rag.chunk_max_length == 0 {
            return Err(invalid("rag.chunk_max_length", 0));
        }
        if self.rag.top_k == 0 {
            return Err(invalid("rag.top_k", 0));
        }
        if self.rag.ingest_concurrency == 0 {
            return Err(invalid("rag.ingest_concurrency", 0));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", 0));
        }
        if self.retry.timeout_secs == 0 {
            return Err(invalid("retry.timeout_secs", 0));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn invalid(key: &str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to connect to
    pub backend: StoreBackend,

    /// Qdrant gRPC URL or Weaviate HTTP URL
    pub url: String,

    /// Collection (Weaviate class) name
    pub collection: String,

    /// Vector dimension (must match embedding model)
    pub vector_dimension: usize,

    /// Similarity metric used for nearest-neighbor search
    pub distance: Distance,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Qdrant,
            url: "http://localhost:6334".to_string(),
            collection: "DocumentChunk".to_string(),
            vector_dimension: 1024, // mxbai-embed-large
            distance: Distance::Cosine,
        }
    }
}

/// Supported vector store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Qdrant,
    Weaviate,
    /// In-process store, contents are lost on exit
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "weaviate" => Ok(Self::Weaviate),
            "memory" | "inmemory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "VECTOR_STORE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Qdrant => write!(f, "qdrant"),
            Self::Weaviate => write!(f, "weaviate"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Similarity metric for nearest-neighbor search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclidean,
}

impl std::str::FromStr for Distance {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            _ => Err(ConfigError::InvalidValue {
                key: "VECTOR_DISTANCE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Embedding and completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Embedding endpoint URL
    pub embedding_endpoint: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Completion endpoint URL
    pub completion_endpoint: String,

    /// Completion model name
    pub completion_model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            embedding_endpoint: "http://localhost:11434/api/embeddings".to_string(),
            embedding_model: "mxbai-embed-large".to_string(),
            completion_endpoint: "http://localhost:11434/api/generate".to_string(),
            completion_model: "llama3".to_string(),
            max_tokens: 256,
            temperature: 0.0,
        }
    }
}

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk length in characters
    pub chunk_max_length: usize,

    /// Number of chunks retrieved per question
    pub top_k: usize,

    /// Chunks embedded and stored concurrently during ingestion
    pub ingest_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_max_length: 500,
            top_k: 3,
            ingest_concurrency: 1,
        }
    }
}

/// Timeout and retry configuration for collaborator calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per call, including the first
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    pub initial_backoff_ms: u64,

    /// Upper bound for the retry delay in milliseconds
    pub max_backoff_ms: u64,

    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
}

impl RetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            timeout_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a filter directive
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
