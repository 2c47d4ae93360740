//! Embedding client for generating vector representations
//!
//! Talks to an Ollama-compatible `/api/embeddings` endpoint.
//!
//! Author: hephaex@gmail.com

use crate::http::{build_client, check_status, read_body, request_error};
use async_trait::async_trait;
use docqa_core::{AppConfig, Collaborator, DocqaError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Model name, for logging
    fn model(&self) -> &str;
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Output dimension of well-known embedding models
pub fn known_dimension(model: &str) -> Option<usize> {
    match model {
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        "all-minilm" => Some(384),
        _ => None,
    }
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            model: model.into(),
            dimension,
            timeout,
        })
    }

    /// Create from config. Fails when the configured dimension disagrees
    /// with a model whose output size is known.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let model = config.llm.embedding_model.as_str();
        let dimension = config.store.vector_dimension;

        if let Some(native) = known_dimension(model) {
            if native != dimension {
                return Err(DocqaError::ConfigError(format!(
                    "Embedding model {model} produces {native}-dimensional vectors \
                     but the store is configured for {dimension}"
                )));
            }
        }

        Self::new(
            config.llm.embedding_endpoint.clone(),
            model,
            dimension,
            config.retry.timeout(),
        )
    }
}

/// Parse an embedding response body
pub fn parse_embedding_response(body: &str) -> Result<Vec<f32>> {
    let response: OllamaEmbeddingResponse = serde_json::from_str(body).map_err(|e| {
        DocqaError::malformed(
            Collaborator::Embedding,
            format!("Failed to parse embedding response: {e}"),
        )
    })?;

    if response.embedding.is_empty() {
        return Err(DocqaError::malformed(
            Collaborator::Embedding,
            "Embedding response contained an empty vector",
        ));
    }

    Ok(response.embedding)
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(Collaborator::Embedding, self.timeout, e))?;

        let response = check_status(Collaborator::Embedding, response).await?;
        let body = read_body(Collaborator::Embedding, response).await?;

        parse_embedding_response(&body)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_dimensions() {
        assert_eq!(known_dimension("nomic-embed-text"), Some(768));
        assert_eq!(known_dimension("mxbai-embed-large"), Some(1024));
        assert_eq!(known_dimension("custom-model"), None);
    }

    #[test]
    fn test_request_shape() {
        let request = OllamaEmbeddingRequest {
            model: "mxbai-embed-large",
            prompt: "Cats are mammals.",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"model": "mxbai-embed-large", "prompt": "Cats are mammals."})
        );
    }

    #[test]
    fn test_parse_embedding_response() {
        let vector = parse_embedding_response(r#"{"embedding": [0.5, -1.0, 2]}"#).unwrap();
        assert_eq!(vector, vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn test_parse_rejects_malformed_and_empty() {
        let err = parse_embedding_response("not json").unwrap_err();
        assert!(matches!(err, DocqaError::MalformedResponse { .. }));
        assert!(!err.is_retryable());

        let err = parse_embedding_response(r#"{"embedding": []}"#).unwrap_err();
        assert!(matches!(err, DocqaError::MalformedResponse { .. }));

        let err = parse_embedding_response(r#"{"vector": [1.0]}"#).unwrap_err();
        assert!(matches!(err, DocqaError::MalformedResponse { .. }));
    }

    #[test]
    fn test_from_config_checks_known_dimension() {
        let mut config = AppConfig::default();
        let client = OllamaEmbedding::from_config(&config).unwrap();
        assert_eq!(client.dimension(), 1024);
        assert_eq!(client.model(), "mxbai-embed-large");

        config.store.vector_dimension = 768;
        assert!(matches!(
            OllamaEmbedding::from_config(&config),
            Err(DocqaError::ConfigError(_))
        ));

        config.llm.embedding_model = "my-finetune".to_string();
        assert_eq!(OllamaEmbedding::from_config(&config).unwrap().dimension(), 768);
    }
}
