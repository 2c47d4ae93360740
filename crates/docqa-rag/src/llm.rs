//! Completion client implementation
//!
//! Posts non-streaming generation requests to an Ollama-compatible
//! endpoint and hands the raw body back to the synthesizer.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use docqa_core::{AppConfig, Collaborator, CompletionClient, Result};
use docqa_vector::http::{build_client, check_status, read_body, request_error};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

/// Generation request body
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            model: model.into(),
            max_tokens,
            temperature,
            timeout,
        })
    }

    /// Create from config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.llm.completion_endpoint.clone(),
            config.llm.completion_model.clone(),
            config.llm.max_tokens,
            config.llm.temperature,
            config.retry.timeout(),
        )
    }

    fn request<'a>(&'a self, prompt: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| request_error(Collaborator::Completion, self.timeout, e))?;

        let response = check_status(Collaborator::Completion, response).await?;
        read_body(Collaborator::Completion, response).await
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
    fn test_request_body() {
        let client = OllamaClient::from_config(&AppConfig::default()).unwrap();
        let prompt = "Context:\n\n\nQuestion: hi\nAnswer:";
        let body = serde_json::to_value(client.request(prompt)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "model": "llama3",
                "prompt": "Context:\n\n\nQuestion: hi\nAnswer:",
                "max_tokens": 256,
                "temperature": 0.0,
                "stream": false,
            })
        );
    }

    #[test]
    fn test_model_name() {
        let client = OllamaClient::new(
            "http://localhost:11434/api/generate",
            "mistral",
            64,
            0.2,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.model(), "mistral");
    }
}
