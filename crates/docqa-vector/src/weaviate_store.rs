//! Weaviate implementation for vector storage
//!
//! Uses the REST schema and batch endpoints and the GraphQL `nearVector`
//! search. Collections map to Weaviate classes with `vectorizer: none`.

use crate::http::{build_client, check_status, read_body, request_error};
use crate::{CollectionSchema, PropertyType, ScoredRecord, StoreRecord, VectorStore, TEXT_PROPERTY};
use async_trait::async_trait;
use docqa_core::{Collaborator, DocqaError, Distance, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

const COLLABORATOR: Collaborator = Collaborator::VectorStore;

/// Weaviate vector store implementation
pub struct WeaviateStore {
    client: Client,
    base_url: String,
    distance: Distance,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    classes: Vec<ClassEntry>,
}

#[derive(Debug, Deserialize)]
struct ClassEntry {
    class: String,
}

#[derive(Debug, Deserialize)]
struct BatchObjectResult {
    #[serde(default)]
    result: Option<BatchResult>,
}

#[derive(Debug, Deserialize)]
struct BatchResult {
    #[serde(default)]
    errors: Option<BatchErrors>,
}

#[derive(Debug, Deserialize)]
struct BatchErrors {
    #[serde(default)]
    error: Vec<BatchErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct BatchErrorMessage {
    message: String,
}

impl WeaviateStore {
    /// Create a client for the Weaviate instance at `base_url`
    pub fn new(base_url: &str, distance: Distance, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            distance,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<String> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| request_error(COLLABORATOR, self.timeout, e))?;
        let response = check_status(COLLABORATOR, response).await?;
        read_body(COLLABORATOR, response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<String> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| request_error(COLLABORATOR, self.timeout, e))?;
        let response = check_status(COLLABORATOR, response).await?;
        read_body(COLLABORATOR, response).await
    }
}

// ============================================================================
// Request building and response parsing
// ============================================================================

/// Weaviate class names must start with an uppercase letter
pub fn validate_class_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(DocqaError::ValidationError(format!(
            "Invalid Weaviate class name '{name}': must match [A-Z][A-Za-z0-9_]*"
        )))
    }
}

/// Weaviate name of a distance metric
pub fn weaviate_distance(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "cosine",
        Distance::Dot => "dot",
        Distance::Euclidean => "l2-squared",
    }
}

/// Class definition for `POST /v1/schema`
pub fn class_definition(schema: &CollectionSchema) -> Value {
    let properties: Vec<Value> = schema
        .properties
        .iter()
        .map(|p| {
            let data_type = match p.data_type {
                PropertyType::Text => "text",
            };
            json!({ "name": p.name, "dataType": [data_type] })
        })
        .collect();

    json!({
        "class": schema.name,
        "vectorizer": "none",
        "vectorIndexConfig": { "distance": weaviate_distance(schema.distance) },
        "properties": properties,
    })
}

/// Body for `POST /v1/batch/objects` carrying one record
pub fn batch_request(class: &str, record: &StoreRecord) -> Value {
    json!({
        "objects": [{
            "class": class,
            "id": record.id.to_string(),
            "properties": { TEXT_PROPERTY: record.text },
            "vector": record.vector,
        }]
    })
}

/// Batch requests succeed at the HTTP level even when objects fail
pub fn check_batch_response(body: &str) -> Result<()> {
    let results: Vec<BatchObjectResult> = serde_json::from_str(body)
        .map_err(|e| DocqaError::malformed(COLLABORATOR, format!("Bad batch response: {e}")))?;

    let messages: Vec<String> = results
        .into_iter()
        .filter_map(|r| r.result.and_then(|r| r.errors))
        .flat_map(|errors| errors.error.into_iter().map(|e| e.message))
        .collect();

    if messages.is_empty() {
        Ok(())
    } else {
        Err(DocqaError::ValidationError(format!(
            "Weaviate rejected object: {}",
            messages.join("; ")
        )))
    }
}

/// GraphQL `nearVector` query body
pub fn near_vector_request(class: &str, vector: &[f32], limit: usize) -> Value {
    let vector = serde_json::to_string(vector).unwrap_or_else(|_| "[]".to_string());
    let query = format!(
        "{{ Get {{ {class}(nearVector: {{vector: {vector}}}, limit: {limit}) \
         {{ {TEXT_PROPERTY} _additional {{ id distance }} }} }} }}"
    );
    json!({ "query": query })
}

/// Convert a Weaviate distance into a higher-is-closer score
fn similarity(distance: Distance, raw: f32) -> f32 {
    match distance {
        Distance::Cosine => 1.0 - raw,
        Distance::Dot | Distance::Euclidean => -raw,
    }
}

/// Parse the GraphQL search response for `class`
pub fn parse_near_vector_response(
    class: &str,
    body: &str,
    distance: Distance,
) -> Result<Vec<ScoredRecord>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| DocqaError::malformed(COLLABORATOR, format!("Bad GraphQL response: {e}")))?;

    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect();
        if messages.iter().any(|m| m.contains(&format!("\"{class}\""))) {
            return Err(DocqaError::CollectionNotFound(class.to_string()));
        }
        if !messages.is_empty() {
            return Err(DocqaError::malformed(COLLABORATOR, messages.join("; ")));
        }
    }

    let hits = value
        .pointer(&format!("/data/Get/{class}"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            DocqaError::malformed(COLLABORATOR, format!("Response has no results for {class}"))
        })?;

    hits.iter()
        .map(|hit| {
            let text = hit
                .get(TEXT_PROPERTY)
                .and_then(Value::as_str)
                .ok_or_else(|| DocqaError::malformed(COLLABORATOR, "Hit without text"))?;
            let id = hit
                .pointer("/_additional/id")
                .and_then(Value::as_str)
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| DocqaError::malformed(COLLABORATOR, "Hit without valid id"))?;
            let raw = hit
                .pointer("/_additional/distance")
                .and_then(Value::as_f64)
                .ok_or_else(|| DocqaError::malformed(COLLABORATOR, "Hit without distance"))?;

            Ok(ScoredRecord {
                id,
                text: text.to_string(),
                score: similarity(distance, raw as f32),
            })
        })
        .collect()
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        let body = self.get("/v1/schema").await?;
        let schema: SchemaResponse = serde_json::from_str(&body)
            .map_err(|e| DocqaError::malformed(COLLABORATOR, format!("Bad schema response: {e}")))?;

        Ok(schema.classes.into_iter().map(|c| c.class).collect())
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        validate_class_name(&schema.name)?;
        self.post("/v1/schema", &class_definition(schema)).await?;
        tracing::debug!(class = %schema.name, "Created Weaviate class");
        Ok(())
    }

    async fn upsert(&self, collection: &str, record: &StoreRecord) -> Result<()> {
        validate_class_name(collection)?;
        let body = self
            .post("/v1/batch/objects", &batch_request(collection, record))
            .await?;
        check_batch_response(&body)
    }

    async fn near_vector_query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        validate_class_name(collection)?;
        let body = self
            .post("/v1/graphql", &near_vector_request(collection, vector, limit))
            .await?;
        parse_near_vector_response(collection, &body, self.distance)
    }

    async fn close(&self) -> Result<()> {
        tracing::debug!(url = %self.base_url, "Weaviate client released");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "weaviate"
    }
}
