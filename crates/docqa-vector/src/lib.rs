//! docqa Vector - Embedding and vector database abstraction
//!
//! Provides the embedding client and an abstraction over vector databases
//! (Qdrant, Weaviate, in-memory) for storing and searching chunk embeddings.

use async_trait::async_trait;
use docqa_core::{Distance, Result, StoreBackend, StoreConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub mod embedding;
pub mod http;
pub mod memory_store;
pub mod qdrant_store;
pub mod weaviate_store;

pub use embedding::{EmbeddingClient, OllamaEmbedding};
pub use memory_store::InMemoryStore;
pub use qdrant_store::QdrantStore;
pub use weaviate_store::WeaviateStore;

/// Name of the property holding chunk text
pub const TEXT_PROPERTY: &str = "text";

/// Data type of a collection property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Text,
}

/// A named property of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    pub data_type: PropertyType,
}

/// Collection definition. Vectors are always supplied by the caller;
/// the store never vectorizes on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub properties: Vec<PropertySchema>,
    pub dimension: usize,
    pub distance: Distance,
}

impl CollectionSchema {
    /// Schema with the single `text` property used for chunks
    pub fn text_chunks(name: impl Into<String>, dimension: usize, distance: Distance) -> Self {
        Self {
            name: name.into(),
            properties: vec![PropertySchema {
                name: TEXT_PROPERTY.to_string(),
                data_type: PropertyType::Text,
            }],
            dimension,
            distance,
        }
    }
}

/// A chunk with its embedding, as persisted in the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRecord {
    pub id: Uuid,
    pub text: String,
    pub vector: Vec<f32>,
}

/// A nearest-neighbor hit. `score` is a similarity: higher is closer,
/// regardless of the backend's native convention.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub id: Uuid,
    pub text: String,
    pub score: f32,
}

/// Trait for vector database operations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of existing collections
    async fn list_collections(&self) -> Result<BTreeSet<String>>;

    /// Create a collection
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()>;

    /// Insert a record, replacing any record with the same id
    async fn upsert(&self, collection: &str, record: &StoreRecord) -> Result<()>;

    /// The `limit` records closest to `vector`, closest first
    async fn near_vector_query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>>;

    /// Release the connection
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Backend name for logging
    fn backend(&self) -> &'static str;
}

/// Open the vector store selected by config
pub fn connect(config: &StoreConfig, timeout: Duration) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.backend {
        StoreBackend::Qdrant => Arc::new(QdrantStore::connect(
            &config.url,
            config.distance,
            timeout,
        )?),
        StoreBackend::Weaviate => Arc::new(WeaviateStore::new(
            &config.url,
            config.distance,
            timeout,
        )?),
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
    };

    tracing::info!(
        backend = store.backend(),
        url = %config.url,
        collection = %config.collection,
        "Vector store connection opened"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_chunk_schema() {
        let schema = CollectionSchema::text_chunks("DocumentChunk", 1024, Distance::Cosine);
        assert_eq!(schema.properties.len(), 1);
        assert_eq!(schema.properties[0].name, TEXT_PROPERTY);
        assert_eq!(schema.properties[0].data_type, PropertyType::Text);
    }

    #[test]
    fn test_connect_memory_backend() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..Default::default()
        };
        let store = connect(&config, Duration::from_secs(1)).unwrap();
        assert_eq!(store.backend(), "memory");
    }
}
