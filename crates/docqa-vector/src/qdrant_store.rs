//! Qdrant implementation for vector storage
//!
//! Provides connection management and vector operations
//! for document chunk embeddings.
//!
//! Author: hephaex@gmail.com

use crate::{CollectionSchema, ScoredRecord, StoreRecord, VectorStore, TEXT_PROPERTY};
use async_trait::async_trait;
use docqa_core::{Collaborator, DocqaError, Distance, Result};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance as QdrantDistance, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use uuid::Uuid;

/// Qdrant vector store implementation
pub struct QdrantStore {
    client: Qdrant,
    distance: Distance,
}

impl QdrantStore {
    /// Create a new Qdrant connection
    pub fn connect(url: &str, distance: Distance, timeout: Duration) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DocqaError::unavailable(
                    Collaborator::VectorStore,
                    format!("Qdrant connection failed: {e}"),
                )
            })?;

        Ok(Self { client, distance })
    }
}

/// Map the configured metric to Qdrant's
pub fn qdrant_distance(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
        Distance::Dot => QdrantDistance::Dot,
        Distance::Euclidean => QdrantDistance::Euclid,
    }
}

/// Qdrant reports Euclidean hits as distances; everything else is already
/// a similarity.
fn similarity(distance: Distance, score: f32) -> f32 {
    match distance {
        Distance::Euclidean => -score,
        Distance::Cosine | Distance::Dot => score,
    }
}

fn point_uuid(id: Option<PointId>) -> Result<Uuid> {
    match id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Uuid(s)) => Uuid::parse_str(&s).map_err(|e| {
            DocqaError::malformed(Collaborator::VectorStore, format!("Bad point id {s}: {e}"))
        }),
        Some(PointIdOptions::Num(n)) => Err(DocqaError::malformed(
            Collaborator::VectorStore,
            format!("Unexpected numeric point id {n}"),
        )),
        None => Err(DocqaError::malformed(
            Collaborator::VectorStore,
            "Point without id",
        )),
    }
}

fn store_error(collection: &str, action: &str, e: QdrantError) -> DocqaError {
    let message = e.to_string();
    if message.contains("doesn't exist") {
        DocqaError::CollectionNotFound(collection.to_string())
    } else {
        DocqaError::unavailable(
            Collaborator::VectorStore,
            format!("Failed to {action}: {message}"),
        )
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| store_error("", "list collections", e))?;

        Ok(collections
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&schema.name).vectors_config(
                    VectorParamsBuilder::new(
                        schema.dimension as u64,
                        qdrant_distance(schema.distance),
                    ),
                ),
            )
            .await
            .map_err(|e| store_error(&schema.name, "create collection", e))?;

        Ok(())
    }

    async fn upsert(&self, collection: &str, record: &StoreRecord) -> Result<()> {
        let payload: HashMap<String, Value> =
            HashMap::from([(TEXT_PROPERTY.to_string(), Value::from(record.text.clone()))]);

        let point = PointStruct::new(record.id.to_string(), record.vector.clone(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
            .await
            .map_err(|e| store_error(collection, "upsert point", e))?;

        Ok(())
    }

    async fn near_vector_query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| store_error(collection, "search points", e))?;

        results
            .result
            .into_iter()
            .map(|point| {
                let text = point
                    .payload
                    .get(TEXT_PROPERTY)
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        DocqaError::malformed(
                            Collaborator::VectorStore,
                            format!("Point without '{TEXT_PROPERTY}' payload"),
                        )
                    })?;

                Ok(ScoredRecord {
                    id: point_uuid(point.id)?,
                    text,
                    score: similarity(self.distance, point.score),
                })
            })
            .collect()
    }

    async fn close(&self) -> Result<()> {
        tracing::debug!("Qdrant connection released");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}
