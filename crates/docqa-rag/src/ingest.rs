//! Document ingestion
//!
//! Chunks a document, embeds every chunk and upserts it under an id derived
//! from the document identity and chunk index. Running the same document
//! twice rewrites the same records.
//!
//! Author: hephaex@gmail.com

use docqa_core::{
    chunk_record_id, AppConfig, Chunk, Collaborator, Distance, DocqaError, Document, Result,
    RetryPolicy,
};
use docqa_parser::chunk_document;
use docqa_vector::{CollectionSchema, EmbeddingClient, StoreRecord, VectorStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of [`IngestionPipeline::ensure_schema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStatus {
    Created,
    AlreadyExists,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub upserted: usize,
    pub elapsed: Duration,
}

/// Embeds and stores document chunks
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    collection: String,
    dimension: usize,
    distance: Distance,
    chunk_max_length: usize,
    concurrency: usize,
    retry: RetryPolicy,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: config.store.collection.clone(),
            dimension: config.store.vector_dimension,
            distance: config.store.distance,
            chunk_max_length: config.rag.chunk_max_length,
            concurrency: config.rag.ingest_concurrency.max(1),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Target collection
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<SchemaStatus> {
        let existing = self
            .retry
            .run(Collaborator::VectorStore, || self.store.list_collections())
            .await?;

        if existing.contains(&self.collection) {
            tracing::debug!(collection = %self.collection, "Collection already exists");
            return Ok(SchemaStatus::AlreadyExists);
        }

        let schema = CollectionSchema::text_chunks(&self.collection, self.dimension, self.distance);
        self.store.create_collection(&schema).await?;

        tracing::info!(
            collection = %self.collection,
            dimension = self.dimension,
            distance = ?self.distance,
            backend = self.store.backend(),
            "Created collection"
        );
        Ok(SchemaStatus::Created)
    }

    /// Chunk, embed and upsert a document.
    ///
    /// The first failing chunk aborts the run; chunks already written stay in
    /// the store and are overwritten by the next successful run.
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        let start = Instant::now();
        let chunks = chunk_document(document, self.chunk_max_length);

        tracing::info!(
            document_id = %document.id,
            chunks = chunks.len(),
            collection = %self.collection,
            "Starting ingestion"
        );

        let upserted = match self.store_chunks(&document.id, &chunks).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(
                    document_id = %document.id,
                    error = %e,
                    "Ingestion aborted"
                );
                return Err(e);
            }
        };

        let report = IngestReport {
            document_id: document.id.clone(),
            chunk_count: chunks.len(),
            upserted,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            document_id = %report.document_id,
            upserted = report.upserted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Ingestion complete"
        );
        Ok(report)
    }

    async fn store_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<usize> {
        // Embeddings run ahead up to `concurrency`; upserts happen in index order
        let mut records = stream::iter(chunks)
            .map(|chunk| self.embed_chunk(document_id, chunk))
            .buffered(self.concurrency);

        let mut upserted = 0;
        while let Some(record) = records.next().await {
            let record = record?;
            self.retry
                .run(Collaborator::VectorStore, || {
                    self.store.upsert(&self.collection, &record)
                })
                .await?;
            upserted += 1;

            tracing::debug!(
                document_id,
                upserted,
                total = chunks.len(),
                id = %record.id,
                "Stored chunk"
            );
        }

        Ok(upserted)
    }

    async fn embed_chunk(&self, document_id: &str, chunk: &Chunk) -> Result<StoreRecord> {
        let vector = self
            .retry
            .run(Collaborator::Embedding, || self.embedder.embed(&chunk.text))
            .await?;

        if vector.len() != self.dimension {
            return Err(DocqaError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        Ok(StoreRecord {
            id: chunk_record_id(document_id, chunk.index),
            text: chunk.text.clone(),
            vector,
        })
    }
}
