//! Similarity retrieval

use docqa_core::{AppConfig, Collaborator, DocqaError, Result, RetrievalResult, RetryPolicy};
use docqa_vector::{EmbeddingClient, ScoredRecord, VectorStore};
use std::cmp::Ordering;
use std::sync::Arc;

/// Finds the chunks closest to a query
pub struct RetrievalPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    collection: String,
    dimension: usize,
    retry: RetryPolicy,
}

impl RetrievalPipeline {
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
            retry: RetryPolicy::from_config(&config.retry),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Top `top_k` hits with scores, closest first
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredRecord>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .retry
            .run(Collaborator::Embedding, || self.embedder.embed(query))
            .await?;

        if vector.len() != self.dimension {
            return Err(DocqaError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let mut hits = self
            .retry
            .run(Collaborator::VectorStore, || {
                self.store.near_vector_query(&self.collection, &vector, top_k)
            })
            .await?;

        // Backends already order hits; re-sort stably so ties keep store order
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);

        tracing::debug!(
            collection = %self.collection,
            top_k,
            hits = hits.len(),
            best_score = hits.first().map(|h| h.score),
            "Retrieved context"
        );
        Ok(hits)
    }

    /// Texts of the top `top_k` chunks, closest first
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        let hits = self.search(query, top_k).await?;
        Ok(RetrievalResult::new(
            hits.into_iter().map(|hit| hit.text).collect(),
        ))
    }
}
