//! In-memory vector store
//!
//! Brute-force search over records held in process memory. Used for tests
//! and for trying the pipeline without a running database.

use crate::{CollectionSchema, ScoredRecord, StoreRecord, VectorStore};
use async_trait::async_trait;
use docqa_core::{Collaborator, DocqaError, Distance, Result};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct MemoryCollection {
    schema: CollectionSchema,
    records: Vec<StoreRecord>,
    positions: HashMap<Uuid, usize>,
}

/// Vector store backed by a map of collections
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    upserts: AtomicUsize,
    closes: AtomicUsize,
    closed: AtomicBool,
}

/// Similarity of two vectors under `distance`; higher is closer
pub fn similarity(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
        Distance::Dot => dot(a, b),
        Distance::Euclidean => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection (0 when it does not exist)
    pub async fn record_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.records.len())
            .unwrap_or(0)
    }

    /// Total upsert calls accepted since creation
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(AtomicOrdering::SeqCst)
    }

    /// Number of times `close` was called
    pub fn close_count(&self) -> usize {
        self.closes.load(AtomicOrdering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(AtomicOrdering::SeqCst) {
            Err(DocqaError::unavailable(
                Collaborator::VectorStore,
                "Store has been closed",
            ))
        } else {
            Ok(())
        }
    }
}

fn check_dimension(schema: &CollectionSchema, vector: &[f32]) -> Result<()> {
    if vector.len() != schema.dimension {
        return Err(DocqaError::DimensionMismatch {
            expected: schema.dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        self.ensure_open()?;
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        if collections.contains_key(&schema.name) {
            return Err(DocqaError::ValidationError(format!(
                "Collection {} already exists",
                schema.name
            )));
        }

        collections.insert(
            schema.name.clone(),
            MemoryCollection {
                schema: schema.clone(),
                records: Vec::new(),
                positions: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, collection: &str, record: &StoreRecord) -> Result<()> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| DocqaError::CollectionNotFound(collection.to_string()))?;
        check_dimension(&target.schema, &record.vector)?;

        match target.positions.get(&record.id) {
            Some(&position) => target.records[position] = record.clone(),
            None => {
                target.positions.insert(record.id, target.records.len());
                target.records.push(record.clone());
            }
        }

        self.upserts.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn near_vector_query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| DocqaError::CollectionNotFound(collection.to_string()))?;
        check_dimension(&target.schema, vector)?;

        let mut scored: Vec<ScoredRecord> = target
            .records
            .iter()
            .map(|r| ScoredRecord {
                id: r.id,
                text: r.text.clone(),
                score: similarity(target.schema.distance, vector, &r.vector),
            })
            .collect();

        // Stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, AtomicOrdering::SeqCst);
        self.closed.store(true, AtomicOrdering::SeqCst);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
