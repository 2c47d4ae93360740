//! docqa RAG - Retrieval-Augmented Generation pipelines
//!
//! This crate implements the three stages of question answering over a
//! document corpus:
//! - Ingestion: chunk, embed and upsert documents idempotently
//! - Retrieval: embed the query and rank stored chunks by similarity
//! - Synthesis: prompt the completion service with the retrieved context
//!
//! [`RagOrchestrator`] composes retrieval and synthesis for a single question.
//!
//! Author: hephaex@gmail.com

use docqa_core::{AppConfig, CompletionClient, RagResponse, Result, RetryPolicy};
use docqa_vector::{EmbeddingClient, VectorStore};
use std::sync::Arc;
use std::time::Instant;

pub mod ingest;
pub mod llm;
pub mod retrieve;
pub mod synth;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use ingest::{IngestReport, IngestionPipeline, SchemaStatus};
pub use llm::OllamaClient;
pub use retrieve::RetrievalPipeline;
pub use synth::{build_prompt, extract_answer, AnswerSynthesizer, PromptBuilder, ANSWER_FIELDS};

// ============================================================================
// RAG Orchestrator
// ============================================================================

/// Answers questions from the indexed corpus
pub struct RagOrchestrator {
    retrieval: RetrievalPipeline,
    synthesizer: AnswerSynthesizer,
    top_k: usize,
}

impl RagOrchestrator {
    pub fn new(retrieval: RetrievalPipeline, synthesizer: AnswerSynthesizer, top_k: usize) -> Self {
        Self {
            retrieval,
            synthesizer,
            top_k,
        }
    }

    /// Wire the pipelines from shared collaborators
    pub fn from_config(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        completion: Arc<dyn CompletionClient>,
        config: &AppConfig,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        Self::new(
            RetrievalPipeline::new(embedder, store, config),
            AnswerSynthesizer::new(completion, retry),
            config.rag.top_k,
        )
    }

    /// Override the number of context chunks
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Replace the retry policy of both stages
    pub fn with_retry(self, retry: RetryPolicy) -> Self {
        Self {
            retrieval: self.retrieval.with_retry(retry.clone()),
            synthesizer: self.synthesizer.with_retry(retry),
            top_k: self.top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve context for `question` and synthesize an answer
    pub async fn ask(&self, question: &str) -> Result<RagResponse> {
        let start = Instant::now();
        tracing::info!(question = %question, top_k = self.top_k, "Processing question");

        let context = self.retrieval.retrieve(question, self.top_k).await?;
        if context.is_empty() {
            tracing::info!("No context retrieved; answering without it");
        }

        let answer = self.synthesizer.synthesize(question, &context).await?;
        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            context_chunks = context.len(),
            answered = answer.is_available(),
            processing_time_ms,
            "Question processed"
        );

        Ok(RagResponse {
            answer,
            context,
            processing_time_ms,
        })
    }
}
