//! Deterministic collaborator fakes
//!
//! Enabled with the `test-utils` feature.

use async_trait::async_trait;
use docqa_core::{Collaborator, CompletionClient, DocqaError, Result};
use docqa_vector::EmbeddingClient;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Bag-of-words embedder over a fixed vocabulary.
///
/// Each dimension counts occurrences of one vocabulary word, ignoring case
/// and punctuation, so texts sharing words are close under cosine.
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocabulary: vocabulary
                .into_iter()
                .map(|w| w.into().to_lowercase())
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        Ok(self
            .vocabulary
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect())
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn model(&self) -> &str {
        "keyword"
    }
}

/// Embedder that returns the same vector for every text
pub struct FixedEmbedder {
    vector: Vec<f32>,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

#[async_trait]
impl EmbeddingClient for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.vector.clone())
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// Embedder that succeeds `succeed` times, then reports the service down
pub struct FailingEmbedder {
    dimension: usize,
    succeed: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize, succeed: usize) -> Self {
        Self {
            dimension,
            succeed,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.succeed {
            Ok(vec![1.0; self.dimension])
        } else {
            Err(DocqaError::unavailable(
                Collaborator::Embedding,
                "connection refused",
            ))
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// One scripted completion outcome
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Unavailable,
}

/// Completion client replaying scripted bodies and recording prompts.
///
/// The last reply repeats once the script is exhausted.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(Reply::Body("{}".to_string())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `{"response": text}`
    pub fn answering(text: &str) -> Self {
        Self::new(vec![Reply::Body(
            serde_json::json!({ "response": text }).to_string(),
        )])
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let reply = {
            let mut replies = self
                .replies
                .lock()
                .map_err(|_| DocqaError::unavailable(Collaborator::Completion, "poisoned"))?;
            let mut last = self
                .last
                .lock()
                .map_err(|_| DocqaError::unavailable(Collaborator::Completion, "poisoned"))?;
            if let Some(next) = replies.pop_front() {
                *last = next;
            }
            last.clone()
        };

        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Unavailable => Err(DocqaError::unavailable(
                Collaborator::Completion,
                "connection refused",
            )),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
