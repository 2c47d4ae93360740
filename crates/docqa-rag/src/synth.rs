//! Answer synthesis
//!
//! Builds the grounded prompt, calls the completion service and pulls the
//! answer out of whatever response shape the backend produced.

use docqa_core::{Answer, Collaborator, CompletionClient, Result, RetrievalResult, RetryPolicy};
use serde_json::Value;
use std::sync::Arc;

/// JSON pointers probed for the answer text, in order
pub const ANSWER_FIELDS: [&str; 5] = [
    "/response",
    "/completion",
    "/choices/0/text",
    "/choices/0/message/content",
    "/message/content",
];

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for the context-then-question prompt
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    context_sections: Vec<String>,
    question: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a context block
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        format!(
            "Context:\n{}\n\nQuestion: {}\nAnswer:",
            self.context_sections.join("\n\n"),
            self.question
        )
    }
}

/// Prompt for `query` grounded on the retrieved chunks
pub fn build_prompt(query: &str, context: &RetrievalResult) -> String {
    context
        .iter()
        .fold(PromptBuilder::new(), |builder, chunk| builder.add_context(chunk))
        .question(query)
        .build()
}

// ============================================================================
// Response extraction
// ============================================================================

/// Extract the answer from a raw completion body.
///
/// Never fails: a body that is not JSON or carries none of the known fields
/// yields [`Answer::Unavailable`].
pub fn extract_answer(body: &str) -> Answer {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Completion response is not JSON");
            return Answer::Unavailable;
        }
    };

    let found = ANSWER_FIELDS.iter().find_map(|pointer| {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
    });

    match found {
        Some(text) => Answer::Text(text.to_string()),
        None => {
            tracing::warn!(
                fields = ?ANSWER_FIELDS,
                "Completion response has no recognized answer field"
            );
            Answer::Unavailable
        }
    }
}

// ============================================================================
// Synthesizer
// ============================================================================

/// Turns a query and its context into an answer
pub struct AnswerSynthesizer {
    completion: Arc<dyn CompletionClient>,
    retry: RetryPolicy,
}

impl AnswerSynthesizer {
    pub fn new(completion: Arc<dyn CompletionClient>, retry: RetryPolicy) -> Self {
        Self { completion, retry }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generate an answer to `query` from `context`
    pub async fn synthesize(&self, query: &str, context: &RetrievalResult) -> Result<Answer> {
        let prompt = build_prompt(query, context);
        tracing::debug!(
            model = self.completion.model(),
            context_chunks = context.len(),
            prompt_chars = prompt.chars().count(),
            "Requesting completion"
        );

        let body = self
            .retry
            .run(Collaborator::Completion, || self.completion.complete(&prompt))
            .await?;

        Ok(extract_answer(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_format() {
        let context = RetrievalResult::new(vec![
            "Cats are mammals.".to_string(),
            "Dogs are mammals too.".to_string(),
        ]);
        assert_eq!(
            build_prompt("What are cats?", &context),
            "Context:\nCats are mammals.\n\nDogs are mammals too.\n\nQuestion: What are cats?\nAnswer:"
        );
    }

    #[test]
    fn test_prompt_with_empty_context() {
        assert_eq!(
            build_prompt("Anything?", &RetrievalResult::default()),
            "Context:\n\n\nQuestion: Anything?\nAnswer:"
        );
    }

    #[test]
    fn test_extract_known_fields() {
        assert_eq!(
            extract_answer(r#"{"response": " Cats are mammals. "}"#),
            Answer::Text("Cats are mammals.".to_string())
        );
        assert_eq!(
            extract_answer(r#"{"completion": "Y"}"#),
            Answer::Text("Y".to_string())
        );
        assert_eq!(
            extract_answer(r#"{"choices": [{"text": "from text"}]}"#),
            Answer::Text("from text".to_string())
        );
        assert_eq!(
            extract_answer(r#"{"choices": [{"message": {"role": "assistant", "content": "chat"}}]}"#),
            Answer::Text("chat".to_string())
        );
        assert_eq!(
            extract_answer(r#"{"message": {"content": "ollama chat"}}"#),
            Answer::Text("ollama chat".to_string())
        );
    }

    #[test]
    fn test_extract_probes_in_order() {
        assert_eq!(
            extract_answer(r#"{"completion": "second", "response": "first"}"#),
            Answer::Text("first".to_string())
        );
        // Empty strings do not count as present
        assert_eq!(
            extract_answer(r#"{"response": "  ", "completion": "fallback"}"#),
            Answer::Text("fallback".to_string())
        );
    }

    #[test]
    fn test_extract_unavailable() {
        assert_eq!(extract_answer("{}"), Answer::Unavailable);
        assert_eq!(extract_answer(r#"{"response": 42}"#), Answer::Unavailable);
        assert_eq!(extract_answer("<html>502</html>"), Answer::Unavailable);
        assert_eq!(extract_answer(""), Answer::Unavailable);
    }
}
