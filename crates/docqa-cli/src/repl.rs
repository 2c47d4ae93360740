//! Interactive question loop

use docqa_rag::RagOrchestrator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const PROMPT: &str = "> ";

/// Counts for a finished session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChatSummary {
    pub answered: usize,
    pub failed: usize,
}

/// `exit` or `quit`, any case
pub fn is_exit(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Read questions from `input` until exit or EOF, writing answers to
/// `output`. A failing question is reported and the loop carries on.
pub async fn run<R, W>(
    orchestrator: &RagOrchestrator,
    input: R,
    mut output: W,
) -> std::io::Result<ChatSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut summary = ChatSummary::default();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }

        match orchestrator.ask(question).await {
            Ok(response) => {
                output
                    .write_all(format!("{}\n", response.answer).as_bytes())
                    .await?;
                summary.answered += 1;
            }
            Err(e) => {
                tracing::error!(question = %question, error = %e, "Query failed");
                output.write_all(format!("error: {e}\n").as_bytes()).await?;
                summary.failed += 1;
            }
        }
    }

    output.flush().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::{AppConfig, Distance, RetryPolicy};
    use docqa_rag::testing::{KeywordEmbedder, Reply, ScriptedCompletion};
    use docqa_vector::{CollectionSchema, InMemoryStore, VectorStore};
    use std::sync::Arc;
    use std::time::Duration;

    async fn orchestrator(replies: Vec<Reply>) -> RagOrchestrator {
        let mut config = AppConfig::default();
        config.store.vector_dimension = 2;

        let store = Arc::new(InMemoryStore::new());
        store
            .create_collection(&CollectionSchema::text_chunks(
                &config.store.collection,
                2,
                Distance::Cosine,
            ))
            .await
            .unwrap();

        RagOrchestrator::from_config(
            Arc::new(KeywordEmbedder::new(["cats", "dogs"])),
            store,
            Arc::new(ScriptedCompletion::new(replies)),
            &config,
        )
        .with_retry(RetryPolicy::no_retry(Duration::from_secs(5)))
    }

    fn body(text: &str) -> Reply {
        Reply::Body(format!(r#"{{"response": "{text}"}}"#))
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("  QUIT "));
        assert!(is_exit("Exit"));
        assert!(!is_exit("exit now"));
        assert!(!is_exit(""));
    }

    #[tokio::test]
    async fn test_answers_until_quit() {
        let orchestrator = orchestrator(vec![body("first"), body("second")]).await;
        let input: &[u8] = b"What are cats?\n\n   \nAnd dogs?\nQUIT\nnever asked\n";
        let mut output = Vec::new();

        let summary = run(&orchestrator, input, &mut output).await.unwrap();
        assert_eq!(summary, ChatSummary { answered: 2, failed: 0 });

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("first\n"));
        assert!(output.contains("second\n"));
    }

    #[tokio::test]
    async fn test_ends_on_eof() {
        let orchestrator = orchestrator(vec![body("only")]).await;
        let input: &[u8] = b"What are cats?";
        let mut output = Vec::new();

        let summary = run(&orchestrator, input, &mut output).await.unwrap();
        assert_eq!(summary.answered, 1);
    }

    #[tokio::test]
    async fn test_failed_query_does_not_end_session() {
        let orchestrator = orchestrator(vec![Reply::Unavailable, body("recovered")]).await;
        let input: &[u8] = b"first?\nsecond?\nexit\n";
        let mut output = Vec::new();

        let summary = run(&orchestrator, input, &mut output).await.unwrap();
        assert_eq!(summary, ChatSummary { answered: 1, failed: 1 });

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("error: completion service unavailable"));
        assert!(output.contains("recovered\n"));
    }

    #[tokio::test]
    async fn test_unrecognized_response_prints_sentinel() {
        let orchestrator = orchestrator(vec![Reply::Body("{}".to_string())]).await;
        let input: &[u8] = b"What are cats?\nexit\n";
        let mut output = Vec::new();

        run(&orchestrator, input, &mut output).await.unwrap();
        assert!(String::from_utf8(output)
            .unwrap()
            .contains("[no answer available]"));
    }
}
