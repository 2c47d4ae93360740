//! Sentence-aware chunking
//!
//! Documents are split on the `". "` delimiter and consecutive sentences are
//! packed greedily into chunks of at most `max_length` characters. A sentence
//! is never split: one that is longer than `max_length` on its own becomes a
//! chunk of its own.
//!
//! Author: hephaex@gmail.com

use docqa_core::{Chunk, Document};

/// Delimiter between sentences
pub const SENTENCE_DELIMITER: &str = ". ";

/// Split text into sentences.
///
/// The period consumed by the delimiter is restored on every sentence but the
/// last one, which keeps whatever ending it had in the source. Sentences are
/// trimmed and empty ones dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = text.split(SENTENCE_DELIMITER).collect();
    let last = pieces.len().saturating_sub(1);

    pieces
        .into_iter()
        .enumerate()
        .filter_map(|(i, piece)| {
            let piece = piece.trim();
            if piece.is_empty() {
                None
            } else if i < last {
                Some(format!("{piece}."))
            } else {
                Some(piece.to_string())
            }
        })
        .collect()
}

/// Split text into ordered chunks of at most `max_length` characters.
///
/// Sentences are joined with a single space. Before a sentence is appended
/// the chunk is flushed if the result would exceed `max_length`.
pub fn chunk_text(text: &str, max_length: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if current_len > 0 && current_len + 1 + sentence_len > max_length {
            chunks.push(Chunk::new(chunks.len(), std::mem::take(&mut current)));
            current_len = 0;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(&sentence);
        current_len += sentence_len;
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(chunks.len(), current));
    }

    chunks
}

/// Chunk a document's text
pub fn chunk_document(document: &Document, max_length: usize) -> Vec<Chunk> {
    let chunks = chunk_text(&document.text, max_length);
    tracing::debug!(
        document_id = %document.id,
        max_length,
        chunks = chunks.len(),
        "Chunked document"
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_sentence_split_restores_periods() {
        assert_eq!(
            split_sentences("Cats are mammals. Dogs are mammals too. The sky is blue."),
            vec!["Cats are mammals.", "Dogs are mammals too.", "The sky is blue."]
        );
        assert_eq!(split_sentences("No period at the end"), vec!["No period at the end"]);
        assert_eq!(split_sentences("Trailing delimiter. "), vec!["Trailing delimiter."]);
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("  \n ").is_empty());
    }

    #[test]
    fn test_chunks_pets_example() {
        let chunks = chunk_text(
            "Cats are mammals. Dogs are mammals too. The sky is blue.",
            30,
        );
        assert_eq!(
            texts(&chunks),
            vec!["Cats are mammals.", "Dogs are mammals too.", "The sky is blue."]
        );
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_packs_sentences_up_to_limit() {
        // "One. Two." is exactly 9 characters
        let chunks = chunk_text("One. Two. Three.", 9);
        assert_eq!(texts(&chunks), vec!["One. Two.", "Three."]);

        let chunks = chunk_text("One. Two. Three.", 8);
        assert_eq!(texts(&chunks), vec!["One.", "Two.", "Three."]);
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_text("", 500).is_empty());
        assert!(chunk_text("   ", 500).is_empty());
    }

    #[test]
    fn test_long_sentence_is_not_split() {
        let long = "a".repeat(80);
        let text = format!("Short one. {long}. Tail.");
        let chunks = chunk_text(&text, 20);

        assert_eq!(
            texts(&chunks),
            vec!["Short one.".to_string(), format!("{long}."), "Tail.".to_string()]
        );
        assert!(chunks[1].len() > 20);
    }

    #[test]
    fn test_first_sentence_over_limit_yields_no_empty_chunk() {
        let chunks = chunk_text("This opening sentence is long. Ok.", 10);
        assert_eq!(texts(&chunks), vec!["This opening sentence is long.", "Ok."]);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 14 characters, 25 bytes
        let chunks = chunk_text("éééééé. ààààà.", 14);
        assert_eq!(texts(&chunks), vec!["éééééé. ààààà."]);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta. Gamma delta epsilon. Zeta. Eta theta iota kappa. Lambda.";
        assert_eq!(chunk_text(text, 25), chunk_text(text, 25));
    }

    #[test]
    fn test_chunk_document() {
        let doc = Document::new("pets", "Cats are mammals. Dogs are mammals too.");
        let chunks = chunk_document(&doc, 500);
        assert_eq!(texts(&chunks), vec!["Cats are mammals. Dogs are mammals too."]);
    }
}
