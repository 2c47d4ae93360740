//! Property tests for sentence-aware chunking.

use docqa_parser::{chunk_text, split_sentences};
use proptest::prelude::*;

/// Text made of short word-sentences joined by the delimiter, sometimes
/// with an oversized sentence mixed in.
fn arb_document() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[A-Za-z]{1,8}( [a-z]{1,8}){0,6}",
            1 => "[a-z]{40,90}",
        ],
        0..25,
    )
    .prop_map(|sentences| sentences.join(". "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every chunk fits the limit unless it is a single oversized sentence.
    #[test]
    fn chunks_respect_max_length(text in arb_document(), max_length in 1usize..120) {
        for chunk in chunk_text(&text, max_length) {
            let len = chunk.text.chars().count();
            prop_assert!(
                len <= max_length || split_sentences(&chunk.text).len() == 1,
                "chunk of {} chars exceeds {} and holds several sentences: {:?}",
                len,
                max_length,
                chunk.text,
            );
        }
    }

    /// Chunking neither drops nor reorders sentences.
    #[test]
    fn chunks_preserve_sentence_order(text in arb_document(), max_length in 1usize..120) {
        let chunks = chunk_text(&text, max_length);
        let rejoined: Vec<String> = chunks
            .iter()
            .flat_map(|c| split_sentences(&c.text))
            .collect();
        prop_assert_eq!(rejoined, split_sentences(&text));
    }

    /// Same input, same chunks; indices are dense and ordered; none empty.
    #[test]
    fn chunking_is_deterministic(text in arb_document(), max_length in 1usize..120) {
        let first = chunk_text(&text, max_length);
        let second = chunk_text(&text, max_length);
        prop_assert_eq!(&first, &second);

        for (i, chunk) in first.iter().enumerate() {
            prop_assert_eq!(chunk.index, i);
            prop_assert!(!chunk.text.is_empty());
        }
    }
}
