//! Deterministic text chunking.
//!
//! Splits whitespace-tokenized text into fixed-size windows with overlap.
//! The same input always produces the same chunks, which keeps ingest
//! idempotent at the chunk level.

const TOKEN_APPROX_CHARS: usize = 4;

/// Text window produced by [`split_text`]. Ids are assigned later by the
/// ingest coordinator (`{doc_id}-{ord}`).
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub ord: usize,
    pub text: String,
    pub tokens: usize,
}

/// Deterministic approximation of token count: the larger of the word
/// count and a character-based estimate.
pub fn approx_tokens(text: &str) -> usize {
    let stripped = text.trim();
    if stripped.is_empty() {
        return 0;
    }
    let word_count = stripped.split_whitespace().count();
    let char_estimate = stripped.len().div_ceil(TOKEN_APPROX_CHARS).max(1);
    word_count.max(char_estimate)
}

/// Split text into overlapping windows of `chunk_tokens` whitespace tokens.
/// Each window after the first starts `overlap` tokens before the previous
/// window's end. Overlap is clamped below the window size.
pub fn split_text(text: &str, chunk_tokens: usize, overlap: usize) -> Vec<Chunk> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let size = chunk_tokens.max(1);
    let overlap = overlap.min(size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut ord = 0;

    while start < tokens.len() {
        let end = (start + size).min(tokens.len());
        let chunk_text = tokens[start..end].join(" ");
        let token_count = approx_tokens(&chunk_text);
        chunks.push(Chunk {
            ord,
            text: chunk_text,
            tokens: token_count,
        });

        if end == tokens.len() {
            break;
        }
        start = end - overlap;
        ord += 1;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_overlap() {
        let chunks = split_text("one two three four five six seven", 4, 1);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "one two three four");
        assert_eq!(chunks[1].text, "four five six seven");
        assert_eq!(chunks[0].ord, 0);
        assert_eq!(chunks[1].ord, 1);
    }

    #[test]
    fn split_empty_text_returns_empty() {
        assert!(split_text("", 4, 1).is_empty());
        assert!(split_text("   \t\n  ", 4, 1).is_empty());
    }

    #[test]
    fn split_single_word() {
        let chunks = split_text("hello", 4, 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!(chunks[0].ord, 0);
    }

    #[test]
    fn split_exact_size_text() {
        let chunks = split_text("one two three", 3, 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "one two three");
    }

    #[test]
    fn split_no_overlap_partitions_tokens() {
        let chunks = split_text("a b c d e f", 2, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "a b");
        assert_eq!(chunks[1].text, "c d");
        assert_eq!(chunks[2].text, "e f");
    }

    #[test]
    fn split_clamps_oversized_overlap() {
        // Overlap >= size would never advance; it is clamped to size - 1.
        let chunks = split_text("a b c d e f g", 3, 10);
        assert!(chunks.len() > 1);
        let last = chunks.last().unwrap();
        assert!(last.text.ends_with('g'));
    }

    #[test]
    fn split_zero_size_uses_minimum() {
        let chunks = split_text("word", 0, 0);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn split_ords_form_contiguous_prefix() {
        let text = (0..100).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = split_text(&text, 16, 4);
        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ord, idx);
        }
    }

    #[test]
    fn split_is_deterministic() {
        let text = "Lorem ipsum dolor sit amet consectetur adipiscing elit sed do";
        let first = split_text(text, 5, 2);
        let second = split_text(text, 5, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn split_normalizes_inner_whitespace() {
        let chunks = split_text("hello   world\n\ttest", 10, 0);
        assert_eq!(chunks[0].text, "hello world test");
    }

    #[test]
    fn approx_tokens_empty_is_zero() {
        assert_eq!(approx_tokens(""), 0);
        assert_eq!(approx_tokens("   "), 0);
    }

    #[test]
    fn approx_tokens_takes_max_of_words_and_chars() {
        // 2 words, 11 chars -> ceil(11 / 4) = 3.
        assert_eq!(approx_tokens("hello world"), 3);
        // Many short words: word count dominates.
        assert_eq!(approx_tokens("a b c d e f g h"), 8);
    }

    #[test]
    fn approx_tokens_single_long_word() {
        assert_eq!(approx_tokens("abcdefgh"), 2);
    }

    #[test]
    fn chunk_tokens_match_approximation() {
        let chunks = split_text("alpha beta gamma delta", 2, 0);
        for chunk in &chunks {
            assert_eq!(chunk.tokens, approx_tokens(&chunk.text));
        }
    }
}
