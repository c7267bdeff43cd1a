//! Heuristic entity extraction.
//!
//! Scans text for capitalized phrases and long alphabetic tokens, then
//! normalizes to lowercase keys. Every contiguous suffix of a multi-word
//! phrase is kept as well, so "Part A" also yields "A". The output is a
//! sorted, deduplicated set, which keeps repeated extraction idempotent.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static CAPITALIZED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][A-Za-z0-9]*(?:\s+[A-Z][A-Za-z0-9]*)*").expect("valid phrase regex")
});

static LONG_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z]{4,}\b").expect("valid word regex"));

/// Extract normalized entity keys from the given texts.
pub fn extract_entities(texts: &[&str]) -> Vec<String> {
    let combined = texts.join("\n");
    let mut keys = BTreeSet::new();

    for phrase in CAPITALIZED_PHRASE.find_iter(&combined) {
        let phrase = phrase.as_str();
        insert_normalized(&mut keys, phrase);
        let parts: Vec<&str> = phrase.split_whitespace().collect();
        for idx in 1..parts.len() {
            insert_normalized(&mut keys, &parts[idx..].join(" "));
        }
    }

    for word in LONG_WORD.find_iter(&combined) {
        insert_normalized(&mut keys, word.as_str());
    }

    keys.into_iter().collect()
}

fn insert_normalized(keys: &mut BTreeSet<String>, candidate: &str) {
    let normalized = candidate.trim().to_lowercase();
    if !normalized.is_empty() {
        keys.insert(normalized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_capitalized_phrases_and_suffixes() {
        let keys = extract_entities(&["Part A connects to Part B."]);

        assert!(keys.contains(&"part a".to_string()));
        assert!(keys.contains(&"part b".to_string()));
        // Contiguous suffixes of multi-word phrases are kept too.
        assert!(keys.contains(&"a".to_string()));
        assert!(keys.contains(&"b".to_string()));
    }

    #[test]
    fn extracts_long_lowercase_words() {
        let keys = extract_entities(&["the widget requires careful handling"]);

        assert!(keys.contains(&"widget".to_string()));
        assert!(keys.contains(&"requires".to_string()));
        assert!(keys.contains(&"handling".to_string()));
        // Three-letter words are below the length floor.
        assert!(!keys.contains(&"the".to_string()));
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let keys = extract_entities(&["Widget widget WIDGET Zeta Alpha"]);

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.iter().filter(|k| *k == "widget").count(), 1);
    }

    #[test]
    fn empty_input_yields_empty_set() {
        assert!(extract_entities(&[]).is_empty());
        assert!(extract_entities(&[""]).is_empty());
        assert!(extract_entities(&["a an of"]).is_empty());
    }

    #[test]
    fn extraction_is_idempotent_on_its_own_output() {
        let first = extract_entities(&["Widget Safety requires Part A before Part B"]);
        let joined = first.join(" ");
        let second = extract_entities(&[joined.as_str()]);

        // Keys are already lowercase, so the second pass only sees the
        // long-word branch; everything it finds was already a key.
        for key in &second {
            if key.split_whitespace().count() == 1 {
                assert!(first.contains(key), "unexpected new key {key}");
            }
        }
    }

    #[test]
    fn spans_multiple_texts() {
        let keys = extract_entities(&["Reset Procedure", "printer offline"]);

        assert!(keys.contains(&"reset procedure".to_string()));
        assert!(keys.contains(&"procedure".to_string()));
        assert!(keys.contains(&"printer".to_string()));
        assert!(keys.contains(&"offline".to_string()));
    }

    #[test]
    fn alphanumeric_capitalized_tokens_are_kept() {
        let keys = extract_entities(&["Use VPN2 with Gateway9 today"]);

        assert!(keys.contains(&"vpn2".to_string()));
        assert!(keys.contains(&"gateway9".to_string()));
    }
}
