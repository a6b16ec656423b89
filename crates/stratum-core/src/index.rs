//! Inverted index and tokenizer shared by `BaseLayer` (spec §4.1 "Indexing").

use std::collections::{HashMap, HashSet};

/// Category/tag tokens get this flat bonus added to their per-token contribution.
pub const TAG_CATEGORY_BONUS: f32 = 0.5;

/// Lowercase, strip punctuation, drop tokens of length <= 2 (§4.1).
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect()
}

/// Maps each token to the set of item ids containing it.
#[derive(Debug, Default, Clone)]
pub struct InvertedIndex {
    postings: HashMap<String, HashSet<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an item's content plus its category and tags as first-class tokens.
    pub fn index_item(&mut self, id: &str, content: &str, category: &str, tags: &[String]) {
        for token in tokenize(content) {
            self.postings.entry(token).or_default().insert(id.to_string());
        }
        for token in tokenize(category) {
            self.postings.entry(token).or_default().insert(id.to_string());
        }
        for tag in tags {
            for token in tokenize(tag) {
                self.postings.entry(token).or_default().insert(id.to_string());
            }
        }
    }

    pub fn remove_item(&mut self, id: &str) {
        for ids in self.postings.values_mut() {
            ids.remove(id);
        }
    }

    pub fn candidates_for_tokens(&self, tokens: &[String]) -> HashSet<String> {
        let mut out = HashSet::new();
        for token in tokens {
            if let Some(ids) = self.postings.get(token) {
                out.extend(ids.iter().cloned());
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.postings.clear();
    }

    pub fn token_count(&self) -> usize {
        self.postings.len()
    }
}

/// Per-token lexical contribution toward a candidate's search score: raw
/// query/content token overlap, plus a flat bonus when the token also
/// appears in the item's category or tags (§4.1 "Indexing").
pub fn lexical_score(
    query_tokens: &[String],
    content: &str,
    category: &str,
    tags: &[String],
) -> f32 {
    let content_tokens: HashSet<String> = tokenize(content).into_iter().collect();
    let category_tokens: HashSet<String> = tokenize(category).into_iter().collect();
    let tag_tokens: HashSet<String> = tags.iter().flat_map(|t| tokenize(t)).collect();

    if query_tokens.is_empty() {
        return 0.0;
    }

    let mut score = 0.0f32;
    for qt in query_tokens {
        if content_tokens.contains(qt) {
            score += 1.0;
        }
        if category_tokens.contains(qt) {
            score += TAG_CATEGORY_BONUS;
        }
        if tag_tokens.contains(qt) {
            score += TAG_CATEGORY_BONUS;
        }
    }
    // Normalize by query length so scores land roughly in [0,1] per match quality.
    (score / query_tokens.len() as f32).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_drops_short_tokens_and_punctuation() {
        let tokens = tokenize("The Rust-lang is, fun! A B ab abc");
        assert!(tokens.contains(&"rust".to_string()));
        assert!(tokens.contains(&"lang".to_string()));
        assert!(!tokens.contains(&"a".to_string()));
        assert!(!tokens.contains(&"ab".to_string()));
        assert!(tokens.contains(&"abc".to_string()));
    }

    #[test]
    fn index_and_lookup_roundtrip() {
        let mut idx = InvertedIndex::new();
        idx.index_item("a", "rust programming language", "tech", &["systems".into()]);
        idx.index_item("b", "python scripting language", "tech", &[]);

        let hits = idx.candidates_for_tokens(&["language".to_string()]);
        assert!(hits.contains("a"));
        assert!(hits.contains("b"));

        let hits = idx.candidates_for_tokens(&["rust".to_string()]);
        assert!(hits.contains("a"));
        assert!(!hits.contains("b"));
    }

    #[test]
    fn remove_item_clears_postings() {
        let mut idx = InvertedIndex::new();
        idx.index_item("a", "unique content here", "cat", &[]);
        idx.remove_item("a");
        let hits = idx.candidates_for_tokens(&["unique".to_string()]);
        assert!(hits.is_empty());
    }

    #[test]
    fn tag_and_category_give_bonus() {
        let score_with_tag = lexical_score(
            &["important".to_string()],
            "some content",
            "misc",
            &["important".to_string()],
        );
        let score_without = lexical_score(&["important".to_string()], "some content", "misc", &[]);
        assert!(score_with_tag > score_without);
    }
}
