//! Deterministic content vectors for `GlobalLayer`'s vector index (spec §4.4).
//!
//! Tokens are hashed into the vector's dimensions with a normalized
//! frequency; no external embedding model is involved, so the mapping is
//! fully deterministic and reproducible across runs (grounded on the
//! *shape* of the teacher's `search::vector` module, not its HNSW backend).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::index::tokenize;

/// Default embedding dimensionality (§4.4).
pub const DEFAULT_DIMENSIONS: usize = 100;

/// A fixed-dimension content vector.
pub type Vector = Vec<f32>;

/// Derive a deterministic vector from content: hash each token into a
/// dimension bucket, accumulate normalized term frequency, then L2-normalize.
pub fn embed(content: &str, dimensions: usize) -> Vector {
    let tokens = tokenize(content);
    let mut buckets = vec![0.0f32; dimensions];

    if tokens.is_empty() {
        return buckets;
    }

    for token in &tokens {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let bucket = (hasher.finish() as usize) % dimensions;
        buckets[bucket] += 1.0;
    }

    let total = tokens.len() as f32;
    for v in buckets.iter_mut() {
        *v /= total;
    }

    l2_normalize(&mut buckets);
    buckets
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two vectors of equal length, in [-1, 1]
/// (in practice [0, 1] for the non-negative term-frequency vectors `embed` produces).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// A brute-force vector store: exact nearest-neighbor search over all
/// entries. Adequate for the tier sizes this spec targets (tens of
/// thousands of items) and keeps the index fully deterministic.
#[derive(Debug, Default, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    entries: std::collections::HashMap<String, Vector>,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: std::collections::HashMap::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn upsert(&mut self, id: impl Into<String>, content: &str) {
        let v = embed(content, self.dimensions);
        self.entries.insert(id.into(), v);
    }

    pub fn remove(&mut self, id: &str) {
        self.entries.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<&Vector> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Search by cosine similarity against a query vector, returning ids with
    /// similarity >= `min_similarity`, sorted descending.
    pub fn search(&self, query: &[f32], min_similarity: f32) -> Vec<(String, f32)> {
        let mut out: Vec<(String, f32)> = self
            .entries
            .iter()
            .map(|(id, v)| (id.clone(), cosine_similarity(query, v)))
            .filter(|(_, sim)| *sim >= min_similarity)
            .collect();
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        out
    }

    /// Search using a content string (embeds it first with this index's dimensionality).
    pub fn search_content(&self, query_content: &str, min_similarity: f32) -> Vec<(String, f32)> {
        let q = embed(query_content, self.dimensions);
        self.search(&q, min_similarity)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        let a = embed("the quick brown fox", DEFAULT_DIMENSIONS);
        let b = embed("the quick brown fox", DEFAULT_DIMENSIONS);
        assert_eq!(a, b);
    }

    #[test]
    fn identical_content_has_similarity_one() {
        let a = embed("rust is a systems programming language", 50);
        let b = embed("rust is a systems programming language", 50);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn unrelated_content_has_lower_similarity() {
        let a = embed("javascript is a dynamic scripting language for the web", 50);
        let b = embed("volcanic rock formations in iceland erupt occasionally", 50);
        let c = embed("javascript is used for dynamic web scripting languages", 50);
        assert!(cosine_similarity(&a, &c) > cosine_similarity(&a, &b));
    }

    #[test]
    fn vector_index_search_respects_threshold() {
        let mut idx = VectorIndex::new(50);
        idx.upsert("a", "rust programming language systems");
        idx.upsert("b", "banana bread recipe ingredients");

        let hits = idx.search_content("rust programming systems language", 0.5);
        assert!(hits.iter().any(|(id, _)| id == "a"));
    }
}
