//! Pure detection-rule functions for the relationship engine (spec §4.7).

use chrono::{DateTime, Utc};

use crate::model::MemoryItem;

/// Co-occurrence within a 1-hour window; strength decays linearly to 0 at the edge.
pub fn temporal_strength(a: DateTime<Utc>, b: DateTime<Utc>) -> Option<f32> {
    let delta = (a - b).num_milliseconds().unsigned_abs() as f32;
    let one_hour_ms = 3_600_000.0f32;
    if delta > one_hour_ms {
        return None;
    }
    Some((1.0 - delta / one_hour_ms).max(0.0))
}

/// Vector cosine similarity >= 0.5 is a SEMANTIC candidate; strength = similarity,
/// folded together with a flat bonus per exact shared term.
pub const SEMANTIC_MIN_SIMILARITY: f32 = 0.5;

/// Flat bonus per token shared between the two contents, mirroring the flat
/// per-token bonus `lexical_score` already gives category/tag hits
/// (`TAG_CATEGORY_BONUS`). Hash-bucket cosine alone underrates short texts
/// that share only one or two salient words, so a shared term is folded in
/// directly rather than relying on vector similarity alone.
pub const SEMANTIC_SHARED_TERM_BONUS: f32 = 0.3;
/// Caps the shared-term bonus at two terms' worth so near-duplicate content
/// doesn't let token overlap alone manufacture an arbitrarily high strength.
pub const SEMANTIC_SHARED_TERM_BONUS_CAP: f32 = 0.6;

/// Count of tokens present in both contents (order-independent, post-tokenize).
pub fn shared_key_terms(a: &str, b: &str) -> usize {
    let ta: std::collections::HashSet<String> = crate::index::tokenize(a).into_iter().collect();
    let tb: std::collections::HashSet<String> = crate::index::tokenize(b).into_iter().collect();
    ta.intersection(&tb).count()
}

pub fn semantic_strength(similarity: f32, shared_term_count: usize) -> Option<f32> {
    let term_bonus = (shared_term_count as f32 * SEMANTIC_SHARED_TERM_BONUS).min(SEMANTIC_SHARED_TERM_BONUS_CAP);
    let strength = (similarity + term_bonus).clamp(0.0, 1.0);
    if strength >= SEMANTIC_MIN_SIMILARITY {
        Some(strength)
    } else {
        None
    }
}

/// Shared project or session scope; fixed strength (§4.7).
pub const CONTEXT_STRENGTH: f32 = 0.8;

pub fn context_strength(a: &MemoryItem, b: &MemoryItem) -> Option<f32> {
    let same_project = a.metadata.project_id.is_some() && a.metadata.project_id == b.metadata.project_id;
    let same_session = a.metadata.session_id.is_some() && a.metadata.session_id == b.metadata.session_id;
    if same_project || same_session {
        Some(CONTEXT_STRENGTH)
    } else {
        None
    }
}

/// One item's content contains the other's id verbatim; maximal strength (§4.7).
pub fn references_strength(a: &MemoryItem, b: &MemoryItem) -> Option<f32> {
    if a.content.contains(&b.id) || b.content.contains(&a.id) {
        Some(1.0)
    } else {
        None
    }
}

const CAUSAL_MARKERS: [&str; 6] = ["because", "due to", "caused by", "results in", "leads to", "therefore"];
const SUPERSEDES_MARKERS: [&str; 4] = ["supersedes", "replaces", "update to", "deprecated by"];

fn token_overlap(a: &str, b: &str) -> f32 {
    let ta: std::collections::HashSet<String> = crate::index::tokenize(a).into_iter().collect();
    let tb: std::collections::HashSet<String> = crate::index::tokenize(b).into_iter().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count() as f32;
    let union = ta.union(&tb).count() as f32;
    intersection / union
}

/// Validator-curated heuristic: marker words plus token overlap. The caller
/// clamps the resulting confidence below `autoConfirmCeiling` since these
/// are never auto-confirmed (§4.7).
pub fn causal_strength(a: &MemoryItem, b: &MemoryItem) -> Option<f32> {
    let lower_a = a.content.to_lowercase();
    if CAUSAL_MARKERS.iter().any(|m| lower_a.contains(m)) {
        let overlap = token_overlap(&a.content, &b.content);
        if overlap > 0.0 {
            return Some(overlap.max(0.3));
        }
    }
    None
}

pub fn supersedes_strength(a: &MemoryItem, b: &MemoryItem) -> Option<f32> {
    let lower_a = a.content.to_lowercase();
    if SUPERSEDES_MARKERS.iter().any(|m| lower_a.contains(m)) {
        let overlap = token_overlap(&a.content, &b.content);
        if overlap > 0.0 {
            return Some(overlap.max(0.3));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn temporal_strength_decays_to_zero_at_one_hour() {
        let a = Utc::now();
        let b = a + Duration::hours(1);
        let strength = temporal_strength(a, b).unwrap();
        assert!(strength.abs() < 1e-5);
    }

    #[test]
    fn temporal_strength_none_beyond_window() {
        let a = Utc::now();
        let b = a + Duration::hours(2);
        assert!(temporal_strength(a, b).is_none());
    }

    #[test]
    fn semantic_strength_respects_threshold() {
        assert!(semantic_strength(0.4, 0).is_none());
        assert_eq!(semantic_strength(0.6, 0), Some(0.6));
    }

    #[test]
    fn semantic_strength_folds_in_shared_terms() {
        // Two short sentences sharing exactly one salient token ("javascript")
        // sit well below the raw cosine threshold on hash-bucket vectors
        // alone; the shared-term bonus should still cross 0.6 (spec §8
        // scenario 7).
        assert!(semantic_strength(0.333, 0).is_none());
        let strength = semantic_strength(0.333, 1).expect("shared term should push over threshold");
        assert!(strength >= 0.6);
    }
}
