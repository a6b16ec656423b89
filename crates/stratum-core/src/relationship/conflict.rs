//! Conflict detection over the full item set (spec §4.7).

use serde::Serialize;

use crate::model::MemoryItem;

const CONFLICT_MIN_SIMILARITY: f32 = 0.7;
const NEGATION_MARKERS: [&str; 8] = ["not", "no", "never", "isn't", "doesn't", "won't", "cannot", "can't"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    SupersedeOlder,
    Merge,
    ManualReview,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSuggestion {
    pub item_a: String,
    pub item_b: String,
    pub similarity: f32,
    pub reason: String,
    pub suggested_resolution: ConflictResolution,
}

fn has_negation(content: &str) -> bool {
    let lower = content.to_lowercase();
    NEGATION_MARKERS.iter().any(|m| {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == *m)
    })
}

fn first_number(content: &str) -> Option<f64> {
    content
        .split(|c: char| !c.is_alphanumeric() && c != '.' && c != '-')
        .find_map(|tok| tok.parse::<f64>().ok())
}

/// Flags pairs with high semantic similarity but contradicting polarity or
/// numeric facts. `similarity` is supplied by the caller (GlobalLayer's
/// vector index) since conflict detection is similarity-source agnostic.
pub fn detect_conflicts(
    items: &[&MemoryItem],
    similarity: impl Fn(&MemoryItem, &MemoryItem) -> f32,
) -> Vec<ConflictSuggestion> {
    let mut conflicts = Vec::new();
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let a = items[i];
            let b = items[j];
            let sim = similarity(a, b);
            if sim < CONFLICT_MIN_SIMILARITY {
                continue;
            }

            let negation_mismatch = has_negation(&a.content) != has_negation(&b.content);
            let numbers = (first_number(&a.content), first_number(&b.content));
            let numeric_mismatch = matches!(numbers, (Some(x), Some(y)) if (x - y).abs() > f64::EPSILON);

            if !negation_mismatch && !numeric_mismatch {
                continue;
            }

            let (reason, resolution) = if negation_mismatch {
                ("contradicting polarity".to_string(), ConflictResolution::ManualReview)
            } else {
                ("contradicting numeric facts".to_string(), ConflictResolution::SupersedeOlder)
            };

            conflicts.push(ConflictSuggestion {
                item_a: a.id.clone(),
                item_b: b.id.clone(),
                similarity: sim,
                reason,
                suggested_resolution: resolution,
            });
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryMetadata, NewMemoryItem};

    fn item(content: &str) -> MemoryItem {
        MemoryItem::from_new(NewMemoryItem {
            id: None,
            content: content.to_string(),
            metadata: MemoryMetadata::default(),
        })
    }

    #[test]
    fn negation_mismatch_is_flagged_for_manual_review() {
        let a = item("the server is healthy");
        let b = item("the server is not healthy");
        let conflicts = detect_conflicts(&[&a, &b], |_, _| 0.9);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].suggested_resolution, ConflictResolution::ManualReview);
    }

    #[test]
    fn low_similarity_pairs_are_ignored() {
        let a = item("the server is healthy");
        let b = item("the server is not healthy");
        let conflicts = detect_conflicts(&[&a, &b], |_, _| 0.2);
        assert!(conflicts.is_empty());
    }
}
