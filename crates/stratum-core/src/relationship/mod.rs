//! RelationshipEngine — detection, conflict detection, versioning, decay (spec §4.7).

pub mod conflict;
pub mod decay;
pub mod detection;

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

pub use conflict::{ConflictResolution, ConflictSuggestion};
pub use decay::predict as predict_decay;

use crate::config::RelationshipConfig;
use crate::error::{MemoryError, Result};
use crate::model::{
    ChangePayload, ChangeType, DecayPrediction, MemoryItem, MemoryRelationship, MemoryVersion,
    RelationshipMetadata, RelationshipType, Tier, VersionHistory,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipSuggestion {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: RelationshipType,
    pub strength: f32,
    pub confidence: f32,
    pub detecting_algorithm: String,
}

#[derive(Debug, Clone, Copy)]
pub enum ValidationAction {
    Confirm,
    Reject,
    Modify { strength: Option<f32>, confidence: Option<f32> },
}

#[derive(Debug, Default)]
pub struct DetectionOutcome {
    pub confirmed: Vec<MemoryRelationship>,
    pub suggestions: Vec<RelationshipSuggestion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub pending: usize,
    pub confirmed: usize,
    pub rejected: usize,
    pub by_type: HashMap<String, usize>,
    pub by_algorithm: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub top_tags: Vec<String>,
    pub top_categories: Vec<String>,
    pub representative_snippet: String,
    pub member_count: usize,
}

const REPRESENTATIVE_SNIPPET_MAX_CHARS: usize = 160;

#[derive(Debug)]
pub struct RelationshipEngine {
    config: RelationshipConfig,
    confirmed: Vec<MemoryRelationship>,
    suggestions: HashMap<String, RelationshipSuggestion>,
    rejected_count: usize,
    versions: HashMap<String, VersionHistory>,
}

impl RelationshipEngine {
    pub fn new(config: RelationshipConfig) -> Self {
        Self {
            config,
            confirmed: Vec::new(),
            suggestions: HashMap::new(),
            rejected_count: 0,
            versions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RelationshipConfig {
        &self.config
    }

    /// Evaluates every detection rule between `new_item` and each candidate
    /// in `bounded_candidates` (the caller has already clamped this to
    /// `batchSize`), storing confirmations directly and queuing the rest
    /// for the validation surface (§4.7).
    pub fn detect(
        &mut self,
        new_item: &MemoryItem,
        new_vector: Option<&[f32]>,
        bounded_candidates: &[(&MemoryItem, Option<&[f32]>)],
    ) -> DetectionOutcome {
        if !self.config.enabled {
            return DetectionOutcome::default();
        }

        let mut outcome = DetectionOutcome::default();
        for (candidate, candidate_vector) in bounded_candidates {
            let mut push = |rel_type: RelationshipType, strength: f32, confidence: f32, algorithm: &str| {
                if confidence >= self.config.min_confidence {
                    let mut relationship =
                        MemoryRelationship::new(&new_item.id, &candidate.id, rel_type, strength, confidence, algorithm);
                    relationship.metadata = RelationshipMetadata {
                        detecting_algorithm: algorithm.to_string(),
                        created_at: Utc::now(),
                        validator: None,
                    };
                    outcome.confirmed.push(relationship);
                } else {
                    outcome.suggestions.push(RelationshipSuggestion {
                        id: uuid::Uuid::new_v4().to_string(),
                        source_id: new_item.id.clone(),
                        target_id: candidate.id.clone(),
                        relationship_type: rel_type,
                        strength,
                        confidence,
                        detecting_algorithm: algorithm.to_string(),
                    });
                }
            };

            if let Some(strength) = detection::temporal_strength(new_item.created_at, candidate.created_at) {
                push(RelationshipType::Temporal, strength, strength, "temporal_cooccurrence");
            }
            if let (Some(nv), Some(cv)) = (new_vector, candidate_vector) {
                let sim = crate::vector::cosine_similarity(nv, cv);
                let shared_terms = detection::shared_key_terms(&new_item.content, &candidate.content);
                if let Some(strength) = detection::semantic_strength(sim, shared_terms) {
                    push(RelationshipType::Semantic, strength, strength, "vector_cosine");
                }
            }
            if let Some(strength) = detection::context_strength(new_item, candidate) {
                push(RelationshipType::Context, strength, strength, "shared_context");
            }
            if let Some(strength) = detection::references_strength(new_item, candidate) {
                push(RelationshipType::References, strength, strength, "id_reference");
            }
            if let Some(strength) = detection::causal_strength(new_item, candidate) {
                let confidence = strength.min(self.config.auto_confirm_ceiling - f32::EPSILON);
                push(RelationshipType::Causal, strength, confidence, "causal_marker");
            }
            if let Some(strength) = detection::supersedes_strength(new_item, candidate) {
                let confidence = strength.min(self.config.auto_confirm_ceiling - f32::EPSILON);
                push(RelationshipType::Supersedes, strength, confidence, "supersedes_marker");
            }
        }

        for suggestion in &outcome.suggestions {
            self.suggestions.insert(suggestion.id.clone(), suggestion.clone());
        }
        self.confirmed.extend(outcome.confirmed.clone());
        outcome
    }

    pub fn get_memory_relationships(&self, item_id: &str) -> Vec<MemoryRelationship> {
        self.confirmed.iter().filter(|r| r.touches(item_id)).cloned().collect()
    }

    /// Drops relationships touching a deleted item (I6: dangling relationships
    /// are garbage-collected at the next optimize; this call performs it eagerly).
    pub fn purge_dangling(&mut self, live_ids: &std::collections::HashSet<String>) {
        self.confirmed
            .retain(|r| live_ids.contains(&r.source_id) && live_ids.contains(&r.target_id));
    }

    pub fn get_relationship_suggestions(&self) -> Vec<RelationshipSuggestion> {
        let mut out: Vec<RelationshipSuggestion> = self.suggestions.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn validate_relationship(&mut self, suggestion_id: &str, action: ValidationAction) -> Result<bool> {
        match action {
            ValidationAction::Reject => {
                if self.suggestions.remove(suggestion_id).is_none() {
                    return Err(MemoryError::NotFound(suggestion_id.to_string()));
                }
                self.rejected_count += 1;
                Ok(true)
            }
            ValidationAction::Confirm => {
                let suggestion = self
                    .suggestions
                    .remove(suggestion_id)
                    .ok_or_else(|| MemoryError::NotFound(suggestion_id.to_string()))?;
                let mut relationship = MemoryRelationship::new(
                    &suggestion.source_id,
                    &suggestion.target_id,
                    suggestion.relationship_type,
                    suggestion.strength,
                    suggestion.confidence,
                    &suggestion.detecting_algorithm,
                );
                relationship.metadata.validator = Some("human".to_string());
                self.confirmed.push(relationship);
                Ok(true)
            }
            ValidationAction::Modify { strength, confidence } => {
                let suggestion = self
                    .suggestions
                    .get_mut(suggestion_id)
                    .ok_or_else(|| MemoryError::NotFound(suggestion_id.to_string()))?;
                if let Some(s) = strength {
                    suggestion.strength = s.clamp(0.0, 1.0);
                }
                if let Some(c) = confidence {
                    suggestion.confidence = c.clamp(0.0, 1.0);
                }
                if suggestion.confidence >= self.config.min_confidence {
                    let suggestion = self.suggestions.remove(suggestion_id).unwrap();
                    let mut relationship = MemoryRelationship::new(
                        &suggestion.source_id,
                        &suggestion.target_id,
                        suggestion.relationship_type,
                        suggestion.strength,
                        suggestion.confidence,
                        &suggestion.detecting_algorithm,
                    );
                    relationship.metadata.validator = Some("human".to_string());
                    self.confirmed.push(relationship);
                }
                Ok(true)
            }
        }
    }

    pub fn get_validation_stats(&self) -> ValidationStats {
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut by_algorithm: HashMap<String, usize> = HashMap::new();
        for relationship in &self.confirmed {
            *by_type.entry(relationship.relationship_type.to_string()).or_insert(0) += 1;
            *by_algorithm.entry(relationship.metadata.detecting_algorithm.clone()).or_insert(0) += 1;
        }
        ValidationStats {
            pending: self.suggestions.len(),
            confirmed: self.confirmed.len(),
            rejected: self.rejected_count,
            by_type,
            by_algorithm,
        }
    }

    pub fn detect_conflicts(
        &self,
        items: &[&MemoryItem],
        similarity: impl Fn(&MemoryItem, &MemoryItem) -> f32,
    ) -> Vec<ConflictSuggestion> {
        conflict::detect_conflicts(items, similarity)
    }

    pub fn predict_decay(&self, item: &MemoryItem, tier: Tier) -> DecayPrediction {
        let incoming = self.confirmed.iter().filter(|r| r.target_id == item.id).count();
        decay::predict(item, incoming, tier, Utc::now())
    }

    pub fn record_version(
        &mut self,
        item_id: &str,
        change_type: ChangeType,
        actor: &str,
        payload: ChangePayload,
    ) -> MemoryVersion {
        let history = self.versions.entry(item_id.to_string()).or_default();
        let version_number = history.next_version_number();
        let parent = history.all().last().map(|v| v.version_id.clone());
        let version = MemoryVersion::new(item_id, version_number, change_type, parent, actor, payload);
        history.push(version.clone());
        version
    }

    pub fn get_memory_versions(&self, item_id: &str) -> &[MemoryVersion] {
        self.versions.get(item_id).map(|h| h.all()).unwrap_or(&[])
    }

    /// Deterministic summary: most frequent tags/categories, plus a
    /// representative snippet from the lowest-id member (§4.7).
    pub fn summarize_cluster(&self, items: &[&MemoryItem]) -> ClusterSummary {
        let mut tag_counts: HashMap<String, usize> = HashMap::new();
        let mut category_counts: HashMap<String, usize> = HashMap::new();
        for item in items {
            for tag in &item.metadata.tags {
                *tag_counts.entry(tag.clone()).or_insert(0) += 1;
            }
            *category_counts.entry(item.metadata.category.clone()).or_insert(0) += 1;
        }

        let mut top_tags: Vec<String> = tag_counts.into_iter().collect::<Vec<_>>().into_iter().map(|(t, _)| t).collect();
        top_tags.sort();
        let mut top_categories: Vec<String> = category_counts.into_keys().collect();
        top_categories.sort();

        let representative = items.iter().min_by(|a, b| a.id.cmp(&b.id));
        let representative_snippet = representative
            .map(|item| {
                let mut snippet = item.content.clone();
                snippet.truncate(REPRESENTATIVE_SNIPPET_MAX_CHARS);
                snippet
            })
            .unwrap_or_default();

        ClusterSummary {
            top_tags,
            top_categories,
            representative_snippet,
            member_count: items.len(),
        }
    }
}
