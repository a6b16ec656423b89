//! Decay prediction model (spec §4.7). Bucket boundaries are fixed by the
//! specification; the coefficients feeding `predictedImportance` are
//! implementation-chosen constants (§9 Open Questions), picked to be
//! monotonic and stable rather than empirically fit.

use crate::model::{DecayPrediction, DecayRecommendation, MemoryItem, Tier};

const WEIGHT_ACCESS: f64 = 0.25;
const WEIGHT_RECENCY: f64 = 0.25;
const WEIGHT_PRIORITY: f64 = 0.35;
const WEIGHT_RELATIONSHIPS: f64 = 0.15;

const ACCESS_FREQUENCY_NORM: f64 = 20.0;
const RELATIONSHIP_COUNT_NORM: f64 = 5.0;
const RECENCY_HALF_LIFE_DAYS: f64 = 14.0;

const TAG_IMPORTANT_BONUS: f64 = 0.1;
const TAG_TEMPORARY_PENALTY: f64 = 0.15;

const BASE_DECAY_RATE: f64 = 0.02;
const MOMENTUM_WEIGHT: f64 = 0.03;
/// How much a heavily-referenced item's incoming-relationship score pulls the
/// decay rate negative, i.e. lets its projected importance grow instead of
/// fade. Independent of recency/access momentum: an item other memories keep
/// pointing to is trending upward on its own signal.
const RELATIONSHIP_GROWTH_WEIGHT: f64 = 0.04;

const OBSOLESCENCE_THRESHOLD: f64 = 0.1;
const MAX_OBSOLESCENCE_HORIZON_DAYS: f64 = 3650.0;

const CONFIDENCE_FLOOR: f64 = 0.5;
const CONFIDENCE_ACCESS_NORM: f64 = 10.0;

const URGENT_HORIZON_DAYS: f64 = 7.0;
const URGENT_THRESHOLD: f64 = 0.2;
const ARCHIVE_HORIZON_DAYS: f64 = 30.0;
const ARCHIVE_THRESHOLD: f64 = 0.3;
const PROMOTE_FACTOR: f64 = 1.5;
const PROMOTE_MIN_CONFIDENCE: f64 = 0.6;

fn tier_weight(tier: Tier) -> f64 {
    match tier {
        Tier::Session => 0.9,
        Tier::Project => 1.0,
        Tier::Global => 1.0,
        Tier::Temporal => 0.8,
    }
}

/// Predicts importance evolution for `item`, given how many other items
/// reference it (`incoming_relationship_count`) and the tier it currently
/// lives in.
pub fn predict(item: &MemoryItem, incoming_relationship_count: usize, tier: Tier, now: chrono::DateTime<chrono::Utc>) -> DecayPrediction {
    let mut factors = Vec::new();

    let access_frequency_score = (item.access_count as f64 / ACCESS_FREQUENCY_NORM).min(1.0);
    if access_frequency_score > 0.5 {
        factors.push("high access frequency".to_string());
    }

    let days_since_access = (now - item.last_accessed).num_seconds() as f64 / 86_400.0;
    let recency_score = (-(days_since_access.max(0.0)) / RECENCY_HALF_LIFE_DAYS).exp();
    if recency_score > 0.7 {
        factors.push("recently accessed".to_string());
    }

    let priority_score = item.metadata.priority as f64 / 10.0;
    if priority_score >= 0.8 {
        factors.push("high priority".to_string());
    }

    let relationship_score = (incoming_relationship_count as f64 / RELATIONSHIP_COUNT_NORM).min(1.0);
    if incoming_relationship_count > 0 {
        factors.push(format!("{incoming_relationship_count} incoming relationships"));
    }

    let mut tag_adjustment = 0.0;
    if item.metadata.has_any_tag(&["important"]) {
        tag_adjustment += TAG_IMPORTANT_BONUS;
        factors.push("tagged important".to_string());
    }
    if item.metadata.has_any_tag(&["temporary"]) {
        tag_adjustment -= TAG_TEMPORARY_PENALTY;
        factors.push("tagged temporary".to_string());
    }

    factors.push(format!("tier: {tier}"));

    let current_importance = (WEIGHT_ACCESS * access_frequency_score
        + WEIGHT_RECENCY * recency_score
        + WEIGHT_PRIORITY * priority_score
        + WEIGHT_RELATIONSHIPS * relationship_score
        + tag_adjustment)
        .clamp(0.0, 1.0)
        * tier_weight(tier);
    let current_importance = current_importance.clamp(0.0, 1.0);

    let momentum = recency_score * access_frequency_score;
    let decay_rate = BASE_DECAY_RATE - MOMENTUM_WEIGHT * momentum - RELATIONSHIP_GROWTH_WEIGHT * relationship_score;

    let predicted_at = |days: f64| -> f64 { (current_importance * (-decay_rate * days).exp()).clamp(0.0, 1.0) };

    let predicted_importance_7d = predicted_at(URGENT_HORIZON_DAYS);
    let predicted_importance_30d = predicted_at(ARCHIVE_HORIZON_DAYS);

    let estimated_time_to_obsolescence_days = if decay_rate <= f64::EPSILON || current_importance <= OBSOLESCENCE_THRESHOLD {
        if current_importance <= OBSOLESCENCE_THRESHOLD {
            0.0
        } else {
            MAX_OBSOLESCENCE_HORIZON_DAYS
        }
    } else {
        (current_importance / OBSOLESCENCE_THRESHOLD).ln() / decay_rate
    };

    let confidence = (CONFIDENCE_FLOOR + (1.0 - CONFIDENCE_FLOOR) * (item.access_count as f64 / CONFIDENCE_ACCESS_NORM).min(1.0))
        .clamp(0.0, 1.0);

    let recommendation = if predicted_importance_7d < URGENT_THRESHOLD {
        DecayRecommendation::Urgent
    } else if predicted_importance_30d < ARCHIVE_THRESHOLD && estimated_time_to_obsolescence_days > ARCHIVE_HORIZON_DAYS {
        DecayRecommendation::Archive
    } else if predicted_importance_30d > PROMOTE_FACTOR * current_importance && confidence >= PROMOTE_MIN_CONFIDENCE {
        DecayRecommendation::Promote
    } else {
        DecayRecommendation::Retain
    };

    DecayPrediction {
        item_id: item.id.clone(),
        current_importance,
        predicted_importance: predicted_importance_30d,
        decay_rate,
        estimated_time_to_obsolescence_days,
        confidence,
        recommendation,
        contributing_factors: factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryMetadata, NewMemoryItem};
    use chrono::Utc;

    fn item_with(priority: u8, access_count: u64) -> MemoryItem {
        let mut item = MemoryItem::from_new(NewMemoryItem {
            id: None,
            content: "x".into(),
            metadata: MemoryMetadata {
                priority,
                ..Default::default()
            },
        });
        item.access_count = access_count;
        item
    }

    #[test]
    fn hot_high_priority_item_never_archives() {
        let item = item_with(10, 20);
        let prediction = predict(&item, 0, Tier::Global, Utc::now());
        assert_ne!(prediction.recommendation, DecayRecommendation::Archive);
    }

    #[test]
    fn cold_low_priority_item_trends_toward_archive_or_urgent() {
        let mut item = item_with(1, 0);
        item.last_accessed = Utc::now() - chrono::Duration::days(200);
        item.created_at = item.last_accessed;
        let prediction = predict(&item, 0, Tier::Temporal, Utc::now());
        assert!(matches!(
            prediction.recommendation,
            DecayRecommendation::Archive | DecayRecommendation::Urgent | DecayRecommendation::Retain
        ));
        assert!(prediction.current_importance < 0.5);
    }

    #[test]
    fn heavily_referenced_item_is_reachable_as_promote() {
        // Moderate priority/access so `current_importance` stays well under
        // 1.0/1.5, but enough incoming relationships that the growth term
        // pushes the 30-day projection past 1.5x current (§4.7 "promote").
        let item = item_with(5, 3);
        let prediction = predict(&item, 5, Tier::Global, Utc::now());
        assert_eq!(prediction.recommendation, DecayRecommendation::Promote);
    }
}
