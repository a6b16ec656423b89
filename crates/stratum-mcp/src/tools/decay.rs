//! `predict_memory_decay`, `get_urgent_memories`, `get_promotion_candidates`,
//! `get_archival_candidates`, `get_decay_insights`.

use serde_json::{json, Value};
use stratum_core::model::DecayRecommendation;
use stratum_core::prelude::*;

use super::{all_items, clamp_limit, find_item, require_str, ToolResult};

fn predict_all(router: &Router) -> Vec<(MemoryItem, Tier, stratum_core::model::DecayPrediction)> {
    let engine = router.relationships().lock().unwrap();
    all_items(router)
        .into_iter()
        .map(|(item, tier)| {
            let prediction = engine.predict_decay(&item, tier);
            (item, tier, prediction)
        })
        .collect()
}

pub fn predict_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"memoryId": {"type": "string"}},
        "required": ["memoryId"],
    })
}

pub async fn execute_predict(router: &Router, args: &Value) -> ToolResult {
    let memory_id = require_str(args, "memoryId")?;
    let item = find_item(router, memory_id)
        .ok_or_else(|| stratum_core::error::MemoryError::NotFound(memory_id.to_string()))?;
    let tier = all_items(router)
        .into_iter()
        .find(|(i, _)| i.id == memory_id)
        .map(|(_, t)| t)
        .unwrap_or(Tier::Session);
    let prediction = router.relationships().lock().unwrap().predict_decay(&item, tier);
    Ok(json!(prediction))
}

fn by_recommendation(router: &Router, recommendation: DecayRecommendation, limit: usize) -> Vec<Value> {
    let mut matches: Vec<_> = predict_all(router)
        .into_iter()
        .filter(|(_, _, p)| p.recommendation == recommendation)
        .collect();
    matches.sort_by(|a, b| b.2.decay_rate.partial_cmp(&a.2.decay_rate).unwrap_or(std::cmp::Ordering::Equal));
    matches
        .into_iter()
        .take(limit)
        .map(|(item, tier, prediction)| json!({"item": item, "tier": tier.as_str(), "prediction": prediction}))
        .collect()
}

pub fn urgent_schema() -> Value {
    json!({"type": "object", "properties": {"limit": {"type": "integer", "minimum": 1, "maximum": 50}}})
}

pub async fn execute_urgent(router: &Router, args: &Value) -> ToolResult {
    let limit = clamp_limit(args.get("limit").and_then(|v| v.as_u64()));
    let matches = by_recommendation(router, DecayRecommendation::Urgent, limit);
    Ok(json!({ "count": matches.len(), "memories": matches }))
}

pub fn promotion_candidates_schema() -> Value {
    json!({"type": "object", "properties": {"limit": {"type": "integer", "minimum": 1, "maximum": 50}}})
}

pub async fn execute_promotion_candidates(router: &Router, args: &Value) -> ToolResult {
    let limit = clamp_limit(args.get("limit").and_then(|v| v.as_u64()));
    let matches = by_recommendation(router, DecayRecommendation::Promote, limit);
    Ok(json!({ "count": matches.len(), "memories": matches }))
}

pub fn archival_candidates_schema() -> Value {
    json!({"type": "object", "properties": {"limit": {"type": "integer", "minimum": 1, "maximum": 50}}})
}

pub async fn execute_archival_candidates(router: &Router, args: &Value) -> ToolResult {
    let limit = clamp_limit(args.get("limit").and_then(|v| v.as_u64()));
    let matches = by_recommendation(router, DecayRecommendation::Archive, limit);
    Ok(json!({ "count": matches.len(), "memories": matches }))
}

pub fn insights_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Aggregate view across every recommendation bucket.
pub async fn execute_insights(router: &Router) -> ToolResult {
    let predictions = predict_all(router);
    let mut by_bucket: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut avg_confidence = 0.0;
    for (_, _, prediction) in &predictions {
        let key = match prediction.recommendation {
            DecayRecommendation::Promote => "promote",
            DecayRecommendation::Retain => "retain",
            DecayRecommendation::Archive => "archive",
            DecayRecommendation::Urgent => "urgent",
        };
        *by_bucket.entry(key).or_insert(0) += 1;
        avg_confidence += prediction.confidence;
    }
    if !predictions.is_empty() {
        avg_confidence /= predictions.len() as f64;
    }

    Ok(json!({
        "totalAnalyzed": predictions.len(),
        "byRecommendation": by_bucket,
        "averageConfidence": avg_confidence,
    }))
}
