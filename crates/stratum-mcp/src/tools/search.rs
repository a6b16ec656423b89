//! `advanced_search`, `semantic_search`, `temporal_search`.

use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use stratum_core::model::{sort_results, DateRange};
use stratum_core::prelude::*;
use stratum_core::search::{self, QueryType, SearchFeatureFlags};
use stratum_core::vector;

use super::{all_items, clamp_limit, require_str, ToolResult};

pub fn advanced_search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string"},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
            "semantic": {"type": "boolean", "default": true},
            "temporal": {"type": "boolean", "default": true},
            "relationship": {"type": "boolean", "default": true},
        },
        "required": ["query"],
    })
}

/// Cascading hybrid: the Router's own lexical dispatch, optionally fused
/// with semantic and relationship-graph signals (§4.8).
pub async fn execute_advanced_search(router: &Router, args: &Value) -> ToolResult {
    let text = require_str(args, "query")?.to_string();
    let limit = clamp_limit(args.get("limit").and_then(|v| v.as_u64()));
    let flags = SearchFeatureFlags {
        semantic: args.get("semantic").and_then(|v| v.as_bool()).unwrap_or(true),
        temporal: args.get("temporal").and_then(|v| v.as_bool()).unwrap_or(true),
        relationship: args.get("relationship").and_then(|v| v.as_bool()).unwrap_or(true),
    };
    let now = Utc::now();

    let mut query = MemoryQuery::new(text.clone());
    query.limit = Some(stratum_core::model::INTERNAL_MAX_LIMIT);
    let lexical = router.search(query, &RequestContext::default(), Duration::from_secs(5)).await?;

    let results = {
        let mut engine = router.search_engine().lock().unwrap();
        engine.cached_or(&text, flags, QueryType::Hybrid, now, || {
            let query_vec = flags.semantic.then(|| vector::embed(&text, vector::DEFAULT_DIMENSIONS));

            let relationship_scores = if flags.relationship {
                let seeds: Vec<(String, f32)> =
                    lexical.iter().map(|r| (r.item.id.clone(), r.score)).collect();
                let graph = router.graph().read().unwrap();
                Some(search::expand_via_graph(&seeds, graph.as_ref(), 2))
            } else {
                None
            };

            let mut fused: Vec<MemorySearchResult> = lexical
                .into_iter()
                .map(|mut r| {
                    let semantic_score = query_vec.as_ref().map(|qv| {
                        let item_vec = vector::embed(&r.item.content, vector::DEFAULT_DIMENSIONS);
                        vector::cosine_similarity(qv, &item_vec)
                    });
                    let temporal_score = flags.temporal.then(|| {
                        let age_hours = (now - r.item.created_at).num_hours().max(0) as f32;
                        1.0 / (1.0 + age_hours / 24.0)
                    });
                    let relationship_score =
                        relationship_scores.as_ref().and_then(|m| m.get(&r.item.id).copied());
                    r.score = search::fuse_scores(r.score, semantic_score, temporal_score, relationship_score);
                    r
                })
                .collect();
            sort_results(&mut fused);
            fused.truncate(limit);
            fused
        })
    };

    Ok(json!({
        "resultCount": results.len(),
        "results": results,
        "analytics": router.search_engine().lock().unwrap().analytics(),
    }))
}

pub fn semantic_search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string"},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
            "minSimilarity": {"type": "number", "minimum": 0, "maximum": 1},
        },
        "required": ["query"],
    })
}

/// Global's vector index is the only layer that carries an embedding; other
/// tiers are matched lexically and folded in at the same similarity scale.
pub async fn execute_semantic_search(router: &Router, args: &Value) -> ToolResult {
    let text = require_str(args, "query")?.to_string();
    let limit = clamp_limit(args.get("limit").and_then(|v| v.as_u64()));
    let min_similarity = args.get("minSimilarity").and_then(|v| v.as_f64()).unwrap_or(0.2) as f32;

    let global_hits = {
        let global = router.global().read().unwrap();
        let query_vec = global.embed_query(&text);
        global.vectors().search(&query_vec, min_similarity)
    };

    let mut results: Vec<MemorySearchResult> = Vec::new();
    {
        let global = router.global().read().unwrap();
        for (id, score) in global_hits {
            if let Some(item) = global.peek(&id) {
                results.push(MemorySearchResult {
                    item: item.clone(),
                    score,
                    source_tier: Tier::Global,
                    explanation: "vector cosine similarity".to_string(),
                });
            }
        }
    }

    for (item, tier) in all_items(router) {
        if tier == Tier::Global {
            continue;
        }
        let item_vec = vector::embed(&item.content, vector::DEFAULT_DIMENSIONS);
        let query_vec = vector::embed(&text, vector::DEFAULT_DIMENSIONS);
        let score = vector::cosine_similarity(&query_vec, &item_vec);
        if score >= min_similarity {
            results.push(MemorySearchResult {
                item,
                score,
                source_tier: tier,
                explanation: "vector cosine similarity (ad-hoc embedding)".to_string(),
            });
        }
    }

    sort_results(&mut results);
    results.truncate(limit);

    Ok(json!({
        "resultCount": results.len(),
        "results": results,
    }))
}

pub fn temporal_search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string"},
            "relative": {"type": "string", "enum": ["today", "yesterday", "last week", "this month"]},
            "start": {"type": "string", "format": "date-time"},
            "end": {"type": "string", "format": "date-time"},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
        },
    })
}

pub async fn execute_temporal_search(router: &Router, args: &Value) -> ToolResult {
    let limit = clamp_limit(args.get("limit").and_then(|v| v.as_u64()));
    let now = Utc::now();

    let range = if let Some(keyword) = args.get("relative").and_then(|v| v.as_str()) {
        search::resolve_relative_range(keyword, now).ok_or_else(|| super::ToolError {
            code: "validation".to_string(),
            message: format!("unrecognized relative range `{keyword}`"),
            retry_after_ms: None,
        })?
    } else {
        let start = args
            .get("start")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));
        let end = args
            .get("end")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));
        DateRange { start, end }
    };

    let start = range.start.unwrap_or(now - chrono::Duration::days(365 * 10));
    let end = range.end.unwrap_or(now);

    let temporal = router.temporal().read().unwrap();
    let mut items = temporal.get_memories_in_range(start, end, stratum_core::model::INTERNAL_MAX_LIMIT);

    if let Some(text) = args.get("query").and_then(|v| v.as_str()) {
        let global = router.global().read().unwrap();
        items.retain(|item| global.query_tokens_overlap(text, item) > 0.0);
    }

    let midpoint = start + (end - start) / 2;
    let mut results: Vec<MemorySearchResult> = items
        .into_iter()
        .map(|item| {
            let distance_hours = (item.created_at - midpoint).num_hours().abs() as f32;
            let score = 1.0 / (1.0 + distance_hours / 24.0);
            MemorySearchResult {
                item,
                score,
                source_tier: Tier::Temporal,
                explanation: "temporal range proximity to midpoint".to_string(),
            }
        })
        .collect();
    sort_results(&mut results);
    results.truncate(limit);

    Ok(json!({
        "resultCount": results.len(),
        "results": results,
        "range": {"start": start, "end": end},
    }))
}
