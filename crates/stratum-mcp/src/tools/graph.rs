//! `build_knowledge_graph`, `get_memory_relationships`, `detect_conflicts`.

use serde_json::{json, Value};
use stratum_core::prelude::*;
use stratum_core::relationship::detection;
use stratum_core::vector;

use super::{all_items, find_item, require_str, ToolResult};

pub fn build_graph_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "maxPairs": {"type": "integer", "minimum": 1, "maximum": 5000},
        },
    })
}

/// Autolinks every pair of live items up to `maxPairs`, backfilling edges
/// between items that predate each other's incremental on-store autolink
/// (§4.6) or were never compared against each other because they fell
/// outside one another's bounded candidate window.
pub async fn execute_build_graph(router: &Router, args: &Value) -> ToolResult {
    let max_pairs = args.get("maxPairs").and_then(|v| v.as_u64()).unwrap_or(2000) as usize;
    let items = all_items(router);

    let mut pairs_examined = 0;
    let mut graph = router.graph().write().unwrap();
    'outer: for (i, (item_a, _)) in items.iter().enumerate() {
        for (item_b, _) in items.iter().skip(i + 1) {
            if pairs_examined >= max_pairs {
                break 'outer;
            }
            pairs_examined += 1;

            let temporal_strength = detection::temporal_strength(item_a.created_at, item_b.created_at).unwrap_or(0.0);
            let vec_a = vector::embed(&item_a.content, vector::DEFAULT_DIMENSIONS);
            let vec_b = vector::embed(&item_b.content, vector::DEFAULT_DIMENSIONS);
            let shares_context = detection::context_strength(item_a, item_b).is_some();

            graph.autolink(&item_a.id, &item_b.id, temporal_strength, Some((&vec_a, &vec_b)), shares_context);
        }
    }

    Ok(json!({
        "nodeCount": graph.node_count(),
        "edgeCount": graph.edge_count(),
        "pairsExamined": pairs_examined,
    }))
}

pub fn relationships_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"memoryId": {"type": "string"}},
        "required": ["memoryId"],
    })
}

pub async fn execute_get_relationships(router: &Router, args: &Value) -> ToolResult {
    let memory_id = require_str(args, "memoryId")?;
    if find_item(router, memory_id).is_none() {
        return Err(stratum_core::error::MemoryError::NotFound(memory_id.to_string()).into());
    }
    let relationships = router.relationships().lock().unwrap().get_memory_relationships(memory_id);
    Ok(json!({ "relationships": relationships }))
}

pub fn detect_conflicts_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "memoryIds": {"type": "array", "items": {"type": "string"}},
        },
    })
}

/// Runs pairwise conflict detection (§4.7) over the requested ids, or every
/// live item when none are given.
pub async fn execute_detect_conflicts(router: &Router, args: &Value) -> ToolResult {
    let requested: Option<Vec<String>> = args
        .get("memoryIds")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect());

    let all = all_items(router);
    let candidates: Vec<MemoryItem> = match requested {
        Some(ids) => all
            .into_iter()
            .filter(|(item, _)| ids.contains(&item.id))
            .map(|(item, _)| item)
            .collect(),
        None => all.into_iter().map(|(item, _)| item).collect(),
    };
    let refs: Vec<&MemoryItem> = candidates.iter().collect();

    let engine = router.relationships().lock().unwrap();
    let conflicts = engine.detect_conflicts(&refs, |a, b| {
        let va = vector::embed(&a.content, vector::DEFAULT_DIMENSIONS);
        let vb = vector::embed(&b.content, vector::DEFAULT_DIMENSIONS);
        vector::cosine_similarity(&va, &vb)
    });

    Ok(json!({ "conflictCount": conflicts.len(), "conflicts": conflicts }))
}
