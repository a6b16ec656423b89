//! `store_memory`, `search_memory`, `get_memory_stats`.

use std::time::Duration;

use serde_json::{json, Value};
use stratum_core::prelude::*;
use stratum_core::router::StoreRequest;

use super::{clamp_limit, require_str, ToolResult};

pub fn store_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}},
            "category": {"type": "string"},
            "priority": {"type": "integer", "minimum": 1, "maximum": 10},
            "source": {"type": "string"},
            "projectId": {"type": "string"},
            "sessionId": {"type": "string"},
            "userId": {"type": "string"},
            "tier": {"type": "string", "enum": ["session", "project", "global", "temporal"]},
        },
        "required": ["content"],
    })
}

pub async fn execute_store(router: &Router, args: &Value) -> ToolResult {
    let content = require_str(args, "content")?.to_string();
    let metadata = MemoryMetadata {
        tags: args
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|t| t.as_str().map(String::from)).collect())
            .unwrap_or_default(),
        category: args.get("category").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        priority: args.get("priority").and_then(|v| v.as_u64()).unwrap_or(5) as u8,
        source: args.get("source").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        project_id: args.get("projectId").and_then(|v| v.as_str()).map(String::from),
        session_id: args.get("sessionId").and_then(|v| v.as_str()).map(String::from),
        user_id: args.get("userId").and_then(|v| v.as_str()).map(String::from),
        expires_at: None,
        additional: Default::default(),
    };
    let requested_tier = args
        .get("tier")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<Tier>().ok());

    let outcome = router.store(
        StoreRequest {
            content,
            metadata,
            requested_tier,
            id: None,
        },
        &RequestContext::default(),
    )?;

    Ok(json!({
        "id": outcome.item.id,
        "layer": outcome.tier.as_str(),
        "metadata": outcome.item.metadata,
    }))
}

pub fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string"},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
            "offset": {"type": "integer", "minimum": 0},
            "category": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}},
        },
        "required": ["query"],
    })
}

pub async fn execute_search(router: &Router, args: &Value) -> ToolResult {
    let text = require_str(args, "query")?.to_string();
    let mut query = MemoryQuery::new(text);
    query.limit = Some(clamp_limit(args.get("limit").and_then(|v| v.as_u64())));
    query.offset = args.get("offset").and_then(|v| v.as_u64()).map(|v| v as usize);
    if args.get("category").is_some() || args.get("tags").is_some() {
        query.filters = Some(MemoryFilters {
            category: args.get("category").and_then(|v| v.as_str()).map(String::from),
            tags: args
                .get("tags")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|t| t.as_str().map(String::from)).collect())
                .unwrap_or_default(),
            ..Default::default()
        });
    }

    let results = router.search(query, &RequestContext::default(), Duration::from_secs(5)).await?;
    Ok(json!({
        "resultCount": results.len(),
        "results": results,
    }))
}

pub fn stats_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

pub async fn execute_stats(router: &Router) -> ToolResult {
    let session = router.session().read().unwrap().get_session_stats();
    let global = router.global().read().unwrap().get_stats();
    let temporal = router.temporal().read().unwrap().get_stats();
    let projects: Vec<_> = router
        .projects()
        .read()
        .unwrap()
        .values()
        .map(|p| p.get_project_stats())
        .collect();

    Ok(json!({
        "session": session,
        "global": global,
        "temporal": temporal,
        "projects": projects,
    }))
}
