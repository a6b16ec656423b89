//! `get_monitoring_stats`.

use serde_json::{json, Value};
use stratum_core::prelude::*;

use super::{all_items, ToolResult};

pub fn schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Cross-cutting health snapshot: per-tier counts, search analytics/cache
/// size, and relationship validation stats in one call.
pub async fn execute(router: &Router) -> ToolResult {
    let items = all_items(router);
    let mut by_tier: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for (_, tier) in &items {
        *by_tier.entry(tier.as_str()).or_insert(0) += 1;
    }

    let search_engine = router.search_engine().lock().unwrap();
    let validation_stats = router.relationships().lock().unwrap().get_validation_stats();

    Ok(json!({
        "totalMemories": items.len(),
        "byTier": by_tier,
        "search": {
            "cacheSize": search_engine.cache_len(),
            "analytics": search_engine.analytics(),
        },
        "relationships": validation_stats,
    }))
}
