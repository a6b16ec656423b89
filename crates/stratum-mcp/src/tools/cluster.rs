//! `summarize_cluster`.

use serde_json::{json, Value};
use stratum_core::prelude::*;

use super::{all_items, require_array, ToolResult};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "memoryIds": {"type": "array", "items": {"type": "string"}},
        },
        "required": ["memoryIds"],
    })
}

pub async fn execute(router: &Router, args: &Value) -> ToolResult {
    let ids: Vec<String> = require_array(args, "memoryIds")?
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();

    let members: Vec<MemoryItem> = all_items(router)
        .into_iter()
        .filter(|(item, _)| ids.contains(&item.id))
        .map(|(item, _)| item)
        .collect();
    let refs: Vec<&MemoryItem> = members.iter().collect();

    let summary = router.relationships().lock().unwrap().summarize_cluster(&refs);
    Ok(json!(summary))
}
