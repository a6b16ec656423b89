//! `get_memory_versions`.

use serde_json::{json, Value};
use stratum_core::prelude::*;

use super::{find_item, require_str, ToolResult};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {"memoryId": {"type": "string"}},
        "required": ["memoryId"],
    })
}

pub async fn execute(router: &Router, args: &Value) -> ToolResult {
    let memory_id = require_str(args, "memoryId")?;
    if find_item(router, memory_id).is_none() {
        return Err(stratum_core::error::MemoryError::NotFound(memory_id.to_string()).into());
    }
    let versions = router.relationships().lock().unwrap().get_memory_versions(memory_id).to_vec();
    Ok(json!({ "versionCount": versions.len(), "versions": versions }))
}
