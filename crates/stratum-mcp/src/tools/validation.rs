//! `get_relationship_suggestions`, `validate_relationship`, `get_validation_stats`.

use serde_json::{json, Value};
use stratum_core::prelude::*;
use stratum_core::relationship::ValidationAction;

use super::{require_str, ToolError, ToolResult};

pub fn suggestions_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

pub async fn execute_suggestions(router: &Router) -> ToolResult {
    let suggestions = router.relationships().lock().unwrap().get_relationship_suggestions();
    Ok(json!({ "suggestionCount": suggestions.len(), "suggestions": suggestions }))
}

pub fn validate_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "suggestionId": {"type": "string"},
            "action": {"type": "string", "enum": ["confirm", "reject", "modify"]},
            "strength": {"type": "number", "minimum": 0, "maximum": 1},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
        },
        "required": ["suggestionId", "action"],
    })
}

pub async fn execute_validate(router: &Router, args: &Value) -> ToolResult {
    let suggestion_id = require_str(args, "suggestionId")?;
    let action_name = require_str(args, "action")?;
    let action = match action_name {
        "confirm" => ValidationAction::Confirm,
        "reject" => ValidationAction::Reject,
        "modify" => ValidationAction::Modify {
            strength: args.get("strength").and_then(|v| v.as_f64()).map(|v| v as f32),
            confidence: args.get("confidence").and_then(|v| v.as_f64()).map(|v| v as f32),
        },
        other => {
            return Err(ToolError {
                code: "validation".to_string(),
                message: format!("unknown action `{other}`"),
                retry_after_ms: None,
            })
        }
    };

    let applied = router.relationships().lock().unwrap().validate_relationship(suggestion_id, action)?;
    Ok(json!({ "applied": applied }))
}

pub fn stats_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

pub async fn execute_stats(router: &Router) -> ToolResult {
    let stats = router.relationships().lock().unwrap().get_validation_stats();
    Ok(json!(stats))
}
