//! `get_temporal_context`, `get_temporal_patterns` — surfaces TemporalLayer's
//! context windowing and histogramming that `temporal_search` doesn't expose.

use chrono::Utc;
use serde_json::{json, Value};
use stratum_core::prelude::*;

use super::{require_str, ToolResult};

pub fn context_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "timestamp": {"type": "string", "format": "date-time"},
            "windowMinutes": {"type": "integer", "minimum": 1, "maximum": 10080},
            "limit": {"type": "integer", "minimum": 1, "maximum": 50},
        },
        "required": ["timestamp"],
    })
}

/// Three windows around `timestamp` — exact (+/- 5 min), before, after — from
/// the temporal tier's chronological index.
pub async fn execute_context(router: &Router, args: &Value) -> ToolResult {
    let raw = require_str(args, "timestamp")?;
    let t = chrono::DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| super::ToolError {
            code: "validation".to_string(),
            message: format!("invalid RFC3339 timestamp `{raw}`"),
            retry_after_ms: None,
        })?;
    let window_min = args.get("windowMinutes").and_then(|v| v.as_i64()).unwrap_or(60);
    let limit = super::clamp_limit(args.get("limit").and_then(|v| v.as_u64()));

    let temporal = router.temporal().read().unwrap();
    let context = temporal.get_temporal_context(t, window_min, limit);
    Ok(json!(context))
}

pub fn patterns_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Daily/weekly/monthly histograms plus a peak-to-average pattern strength.
pub async fn execute_patterns(router: &Router) -> ToolResult {
    let temporal = router.temporal().read().unwrap();
    let patterns = temporal.analyze_temporal_patterns();
    Ok(json!(patterns))
}
