//! MCP tool implementations for the stratum hierarchical memory store (spec §6).
//!
//! Each tool is a `schema() -> Value` + `async fn execute(router, args) ->
//! Result<Value, ToolError>` pair, the same shape as every teacher
//! `tools/*_unified.rs` module.

pub mod cluster;
pub mod decay;
pub mod graph;
pub mod memory;
pub mod monitoring;
pub mod search;
pub mod temporal;
pub mod validation;
pub mod versions;

use serde::Serialize;
use stratum_core::prelude::*;

/// Tagged error the tool layer converts `MemoryError` into, matching §7
/// "User-visible failure": `{error: {code, message, details?}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl From<MemoryError> for ToolError {
    fn from(e: MemoryError) -> Self {
        let retry_after_ms = match &e {
            MemoryError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        };
        ToolError {
            code: e.code().to_string(),
            message: e.to_string(),
            retry_after_ms,
        }
    }
}

pub type ToolResult = Result<serde_json::Value, ToolError>;

/// Collects every live item across all four tiers, tagged with its source
/// tier. Used by tools that need the full item set (decay, conflicts,
/// cluster summaries) rather than a single tier's worth.
pub fn all_items(router: &Router) -> Vec<(MemoryItem, Tier)> {
    let mut items: Vec<(MemoryItem, Tier)> = Vec::new();
    items.extend(router.session().read().unwrap().export().into_iter().map(|i| (i, Tier::Session)));
    items.extend(router.global().read().unwrap().peek_all().into_iter().map(|i| (i, Tier::Global)));
    items.extend(router.temporal().read().unwrap().peek_all().into_iter().map(|i| (i, Tier::Temporal)));
    for project in router.projects().read().unwrap().values() {
        items.extend(project.peek_all().into_iter().map(|i| (i, Tier::Project)));
    }
    items
}

/// Finds a single item by id across every tier without mutating access
/// counters (used by tools that only read, like `summarize_cluster`).
pub fn find_item(router: &Router, id: &str) -> Option<MemoryItem> {
    all_items(router).into_iter().find(|(item, _)| item.id == id).map(|(item, _)| item)
}

fn missing_field(name: &str) -> ToolError {
    ToolError {
        code: "validation".to_string(),
        message: format!("missing required field `{name}`"),
        retry_after_ms: None,
    }
}

pub fn require_str<'a>(args: &'a serde_json::Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name).and_then(|v| v.as_str()).ok_or_else(|| missing_field(name))
}

pub fn require_array<'a>(args: &'a serde_json::Value, name: &str) -> Result<&'a Vec<serde_json::Value>, ToolError> {
    args.get(name).and_then(|v| v.as_array()).ok_or_else(|| missing_field(name))
}

/// `limit` clamp shared by every list-returning tool (§6 "Defaults and bounds").
pub fn clamp_limit(requested: Option<u64>) -> usize {
    requested.unwrap_or(10).clamp(1, stratum_core::model::TOOL_CALL_MAX_LIMIT as u64) as usize
}
