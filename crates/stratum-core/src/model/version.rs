//! MemoryVersion (spec §3). Versions are append-only and form a per-id total order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Created,
    Updated,
    Merged,
    Split,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChangePayload {
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub old_metadata: Option<serde_json::Value>,
    pub new_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryVersion {
    pub item_id: String,
    /// Monotonically increasing within `item_id` (I7).
    pub version: u64,
    pub change_type: ChangeType,
    pub parent_version_id: Option<String>,
    /// The version's own unique id (`{item_id}@{version}`), used as `parent_version_id` by children.
    pub version_id: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub payload: ChangePayload,
}

impl MemoryVersion {
    pub fn version_id_for(item_id: &str, version: u64) -> String {
        format!("{item_id}@{version}")
    }

    pub fn new(
        item_id: impl Into<String>,
        version: u64,
        change_type: ChangeType,
        parent_version_id: Option<String>,
        actor: impl Into<String>,
        payload: ChangePayload,
    ) -> Self {
        let item_id = item_id.into();
        let version_id = Self::version_id_for(&item_id, version);
        Self {
            item_id,
            version,
            change_type,
            parent_version_id,
            version_id,
            actor: actor.into(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Append-only per-id version history (I7: total order, parent belongs to same id).
#[derive(Debug, Default)]
pub struct VersionHistory {
    versions: Vec<MemoryVersion>,
}

impl VersionHistory {
    pub fn push(&mut self, version: MemoryVersion) {
        self.versions.push(version);
    }

    pub fn next_version_number(&self) -> u64 {
        self.versions.last().map(|v| v.version + 1).unwrap_or(1)
    }

    pub fn all(&self) -> &[MemoryVersion] {
        &self.versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_numbers_increase() {
        let mut history = VersionHistory::default();
        assert_eq!(history.next_version_number(), 1);
        history.push(MemoryVersion::new(
            "abc",
            1,
            ChangeType::Created,
            None,
            "router",
            ChangePayload::default(),
        ));
        assert_eq!(history.next_version_number(), 2);
    }
}
