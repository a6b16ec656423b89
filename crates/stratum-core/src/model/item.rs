//! MemoryItem and MemoryMetadata — the fundamental unit of storage (spec §3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SCHEMA_VERSION;

fn schema_version_default() -> u32 {
    SCHEMA_VERSION
}

/// Required + optional structured metadata attached to every [`MemoryItem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetadata {
    /// Ordered set of tags. Stored as a `Vec` to preserve insertion order
    /// (ordering matters for deterministic display, not for membership tests).
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    /// 1 (least important) to 10 (most important), inclusive.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Open-ended bag of additional properties. `BTreeMap` keeps snapshot
    /// serialization byte-stable across runs (deterministic key order).
    #[serde(default)]
    pub additional: BTreeMap<String, serde_json::Value>,
}

fn default_priority() -> u8 {
    5
}

impl Default for MemoryMetadata {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            category: String::new(),
            priority: default_priority(),
            source: String::new(),
            project_id: None,
            session_id: None,
            user_id: None,
            expires_at: None,
            additional: BTreeMap::new(),
        }
    }
}

impl MemoryMetadata {
    pub fn has_any_tag(&self, wanted: &[&str]) -> bool {
        wanted
            .iter()
            .any(|w| self.tags.iter().any(|t| t.eq_ignore_ascii_case(w)))
    }

    pub fn clamp_priority(&mut self) {
        self.priority = self.priority.clamp(1, 10);
    }
}

/// A stored memory item. Identifiers are unique within the process; the same
/// logical item may exist under the same id in more than one tier — that is
/// how promotion is expressed (I1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    pub id: String,
    pub content: String,
    pub metadata: MemoryMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Monotonically nondecreasing per id within a tier (I2).
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
    /// Stamped at construction; lets snapshot readers detect stale formats.
    #[serde(default = "schema_version_default")]
    pub schema_version: u32,
}

/// Fields a caller may supply when creating a new item; the rest are
/// assigned by the layer (`BaseLayer::store`).
#[derive(Debug, Clone, Default)]
pub struct NewMemoryItem {
    pub id: Option<String>,
    pub content: String,
    pub metadata: MemoryMetadata,
}

impl MemoryItem {
    pub fn from_new(new: NewMemoryItem) -> Self {
        let now = Utc::now();
        let mut metadata = new.metadata;
        metadata.clamp_priority();
        Self {
            id: new.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            content: new.content,
            metadata,
            created_at: now,
            updated_at: now,
            access_count: 0,
            last_accessed: now,
            schema_version: SCHEMA_VERSION,
        }
    }

    pub fn content_bytes(&self) -> usize {
        self.content.len()
    }

    /// Record an access: bumps `access_count` and `last_accessed` (I2).
    pub fn touch(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = Utc::now();
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.metadata
            .expires_at
            .map(|exp| now >= exp)
            .unwrap_or(false)
    }

    pub fn violates_ttl(&self, now: DateTime<Utc>, ttl: Option<chrono::Duration>) -> bool {
        match ttl {
            Some(ttl) => now - self.created_at > ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_clamped() {
        let mut meta = MemoryMetadata::default();
        meta.priority = 20;
        meta.clamp_priority();
        assert_eq!(meta.priority, 10);
    }

    #[test]
    fn touch_is_monotonic() {
        let mut item = MemoryItem::from_new(NewMemoryItem {
            id: None,
            content: "hello".into(),
            metadata: MemoryMetadata::default(),
        });
        let before = item.access_count;
        item.touch();
        assert_eq!(item.access_count, before + 1);
    }

    #[test]
    fn expiry_semantics() {
        let mut item = MemoryItem::from_new(NewMemoryItem {
            id: None,
            content: "x".into(),
            metadata: MemoryMetadata::default(),
        });
        item.metadata.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        assert!(item.is_expired(Utc::now()));
    }
}
