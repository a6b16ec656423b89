//! SessionLayer — ephemeral, process-lifetime-only tier (spec §4.2).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::base::{BaseLayer, LayerStats, LruEviction};
use super::MemoryLayer;
use crate::config::TierConfig;
use crate::error::Result;
use crate::model::{MemoryItem, MemoryMetadata, MemoryQuery, MemorySearchResult, NewMemoryItem, Tier};

/// Tags that make an item an unconditional promotion candidate (§4.2).
const PROMOTE_TAGS: [&str; 2] = ["promote", "important"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActivity {
    pub stores: u64,
    pub searches: u64,
    pub retrievals: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub base: LayerStats,
    pub active_minutes: f64,
    pub average_item_age_seconds: f64,
    pub most_accessed_item_id: Option<String>,
    pub activity: SessionActivity,
}

/// No session state survives the process, so `backup()` hands back an
/// opaque id that `restore()` always rejects (§4.2).
#[derive(Debug)]
pub struct SessionLayer {
    base: BaseLayer<LruEviction>,
    first_store_at: Option<DateTime<Utc>>,
    activity: SessionActivity,
}

impl SessionLayer {
    pub fn new(config: TierConfig) -> Self {
        Self {
            base: BaseLayer::new(Tier::Session, config, LruEviction),
            first_store_at: None,
            activity: SessionActivity {
                stores: 0,
                searches: 0,
                retrievals: 0,
            },
        }
    }

    pub fn config(&self) -> &TierConfig {
        self.base.config()
    }

    pub fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        let item = self.base.store(new)?;
        self.first_store_at.get_or_insert(item.created_at);
        self.activity.stores += 1;
        Ok(item)
    }

    pub fn retrieve(&mut self, id: &str) -> Option<MemoryItem> {
        self.activity.retrievals += 1;
        self.base.retrieve(id)
    }

    pub fn search(&mut self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        self.activity.searches += 1;
        self.base.search(query)
    }

    pub fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem> {
        self.base.update(id, content, metadata)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        self.base.delete(id)
    }

    pub fn cleanup(&mut self) -> usize {
        self.base.cleanup()
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn export(&self) -> Vec<MemoryItem> {
        self.base.export()
    }

    /// Alias for `export()`, named to match the Router's migration-path
    /// vocabulary across tiers (§4.9 "Migration").
    pub fn values_snapshot(&self) -> Vec<MemoryItem> {
        self.export()
    }

    /// Inserts an already-constructed item verbatim, used by the Router for
    /// promotion and migration (§4.9).
    pub fn store_existing(&mut self, item: MemoryItem) -> Result<MemoryItem> {
        self.base.store_existing(item)
    }

    /// `store_existing` discarding the returned item, for call sites (like
    /// `Router::store_into_tier`) that only care about success/failure.
    pub fn store_existing_public(&mut self, item: MemoryItem) -> Result<()> {
        self.store_existing(item).map(|_| ())
    }

    /// Drops all items and resets indices atomically (single `&mut self` call).
    pub fn clear(&mut self) {
        self.base = BaseLayer::new(Tier::Session, self.base.config().clone(), LruEviction);
        self.first_store_at = None;
        self.activity = SessionActivity {
            stores: 0,
            searches: 0,
            retrievals: 0,
        };
    }

    /// Ids satisfying any promotion rule, excluding the explicit low-value
    /// carve-out (priority <= 3 and access count < 2) (§4.2).
    pub fn get_promotion_candidates(&self) -> Vec<String> {
        self.base
            .values()
            .filter(|item| {
                if item.metadata.priority <= 3 && item.access_count < 2 {
                    return false;
                }
                item.metadata.priority >= 8
                    || item.access_count >= 3
                    || item.metadata.has_any_tag(&PROMOTE_TAGS)
            })
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn get_session_stats(&self) -> SessionStats {
        let base = self.base.get_stats();
        let now = Utc::now();
        let active_minutes = self
            .first_store_at
            .map(|first| (now - first).num_seconds() as f64 / 60.0)
            .unwrap_or(0.0);

        let items: Vec<&MemoryItem> = self.base.values().collect();
        let average_item_age_seconds = if items.is_empty() {
            0.0
        } else {
            items
                .iter()
                .map(|item| (now - item.created_at).num_seconds() as f64)
                .sum::<f64>()
                / items.len() as f64
        };

        let most_accessed_item_id = items
            .iter()
            .max_by_key(|item| item.access_count)
            .map(|item| item.id.clone());

        SessionStats {
            base,
            active_minutes,
            average_item_age_seconds,
            most_accessed_item_id,
            activity: self.activity.clone(),
        }
    }

    /// Always returns an id; the id cannot be used to recover data (§4.2).
    pub fn backup(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Always `false`: session data does not survive across process boundaries.
    pub fn restore(&mut self, _id: &str) -> bool {
        false
    }
}

impl MemoryLayer for SessionLayer {
    fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        SessionLayer::store(self, new)
    }

    fn retrieve(&mut self, id: &str) -> Option<MemoryItem> {
        SessionLayer::retrieve(self, id)
    }

    fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        self.base.search(query)
    }

    fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem> {
        SessionLayer::update(self, id, content, metadata)
    }

    fn delete(&mut self, id: &str) -> bool {
        SessionLayer::delete(self, id)
    }

    fn cleanup(&mut self) -> usize {
        SessionLayer::cleanup(self)
    }

    fn len(&self) -> usize {
        SessionLayer::len(self)
    }
}
