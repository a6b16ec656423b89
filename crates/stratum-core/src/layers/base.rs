//! BaseLayer — common store/retrieve/search/index primitives shared by every
//! tier (spec §4.1). Concrete tiers embed a `BaseLayer<P>` by composition
//! (design notes: "a tagged variant of tier plus a shared capability set")
//! and add their own extra capabilities on top.

use std::collections::HashMap;

use chrono::Utc;

use crate::config::TierConfig;
use crate::error::{MemoryError, Result};
use crate::index::{lexical_score, tokenize, InvertedIndex};
use crate::model::{
    sort_results, MemoryFilters, MemoryItem, MemoryMetadata, MemoryQuery, MemorySearchResult,
    NewMemoryItem, Tier,
};

/// Decides which item to evict when a tier is at capacity. `NoEviction`
/// tiers fail the admission instead (§4.1 "Failure semantics").
pub trait EvictionPolicy: Send + Sync + std::fmt::Debug {
    fn select_victim(&self, items: &HashMap<String, MemoryItem>) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct NoEviction;

impl EvictionPolicy for NoEviction {
    fn select_victim(&self, _items: &HashMap<String, MemoryItem>) -> Option<String> {
        None
    }
}

/// Least-recently-accessed, ties broken by oldest `createdAt` (§4.2).
#[derive(Debug, Default)]
pub struct LruEviction;

impl EvictionPolicy for LruEviction {
    fn select_victim(&self, items: &HashMap<String, MemoryItem>) -> Option<String> {
        items
            .values()
            .min_by(|a, b| {
                a.last_accessed
                    .cmp(&b.last_accessed)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            })
            .map(|i| i.id.clone())
    }
}

/// Aggregate statistics every tier reports via `getStats()` (§4.1).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStats {
    pub tier: Tier,
    pub total_items: usize,
    pub total_bytes: usize,
    pub max_items: usize,
    pub max_size_bytes: usize,
    pub categories: HashMap<String, usize>,
    pub oldest_created_at: Option<chrono::DateTime<Utc>>,
    pub newest_created_at: Option<chrono::DateTime<Utc>>,
}

/// Common storage and indexing primitives. Generic over the tier's eviction
/// policy so `Session` gets LRU eviction while the persistent tiers simply
/// reject admission once full.
#[derive(Debug)]
pub struct BaseLayer<P: EvictionPolicy> {
    pub(crate) tier: Tier,
    pub(crate) config: TierConfig,
    pub(crate) items: HashMap<String, MemoryItem>,
    pub(crate) index: InvertedIndex,
    policy: P,
}

impl<P: EvictionPolicy> BaseLayer<P> {
    pub fn new(tier: Tier, config: TierConfig, policy: P) -> Self {
        Self {
            tier,
            config,
            items: HashMap::new(),
            index: InvertedIndex::new(),
            policy,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn total_bytes(&self) -> usize {
        self.items.values().map(|i| i.content_bytes()).sum()
    }

    fn make_room_for_one(&mut self) -> Result<()> {
        if self.items.len() < self.config.max_items {
            return Ok(());
        }
        match self.policy.select_victim(&self.items) {
            Some(victim_id) => {
                self.remove_item(&victim_id);
                Ok(())
            }
            None => Err(MemoryError::CapacityExceeded {
                tier: self.tier.to_string(),
                detail: format!("maxItems ({}) reached, no eviction policy", self.config.max_items),
            }),
        }
    }

    fn remove_item(&mut self, id: &str) {
        self.items.remove(id);
        self.index.remove_item(id);
    }

    /// Store a new item, enforcing capacity (evicting first if the tier has
    /// a policy) and updating the inverted index.
    pub fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        self.make_room_for_one()?;
        let item = MemoryItem::from_new(new);
        self.index
            .index_item(&item.id, &item.content, &item.metadata.category, &item.metadata.tags);
        self.items.insert(item.id.clone(), item.clone());
        if self.total_bytes() > self.config.max_size_bytes {
            tracing::debug!(
                tier = %self.tier,
                total_bytes = self.total_bytes(),
                max = self.config.max_size_bytes,
                "tier exceeded maxSizeBytes after admission (allowed: one admission of grace)"
            );
        }
        Ok(item)
    }

    /// Insert an already-constructed item verbatim (used by promotion/migration/import).
    pub fn store_existing(&mut self, item: MemoryItem) -> Result<MemoryItem> {
        self.make_room_for_one()?;
        self.index
            .index_item(&item.id, &item.content, &item.metadata.category, &item.metadata.tags);
        self.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    /// Returns the item if present; bumps its access counter and last-access
    /// time, with the update reflected in the returned snapshot (§4.1).
    pub fn retrieve(&mut self, id: &str) -> Option<MemoryItem> {
        let item = self.items.get_mut(id)?;
        item.touch();
        Some(item.clone())
    }

    /// Read without recording an access (used internally by search/export).
    pub fn peek(&self, id: &str) -> Option<&MemoryItem> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        let query_tokens = tokenize(&query.text);
        let filters = query.filters_or_default();
        let threshold = query.similarity.as_ref().map(|s| s.threshold).unwrap_or(0.0);

        let mut results: Vec<MemorySearchResult> = self
            .items
            .values()
            .filter(|item| filters.matches(item))
            .filter_map(|item| {
                let score = lexical_score(
                    &query_tokens,
                    &item.content,
                    &item.metadata.category,
                    &item.metadata.tags,
                );
                if score < threshold {
                    return None;
                }
                Some(MemorySearchResult {
                    item: item.clone(),
                    score,
                    source_tier: self.tier,
                    explanation: format!("lexical match (score {score:.3})"),
                })
            })
            .collect();

        if query.chronological {
            results.sort_by(|a, b| b.item.created_at.cmp(&a.item.created_at));
        } else {
            sort_results(&mut results);
        }

        let offset = query.effective_offset();
        let limit = query.effective_limit(crate::model::INTERNAL_MAX_LIMIT);
        results.into_iter().skip(offset).take(limit).collect()
    }

    pub fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem> {
        let item = self.items.get_mut(id)?;
        if let Some(content) = content {
            self.index.remove_item(id);
            item.content = content;
        }
        if let Some(mut metadata) = metadata {
            metadata.clamp_priority();
            item.metadata = metadata;
        }
        item.updated_at = Utc::now();
        let (content, category, tags) = (
            item.content.clone(),
            item.metadata.category.clone(),
            item.metadata.tags.clone(),
        );
        self.index.index_item(id, &content, &category, &tags);
        Some(item.clone())
    }

    pub fn delete(&mut self, id: &str) -> bool {
        if self.items.remove(id).is_some() {
            self.index.remove_item(id);
            true
        } else {
            false
        }
    }

    pub fn bulk_store(&mut self, news: Vec<NewMemoryItem>) -> Vec<Result<MemoryItem>> {
        news.into_iter().map(|n| self.store(n)).collect()
    }

    pub fn bulk_delete(&mut self, ids: &[String]) -> usize {
        ids.iter().filter(|id| self.delete(id)).count()
    }

    /// Removes items violating TTL or explicit expiry; returns count removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Utc::now();
        let ttl = self.config.ttl();
        let victims: Vec<String> = self
            .items
            .values()
            .filter(|item| item.is_expired(now) || item.violates_ttl(now, ttl))
            .map(|item| item.id.clone())
            .collect();
        for id in &victims {
            self.remove_item(id);
        }
        victims.len()
    }

    pub fn get_stats(&self) -> LayerStats {
        let mut categories: HashMap<String, usize> = HashMap::new();
        let mut oldest = None;
        let mut newest = None;
        for item in self.items.values() {
            *categories.entry(item.metadata.category.clone()).or_insert(0) += 1;
            oldest = Some(oldest.map_or(item.created_at, |o: chrono::DateTime<Utc>| o.min(item.created_at)));
            newest = Some(newest.map_or(item.created_at, |n: chrono::DateTime<Utc>| n.max(item.created_at)));
        }
        LayerStats {
            tier: self.tier,
            total_items: self.items.len(),
            total_bytes: self.total_bytes(),
            max_items: self.config.max_items,
            max_size_bytes: self.config.max_size_bytes,
            categories,
            oldest_created_at: oldest,
            newest_created_at: newest,
        }
    }

    pub fn export(&self) -> Vec<MemoryItem> {
        let mut items: Vec<MemoryItem> = self.items.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    /// Import items; malformed items (empty id or empty content) are
    /// rejected per-item, valid items are retained, and the count of
    /// successfully imported items is returned (§4.1 "Failure semantics").
    pub fn import(&mut self, items: Vec<MemoryItem>) -> usize {
        let mut imported = 0;
        for item in items {
            if item.id.trim().is_empty() || item.content.trim().is_empty() {
                continue;
            }
            if self.store_existing(item).is_ok() {
                imported += 1;
            }
        }
        imported
    }

    /// Rebuilds the inverted index from scratch. Tier-specific `optimize()`
    /// implementations call this as their minimum behavior (§4.1).
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for item in self.items.values() {
            self.index
                .index_item(&item.id, &item.content, &item.metadata.category, &item.metadata.tags);
        }
    }

    pub fn all_ids(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &MemoryItem> {
        self.items.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryMetadata;

    fn new_item(content: &str) -> NewMemoryItem {
        NewMemoryItem {
            id: None,
            content: content.to_string(),
            metadata: MemoryMetadata::default(),
        }
    }

    #[test]
    fn capacity_exceeded_without_eviction_policy() {
        let config = TierConfig {
            max_items: 1,
            ..TierConfig::default()
        };
        let mut layer = BaseLayer::new(Tier::Project, config, NoEviction);
        layer.store(new_item("first")).unwrap();
        let err = layer.store(new_item("second")).unwrap_err();
        assert!(matches!(err, MemoryError::CapacityExceeded { .. }));
    }

    #[test]
    fn lru_eviction_makes_room() {
        let config = TierConfig {
            max_items: 2,
            ..TierConfig::default()
        };
        let mut layer = BaseLayer::new(Tier::Session, config, LruEviction);
        let a = layer.store(new_item("a content")).unwrap();
        let _b = layer.store(new_item("b content")).unwrap();
        // touch a so it's more recently accessed than b
        layer.retrieve(&a.id);
        let c = layer.store(new_item("c content")).unwrap();

        assert!(layer.contains(&a.id));
        assert!(layer.contains(&c.id));
        assert_eq!(layer.len(), 2);
    }

    #[test]
    fn retrieve_bumps_access_count_monotonically() {
        let mut layer = BaseLayer::new(Tier::Session, TierConfig::default(), LruEviction);
        let item = layer.store(new_item("hello world")).unwrap();
        let r1 = layer.retrieve(&item.id).unwrap();
        let r2 = layer.retrieve(&item.id).unwrap();
        assert!(r2.access_count > r1.access_count);
    }

    #[test]
    fn delete_removes_from_index() {
        let mut layer = BaseLayer::new(Tier::Session, TierConfig::default(), LruEviction);
        let item = layer.store(new_item("unique searchable content")).unwrap();
        assert!(layer.delete(&item.id));
        assert!(layer.retrieve(&item.id).is_none());
        let results = layer.search(&MemoryQuery::new("unique"));
        assert!(results.is_empty());
    }

    #[test]
    fn search_sorts_by_score_then_recency_then_priority() {
        let mut layer = BaseLayer::new(Tier::Session, TierConfig::default(), LruEviction);
        layer.store(new_item("apple banana cherry")).unwrap();
        layer.store(new_item("apple banana")).unwrap();
        let results = layer.search(&MemoryQuery::new("apple banana"));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn import_rejects_malformed_items_but_keeps_valid_ones() {
        let mut layer = BaseLayer::new(Tier::Session, TierConfig::default(), LruEviction);
        let good = MemoryItem::from_new(new_item("good content"));
        let mut bad = MemoryItem::from_new(new_item("bad"));
        bad.content = "".to_string();
        let n = layer.import(vec![good, bad]);
        assert_eq!(n, 1);
    }

    #[test]
    fn cleanup_removes_ttl_violations() {
        let config = TierConfig {
            ttl_ms: Some(0),
            ..TierConfig::default()
        };
        let mut layer = BaseLayer::new(Tier::Project, config, NoEviction);
        layer.store(new_item("short lived")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let removed = layer.cleanup();
        assert_eq!(removed, 1);
        assert_eq!(layer.len(), 0);
    }
}
