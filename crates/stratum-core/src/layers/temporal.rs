//! TemporalLayer — historical tier optimized for time-based access (spec §4.5).

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::base::{BaseLayer, LayerStats, NoEviction};
use super::MemoryLayer;
use crate::config::TierConfig;
use crate::error::Result;
use crate::model::{MemoryItem, MemoryMetadata, MemoryQuery, MemorySearchResult, NewMemoryItem, Tier};
use crate::persistence::{new_backup_path, DirtyFlag, PersistenceStatus, Snapshot};

/// Boundaries for the recency boost added to a result's score (§4.5).
const RECENCY_BOOST_1_DAY: f32 = 0.2;
const RECENCY_BOOST_7_DAYS: f32 = 0.1;
const RECENCY_BOOST_30_DAYS: f32 = 0.05;
/// Access-count boost cap (§4.5).
const ACCESS_BOOST_DIVISOR: f32 = 10.0;
const ACCESS_BOOST_CAP: f32 = 0.1;
/// Window around `t` treated as "exact" in `getTemporalContext` (§4.5).
const EXACT_WINDOW_MINUTES: i64 = 5;

fn day_bucket_key(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d").to_string()
}

fn recency_boost(age: Duration) -> f32 {
    if age <= Duration::days(1) {
        RECENCY_BOOST_1_DAY
    } else if age <= Duration::days(7) {
        RECENCY_BOOST_7_DAYS
    } else if age <= Duration::days(30) {
        RECENCY_BOOST_30_DAYS
    } else {
        0.0
    }
}

fn access_boost(access_count: u64) -> f32 {
    (access_count as f32 / ACCESS_BOOST_DIVISOR).min(ACCESS_BOOST_CAP)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemporalSnapshotPayload {
    items: Vec<MemoryItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalContext {
    pub exact: Vec<MemoryItem>,
    pub before: Vec<MemoryItem>,
    pub after: Vec<MemoryItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalPatterns {
    pub daily: HashMap<String, usize>,
    pub weekly: HashMap<String, usize>,
    pub monthly: HashMap<String, usize>,
    /// Peak-to-average deviation in [0,1] (§4.5).
    pub pattern_strength: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalStats {
    pub base: LayerStats,
    pub persistence_status: PersistenceStatus,
    pub bucket_count: usize,
}

#[derive(Debug)]
pub struct TemporalLayer {
    base: BaseLayer<NoEviction>,
    day_buckets: HashMap<String, HashSet<String>>,
    /// Kept sorted ascending by creation time (I9).
    chronological: Vec<(String, DateTime<Utc>)>,
    root: PathBuf,
    dirty: Arc<DirtyFlag>,
}

impl TemporalLayer {
    pub fn new(root: PathBuf, config: TierConfig) -> Self {
        Self {
            base: BaseLayer::new(Tier::Temporal, config, NoEviction),
            day_buckets: HashMap::new(),
            chronological: Vec::new(),
            root,
            dirty: Arc::new(DirtyFlag::new()),
        }
    }

    pub fn dirty_flag(&self) -> Arc<DirtyFlag> {
        self.dirty.clone()
    }

    fn index_new(&mut self, item: &MemoryItem) {
        self.day_buckets
            .entry(day_bucket_key(item.created_at))
            .or_default()
            .insert(item.id.clone());
        let pos = self
            .chronological
            .partition_point(|(_, t)| *t <= item.created_at);
        self.chronological.insert(pos, (item.id.clone(), item.created_at));
    }

    fn deindex(&mut self, id: &str, created_at: DateTime<Utc>) {
        if let Some(bucket) = self.day_buckets.get_mut(&day_bucket_key(created_at)) {
            bucket.remove(id);
        }
        self.chronological.retain(|(item_id, _)| item_id != id);
    }

    pub fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        let item = self.base.store(new)?;
        self.index_new(&item);
        self.dirty.mark();
        Ok(item)
    }

    pub fn retrieve(&mut self, id: &str) -> Option<MemoryItem> {
        let item = self.base.retrieve(id);
        if item.is_some() {
            self.dirty.mark();
        }
        item
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let created_at = self.base.peek(id).map(|i| i.created_at);
        let removed = self.base.delete(id);
        if removed {
            if let Some(created_at) = created_at {
                self.deindex(id, created_at);
            }
            self.dirty.mark();
        }
        removed
    }

    pub fn cleanup(&mut self) -> usize {
        let victims: Vec<(String, DateTime<Utc>)> = self
            .base
            .values()
            .filter(|item| item.is_expired(Utc::now()))
            .map(|item| (item.id.clone(), item.created_at))
            .collect();
        let n = self.base.cleanup();
        for (id, created_at) in victims {
            self.deindex(&id, created_at);
        }
        if n > 0 {
            self.dirty.mark();
        }
        n
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
    pub fn peek_all(&self) -> Vec<MemoryItem> {
        self.export()
    }

    /// Inserts an already-constructed item verbatim and re-indexes its day
    /// bucket. Used by the Router for promotion and migration (§4.9).
    pub fn store_existing(&mut self, item: MemoryItem) -> Result<MemoryItem> {
        self.index_new(&item);
        let item = self.base.store_existing(item)?;
        self.dirty.mark();
        Ok(item)
    }

    /// `store_existing` discarding the returned item, for call sites (like
    /// `Router::store_into_tier`) that only care about success/failure.
    pub fn store_existing_public(&mut self, item: MemoryItem) -> Result<()> {
        self.store_existing(item).map(|_| ())
    }

    /// Applies the temporal score boost on top of the base lexical score (§4.5).
    pub fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        let now = Utc::now();
        let mut results = self.base.search(query);
        for result in &mut results {
            let boost = recency_boost(now - result.item.created_at) + access_boost(result.item.access_count);
            result.score = (result.score + boost).min(1.0);
        }
        if query.chronological {
            results.sort_by(|a, b| b.item.created_at.cmp(&a.item.created_at));
        } else {
            crate::model::sort_results(&mut results);
        }
        results
    }

    /// Bounded linear scan over the sorted chronological list (§4.5).
    pub fn get_memories_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<MemoryItem> {
        let start_idx = self.chronological.partition_point(|(_, t)| *t < start);
        self.chronological[start_idx..]
            .iter()
            .take_while(|(_, t)| *t <= end)
            .take(limit)
            .filter_map(|(id, _)| self.base.peek(id).cloned())
            .collect()
    }

    /// Three windows around `t`: exact (+/- 5 min), before, after (§4.5).
    pub fn get_temporal_context(&self, t: DateTime<Utc>, window_min: i64, limit: usize) -> TemporalContext {
        let exact_window = Duration::minutes(EXACT_WINDOW_MINUTES);
        let window = Duration::minutes(window_min);

        let exact = self
            .get_memories_in_range(t - exact_window, t + exact_window, limit);

        let mut before = self.get_memories_in_range(t - window, t - exact_window, usize::MAX);
        before.reverse();
        before.truncate(limit);

        let after = self
            .get_memories_in_range(t + exact_window, t + window, limit);

        TemporalContext { exact, before, after }
    }

    pub fn analyze_temporal_patterns(&self) -> TemporalPatterns {
        let mut daily: HashMap<String, usize> = HashMap::new();
        let mut weekly: HashMap<String, usize> = HashMap::new();
        let mut monthly: HashMap<String, usize> = HashMap::new();

        for (_, created_at) in &self.chronological {
            *daily.entry(created_at.format("%Y-%m-%d").to_string()).or_insert(0) += 1;
            *weekly.entry(created_at.format("%Y-W%W").to_string()).or_insert(0) += 1;
            *monthly.entry(created_at.format("%Y-%m").to_string()).or_insert(0) += 1;
        }

        let pattern_strength = pattern_strength(&daily);

        TemporalPatterns {
            daily,
            weekly,
            monthly,
            pattern_strength,
        }
    }

    pub fn get_stats(&self) -> TemporalStats {
        TemporalStats {
            base: self.base.get_stats(),
            persistence_status: if self.dirty.is_dirty() {
                PersistenceStatus::Dirty
            } else {
                PersistenceStatus::Clean
            },
            bucket_count: self.day_buckets.len(),
        }
    }

    fn items_path(&self) -> PathBuf {
        self.root.join("temporal").join("items.json")
    }

    pub fn flush(&self) -> Result<()> {
        let payload = TemporalSnapshotPayload {
            items: self.base.export(),
        };
        Snapshot::new(payload).write_atomically(&self.items_path())?;
        self.dirty.clear();
        Ok(())
    }

    pub fn load_from_disk(&mut self) -> Result<()> {
        let path = self.items_path();
        if !path.exists() {
            return Ok(());
        }
        let snapshot: Snapshot<TemporalSnapshotPayload> = Snapshot::read(&path)?;
        for item in snapshot.payload.items {
            self.index_new(&item);
            self.base.store_existing(item)?;
        }
        Ok(())
    }

    pub fn backup(&self) -> Result<String> {
        let (id, path) = new_backup_path(&self.root);
        let payload = TemporalSnapshotPayload {
            items: self.base.export(),
        };
        Snapshot::new(payload).write_atomically(&path)?;
        Ok(id)
    }

    pub fn restore(&mut self, backup_id: &str) -> Result<bool> {
        let path = crate::persistence::backup_path_for(&self.root, backup_id)?;
        if !path.exists() {
            return Ok(false);
        }
        let snapshot: Snapshot<TemporalSnapshotPayload> = Snapshot::read(&path)?;
        self.base = BaseLayer::new(Tier::Temporal, self.base.config().clone(), NoEviction);
        self.day_buckets.clear();
        self.chronological.clear();
        for item in snapshot.payload.items {
            self.index_new(&item);
            self.base.store_existing(item)?;
        }
        self.dirty.mark();
        Ok(true)
    }
}

/// Peak-to-average deviation across daily counts, normalized into [0,1].
fn pattern_strength(daily: &HashMap<String, usize>) -> f32 {
    if daily.is_empty() {
        return 0.0;
    }
    let values: Vec<f32> = daily.values().map(|v| *v as f32).collect();
    let avg = values.iter().sum::<f32>() / values.len() as f32;
    if avg <= f32::EPSILON {
        return 0.0;
    }
    let peak = values.iter().cloned().fold(0.0f32, f32::max);
    ((peak - avg) / peak).clamp(0.0, 1.0)
}

impl MemoryLayer for TemporalLayer {
    fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        TemporalLayer::store(self, new)
    }

    fn retrieve(&mut self, id: &str) -> Option<MemoryItem> {
        TemporalLayer::retrieve(self, id)
    }

    fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        TemporalLayer::search(self, query)
    }

    fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem> {
        let item = self.base.update(id, content, metadata);
        if item.is_some() {
            self.dirty.mark();
        }
        item
    }

    fn delete(&mut self, id: &str) -> bool {
        TemporalLayer::delete(self, id)
    }

    fn cleanup(&mut self) -> usize {
        TemporalLayer::cleanup(self)
    }

    fn len(&self) -> usize {
        TemporalLayer::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::temporal_default;
    use tempfile::tempdir;

    fn item(content: &str) -> NewMemoryItem {
        NewMemoryItem {
            id: None,
            content: content.to_string(),
            metadata: MemoryMetadata::default(),
        }
    }

    #[test]
    fn chronological_list_stays_sorted() {
        let dir = tempdir().unwrap();
        let mut layer = TemporalLayer::new(dir.path().to_path_buf(), temporal_default());
        layer.store(item("one")).unwrap();
        layer.store(item("two")).unwrap();
        layer.store(item("three")).unwrap();
        let timestamps: Vec<DateTime<Utc>> = layer.chronological.iter().map(|(_, t)| *t).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
    }

    #[test]
    fn range_query_returns_bounded_items_ascending() {
        let dir = tempdir().unwrap();
        let mut layer = TemporalLayer::new(dir.path().to_path_buf(), temporal_default());
        let mut ids = Vec::new();
        let base_t = Utc::now();
        for i in 0..5 {
            let mut new = item(&format!("item {i}"));
            new.id = Some(format!("id-{i}"));
            let stored_item = MemoryItem {
                created_at: base_t + Duration::seconds(i),
                ..MemoryItem::from_new(new)
            };
            layer.index_new(&stored_item);
            layer.base.store_existing(stored_item.clone()).unwrap();
            ids.push(stored_item.id);
        }

        let results = layer.get_memories_in_range(base_t + Duration::seconds(1), base_t + Duration::seconds(3), 100);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "id-1");
        assert_eq!(results[2].id, "id-3");
    }

    #[test]
    fn delete_removes_from_chronological_and_buckets() {
        let dir = tempdir().unwrap();
        let mut layer = TemporalLayer::new(dir.path().to_path_buf(), temporal_default());
        let stored = layer.store(item("hello")).unwrap();
        layer.delete(&stored.id);
        assert!(layer.chronological.is_empty());
        assert!(layer.day_buckets.values().all(|b| b.is_empty()));
    }
}
