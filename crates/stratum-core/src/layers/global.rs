//! GlobalLayer — cross-scope persistent tier with a vector index (spec §4.4).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::base::{BaseLayer, LayerStats, NoEviction};
use super::MemoryLayer;
use crate::config::TierConfig;
use crate::error::Result;
use crate::index::tokenize;
use crate::model::{MemoryItem, MemoryMetadata, MemoryQuery, MemorySearchResult, NewMemoryItem, Tier};
use crate::persistence::{new_backup_path, DirtyFlag, PersistenceStatus, Snapshot};
use crate::vector::{cosine_similarity, embed, VectorIndex, DEFAULT_DIMENSIONS};

/// Minimum cosine similarity for a vector hit to be returned at all (§4.4).
pub const VECTOR_MIN_SIMILARITY: f32 = 0.1;
/// Weighted-average fusion weights when an item scores on both paths (§4.4, §9).
pub const LEXICAL_WEIGHT: f32 = 0.6;
pub const VECTOR_WEIGHT: f32 = 0.4;
/// Clustering threshold for `analyzeClusters()` (§4.4).
pub const CLUSTER_MIN_SIMILARITY: f32 = 0.8;
/// Archival thresholds for `optimize()` (§4.4).
pub const ARCHIVE_MIN_AGE_DAYS: i64 = 182;
pub const ARCHIVE_MAX_ACCESS_COUNT: u64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalSnapshotPayload {
    items: Vec<MemoryItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub dominant_category: String,
    pub size: usize,
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRate {
    pub last_1_day: usize,
    pub last_7_days: usize,
    pub last_30_days: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub base: LayerStats,
    pub persistence_status: PersistenceStatus,
    pub vector_entries: usize,
}

#[derive(Debug)]
pub struct GlobalLayer {
    base: BaseLayer<NoEviction>,
    vectors: VectorIndex,
    root: PathBuf,
    dirty: Arc<DirtyFlag>,
}

impl GlobalLayer {
    pub fn new(root: PathBuf, config: TierConfig) -> Self {
        Self {
            base: BaseLayer::new(Tier::Global, config, NoEviction),
            vectors: VectorIndex::new(DEFAULT_DIMENSIONS),
            root,
            dirty: Arc::new(DirtyFlag::new()),
        }
    }

    pub fn dirty_flag(&self) -> Arc<DirtyFlag> {
        self.dirty.clone()
    }

    pub fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        let item = self.base.store(new)?;
        self.vectors.upsert(item.id.clone(), &item.content);
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

    pub fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem> {
        let content_changed = content.is_some();
        let item = self.base.update(id, content, metadata)?;
        if content_changed {
            self.vectors.upsert(id.to_string(), &item.content);
        }
        self.dirty.mark();
        Some(item)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let removed = self.base.delete(id);
        if removed {
            self.vectors.remove(id);
            self.dirty.mark();
        }
        removed
    }

    pub fn cleanup(&mut self) -> usize {
        let removed_ids: Vec<String> = self
            .base
            .values()
            .filter(|item| {
                let now = Utc::now();
                item.is_expired(now) || item.violates_ttl(now, self.base.config().ttl())
            })
            .map(|i| i.id.clone())
            .collect();
        let n = self.base.cleanup();
        for id in removed_ids {
            self.vectors.remove(&id);
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

    /// Inserts an already-constructed item verbatim and re-embeds it into
    /// the vector index. Used by the Router for promotion and migration (§4.9).
    pub fn store_existing(&mut self, item: MemoryItem) -> Result<MemoryItem> {
        let item = self.base.store_existing(item)?;
        self.vectors.upsert(item.id.clone(), &item.content);
        self.dirty.mark();
        Ok(item)
    }

    /// `store_existing` discarding the returned item, for call sites (like
    /// `Router::store_into_tier`) that only care about success/failure.
    pub fn store_existing_public(&mut self, item: MemoryItem) -> Result<()> {
        self.store_existing(item).map(|_| ())
    }

    /// Union of lexical and vector hits; shared ids get the §4.4 weighted average.
    pub fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        let lexical = self.base.search(query);
        let vector_hits = self.vectors.search_content(&query.text, VECTOR_MIN_SIMILARITY);

        let mut by_id: HashMap<String, MemorySearchResult> = HashMap::new();
        for result in lexical {
            by_id.insert(result.item.id.clone(), result);
        }

        let filters = query.filters_or_default();
        for (id, vec_score) in vector_hits {
            let Some(item) = self.base.peek(&id) else {
                continue;
            };
            if !filters.matches(item) {
                continue;
            }
            by_id
                .entry(id.clone())
                .and_modify(|existing| {
                    existing.score = existing.score * LEXICAL_WEIGHT + vec_score * VECTOR_WEIGHT;
                    existing.explanation =
                        format!("{} + vector similarity {vec_score:.3}", existing.explanation);
                })
                .or_insert_with(|| MemorySearchResult {
                    item: item.clone(),
                    score: vec_score * VECTOR_WEIGHT,
                    source_tier: Tier::Global,
                    explanation: format!("vector similarity {vec_score:.3}"),
                });
        }

        let mut results: Vec<MemorySearchResult> = by_id.into_values().collect();
        crate::model::sort_results(&mut results);
        let offset = query.effective_offset();
        let limit = query.effective_limit(crate::model::INTERNAL_MAX_LIMIT);
        results.into_iter().skip(offset).take(limit).collect()
    }

    /// Rebuilds both indices, then archives cold items to a snapshot under
    /// `<root>/global/archive/archive-<ts>.json` and removes them live (§4.4).
    pub fn optimize(&mut self) -> Result<usize> {
        self.base.rebuild_index();
        self.vectors.clear();
        for item in self.base.values() {
            self.vectors.upsert(item.id.clone(), &item.content);
        }

        let now = Utc::now();
        let archive_ids: Vec<String> = self
            .base
            .values()
            .filter(|item| {
                (now - item.created_at).num_days() >= ARCHIVE_MIN_AGE_DAYS
                    && item.access_count < ARCHIVE_MAX_ACCESS_COUNT
                    && (now - item.last_accessed).num_days() >= ARCHIVE_MIN_AGE_DAYS
            })
            .map(|item| item.id.clone())
            .collect();

        if archive_ids.is_empty() {
            return Ok(0);
        }

        let archived: Vec<MemoryItem> = archive_ids
            .iter()
            .filter_map(|id| self.base.peek(id).cloned())
            .collect();
        let archive_path = self
            .root
            .join("global")
            .join("archive")
            .join(format!("archive-{}.json", now.timestamp()));
        Snapshot::new(GlobalSnapshotPayload { items: archived }).write_atomically(&archive_path)?;

        for id in &archive_ids {
            self.base.delete(id);
            self.vectors.remove(id);
        }
        self.dirty.mark();
        Ok(archive_ids.len())
    }

    /// Greedy single-pass clustering by vector cosine similarity (§4.4).
    pub fn analyze_clusters(&self) -> Vec<ClusterSummary> {
        let mut assigned: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut clusters = Vec::new();
        let ids: Vec<&String> = self.vectors.ids().collect();

        for seed_id in &ids {
            if assigned.contains(*seed_id) {
                continue;
            }
            let Some(seed_vec) = self.vectors.get(seed_id) else {
                continue;
            };
            let mut members = vec![(*seed_id).clone()];
            assigned.insert((*seed_id).clone());

            for other_id in &ids {
                if assigned.contains(*other_id) {
                    continue;
                }
                if let Some(other_vec) = self.vectors.get(other_id) {
                    if cosine_similarity(seed_vec, other_vec) >= CLUSTER_MIN_SIMILARITY {
                        members.push((*other_id).clone());
                        assigned.insert((*other_id).clone());
                    }
                }
            }

            let mut category_counts: HashMap<String, usize> = HashMap::new();
            for id in &members {
                if let Some(item) = self.base.peek(id) {
                    *category_counts.entry(item.metadata.category.clone()).or_insert(0) += 1;
                }
            }
            let dominant_category = category_counts
                .into_iter()
                .max_by_key(|(_, count)| *count)
                .map(|(cat, _)| cat)
                .unwrap_or_default();

            clusters.push(ClusterSummary {
                dominant_category,
                size: members.len(),
                member_ids: members,
            });
        }

        clusters
    }

    pub fn growth_rate(&self) -> GrowthRate {
        let now = Utc::now();
        let count_since = |days: i64| {
            self.base
                .values()
                .filter(|item| now - item.created_at <= Duration::days(days))
                .count()
        };
        GrowthRate {
            last_1_day: count_since(1),
            last_7_days: count_since(7),
            last_30_days: count_since(30),
        }
    }

    pub fn get_stats(&self) -> GlobalStats {
        GlobalStats {
            base: self.base.get_stats(),
            persistence_status: if self.dirty.is_dirty() {
                PersistenceStatus::Dirty
            } else {
                PersistenceStatus::Clean
            },
            vector_entries: self.vectors.len(),
        }
    }

    fn items_path(&self) -> PathBuf {
        self.root.join("global").join("items.json")
    }

    pub fn flush(&self) -> Result<()> {
        let payload = GlobalSnapshotPayload {
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
        let snapshot: Snapshot<GlobalSnapshotPayload> = Snapshot::read(&path)?;
        for item in snapshot.payload.items {
            self.vectors.upsert(item.id.clone(), &item.content);
            self.base.store_existing(item)?;
        }
        Ok(())
    }

    pub fn backup(&self) -> Result<String> {
        let (id, path) = new_backup_path(&self.root);
        let payload = GlobalSnapshotPayload {
            items: self.base.export(),
        };
        Snapshot::new(payload).write_atomically(&path)?;
        Ok(id)
    }

    pub fn query_tokens_overlap(&self, query: &str, item: &MemoryItem) -> f32 {
        let q = tokenize(query);
        if q.is_empty() {
            return 0.0;
        }
        let content = tokenize(&item.content);
        let hits = q.iter().filter(|t| content.contains(t)).count();
        hits as f32 / q.len() as f32
    }

    pub fn embed_query(&self, text: &str) -> Vec<f32> {
        embed(text, self.vectors.dimensions())
    }

    pub fn peek(&self, id: &str) -> Option<&MemoryItem> {
        self.base.peek(id)
    }

    pub fn vectors(&self) -> &VectorIndex {
        &self.vectors
    }
}

impl MemoryLayer for GlobalLayer {
    fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        GlobalLayer::store(self, new)
    }

    fn retrieve(&mut self, id: &str) -> Option<MemoryItem> {
        GlobalLayer::retrieve(self, id)
    }

    fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        GlobalLayer::search(self, query)
    }

    fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem> {
        GlobalLayer::update(self, id, content, metadata)
    }

    fn delete(&mut self, id: &str) -> bool {
        GlobalLayer::delete(self, id)
    }

    fn cleanup(&mut self) -> usize {
        GlobalLayer::cleanup(self)
    }

    fn len(&self) -> usize {
        GlobalLayer::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::global_default;
    use tempfile::tempdir;

    fn item(content: &str, priority: u8) -> NewMemoryItem {
        NewMemoryItem {
            id: None,
            content: content.to_string(),
            metadata: MemoryMetadata {
                priority,
                ..Default::default()
            },
        }
    }

    #[test]
    fn vector_index_stays_in_sync_with_store() {
        let dir = tempdir().unwrap();
        let mut layer = GlobalLayer::new(dir.path().to_path_buf(), global_default());
        let stored = layer.store(item("rust programming language", 5)).unwrap();
        assert_eq!(layer.vectors().len(), 1);
        layer.delete(&stored.id);
        assert_eq!(layer.vectors().len(), 0);
    }

    #[test]
    fn hybrid_search_blends_scores_for_shared_hits() {
        let dir = tempdir().unwrap();
        let mut layer = GlobalLayer::new(dir.path().to_path_buf(), global_default());
        layer.store(item("rust programming language systems", 5)).unwrap();
        let results = layer.search(&MemoryQuery::new("rust programming"));
        assert!(!results.is_empty());
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn clusters_group_similar_content() {
        let dir = tempdir().unwrap();
        let mut layer = GlobalLayer::new(dir.path().to_path_buf(), global_default());
        layer.store(item("rust is a systems programming language", 5)).unwrap();
        layer.store(item("rust is a systems programming language", 5)).unwrap();
        layer.store(item("completely unrelated baking recipe content", 5)).unwrap();
        let clusters = layer.analyze_clusters();
        assert!(clusters.iter().any(|c| c.size >= 2));
    }
}
