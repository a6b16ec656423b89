//! ProjectLayer — per-project persistent tier (spec §4.3).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::base::{BaseLayer, LayerStats, NoEviction};
use super::MemoryLayer;
use crate::config::TierConfig;
use crate::error::{MemoryError, Result};
use crate::model::{MemoryItem, MemoryMetadata, MemoryQuery, MemorySearchResult, NewMemoryItem, Tier};
use crate::persistence::{backup_path_for, new_backup_path, DirtyFlag, PersistenceStatus, Snapshot};

/// Items untouched for at least this long, and accessed at most
/// `COMPRESSION_MAX_ACCESS_COUNT` times, are eligible for whitespace
/// compression during `optimize()` (§4.3; threshold left to the implementation).
pub const COMPRESSION_MIN_AGE_DAYS: i64 = 30;
pub const COMPRESSION_MAX_ACCESS_COUNT: u64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectSnapshotPayload {
    project_id: String,
    items: Vec<MemoryItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub base: LayerStats,
    pub persistence_status: PersistenceStatus,
    pub compression_ratio: Option<f32>,
}

#[derive(Debug)]
pub struct ProjectLayer {
    base: BaseLayer<NoEviction>,
    project_id: String,
    root: PathBuf,
    dirty: Arc<DirtyFlag>,
    last_compression_ratio: Option<f32>,
}

impl ProjectLayer {
    pub fn new(project_id: impl Into<String>, root: PathBuf, config: TierConfig) -> Self {
        Self {
            base: BaseLayer::new(Tier::Project, config, NoEviction),
            project_id: project_id.into(),
            root,
            dirty: Arc::new(DirtyFlag::new()),
            last_compression_ratio: None,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn dirty_flag(&self) -> Arc<DirtyFlag> {
        self.dirty.clone()
    }

    fn items_path(&self) -> PathBuf {
        self.root.join("project").join(&self.project_id).join("items.json")
    }

    pub fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        let mut new = new;
        new.metadata.project_id = Some(self.project_id.clone());
        let item = self.base.store(new)?;
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

    pub fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        self.base.search(query)
    }

    pub fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem> {
        let mut metadata = metadata;
        if let Some(m) = metadata.as_mut() {
            m.project_id = Some(self.project_id.clone());
        }
        let item = self.base.update(id, content, metadata);
        if item.is_some() {
            self.dirty.mark();
        }
        item
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let removed = self.base.delete(id);
        if removed {
            self.dirty.mark();
        }
        removed
    }

    pub fn cleanup(&mut self) -> usize {
        let n = self.base.cleanup();
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

    /// Inserts an already-constructed item verbatim, forcing this project's
    /// id onto it. Used by the Router for promotion and migration (§4.9).
    pub fn store_existing(&mut self, mut item: MemoryItem) -> Result<MemoryItem> {
        item.metadata.project_id = Some(self.project_id.clone());
        let item = self.base.store_existing(item)?;
        self.dirty.mark();
        Ok(item)
    }

    /// `store_existing` discarding the returned item, for call sites (like
    /// `Router::store_into_tier`) that only care about success/failure.
    pub fn store_existing_public(&mut self, item: MemoryItem) -> Result<()> {
        self.store_existing(item).map(|_| ())
    }

    /// Rebuilds the inverted index, then compresses eligible items in-place
    /// when `compressionEnabled` (§4.3).
    pub fn optimize(&mut self) {
        self.base.rebuild_index();
        if !self.base.config().compression_enabled {
            return;
        }
        let now = Utc::now();
        let ids: Vec<String> = self
            .base
            .values()
            .filter(|item| is_compression_eligible(item, now))
            .map(|item| item.id.clone())
            .collect();

        let mut before_total = 0usize;
        let mut after_total = 0usize;
        for id in ids {
            if let Some(item) = self.base.peek(&id) {
                let original = item.content.clone();
                let compressed = compress_whitespace(&original);
                before_total += original.len();
                after_total += compressed.len();
                self.base.update(&id, Some(compressed), None);
            }
        }
        if before_total > 0 {
            self.last_compression_ratio = Some(after_total as f32 / before_total as f32);
        }
        self.dirty.mark();
    }

    pub fn get_project_stats(&self) -> ProjectStats {
        ProjectStats {
            base: self.base.get_stats(),
            persistence_status: if self.dirty.is_dirty() {
                PersistenceStatus::Dirty
            } else {
                PersistenceStatus::Clean
            },
            compression_ratio: self.last_compression_ratio,
        }
    }

    fn payload(&self) -> ProjectSnapshotPayload {
        ProjectSnapshotPayload {
            project_id: self.project_id.clone(),
            items: self.base.export(),
        }
    }

    /// Writes the items snapshot to `<root>/project/<projectId>/items.json`,
    /// clearing the dirty flag only on success (§5 "Shared-resource policy").
    pub fn flush(&self) -> Result<()> {
        let snapshot = Snapshot::new(self.payload());
        snapshot.write_atomically(&self.items_path())?;
        self.dirty.clear();
        Ok(())
    }

    /// Synchronous flush used by `close()` semantics; returns the flush result.
    pub fn close(&self) -> Result<()> {
        self.flush()
    }

    pub fn load_from_disk(&mut self) -> Result<()> {
        let path = self.items_path();
        if !path.exists() {
            return Ok(());
        }
        let snapshot: Snapshot<ProjectSnapshotPayload> = Snapshot::read(&path)?;
        if snapshot.payload.project_id != self.project_id {
            return Err(MemoryError::Conflict(format!(
                "snapshot project id {} does not match layer project id {}",
                snapshot.payload.project_id, self.project_id
            )));
        }
        for item in snapshot.payload.items {
            self.base.store_existing(item)?;
        }
        Ok(())
    }

    /// Writes a self-contained backup embedding the project id; returns its id.
    pub fn backup(&self) -> Result<String> {
        let (id, path) = new_backup_path(&self.root);
        let snapshot = Snapshot::new(self.payload());
        snapshot.write_atomically(&path)?;
        Ok(id)
    }

    /// Refuses snapshots whose embedded project id differs from this layer's (§4.3).
    pub fn restore(&mut self, backup_id: &str) -> Result<bool> {
        let path = backup_path_for(&self.root, backup_id)?;
        if !path.exists() {
            return Ok(false);
        }
        let snapshot: Snapshot<ProjectSnapshotPayload> = Snapshot::read(&path)?;
        if snapshot.payload.project_id != self.project_id {
            return Ok(false);
        }
        self.base = BaseLayer::new(Tier::Project, self.base.config().clone(), NoEviction);
        for item in snapshot.payload.items {
            self.base.store_existing(item)?;
        }
        self.dirty.mark();
        Ok(true)
    }

    pub fn last_saved_at(&self, path: &Path) -> Option<DateTime<Utc>> {
        Snapshot::<ProjectSnapshotPayload>::read(path).ok().map(|s| s.saved_at)
    }
}

fn is_compression_eligible(item: &MemoryItem, now: DateTime<Utc>) -> bool {
    (now - item.created_at).num_days() >= COMPRESSION_MIN_AGE_DAYS
        && item.access_count < COMPRESSION_MAX_ACCESS_COUNT
}

/// Collapses runs of whitespace and duplicate blank lines without dropping
/// any token, matching the source-parity compression behavior (§9 Open Questions).
fn compress_whitespace(content: &str) -> String {
    let mut out_lines: Vec<String> = Vec::new();
    let mut prev_blank = false;
    for line in content.lines() {
        let collapsed: String = line.split_whitespace().collect::<Vec<_>>().join(" ");
        let blank = collapsed.is_empty();
        if blank && prev_blank {
            continue;
        }
        out_lines.push(collapsed);
        prev_blank = blank;
    }
    out_lines.join("\n")
}

impl MemoryLayer for ProjectLayer {
    fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem> {
        ProjectLayer::store(self, new)
    }

    fn retrieve(&mut self, id: &str) -> Option<MemoryItem> {
        ProjectLayer::retrieve(self, id)
    }

    fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        ProjectLayer::search(self, query)
    }

    fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem> {
        ProjectLayer::update(self, id, content, metadata)
    }

    fn delete(&mut self, id: &str) -> bool {
        ProjectLayer::delete(self, id)
    }

    fn cleanup(&mut self) -> usize {
        ProjectLayer::cleanup(self)
    }

    fn len(&self) -> usize {
        ProjectLayer::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::project_default;
    use tempfile::tempdir;

    fn item(content: &str) -> NewMemoryItem {
        NewMemoryItem {
            id: None,
            content: content.to_string(),
            metadata: MemoryMetadata::default(),
        }
    }

    #[test]
    fn store_forces_project_id() {
        let dir = tempdir().unwrap();
        let mut layer = ProjectLayer::new("p1", dir.path().to_path_buf(), project_default());
        let stored = layer.store(item("hello")).unwrap();
        assert_eq!(stored.metadata.project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn backup_restore_roundtrip_same_project() {
        let dir = tempdir().unwrap();
        let mut layer = ProjectLayer::new("p1", dir.path().to_path_buf(), project_default());
        layer.store(item("hello")).unwrap();
        let backup_id = layer.backup().unwrap();

        layer.delete(&layer.base.export()[0].id.clone());
        assert_eq!(layer.len(), 0);

        let restored = layer.restore(&backup_id).unwrap();
        assert!(restored);
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn restore_refuses_wrong_project() {
        let dir = tempdir().unwrap();
        let mut p1 = ProjectLayer::new("p1", dir.path().to_path_buf(), project_default());
        p1.store(item("hello")).unwrap();
        let backup_id = p1.backup().unwrap();

        let mut p2 = ProjectLayer::new("p2", dir.path().to_path_buf(), project_default());
        let restored = p2.restore(&backup_id).unwrap();
        assert!(!restored);
        assert_eq!(p2.len(), 0);
    }

    #[test]
    fn flush_clears_dirty_flag() {
        let dir = tempdir().unwrap();
        let mut layer = ProjectLayer::new("p1", dir.path().to_path_buf(), project_default());
        layer.store(item("hello")).unwrap();
        assert!(layer.dirty_flag().is_dirty());
        layer.flush().unwrap();
        assert!(!layer.dirty_flag().is_dirty());
    }

    #[test]
    fn compress_whitespace_collapses_blank_runs() {
        let input = "a   b\n\n\n\nc    d\n";
        let compressed = compress_whitespace(input);
        assert_eq!(compressed, "a b\n\nc d");
    }
}
