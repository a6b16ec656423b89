//! JSON snapshot persistence shared by ProjectLayer, GlobalLayer and
//! TemporalLayer (spec §4.3, §4.4, §4.5, §6).
//!
//! Snapshots are self-describing (`version`, `savedAt`, payload) per §6.
//! The dirty-flag + periodic-flush discipline is grounded on the teacher's
//! WAL-checkpoint / "close() flushes synchronously" pattern, adapted to
//! plain JSON files since the spec mandates that on-disk format.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{MemoryError, Result};
use crate::SCHEMA_VERSION;

/// A self-describing on-disk snapshot envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<T> {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub payload: T,
}

impl<T: Serialize + DeserializeOwned> Snapshot<T> {
    pub fn new(payload: T) -> Self {
        Self {
            version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            payload,
        }
    }

    pub fn write_atomically(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: Snapshot<T> = serde_json::from_slice(&bytes)?;
        Ok(snapshot)
    }
}

/// Tracks whether in-memory state differs from the last persisted snapshot.
/// Cleared only after a write returns success (§5 "Shared-resource policy").
#[derive(Debug, Default)]
pub struct DirtyFlag(AtomicBool);

impl DirtyFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Persistence status reported by stats endpoints (§4.3 "clean"/"dirty").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceStatus {
    Clean,
    Dirty,
}

/// Spawns a background task that flushes a tier whenever its dirty flag is
/// set, at the given period. Intended period per spec: 5-15 minutes;
/// callers pick a value in that range.
pub fn spawn_periodic_flush<F>(dirty: Arc<DirtyFlag>, period: std::time::Duration, mut flush: F) -> tokio::task::JoinHandle<()>
where
    F: FnMut() -> Result<()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if dirty.is_dirty() {
                if let Err(e) = flush() {
                    tracing::warn!(error = %e, "periodic flush failed; in-memory state remains authoritative");
                } else {
                    dirty.clear();
                }
            }
        }
    })
}

/// Allocates a fresh backup id and its path under `<root>/backups/<id>.json`.
pub fn new_backup_path(root: &Path) -> (String, PathBuf) {
    let id = uuid::Uuid::new_v4().to_string();
    let path = root.join("backups").join(format!("{id}.json"));
    (id, path)
}

pub fn backup_path_for(root: &Path, id: &str) -> Result<PathBuf> {
    if id.chars().any(|c| !(c.is_alphanumeric() || c == '-')) {
        return Err(MemoryError::Validation(format!("invalid backup id: {id}")));
    }
    Ok(root.join("backups").join(format!("{id}.json")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        n: u32,
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.json");
        let snap = Snapshot::new(Payload { n: 42 });
        snap.write_atomically(&path).unwrap();

        let read: Snapshot<Payload> = Snapshot::read(&path).unwrap();
        assert_eq!(read.payload, Payload { n: 42 });
        assert_eq!(read.version, SCHEMA_VERSION);
    }

    #[test]
    fn dirty_flag_lifecycle() {
        let flag = DirtyFlag::new();
        assert!(!flag.is_dirty());
        flag.mark();
        assert!(flag.is_dirty());
        flag.clear();
        assert!(!flag.is_dirty());
    }

    #[test]
    fn backup_path_rejects_unsafe_ids() {
        let dir = tempdir().unwrap();
        assert!(backup_path_for(dir.path(), "../../etc/passwd").is_err());
        assert!(backup_path_for(dir.path(), "a1b2-c3d4").is_ok());
    }
}
