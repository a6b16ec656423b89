//! Disposable [`Router`] instances backed by a temp directory, with seeding
//! helpers for building up multi-tier fixtures quickly.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use stratum_core::config::StratumConfig;
use stratum_core::middleware::RequestContext;
use stratum_core::model::{MemoryItem, MemoryMetadata, Tier};
use stratum_core::router::{Router, StoreOutcome, StoreRequest};
use tempfile::TempDir;

/// Owns the temp dir so it isn't dropped (and deleted) out from under the
/// layers that persist into it.
pub struct TestRouter {
    router: Arc<Router>,
    _temp_dir: TempDir,
}

impl TestRouter {
    /// Fresh router over a throwaway data directory, default tier limits.
    pub fn new_temp() -> Self {
        Self::with_config(StratumConfig::default())
    }

    /// Like [`Self::new_temp`] but lets the caller shrink tier capacities to
    /// exercise eviction without seeding thousands of items.
    pub fn with_config(mut config: StratumConfig) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        config.data_dir = temp_dir.path().to_path_buf();
        Self { router: Arc::new(Router::new(config)), _temp_dir: temp_dir }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn data_dir(&self) -> PathBuf {
        self._temp_dir.path().to_path_buf()
    }

    fn ctx() -> RequestContext {
        RequestContext::default()
    }

    /// Store with default (router-decided) tier routing.
    pub fn store(&self, content: &str, metadata: MemoryMetadata) -> StoreOutcome {
        self.router
            .store(
                StoreRequest { content: content.to_string(), metadata, requested_tier: None, id: None },
                &Self::ctx(),
            )
            .expect("store should succeed")
    }

    /// Store pinned to a specific tier.
    pub fn store_in(&self, tier: Tier, content: &str, metadata: MemoryMetadata) -> StoreOutcome {
        self.router
            .store(
                StoreRequest {
                    content: content.to_string(),
                    metadata,
                    requested_tier: Some(tier),
                    id: None,
                },
                &Self::ctx(),
            )
            .expect("store should succeed")
    }

    pub fn retrieve(&self, id: &str) -> Option<(MemoryItem, Tier)> {
        self.router.retrieve(id, &Self::ctx()).expect("retrieve should not error")
    }

    /// Seeds `count` plain session memories, returning their ids.
    pub fn seed_session(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                let outcome = self.store_in(
                    Tier::Session,
                    &format!("session memory {i}"),
                    MemoryMetadata { category: "note".to_string(), ..Default::default() },
                );
                outcome.item.id
            })
            .collect()
    }

    /// Seeds memories spread across all four tiers by tag/priority/category
    /// signals, letting the router's own classification pick the tier.
    pub fn seed_diverse(&self, project_id: &str) -> SeededIds {
        let session = self.store(
            "short-lived scratch note",
            MemoryMetadata { tags: vec!["temporary".to_string()], ..Default::default() },
        );
        let project = self.store(
            "project-specific implementation detail",
            MemoryMetadata {
                category: "project-specific".to_string(),
                project_id: Some(project_id.to_string()),
                ..Default::default()
            },
        );
        let global = self.store(
            "company-wide policy every agent must honor",
            MemoryMetadata { tags: vec!["important".to_string()], priority: 9, ..Default::default() },
        );
        let temporal = self.store_in(
            Tier::Temporal,
            "event that happened at a specific point in time",
            MemoryMetadata::default(),
        );

        SeededIds {
            session: session.item.id,
            project: project.item.id,
            global: global.item.id,
            temporal: temporal.item.id,
        }
    }

    /// Seeds a handful of temporal memories; content carries distinct
    /// markers so tests can identify which ids fell into which bucket.
    pub fn seed_temporal_spread(&self) -> Vec<String> {
        let now = Utc::now();
        (0..4)
            .map(|i| {
                let outcome = self.store_in(
                    Tier::Temporal,
                    &format!("temporal event #{i} near {now}"),
                    MemoryMetadata::default(),
                );
                outcome.item.id
            })
            .collect()
    }

    pub fn item_count(&self) -> usize {
        let session = self.router.session().read().unwrap().len();
        let global = self.router.global().read().unwrap().len();
        let temporal = self.router.temporal().read().unwrap().len();
        let projects: usize =
            self.router.projects().read().unwrap().values().map(|p| p.len()).sum();
        session + global + temporal + projects
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}

#[derive(Debug, Clone)]
pub struct SeededIds {
    pub session: String,
    pub project: String,
    pub global: String,
    pub temporal: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_temp_starts_empty() {
        let harness = TestRouter::new_temp();
        assert!(harness.is_empty());
    }

    #[test]
    fn seed_session_creates_requested_count() {
        let harness = TestRouter::new_temp();
        let ids = harness.seed_session(5);
        assert_eq!(ids.len(), 5);
        assert_eq!(harness.item_count(), 5);
    }

    #[test]
    fn seed_diverse_lands_in_four_distinct_tiers() {
        let harness = TestRouter::new_temp();
        let seeded = harness.seed_diverse("proj-1");

        let (_, session_tier) = harness.retrieve(&seeded.session).expect("session item exists");
        let (_, project_tier) = harness.retrieve(&seeded.project).expect("project item exists");
        let (_, global_tier) = harness.retrieve(&seeded.global).expect("global item exists");
        let (_, temporal_tier) = harness.retrieve(&seeded.temporal).expect("temporal item exists");

        assert_eq!(session_tier, Tier::Session);
        assert_eq!(project_tier, Tier::Project);
        assert_eq!(global_tier, Tier::Global);
        assert_eq!(temporal_tier, Tier::Temporal);
    }

    #[test]
    fn retrieve_missing_id_returns_none() {
        let harness = TestRouter::new_temp();
        assert!(harness.retrieve("does-not-exist").is_none());
    }
}
