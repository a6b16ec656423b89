//! The eight concrete end-to-end scenarios from the spec's testable
//! properties section, run against a real `Router` over a disposable data dir.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use stratum_core::config::StratumConfig;
use stratum_core::middleware::RequestContext;
use stratum_core::model::{MemoryMetadata, MemoryQuery, Tier};

use stratum_e2e_tests::harness::TestRouter;

fn ctx() -> RequestContext {
    RequestContext::default()
}

fn meta(priority: u8) -> MemoryMetadata {
    MemoryMetadata {
        priority,
        ..Default::default()
    }
}

/// 1. Session LRU eviction: maxItems = 2, store A, B, retrieve A, store C.
/// Session ends up with {A, C}; B is evicted.
#[test]
fn session_lru_eviction() {
    let mut config = StratumConfig::default();
    config.session.max_items = 2;
    let harness = TestRouter::with_config(config);

    let a = harness.store_in(Tier::Session, "A", meta(3));
    let b = harness.store_in(Tier::Session, "B", meta(3));
    harness.retrieve(&a.item.id);
    let c = harness.store_in(Tier::Session, "C", meta(3));

    assert!(harness.retrieve(&a.item.id).is_some());
    assert!(harness.retrieve(&c.item.id).is_some());
    assert!(harness.retrieve(&b.item.id).is_none());
    assert_eq!(harness.router().session().read().unwrap().len(), 2);
}

/// 2. Priority routing: priority 9 lands in Global; a search for it reports
/// `source = global` when only Global holds it.
#[tokio::test]
async fn priority_routing_to_global() {
    let harness = TestRouter::new_temp();
    let outcome = harness.store("critical priority routing configuration item", meta(9));
    assert_eq!(outcome.tier, Tier::Global);

    let results = harness
        .router()
        .search(MemoryQuery::new("critical priority routing configuration"), &ctx(), Duration::from_secs(5))
        .await
        .unwrap();
    let hit = results.iter().find(|r| r.item.id == outcome.item.id).expect("global item found");
    assert_eq!(hit.source_tier, Tier::Global);
}

/// 3. Cross-tier deduplication: the same content stored twice (different
/// priorities, different tiers) yields exactly one search result.
#[tokio::test]
async fn cross_tier_dedup() {
    let harness = TestRouter::new_temp();
    harness.store("UniqueContentXYZ across several memory tiers", meta(2));
    harness.store("UniqueContentXYZ across several memory tiers", meta(8));

    let results = harness
        .router()
        .search(MemoryQuery::new("UniqueContentXYZ across several memory tiers"), &ctx(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

/// 4. TTL cleanup: Session TTL 100ms, store one item, wait 150ms, cleanup()
/// removes it and reports 1.
#[test]
fn ttl_cleanup_removes_expired_item() {
    let mut config = StratumConfig::default();
    config.session.ttl_ms = Some(100);
    let harness = TestRouter::with_config(config);

    harness.store_in(Tier::Session, "short lived", MemoryMetadata::default());
    std::thread::sleep(Duration::from_millis(150));

    let removed = harness.router().session().write().unwrap().cleanup();
    assert_eq!(removed, 1);
    assert!(harness.router().session().read().unwrap().is_empty());
}

/// 5. Project backup isolation: P1's backup cannot be restored into P2.
#[test]
fn project_backup_isolation() {
    let dir = tempfile::tempdir().unwrap();
    let config = StratumConfig::default();

    let mut p1 = stratum_core::layers::ProjectLayer::new("p1", dir.path().to_path_buf(), config.project.clone());
    p1.store(stratum_core::model::NewMemoryItem {
        id: None,
        content: "p1 memory".to_string(),
        metadata: MemoryMetadata::default(),
    })
    .unwrap();
    let backup_id = p1.backup().unwrap();

    let mut p2 = stratum_core::layers::ProjectLayer::new("p2", dir.path().to_path_buf(), config.project.clone());
    let restored = p2.restore(&backup_id).unwrap();
    assert!(!restored);
    assert_eq!(p2.get_project_stats().base.total_items, 0);
}

/// 6. Temporal range: 5 items at t, t+1s, ..., t+4s; range [t+1s, t+3s]
/// returns exactly the 3 items in ascending time order.
#[test]
fn temporal_range_query() {
    let dir = tempfile::tempdir().unwrap();
    let config = StratumConfig::default();
    let mut temporal = stratum_core::layers::TemporalLayer::new(dir.path().to_path_buf(), config.temporal.clone());

    let base_t = Utc::now();
    let mut ids = Vec::new();
    for i in 0..5i64 {
        let mut new = stratum_core::model::NewMemoryItem {
            id: Some(format!("id-{i}")),
            content: format!("event {i}"),
            metadata: MemoryMetadata::default(),
        };
        new.id = Some(format!("id-{i}"));
        let mut item = stratum_core::model::MemoryItem::from_new(new);
        item.created_at = base_t + ChronoDuration::seconds(i);
        temporal.store_existing(item).unwrap();
        ids.push(format!("id-{i}"));
    }

    let results = temporal.get_memories_in_range(base_t + ChronoDuration::seconds(1), base_t + ChronoDuration::seconds(3), 100);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "id-1");
    assert_eq!(results[1].id, "id-2");
    assert_eq!(results[2].id, "id-3");
}

/// 7. Relationship detection: two related facts get a SEMANTIC relationship
/// with confidence >= 0.6.
#[test]
fn relationship_detection_semantic() {
    let harness = TestRouter::new_temp();
    let first = harness.store("JavaScript is a dynamic language", MemoryMetadata::default());
    harness.store("React is a JavaScript library", MemoryMetadata::default());

    let relationships = harness
        .router()
        .relationships()
        .lock()
        .unwrap()
        .get_memory_relationships(&first.item.id);

    assert!(relationships
        .iter()
        .any(|r| r.relationship_type == stratum_core::model::RelationshipType::Semantic && r.confidence >= 0.6));
}

/// 8. Decay bucket boundary: priority 10, last access now, accessCount 20
/// never recommends archive.
#[test]
fn decay_never_archives_hot_high_priority_item() {
    let harness = TestRouter::new_temp();
    let outcome = harness.store_in(Tier::Global, "hot item", meta(10));

    for _ in 0..20 {
        harness.router().retrieve(&outcome.item.id, &ctx()).unwrap();
    }
    let (item, tier) = harness.retrieve(&outcome.item.id).unwrap();
    assert!(item.access_count >= 20);

    let prediction = harness.router().relationships().lock().unwrap().predict_decay(&item, tier);
    assert_ne!(prediction.recommendation, stratum_core::model::DecayRecommendation::Archive);
}
