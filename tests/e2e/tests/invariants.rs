//! Property-flavored checks of the spec's universal invariants (§8), run
//! against a real `Router` rather than a single tier in isolation.

use std::time::Duration;

use stratum_core::config::StratumConfig;
use stratum_core::middleware::RequestContext;
use stratum_core::model::{MemoryMetadata, MemoryQuery, Tier};

use stratum_e2e_tests::harness::TestRouter;

fn ctx() -> RequestContext {
    RequestContext::default()
}

/// retrieve(store(x).id) returns x, possibly in a higher tier after promotion.
#[test]
fn retrieve_after_store_returns_the_item() {
    let harness = TestRouter::new_temp();
    let outcome = harness.store("hello world", MemoryMetadata::default());
    let (retrieved, _tier) = harness.retrieve(&outcome.item.id).expect("item exists");
    assert_eq!(retrieved.id, outcome.item.id);
    assert_eq!(retrieved.content, "hello world");
}

/// After delete(x.id), retrieve(x.id) is null and the id disappears from
/// every tier's search results.
#[tokio::test]
async fn delete_removes_item_from_every_tier() {
    let harness = TestRouter::new_temp();
    let outcome = harness.store_in(Tier::Session, "unique deletable content", MemoryMetadata::default());
    assert!(harness.router().session().write().unwrap().delete(&outcome.item.id));
    assert!(harness.retrieve(&outcome.item.id).is_none());

    let results = harness
        .router()
        .search(MemoryQuery::new("unique deletable content"), &ctx(), Duration::from_secs(5))
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.item.id != outcome.item.id));
}

/// A tier with a configured maxItems never exceeds it at any observation point.
#[test]
fn session_never_exceeds_max_items() {
    let mut config = StratumConfig::default();
    config.session.max_items = 5;
    let harness = TestRouter::with_config(config);

    for i in 0..20 {
        harness.store_in(Tier::Session, &format!("item {i}"), MemoryMetadata::default());
        assert!(harness.router().session().read().unwrap().len() <= 5);
    }
}

/// A tier with a TTL never retains an item past TTL + a small cleanup slack,
/// once cleanup() has run.
#[test]
fn ttl_is_enforced_after_cleanup() {
    let mut config = StratumConfig::default();
    config.session.ttl_ms = Some(50);
    let harness = TestRouter::with_config(config);

    harness.store_in(Tier::Session, "will expire", MemoryMetadata::default());
    std::thread::sleep(Duration::from_millis(100));
    harness.router().session().write().unwrap().cleanup();

    let now = chrono::Utc::now();
    let ttl = chrono::Duration::milliseconds(50);
    for item in harness.router().session().read().unwrap().export() {
        assert!(now - item.created_at <= ttl + chrono::Duration::seconds(1));
    }
}

/// Returned search results are sorted by score descending.
#[tokio::test]
async fn search_results_sorted_by_score_descending() {
    let harness = TestRouter::new_temp();
    harness.store("apple banana cherry apple banana", MemoryMetadata::default());
    harness.store("apple", MemoryMetadata::default());
    harness.store("completely unrelated content about weather", MemoryMetadata::default());

    let results = harness
        .router()
        .search(MemoryQuery::new("apple banana cherry"), &ctx(), Duration::from_secs(5))
        .await
        .unwrap();

    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
}

/// Merge-dedup law: search returns at most one result per item id even when
/// the same content exists in more than one tier.
#[tokio::test]
async fn search_dedups_across_tiers() {
    let harness = TestRouter::new_temp();
    harness.store_in(Tier::Session, "shared across tiers content", MemoryMetadata::default());
    harness.store_in(Tier::Project, "shared across tiers content", MemoryMetadata::default());
    harness.store_in(Tier::Global, "shared across tiers content", MemoryMetadata::default());

    let results = harness
        .router()
        .search(MemoryQuery::new("shared across tiers content"), &ctx(), Duration::from_secs(5))
        .await
        .unwrap();

    let mut seen = std::collections::HashSet::new();
    for r in &results {
        assert!(seen.insert(r.item.id.clone()), "duplicate id in merged results");
    }
    assert_eq!(results.len(), 1, "identical content across tiers should dedup to one result");
}

/// store(x); retrieve(x.id) returns x with metadata.projectId set when x was
/// routed to Project.
#[test]
fn project_routed_items_carry_project_id() {
    let harness = TestRouter::new_temp();
    let outcome = harness.store(
        "project specific detail",
        MemoryMetadata {
            category: "project-specific".to_string(),
            project_id: Some("proj-42".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(outcome.tier, Tier::Project);
    let (retrieved, _) = harness.retrieve(&outcome.item.id).unwrap();
    assert_eq!(retrieved.metadata.project_id.as_deref(), Some("proj-42"));
}

/// export(); clear(); import(exported) preserves the item set.
#[test]
fn export_clear_import_preserves_item_set() {
    let harness = TestRouter::new_temp();
    for i in 0..5 {
        harness.store_in(Tier::Session, &format!("session item {i}"), MemoryMetadata::default());
    }

    let exported = harness.router().session().read().unwrap().export();
    assert_eq!(exported.len(), 5);

    harness.router().session().write().unwrap().clear();
    assert!(harness.router().session().read().unwrap().is_empty());

    {
        let mut session = harness.router().session().write().unwrap();
        for item in &exported {
            session.store_existing(item.clone()).unwrap();
        }
    }
    let reimported = harness.router().session().read().unwrap().export();
    let original_ids: std::collections::HashSet<_> = exported.iter().map(|i| i.id.clone()).collect();
    let reimported_ids: std::collections::HashSet<_> = reimported.iter().map(|i| i.id.clone()).collect();
    assert_eq!(original_ids, reimported_ids);
}
