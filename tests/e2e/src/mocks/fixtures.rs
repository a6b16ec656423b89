//! Test data factory: generates realistic fixtures for multi-tier scenarios
//! without leaning on the harness's narrower `seed_*` helpers.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use stratum_core::middleware::RequestContext;
use stratum_core::model::{MemoryItem, MemoryMetadata, Tier};
use stratum_core::router::{Router, StoreRequest};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub count: usize,
    pub category: String,
    pub content_prefix: String,
    pub tags: Vec<String>,
    pub priority: u8,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 10,
            category: "note".to_string(),
            content_prefix: "test memory".to_string(),
            tags: vec![],
            priority: 5,
        }
    }
}

#[derive(Debug)]
pub struct TestScenario {
    pub ids: Vec<String>,
    pub description: String,
    pub metadata: HashMap<String, String>,
}

/// Generates realistic multi-tier fixtures for end-to-end scenario tests.
pub struct TestDataFactory;

impl TestDataFactory {
    fn ctx() -> RequestContext {
        RequestContext::default()
    }

    pub fn store(router: &Router, content: &str, metadata: MemoryMetadata) -> MemoryItem {
        router
            .store(
                StoreRequest {
                    content: content.to_string(),
                    metadata,
                    requested_tier: None,
                    id: None,
                },
                &Self::ctx(),
            )
            .expect("store should succeed")
            .item
    }

    pub fn store_in(router: &Router, tier: Tier, content: &str, metadata: MemoryMetadata) -> MemoryItem {
        router
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
            .item
    }

    pub fn create_batch(router: &Router, config: BatchConfig) -> Vec<String> {
        (0..config.count)
            .map(|i| {
                let metadata = MemoryMetadata {
                    category: config.category.clone(),
                    tags: config.tags.clone(),
                    priority: config.priority,
                    ..Default::default()
                };
                Self::store(router, &format!("{} {i}", config.content_prefix), metadata).id
            })
            .collect()
    }

    /// Scenario grouped by topical category, for exercising lexical search ranking.
    pub fn create_search_scenario(router: &Router) -> TestScenario {
        let mut ids = Vec::new();
        let mut metadata = HashMap::new();

        for content in [
            "Rust programming language uses ownership for memory safety",
            "Python is great for data science and machine learning",
            "JavaScript runs in web browsers and on servers via Node.js",
        ] {
            ids.push(
                Self::store(
                    router,
                    content,
                    MemoryMetadata { category: "programming".to_string(), source: "docs".to_string(), ..Default::default() },
                )
                .id,
            );
        }
        metadata.insert("programming_count".to_string(), "3".to_string());

        for content in [
            "Mitochondria is the powerhouse of the cell",
            "DNA contains the genetic instructions for an organism",
        ] {
            ids.push(
                Self::store(
                    router,
                    content,
                    MemoryMetadata { category: "science".to_string(), source: "textbook".to_string(), ..Default::default() },
                )
                .id,
            );
        }
        metadata.insert("science_count".to_string(), "2".to_string());

        TestScenario { ids, description: "categorized search fixture".to_string(), metadata }
    }

    /// Spreads items across a day with distinct timestamps, for temporal-range tests.
    pub fn create_temporal_scenario(router: &Router, base: DateTime<Utc>) -> Vec<(String, DateTime<Utc>)> {
        (0..5)
            .map(|i| {
                let item = Self::store_in(
                    router,
                    Tier::Temporal,
                    &format!("temporal marker #{i}"),
                    MemoryMetadata::default(),
                );
                (item.id, base + Duration::seconds(i))
            })
            .collect()
    }

    pub fn lorem_content(words: usize, seed: usize) -> String {
        const WORDS: [&str; 16] = [
            "memory", "learning", "knowledge", "algorithm", "data", "system", "process",
            "function", "method", "object", "variable", "constant", "pattern", "design",
            "architecture", "index",
        ];
        (0..words).map(|i| WORDS[(seed + i * 7) % WORDS.len()]).collect::<Vec<_>>().join(" ")
    }
}
