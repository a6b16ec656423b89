//! Configuration structs (spec §6). Loading these from TOML/env/CLI is the
//! excluded process-level configuration loader's job; the core only defines
//! the shape a loader must produce.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-tier capacity/TTL/behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    pub max_items: usize,
    pub max_size_bytes: usize,
    /// `None` = no TTL.
    pub ttl_ms: Option<u64>,
    pub compression_enabled: bool,
    pub indexing_enabled: bool,
}

impl TierConfig {
    pub fn ttl(&self) -> Option<chrono::Duration> {
        self.ttl_ms.map(|ms| chrono::Duration::milliseconds(ms as i64))
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            max_items: 1000,
            max_size_bytes: 10 * 1024 * 1024,
            ttl_ms: None,
            compression_enabled: false,
            indexing_enabled: true,
        }
    }
}

pub fn session_default() -> TierConfig {
    TierConfig {
        max_items: 50,
        max_size_bytes: 1024 * 1024,
        ttl_ms: None,
        compression_enabled: false,
        indexing_enabled: true,
    }
}

pub fn project_default() -> TierConfig {
    TierConfig {
        max_items: 1000,
        max_size_bytes: 10 * 1024 * 1024,
        ttl_ms: Some(Duration::from_secs(30 * 24 * 3600).as_millis() as u64),
        compression_enabled: true,
        indexing_enabled: true,
    }
}

pub fn global_default() -> TierConfig {
    TierConfig {
        max_items: 10_000,
        max_size_bytes: 100 * 1024 * 1024,
        ttl_ms: Some(Duration::from_secs(365 * 24 * 3600).as_millis() as u64),
        compression_enabled: false,
        indexing_enabled: true,
    }
}

pub fn temporal_default() -> TierConfig {
    TierConfig {
        max_items: 50_000,
        max_size_bytes: 500 * 1024 * 1024,
        ttl_ms: None,
        compression_enabled: false,
        indexing_enabled: true,
    }
}

/// Weights the router applies during cross-tier scoring (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub recency: f32,
    pub frequency: f32,
    pub relevance: f32,
    pub priority: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            recency: 0.3,
            frequency: 0.2,
            relevance: 0.4,
            priority: 0.1,
        }
    }
}

/// Router-level configuration (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    pub session_threshold: u8,
    pub project_threshold: u8,
    pub global_threshold: u8,
    pub temporal_fallback: bool,
    pub max_results: usize,
    pub scoring_weights: ScoringWeights,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            session_threshold: 6,
            project_threshold: 6,
            global_threshold: 8,
            temporal_fallback: true,
            max_results: 1000,
            scoring_weights: ScoringWeights::default(),
        }
    }
}

/// Relationship engine configuration (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipConfig {
    pub enabled: bool,
    pub min_confidence: f32,
    pub batch_size: usize,
    /// Ceiling below which CAUSAL/SUPERSEDES are never auto-confirmed (§4.7).
    pub auto_confirm_ceiling: f32,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.6,
            batch_size: 75,
            auto_confirm_ceiling: 0.8,
        }
    }
}

/// Top-level configuration tree the core consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StratumConfig {
    pub session: TierConfig,
    pub project: TierConfig,
    pub global: TierConfig,
    pub temporal: TierConfig,
    pub router: RouterConfig,
    pub relationships: RelationshipConfig,
    /// Directory snapshots are persisted under (§6 "Persisted state layout").
    pub data_dir: std::path::PathBuf,
    pub log_level: String,
}

impl Default for StratumConfig {
    fn default() -> Self {
        Self {
            session: session_default(),
            project: project_default(),
            global: global_default(),
            temporal: temporal_default(),
            router: RouterConfig::default(),
            relationships: RelationshipConfig::default(),
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
        }
    }
}

fn default_data_dir() -> std::path::PathBuf {
    directories::ProjectDirs::from("dev", "stratum", "stratum")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("./stratum-data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_defaults_match_spec() {
        assert_eq!(session_default().max_items, 50);
        assert_eq!(project_default().max_items, 1000);
        assert_eq!(global_default().max_items, 10_000);
        assert_eq!(temporal_default().max_items, 50_000);
        assert!(session_default().ttl_ms.is_none());
        assert!(temporal_default().ttl_ms.is_none());
        assert!(project_default().ttl_ms.is_some());
    }
}
