//! MemoryQuery, filters, similarity options, and MemorySearchResult (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tier;

/// Similarity algorithm used when a query sets a similarity threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityAlgorithm {
    #[default]
    Cosine,
    Euclidean,
    Semantic,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityOptions {
    /// Minimum score in [0,1] a result must reach to be returned.
    #[serde(default)]
    pub threshold: f32,
    #[serde(default)]
    pub algorithm: SimilarityAlgorithm,
}

/// Date range filter: `[start, end]` inclusive, either bound optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start.map(|s| t >= s).unwrap_or(true) && self.end.map(|e| t <= e).unwrap_or(true)
    }
}

/// Any subset of filters a query may specify.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MemoryFilters {
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub min_priority: Option<u8>,
    pub max_priority: Option<u8>,
    pub source: Option<String>,
    pub project_id: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub date_range: Option<DateRange>,
}

impl MemoryFilters {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.category.is_none()
            && self.min_priority.is_none()
            && self.max_priority.is_none()
            && self.source.is_none()
            && self.project_id.is_none()
            && self.session_id.is_none()
            && self.user_id.is_none()
            && self.date_range.is_none()
    }

    pub fn matches(&self, item: &super::MemoryItem) -> bool {
        if !self.tags.is_empty()
            && !self
                .tags
                .iter()
                .any(|t| item.metadata.tags.iter().any(|it| it == t))
        {
            return false;
        }
        if let Some(cat) = &self.category {
            if &item.metadata.category != cat {
                return false;
            }
        }
        if let Some(min) = self.min_priority {
            if item.metadata.priority < min {
                return false;
            }
        }
        if let Some(max) = self.max_priority {
            if item.metadata.priority > max {
                return false;
            }
        }
        if let Some(src) = &self.source {
            if &item.metadata.source != src {
                return false;
            }
        }
        if let Some(pid) = &self.project_id {
            if item.metadata.project_id.as_ref() != Some(pid) {
                return false;
            }
        }
        if let Some(sid) = &self.session_id {
            if item.metadata.session_id.as_ref() != Some(sid) {
                return false;
            }
        }
        if let Some(uid) = &self.user_id {
            if item.metadata.user_id.as_ref() != Some(uid) {
                return false;
            }
        }
        if let Some(range) = &self.date_range {
            if !range.contains(item.created_at) {
                return false;
            }
        }
        true
    }
}

/// Default limit for a search (10); tool-call callers are capped at 50,
/// internal callers at 1000.
pub const DEFAULT_LIMIT: usize = 10;
pub const TOOL_CALL_MAX_LIMIT: usize = 50;
pub const INTERNAL_MAX_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryQuery {
    pub text: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub filters: Option<MemoryFilters>,
    #[serde(default)]
    pub similarity: Option<SimilarityOptions>,
    /// If set, results are sorted by `createdAt` descending instead of by score (§4.5).
    #[serde(default)]
    pub chronological: bool,
}

impl MemoryQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: None,
            offset: None,
            filters: None,
            similarity: None,
            chronological: false,
        }
    }

    pub fn effective_limit(&self, cap: usize) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(cap)
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn filters_or_default(&self) -> MemoryFilters {
        self.filters.clone().unwrap_or_default()
    }
}

/// One scored hit returned by a tier search or the router's merged search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySearchResult {
    pub item: super::MemoryItem,
    /// Score in [0,1] (may exceed 1 transiently before final clamping in the router).
    pub score: f32,
    pub source_tier: Tier,
    pub explanation: String,
}

/// Sort results by score descending, ties broken by recency then priority (§4.1).
pub fn sort_results(results: &mut [MemorySearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.item.created_at.cmp(&a.item.created_at))
            .then_with(|| b.item.metadata.priority.cmp(&a.item.metadata.priority))
            .then_with(|| a.item.id.cmp(&b.item.id))
    });
}
