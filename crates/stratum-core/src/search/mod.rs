//! AdvancedSearchEngine — semantic/temporal/relationship/hybrid search
//! composition, content-addressed caching, and query analytics (spec §4.8).
//!
//! Dependencies the engine needs (vector search, graph reachability) are
//! supplied by the caller per-call rather than owned here, so the engine
//! stays a pure composition layer the Router drives — mirroring the
//! teacher's `search::hybrid` module, which composes over pre-fetched
//! candidate lists instead of owning the stores itself.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;

use crate::layers::GraphLayer;
use crate::model::{DateRange, MemorySearchResult, Tier};

/// Default cache entry lifetime (§4.8).
pub const CACHE_TTL: StdDuration = StdDuration::from_secs(5 * 60);
/// Graph expansion depth default for relationship search (§4.8).
pub const DEFAULT_MAX_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryComplexity {
    Simple,
    Moderate,
    Complex,
}

/// Simple if length < 20 and <= 3 tokens; complex if length > 100 or > 10
/// tokens; else moderate (§4.9 "analyze", reused by §4.8 analytics).
pub fn analyze_query_complexity(text: &str) -> QueryComplexity {
    let token_count = crate::index::tokenize(text).len();
    if text.len() > 100 || token_count > 10 {
        QueryComplexity::Complex
    } else if text.len() < 20 && token_count <= 3 {
        QueryComplexity::Simple
    } else {
        QueryComplexity::Moderate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Keyword,
    Semantic,
    Temporal,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBucket {
    High,
    Medium,
    Low,
}

pub fn score_bucket(score: f32) -> ScoreBucket {
    if score > 0.8 {
        ScoreBucket::High
    } else if score >= 0.4 {
        ScoreBucket::Medium
    } else {
        ScoreBucket::Low
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalytics {
    pub by_query_type: HashMap<String, usize>,
    pub by_complexity: HashMap<String, usize>,
    pub layer_distribution: HashMap<String, usize>,
    pub score_distribution: HashMap<String, usize>,
}

impl SearchAnalytics {
    fn record(&mut self, query_type: QueryType, text: &str, results: &[MemorySearchResult]) {
        *self
            .by_query_type
            .entry(format!("{query_type:?}").to_lowercase())
            .or_insert(0) += 1;
        *self
            .by_complexity
            .entry(format!("{:?}", analyze_query_complexity(text)).to_lowercase())
            .or_insert(0) += 1;
        for result in results {
            *self.layer_distribution.entry(result.source_tier.to_string()).or_insert(0) += 1;
            let bucket = format!("{:?}", score_bucket(result.score)).to_lowercase();
            *self.score_distribution.entry(bucket).or_insert(0) += 1;
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    results: Vec<MemorySearchResult>,
    inserted_at: DateTime<Utc>,
}

/// Content-addressed result cache keyed by query text + enabled feature flags.
#[derive(Debug, Default)]
pub struct SearchCache {
    entries: HashMap<u64, CacheEntry>,
}

/// Feature flags that participate in the cache key, mirroring the flags
/// that change how `hybrid_search` composes its result (§4.8).
#[derive(Debug, Clone, Copy, Default, Hash)]
pub struct SearchFeatureFlags {
    pub semantic: bool,
    pub temporal: bool,
    pub relationship: bool,
}

/// Reuses the Router's cross-tier dedup hashing discipline (§4.8 "content-
/// addressed key"; grounded on §4.9's 32-bit rolling content hash, generalized
/// to `DefaultHasher`'s 64-bit output since the cache key has no wire format).
pub fn cache_key(query_text: &str, flags: SearchFeatureFlags) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    query_text.hash(&mut hasher);
    flags.hash(&mut hasher);
    hasher.finish()
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: u64, now: DateTime<Utc>) -> Option<Vec<MemorySearchResult>> {
        let entry = self.entries.get(&key)?;
        if now - entry.inserted_at > Duration::from_std(CACHE_TTL).unwrap() {
            return None;
        }
        Some(entry.results.clone())
    }

    pub fn insert(&mut self, key: u64, results: Vec<MemorySearchResult>, now: DateTime<Utc>) {
        self.entries.insert(key, CacheEntry { results, inserted_at: now });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves a relative-time keyword into an absolute range (§4.8).
pub fn resolve_relative_range(keyword: &str, now: DateTime<Utc>) -> Option<DateRange> {
    let today_start = now.date_naive().and_hms_opt(0, 0, 0)?.and_utc();
    match keyword.to_lowercase().as_str() {
        "today" => Some(DateRange {
            start: Some(today_start),
            end: Some(now),
        }),
        "yesterday" => Some(DateRange {
            start: Some(today_start - Duration::days(1)),
            end: Some(today_start),
        }),
        "last week" => Some(DateRange {
            start: Some(now - Duration::days(14)),
            end: Some(now - Duration::days(7)),
        }),
        "this month" => Some(DateRange {
            start: Some(today_start - Duration::days(today_start.day0() as i64)),
            end: Some(now),
        }),
        _ => None,
    }
}

/// §4.8 cascading hybrid re-rank: lexical/semantic first, then temporal,
/// then relationship, each only applied when that signal is present.
pub fn fuse_scores(lexical: f32, semantic: Option<f32>, temporal: Option<f32>, relationship: Option<f32>) -> f32 {
    let mut score = match semantic {
        Some(sem) => 0.4 * lexical + 0.6 * sem,
        None => lexical,
    };
    if let Some(t) = temporal {
        score = score * 0.8 + 0.2 * t;
    }
    if let Some(r) = relationship {
        score = score * 0.9 + 0.1 * r;
    }
    score.clamp(0.0, 1.0)
}

/// `seedScore / (distance + 1)` expansion through the graph (§4.8 "relationship search").
pub fn expand_via_graph(
    seeds: &[(String, f32)],
    graph: &dyn GraphLayer,
    max_depth: usize,
) -> HashMap<String, f32> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    for (seed_id, seed_score) in seeds {
        scores
            .entry(seed_id.clone())
            .and_modify(|s| *s = s.max(*seed_score))
            .or_insert(*seed_score);
        for (id, distance) in graph.reachable_from(seed_id, max_depth) {
            let candidate_score = seed_score / (distance as f32 + 1.0);
            scores
                .entry(id)
                .and_modify(|s| *s = s.max(candidate_score))
                .or_insert(candidate_score);
        }
    }
    scores
}

/// Drives caching + analytics around whatever the Router's per-tier
/// dispatch already produced.
#[derive(Debug, Default)]
pub struct AdvancedSearchEngine {
    cache: SearchCache,
    analytics: SearchAnalytics,
}

impl AdvancedSearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_or<F>(
        &mut self,
        query_text: &str,
        flags: SearchFeatureFlags,
        query_type: QueryType,
        now: DateTime<Utc>,
        compute: F,
    ) -> Vec<MemorySearchResult>
    where
        F: FnOnce() -> Vec<MemorySearchResult>,
    {
        let key = cache_key(query_text, flags);
        if let Some(cached) = self.cache.get(key, now) {
            return cached;
        }
        let results = compute();
        self.analytics.record(query_type, query_text, &results);
        self.cache.insert(key, results.clone(), now);
        results
    }

    pub fn analytics(&self) -> &SearchAnalytics {
        &self.analytics
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_buckets_match_spec_thresholds() {
        assert_eq!(analyze_query_complexity("hi there"), QueryComplexity::Simple);
        assert_eq!(
            analyze_query_complexity("a somewhat longer query about several different topics at once here"),
            QueryComplexity::Moderate
        );
        let long = "word ".repeat(12);
        assert_eq!(analyze_query_complexity(&long), QueryComplexity::Complex);
    }

    #[test]
    fn fuse_scores_applies_cascading_weights() {
        let lex_only = fuse_scores(0.5, None, None, None);
        assert_eq!(lex_only, 0.5);
        let with_semantic = fuse_scores(0.5, Some(1.0), None, None);
        assert!((with_semantic - (0.4 * 0.5 + 0.6)).abs() < 1e-5);
    }

    #[test]
    fn cache_respects_ttl() {
        let mut cache = SearchCache::new();
        let key = cache_key("hello", SearchFeatureFlags::default());
        let now = Utc::now();
        cache.insert(key, vec![], now);
        assert!(cache.get(key, now).is_some());
        assert!(cache.get(key, now + Duration::minutes(10)).is_none());
    }
}
