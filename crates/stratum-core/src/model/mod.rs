//! Data model — MemoryItem, MemoryMetadata, MemoryQuery, MemorySearchResult,
//! MemoryRelationship, MemoryVersion, DecayPrediction (spec §3).

mod decay;
mod item;
mod query;
mod relationship;
mod tier;
mod version;

pub use decay::{DecayPrediction, DecayRecommendation};
pub use item::{MemoryItem, MemoryMetadata, NewMemoryItem};
pub use query::{
    sort_results, DateRange, MemoryFilters, MemoryQuery, MemorySearchResult, SimilarityAlgorithm,
    SimilarityOptions, DEFAULT_LIMIT, INTERNAL_MAX_LIMIT, TOOL_CALL_MAX_LIMIT,
};
pub use relationship::{MemoryRelationship, RelationshipMetadata, RelationshipType};
pub use tier::Tier;
pub use version::{ChangePayload, ChangeType, MemoryVersion, VersionHistory};
