//! stratum-core: the hierarchical memory store's storage and retrieval engine.
//!
//! Four storage tiers (Session, Project, Global, Temporal) plus an optional
//! graph layer are coordinated by a [`router::Router`], which also owns the
//! relationship/decay engine and the advanced search composition.

pub mod config;
pub mod error;
pub mod events;
pub mod index;
pub mod layers;
pub mod middleware;
pub mod mixer;
pub mod model;
pub mod persistence;
pub mod relationship;
pub mod router;
pub mod search;
pub mod vector;

/// Bumped whenever the on-disk snapshot or `MemoryItem` shape changes.
pub const SCHEMA_VERSION: u32 = 1;
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for downstream crates and tests.
pub mod prelude {
    pub use crate::config::{RelationshipConfig, RouterConfig, ScoringWeights, StratumConfig, TierConfig};
    pub use crate::error::{MemoryError, Result};
    pub use crate::events::{EventBus, EventSink, NullEventSink, RouterEvent, TracingEventSink};
    pub use crate::middleware::{AllowAllGuard, GuardDecision, Operation, RequestContext, RequestGuard};
    pub use crate::mixer::{MixPlan, MixStrategy};
    pub use crate::model::{
        MemoryFilters, MemoryItem, MemoryMetadata, MemoryQuery, MemoryRelationship, MemorySearchResult,
        MemoryVersion, NewMemoryItem, RelationshipType, Tier,
    };
    pub use crate::router::Router;
    pub use crate::{SCHEMA_VERSION, VERSION};
}
