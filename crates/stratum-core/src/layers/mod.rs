//! The four storage tiers plus the optional graph layer (spec §4).
//!
//! Each tier embeds a [`base::BaseLayer`] for the operations every tier
//! shares (store/retrieve/search/update/delete/cleanup/stats/export/import)
//! and adds whatever is specific to it on top (eviction, persistence,
//! vector search, time buckets, ...).

pub mod base;
pub mod global;
pub mod graph;
pub mod project;
pub mod session;
pub mod temporal;

pub use base::{EvictionPolicy, LayerStats, LruEviction, NoEviction};
pub use global::GlobalLayer;
pub use graph::{GraphEdge, GraphLayer, GraphNode, InMemoryGraphLayer};
pub use project::ProjectLayer;
pub use session::SessionLayer;
pub use temporal::TemporalLayer;

use crate::error::Result;
use crate::model::{MemoryItem, MemoryMetadata, MemoryQuery, MemorySearchResult, NewMemoryItem};

/// Capability every tier exposes to the Router, independent of its storage
/// strategy. Lets the Router treat tiers uniformly where their behavior
/// doesn't diverge (§4.9).
pub trait MemoryLayer {
    fn store(&mut self, new: NewMemoryItem) -> Result<MemoryItem>;
    fn retrieve(&mut self, id: &str) -> Option<MemoryItem>;
    fn search(&self, query: &MemoryQuery) -> Vec<MemorySearchResult>;
    fn update(
        &mut self,
        id: &str,
        content: Option<String>,
        metadata: Option<MemoryMetadata>,
    ) -> Option<MemoryItem>;
    fn delete(&mut self, id: &str) -> bool;
    fn cleanup(&mut self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
