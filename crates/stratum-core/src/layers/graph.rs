//! GraphLayer — optional typed adjacency store (spec §4.6).
//!
//! Modeled as a trait plus one in-process reference implementation, since
//! the external graph-database binding itself is out of scope; absence of
//! a configured binding is not a failure, it just means the Router uses
//! `InMemoryGraphLayer` instead of a remote one.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::error::Result;
use crate::model::RelationshipType;
use crate::vector::cosine_similarity;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub edge_type: RelationshipType,
    pub weight: f32,
}

/// The seam an external graph database binds into. `Dependency` is the
/// error kind a binding should return when unreachable (§7).
pub trait GraphLayer: Send + Sync {
    fn create_node(&mut self, id: &str);
    fn create_edge(&mut self, source: &str, target: &str, edge_type: RelationshipType, weight: f32) -> Result<()>;
    fn edges_by_type(&self, edge_type: &RelationshipType) -> Vec<GraphEdge>;
    fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>>;
    fn reachable_from(&self, id: &str, max_depth: usize) -> HashMap<String, usize>;
    fn node_count(&self) -> usize;
    fn edge_count(&self) -> usize;
    fn nodes(&self) -> Vec<GraphNode>;
    fn all_edges(&self) -> Vec<GraphEdge>;
}

/// A plain adjacency-list graph held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryGraphLayer {
    nodes: HashSet<String>,
    adjacency: HashMap<String, Vec<GraphEdge>>,
}

impl InMemoryGraphLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates edges from temporal proximity, semantic similarity (the
    /// caller supplies the GlobalLayer vector), and shared project/session
    /// context — the autolink heuristic named in §4.6.
    pub fn autolink(
        &mut self,
        item_id: &str,
        candidate_id: &str,
        temporal_strength: f32,
        semantic_vectors: Option<(&[f32], &[f32])>,
        shares_context: bool,
    ) {
        self.create_node(item_id);
        self.create_node(candidate_id);

        if temporal_strength > 0.0 {
            let _ = self.create_edge(item_id, candidate_id, RelationshipType::Temporal, temporal_strength);
        }
        if let Some((a, b)) = semantic_vectors {
            let sim = cosine_similarity(a, b);
            if sim >= 0.5 {
                let _ = self.create_edge(item_id, candidate_id, RelationshipType::Semantic, sim);
            }
        }
        if shares_context {
            let _ = self.create_edge(item_id, candidate_id, RelationshipType::Context, 0.8);
        }
    }
}

impl GraphLayer for InMemoryGraphLayer {
    fn create_node(&mut self, id: &str) {
        self.nodes.insert(id.to_string());
    }

    fn create_edge(
        &mut self,
        source: &str,
        target: &str,
        edge_type: RelationshipType,
        weight: f32,
    ) -> Result<()> {
        self.create_node(source);
        self.create_node(target);
        self.adjacency.entry(source.to_string()).or_default().push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            edge_type,
            weight: weight.clamp(0.0, 1.0),
        });
        Ok(())
    }

    fn edges_by_type(&self, edge_type: &RelationshipType) -> Vec<GraphEdge> {
        self.adjacency
            .values()
            .flatten()
            .filter(|e| &e.edge_type == edge_type)
            .cloned()
            .collect()
    }

    fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if from == to {
            return Some(vec![from.to_string()]);
        }
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<Vec<String>> = VecDeque::new();
        queue.push_back(vec![from.to_string()]);
        visited.insert(from.to_string());

        while let Some(path) = queue.pop_front() {
            let last = path.last().unwrap().clone();
            if let Some(edges) = self.adjacency.get(&last) {
                for edge in edges {
                    if edge.target == to {
                        let mut full = path.clone();
                        full.push(edge.target.clone());
                        return Some(full);
                    }
                    if visited.insert(edge.target.clone()) {
                        let mut next = path.clone();
                        next.push(edge.target.clone());
                        queue.push_back(next);
                    }
                }
            }
        }
        None
    }

    fn reachable_from(&self, id: &str, max_depth: usize) -> HashMap<String, usize> {
        let mut depths: HashMap<String, usize> = HashMap::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        queue.push_back((id.to_string(), 0));
        depths.insert(id.to_string(), 0);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            if let Some(edges) = self.adjacency.get(&current) {
                for edge in edges {
                    if !depths.contains_key(&edge.target) {
                        depths.insert(edge.target.clone(), depth + 1);
                        queue.push_back((edge.target.clone(), depth + 1));
                    }
                }
            }
        }
        depths.remove(id);
        depths
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.adjacency.values().map(|v| v.len()).sum()
    }

    fn nodes(&self) -> Vec<GraphNode> {
        self.nodes
            .iter()
            .map(|id| GraphNode {
                id: id.clone(),
                label: "Memory",
            })
            .collect()
    }

    fn all_edges(&self) -> Vec<GraphEdge> {
        self.adjacency.values().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_path_finds_direct_edge() {
        let mut graph = InMemoryGraphLayer::new();
        graph.create_edge("a", "b", RelationshipType::Semantic, 0.9).unwrap();
        let path = graph.shortest_path("a", "b").unwrap();
        assert_eq!(path, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn reachable_from_respects_max_depth() {
        let mut graph = InMemoryGraphLayer::new();
        graph.create_edge("a", "b", RelationshipType::Temporal, 0.5).unwrap();
        graph.create_edge("b", "c", RelationshipType::Temporal, 0.5).unwrap();
        let reachable = graph.reachable_from("a", 1);
        assert!(reachable.contains_key("b"));
        assert!(!reachable.contains_key("c"));
    }

    #[test]
    fn autolink_creates_semantic_edge_above_threshold() {
        let mut graph = InMemoryGraphLayer::new();
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0];
        graph.autolink("x", "y", 0.0, Some((&a, &b)), false);
        assert_eq!(graph.edges_by_type(&RelationshipType::Semantic).len(), 1);
    }
}
