//! The validated directed acyclic graph of nodes.

use serde::{Deserialize, Serialize};

/// A producer-to-consumer edge inferred from type matching
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Node whose emitted type feeds the consumer
    pub producer: String,
    /// Node consuming the type
    pub consumer: String,
}

impl Edge {
    /// Create a new edge
    #[must_use]
    pub fn new(producer: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            consumer: consumer.into(),
        }
    }
}

/// A validated directed acyclic graph of nodes.
///
/// Nodes appear in contract discovery order; edges are grouped by
/// producer discovery order, sub-ordered by consumer discovery order,
/// and carry no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dag {
    /// Node names in discovery order
    pub nodes: Vec<String>,
    /// Deduplicated edges in deterministic order
    pub edges: Vec<Edge>,
}

impl Dag {
    /// Create an empty DAG
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if the DAG has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether a node is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n == name)
    }

    /// Direct successors of a node, in edge order
    #[must_use]
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.producer == name)
            .map(|e| e.consumer.as_str())
            .collect()
    }

    /// Direct predecessors of a node, in edge order
    #[must_use]
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.consumer == name)
            .map(|e| e.producer.as_str())
            .collect()
    }
}
