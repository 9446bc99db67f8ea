//! DAG builder: from node contracts to a validated graph.
//!
//! The builder matches every consumed message type against the set of
//! emitted types, creating a producer-to-consumer edge per match. The
//! full graph is then checked for cycles. Any structural problem fails
//! here, at composition time, before the first message is processed.

use crate::dag::{Dag, Edge};
use indexmap::{IndexMap, IndexSet};
use streamkernel_core::{ContractError, MessageType, NodeContract};
use thiserror::Error;

/// Structural error from DAG construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DagError {
    /// Two contracts share a name
    #[error("duplicate node name: {name}")]
    DuplicateNodeName {
        /// The conflicting name
        name: String,
    },

    /// A consumed type has no emitting node and no external boundary contract
    #[error("no provider for type {message_type} consumed by {consumer}")]
    MissingProvider {
        /// The consuming node
        consumer: String,
        /// The unsatisfied type
        message_type: MessageType,
    },

    /// The graph contains a cycle
    #[error("cycle detected involving nodes: {nodes:?}")]
    Cycle {
        /// Nodes participating in the cycle, in discovery order
        nodes: Vec<String>,
    },

    /// A non-external node declares neither inputs nor outputs
    #[error("node {name} consumes nothing and emits nothing; mark it external")]
    NonSourceWithoutInputs {
        /// The offending node
        name: String,
    },

    /// A contract failed its own validation
    #[error("invalid contract: {0}")]
    Contract(#[from] ContractError),
}

/// Build a validated DAG from node contracts.
///
/// `extra_contracts` declare boundary sources and sinks that satisfy
/// missing-provider checks without becoming in-graph nodes; only those
/// marked external are considered.
///
/// Edges are deterministic: grouped by producer in contract discovery
/// order, sub-ordered by consumer in discovery order, de-duplicated
/// when a consumer takes several types from the same producer.
///
/// # Errors
///
/// Returns [`DagError`] on duplicate names, invalid contracts, missing
/// providers, self-loops, or cycles.
pub fn build_dag(
    contracts: &[NodeContract],
    extra_contracts: &[NodeContract],
) -> Result<Dag, DagError> {
    if contracts.is_empty() {
        return Ok(Dag::new());
    }

    let mut seen = IndexSet::new();
    for contract in contracts.iter().chain(extra_contracts.iter()) {
        contract.validate()?;
        if !seen.insert(contract.name.as_str()) {
            return Err(DagError::DuplicateNodeName {
                name: contract.name.clone(),
            });
        }
    }

    for contract in contracts {
        if !contract.external && contract.consumes.is_empty() && contract.emits.is_empty() {
            return Err(DagError::NonSourceWithoutInputs {
                name: contract.name.clone(),
            });
        }

        // A node consuming a type it itself emits is a self-loop; callers
        // must use an explicit routing target to loop deliberately.
        if contract.consumes.iter().any(|t| contract.emits.contains(t)) {
            return Err(DagError::Cycle {
                nodes: vec![contract.name.clone()],
            });
        }
    }

    // Provider index: emitted type -> producers, fan-in allowed.
    let mut providers: IndexMap<&MessageType, Vec<&str>> = IndexMap::new();
    for contract in contracts {
        for emitted in &contract.emits {
            providers.entry(emitted).or_default().push(&contract.name);
        }
    }

    let boundary_types: IndexSet<&MessageType> = extra_contracts
        .iter()
        .filter(|c| c.external)
        .flat_map(|c| c.emits.iter())
        .collect();

    for contract in contracts {
        for consumed in &contract.consumes {
            if !providers.contains_key(consumed) && !boundary_types.contains(consumed) {
                return Err(DagError::MissingProvider {
                    consumer: contract.name.clone(),
                    message_type: consumed.clone(),
                });
            }
        }
    }

    // Edges grouped by producer discovery order, sub-ordered by consumer
    // discovery order; the IndexSet de-duplicates multi-type pairs.
    let mut edges: IndexSet<Edge> = IndexSet::new();
    for producer in contracts {
        for consumer in contracts {
            if producer.name == consumer.name {
                continue;
            }
            if consumer.consumes.iter().any(|t| producer.emits.contains(t)) {
                edges.insert(Edge::new(&producer.name, &consumer.name));
            }
        }
    }

    let dag = Dag {
        nodes: contracts.iter().map(|c| c.name.clone()).collect(),
        edges: edges.into_iter().collect(),
    };

    check_acyclic(&dag)?;
    Ok(dag)
}

/// Cycle check by topological peeling; nodes the peel never reaches are
/// part of a cycle.
fn check_acyclic(dag: &Dag) -> Result<(), DagError> {
    let mut in_degree: IndexMap<&str, usize> =
        dag.nodes.iter().map(|n| (n.as_str(), 0)).collect();
    for edge in &dag.edges {
        if let Some(d) = in_degree.get_mut(edge.consumer.as_str()) {
            *d += 1;
        }
    }

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();
    let mut peeled = 0usize;

    while let Some(node) = ready.pop() {
        peeled += 1;
        for edge in &dag.edges {
            if edge.producer == node {
                if let Some(d) = in_degree.get_mut(edge.consumer.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(edge.consumer.as_str());
                    }
                }
            }
        }
    }

    if peeled < dag.node_count() {
        let remaining: Vec<String> = in_degree
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(n, _)| (*n).to_string())
            .collect();
        return Err(DagError::Cycle { nodes: remaining });
    }

    Ok(())
}
