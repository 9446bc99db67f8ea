//! Deterministic topological execution planning.

use crate::builder::DagError;
use crate::dag::Dag;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Compute a topological ordering of the DAG's nodes.
///
/// Kahn's algorithm with a deterministic tie-break: whenever several
/// nodes are ready, the one declared earliest wins. The same DAG always
/// yields the same plan.
///
/// # Errors
///
/// Returns [`DagError::Cycle`] if the plan cannot cover every node.
pub fn build_execution_plan(dag: &Dag) -> Result<Vec<String>, DagError> {
    let declaration: IndexMap<&str, usize> = dag
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let mut in_degree: IndexMap<&str, usize> =
        dag.nodes.iter().map(|n| (n.as_str(), 0)).collect();
    for edge in &dag.edges {
        if let Some(d) = in_degree.get_mut(edge.consumer.as_str()) {
            *d += 1;
        }
    }

    // Ready set keyed by declaration index so pops are ordered.
    let mut ready: BTreeMap<usize, &str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .filter_map(|(n, _)| declaration.get(n).map(|i| (*i, *n)))
        .collect();

    let mut plan = Vec::with_capacity(dag.node_count());
    while let Some((_, node)) = ready.pop_first() {
        plan.push(node.to_string());
        for edge in &dag.edges {
            if edge.producer == node {
                if let Some(d) = in_degree.get_mut(edge.consumer.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        if let Some(i) = declaration.get(edge.consumer.as_str()) {
                            ready.insert(*i, edge.consumer.as_str());
                        }
                    }
                }
            }
        }
    }

    if plan.len() < dag.node_count() {
        let remaining: Vec<String> = dag
            .nodes
            .iter()
            .filter(|n| !plan.contains(n))
            .cloned()
            .collect();
        return Err(DagError::Cycle { nodes: remaining });
    }

    Ok(plan)
}
