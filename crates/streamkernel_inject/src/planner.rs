//! Execution-pool planning.
//!
//! Classifies each node into a sync or async pool from the capabilities
//! of its declared dependencies. The label is advisory metadata for a
//! higher scheduling layer; planning itself is pure and idempotent, so
//! a scheduler can safely re-run it.

use crate::registry::InjectionRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use streamkernel_core::Node;

/// Execution pool a node is planned into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPool {
    /// All dependencies are synchronous
    Sync,
    /// At least one dependency is async-capable; async dominates
    Async,
}

impl std::fmt::Display for ExecutionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Async => write!(f, "async"),
        }
    }
}

/// Classify each node instance into an execution pool.
///
/// A node lands in the async pool as soon as any of its declared
/// dependencies resolves to a binding registered with `is_async`.
#[must_use]
pub fn plan_pools(
    nodes: &IndexMap<String, Arc<dyn Node>>,
    registry: &InjectionRegistry,
) -> IndexMap<String, ExecutionPool> {
    nodes
        .iter()
        .map(|(name, node)| {
            let has_async = node
                .dependencies()
                .iter()
                .any(|dep| registry.is_async_binding(dep.port, dep.data_type));
            let pool = if has_async {
                ExecutionPool::Async
            } else {
                ExecutionPool::Sync
            };
            tracing::debug!(node = name.as_str(), %pool, "planned execution pool");
            (name.clone(), pool)
        })
        .collect()
}
