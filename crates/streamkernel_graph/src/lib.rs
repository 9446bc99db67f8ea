//! STREAMKERNEL Graph
//!
//! Static validation of node graphs: builds a DAG from node contracts by
//! matching emitted message types to consumers, and derives a
//! deterministic topological execution plan from it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod dag;
pub mod plan;

pub use builder::{build_dag, DagError};
pub use dag::{Dag, Edge};
pub use plan::build_execution_plan;
