//! STREAMKERNEL Core Types
//!
//! This crate contains pure types and logic with no I/O: message type
//! identifiers, runtime-typed payloads, envelopes, node contracts, the
//! node trait, and the injection port taxonomy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod envelope;
pub mod id;
pub mod message;
pub mod node;
pub mod port;

// Re-exports
pub use contract::{ContractError, ContractSet, NodeContract};
pub use envelope::{Envelope, EnvelopeError, Target};
pub use id::{RunId, ScenarioId};
pub use message::{Message, MessageType, Payload, TypedValue};
pub use node::{Context, Node, NodeError, NodeOutput};
pub use port::{DependencySpec, PortType};
