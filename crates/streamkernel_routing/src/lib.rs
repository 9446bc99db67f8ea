//! STREAMKERNEL Routing
//!
//! The dynamic counterpart of the static DAG: a versioned consumer
//! registry, a router that fans payloads out by runtime type, and a
//! cache-optimizing routing service that rebuilds only when the
//! registry changes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod registry;
pub mod router;
pub mod service;

pub use registry::{ConsumerRegistry, InMemoryConsumerRegistry};
pub use router::{
    DropReason, RouteDecision, RouteError, Router, RoutingPolicy, RoutingResult,
};
pub use service::RoutingService;
