//! STREAMKERNEL Runtime
//!
//! The synchronous, envelope-driven run loop plus the collaborator
//! ports it consumes: work queue, context service, observability hooks,
//! and the scenario builder that wires a validated graph into a runner.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod observe;
pub mod queue;
pub mod runner;
pub mod scenario;

pub use context::{ContextService, InMemoryContextService, INTERNAL_KEY_PREFIX};
pub use observe::{InvocationState, NoopObservability, ObservabilityService, TracingObservability};
pub use queue::{InMemoryQueue, QueuePort};
pub use runner::{Runner, RunnerError, RunnerState, RunSummary};
pub use scenario::{Scenario, ScenarioBuilder, ScenarioError};
