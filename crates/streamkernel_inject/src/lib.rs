//! STREAMKERNEL Injection
//!
//! Typed, qualified dependency resolution: factories are registered once
//! at composition time, instances are constructed at most once per
//! scenario scope, and the sync/async classification of bindings drives
//! execution-pool planning.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binding;
pub mod planner;
pub mod registry;
pub mod scope;

pub use binding::{Binding, BindingKey};
pub use planner::{plan_pools, ExecutionPool};
pub use registry::{InjectError, InjectionRegistry};
pub use scope::ScenarioScope;
