//! Scenario assembly.
//!
//! A scenario is the preflighted composition of one run: contracts are
//! validated into a DAG, an execution plan is derived, every node
//! instance is matched to its contract, declared dependencies are
//! resolved once up front, and the result is a wired [`Runner`]. All
//! composition errors surface here, before the first message moves.

use crate::context::{ContextService, InMemoryContextService};
use crate::observe::{NoopObservability, ObservabilityService};
use crate::queue::{InMemoryQueue, QueuePort};
use crate::runner::{Runner, RunnerError, RunSummary};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use streamkernel_core::{Envelope, Node, NodeContract, Payload, RunId, ScenarioId};
use streamkernel_graph::{build_dag, build_execution_plan, Dag, DagError};
use streamkernel_inject::{plan_pools, ExecutionPool, InjectError, InjectionRegistry, ScenarioScope};
use streamkernel_routing::{InMemoryConsumerRegistry, RoutingPolicy, RoutingService};
use thiserror::Error;

/// Error from scenario assembly
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A node instance was registered with no matching contract
    #[error("node instance {name} has no contract")]
    UnknownStep {
        /// The unmatched instance name
        name: String,
    },

    /// A non-boundary contract has no node instance to invoke
    #[error("contract {name} has no node instance")]
    MissingInstance {
        /// The unmatched contract name
        name: String,
    },

    /// Graph construction or planning failed
    #[error(transparent)]
    Dag(#[from] DagError),

    /// A declared dependency could not be resolved
    #[error(transparent)]
    Inject(#[from] InjectError),
}

/// Builder wiring contracts, instances, and collaborators into a
/// [`Scenario`].
pub struct ScenarioBuilder {
    contracts: Vec<NodeContract>,
    boundary_contracts: Vec<NodeContract>,
    nodes: IndexMap<String, Arc<dyn Node>>,
    full_context_nodes: IndexSet<String>,
    injections: Arc<InjectionRegistry>,
    policy: RoutingPolicy,
    scenario_id: ScenarioId,
    queue: Option<Box<dyn QueuePort>>,
    context: Option<Box<dyn ContextService>>,
    observer: Option<Box<dyn ObservabilityService>>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    /// Create an empty builder with strict routing and a fresh scenario id
    #[must_use]
    pub fn new() -> Self {
        Self {
            contracts: Vec::new(),
            boundary_contracts: Vec::new(),
            nodes: IndexMap::new(),
            full_context_nodes: IndexSet::new(),
            injections: Arc::new(InjectionRegistry::new()),
            policy: RoutingPolicy::default(),
            scenario_id: ScenarioId::new(),
            queue: None,
            context: None,
            observer: None,
        }
    }

    /// Register a contract together with the instance that fulfils it
    #[must_use]
    pub fn with_node(mut self, contract: NodeContract, instance: Arc<dyn Node>) -> Self {
        self.nodes.insert(contract.name.clone(), instance);
        self.contracts.push(contract);
        self
    }

    /// Register a boundary contract with no local instance.
    ///
    /// Boundary contracts describe external collaborators; their emitted
    /// types count as provided when the graph is validated.
    #[must_use]
    pub fn with_boundary(mut self, contract: NodeContract) -> Self {
        self.boundary_contracts.push(contract.with_external(true));
        self
    }

    /// Grant a node full context, including internal bookkeeping keys
    #[must_use]
    pub fn with_full_context(mut self, name: impl Into<String>) -> Self {
        self.full_context_nodes.insert(name.into());
        self
    }

    /// Use the given injection registry for dependency resolution
    #[must_use]
    pub fn with_injections(mut self, injections: Arc<InjectionRegistry>) -> Self {
        self.injections = injections;
        self
    }

    /// Set the routing policy
    #[must_use]
    pub fn with_policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the generated scenario id
    #[must_use]
    pub fn with_scenario_id(mut self, scenario_id: ScenarioId) -> Self {
        self.scenario_id = scenario_id;
        self
    }

    /// Override the work queue
    #[must_use]
    pub fn with_queue(mut self, queue: Box<dyn QueuePort>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Override the context service
    #[must_use]
    pub fn with_context_service(mut self, context: Box<dyn ContextService>) -> Self {
        self.context = Some(context);
        self
    }

    /// Override the observability hooks
    #[must_use]
    pub fn with_observability(mut self, observer: Box<dyn ObservabilityService>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate and assemble the scenario.
    ///
    /// Builds the DAG and execution plan, checks the contract/instance
    /// pairing in both directions, eagerly resolves every declared
    /// dependency into the scenario scope, and wires the runner.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] on any graph, pairing, or injection
    /// failure.
    pub fn build(self) -> Result<Scenario, ScenarioError> {
        let dag = build_dag(&self.contracts, &self.boundary_contracts)?;
        let execution_plan = build_execution_plan(&dag)?;

        for contract in &self.contracts {
            if !self.nodes.contains_key(&contract.name) {
                return Err(ScenarioError::MissingInstance {
                    name: contract.name.clone(),
                });
            }
        }
        for (name, instance) in &self.nodes {
            let matched = self.contracts.iter().any(|c| &c.name == name);
            if !matched || instance.name() != name {
                return Err(ScenarioError::UnknownStep { name: name.clone() });
            }
        }

        // Resolve every declared dependency now; the scope memoizes, so
        // nothing is constructed twice when nodes resolve at run time.
        let scope = self.injections.instantiate_for_scenario(self.scenario_id);
        for instance in self.nodes.values() {
            for spec in instance.dependencies() {
                scope.resolve_spec(&spec)?;
            }
        }

        let pools = plan_pools(&self.nodes, &self.injections);
        let registry = InMemoryConsumerRegistry::from_contracts(&self.contracts);

        tracing::info!(
            scenario = %self.scenario_id,
            nodes = self.nodes.len(),
            edges = dag.edge_count(),
            "scenario assembled"
        );

        let runner = Runner::new(
            self.nodes,
            RoutingService::new(registry, self.policy),
            self.queue.unwrap_or_else(|| Box::new(InMemoryQueue::new())),
            self.context
                .unwrap_or_else(|| Box::new(InMemoryContextService::new())),
            self.observer.unwrap_or_else(|| Box::new(NoopObservability)),
        )
        .with_full_context_nodes(self.full_context_nodes);

        Ok(Scenario {
            scenario_id: self.scenario_id,
            dag,
            execution_plan,
            pools,
            scope,
            runner,
        })
    }
}

/// A fully assembled, runnable scenario
pub struct Scenario {
    scenario_id: ScenarioId,
    dag: Dag,
    execution_plan: Vec<String>,
    pools: IndexMap<String, ExecutionPool>,
    scope: ScenarioScope,
    runner: Runner<InMemoryConsumerRegistry>,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("scenario_id", &self.scenario_id)
            .field("execution_plan", &self.execution_plan)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// The scenario id
    #[must_use]
    pub fn scenario_id(&self) -> ScenarioId {
        self.scenario_id
    }

    /// The validated graph
    #[must_use]
    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// Deterministic topological node order
    #[must_use]
    pub fn execution_plan(&self) -> &[String] {
        &self.execution_plan
    }

    /// Planned execution pool per node
    #[must_use]
    pub fn pools(&self) -> &IndexMap<String, ExecutionPool> {
        &self.pools
    }

    /// The dependency scope backing this scenario
    #[must_use]
    pub fn scope(&self) -> &ScenarioScope {
        &self.scope
    }

    /// Direct access to the runner
    pub fn runner_mut(&mut self) -> &mut Runner<InMemoryConsumerRegistry> {
        &mut self.runner
    }

    /// Seed trace context and enqueue a payload as an untargeted envelope
    pub fn submit(&mut self, trace_id: &str, payload: Payload, run_id: RunId) {
        self.runner
            .context_mut()
            .seed(trace_id, &payload, run_id, self.scenario_id);
        self.runner
            .enqueue(Envelope::new(payload).with_trace_id(trace_id));
    }

    /// Enqueue an envelope as-is
    pub fn enqueue(&mut self, envelope: Envelope) {
        self.runner.enqueue(envelope);
    }

    /// Drain the queue to completion
    ///
    /// # Errors
    ///
    /// Propagates [`RunnerError`] from the run loop.
    pub fn run(&mut self) -> Result<RunSummary, RunnerError> {
        self.runner.run()
    }
}
