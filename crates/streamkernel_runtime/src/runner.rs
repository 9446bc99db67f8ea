//! The synchronous envelope-driven run loop.
//!
//! Envelopes are processed strictly one at a time, in dequeue order.
//! Node invocation, context resolution, and routing are all synchronous
//! calls; the first unhandled node error aborts the run. Retry and
//! backoff policy, if any, belongs to a collaborator wrapping this
//! loop.

use crate::context::ContextService;
use crate::observe::ObservabilityService;
use crate::queue::QueuePort;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use streamkernel_core::{Context, Envelope, Node, NodeError, NodeOutput, Target};
use streamkernel_routing::{ConsumerRegistry, RouteError, RoutingService};
use thiserror::Error;

/// Observable run-loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Queue empty, nothing in flight
    Idle,
    /// An envelope has been dequeued
    Dispatching,
    /// A node is running
    Invoking,
    /// Outputs are being delivered
    Routing,
    /// An unrecoverable error propagated to the caller
    Aborted,
}

/// Error propagated out of [`Runner::run`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// A node's own logic failed; never retried by this layer
    #[error("node {node} failed: {source}")]
    NodeFailed {
        /// The failing node
        node: String,
        /// The underlying error
        source: NodeError,
    },

    /// An envelope was addressed to a node this runner does not host
    #[error("envelope addressed to unknown node: {name}")]
    UnknownNode {
        /// The unknown name
        name: String,
    },

    /// Routing failed under strict policy
    #[error(transparent)]
    Routing(#[from] RouteError),
}

/// Counters for one completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Envelopes dequeued and processed
    pub envelopes_processed: u64,
    /// Deliveries pushed back onto the queue
    pub messages_emitted: u64,
}

/// Single-threaded envelope runner.
///
/// Drains the work queue, resolves per-message context, invokes nodes,
/// notifies observability hooks, and re-routes produced outputs with
/// the producing node as `source`.
pub struct Runner<R: ConsumerRegistry> {
    nodes: IndexMap<String, Arc<dyn Node>>,
    full_context_nodes: IndexSet<String>,
    routing: RoutingService<R>,
    queue: Box<dyn QueuePort>,
    context: Box<dyn ContextService>,
    observer: Box<dyn ObservabilityService>,
    state: RunnerState,
}

impl<R: ConsumerRegistry> Runner<R> {
    /// Create a runner over resolved node instances
    #[must_use]
    pub fn new(
        nodes: IndexMap<String, Arc<dyn Node>>,
        routing: RoutingService<R>,
        queue: Box<dyn QueuePort>,
        context: Box<dyn ContextService>,
        observer: Box<dyn ObservabilityService>,
    ) -> Self {
        Self {
            nodes,
            full_context_nodes: IndexSet::new(),
            routing,
            queue,
            context,
            observer,
            state: RunnerState::Idle,
        }
    }

    /// Mark nodes that receive full context including internal keys
    #[must_use]
    pub fn with_full_context_nodes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.full_context_nodes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Current run-loop state
    #[must_use]
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Number of pending envelopes
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.size()
    }

    /// Enqueue an envelope for the next run
    pub fn enqueue(&mut self, envelope: Envelope) {
        self.queue.push(envelope);
    }

    /// The context service, for boundary seeding
    pub fn context_mut(&mut self) -> &mut dyn ContextService {
        self.context.as_mut()
    }

    /// The routing service backing this runner
    pub fn routing_mut(&mut self) -> &mut RoutingService<R> {
        &mut self.routing
    }

    /// Drain the queue to completion.
    ///
    /// Returns normally only once the queue is exhausted without error;
    /// the first node or routing error aborts the run and propagates.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] on node failure, strict-mode routing
    /// failure, or an envelope addressed to an unknown node.
    pub fn run(&mut self) -> Result<RunSummary, RunnerError> {
        let mut summary = RunSummary::default();

        loop {
            self.state = RunnerState::Dispatching;
            let Some(envelope) = self.queue.pop() else {
                break;
            };

            summary.envelopes_processed += 1;
            if let Err(err) = self.process(envelope, &mut summary) {
                self.state = RunnerState::Aborted;
                return Err(err);
            }
            self.state = RunnerState::Idle;
        }

        self.state = RunnerState::Idle;
        self.observer.on_run_end();
        Ok(summary)
    }

    fn process(&mut self, envelope: Envelope, summary: &mut RunSummary) -> Result<(), RunnerError> {
        let Some(target) = envelope.target.clone() else {
            // Untargeted envelope: expand into addressed deliveries via
            // default type-based fan-out.
            self.state = RunnerState::Routing;
            let routed = self
                .routing
                .route([NodeOutput::Wrapped(envelope.clone())], None)?;
            self.push_deliveries(routed.local_deliveries, envelope.trace_id.as_deref(), summary);
            return Ok(());
        };

        for name in target.names() {
            self.invoke_one(name, &envelope, summary)?;
        }
        Ok(())
    }

    fn invoke_one(
        &mut self,
        name: &str,
        envelope: &Envelope,
        summary: &mut RunSummary,
    ) -> Result<(), RunnerError> {
        let Some(node) = self.nodes.get(name).map(Arc::clone) else {
            return Err(RunnerError::UnknownNode {
                name: name.to_string(),
            });
        };

        let trace_id = envelope.trace_id.as_deref();
        let full = self.full_context_nodes.contains(name);
        let ctx: Context = match trace_id {
            Some(trace) => self.context.metadata(trace, full),
            None => Context::new(),
        };

        let state = self
            .observer
            .before_node(name, &envelope.payload, &ctx, trace_id);

        self.state = RunnerState::Invoking;
        tracing::trace!(node = name, "invoking");
        match node.invoke(envelope.payload.clone(), &ctx) {
            Ok(outputs) => {
                self.observer
                    .after_node(name, &envelope.payload, &ctx, trace_id, &outputs, state);

                self.state = RunnerState::Routing;
                let routed = self.routing.route(outputs, Some(name))?;
                self.push_deliveries(routed.local_deliveries, trace_id, summary);
                Ok(())
            }
            Err(err) => {
                self.observer
                    .on_node_error(name, &envelope.payload, &ctx, trace_id, &err, state);
                Err(RunnerError::NodeFailed {
                    node: name.to_string(),
                    source: err,
                })
            }
        }
    }

    fn push_deliveries(
        &mut self,
        deliveries: Vec<(String, streamkernel_core::Payload)>,
        trace_id: Option<&str>,
        summary: &mut RunSummary,
    ) {
        for (target, payload) in deliveries {
            summary.messages_emitted += 1;
            let mut next = Envelope::new(payload).with_target(Target::One(target));
            if let Some(trace) = trace_id {
                next = next.with_trace_id(trace);
            }
            self.queue.push(next);
        }
    }
}
