//! Observability hooks around node invocation.

use std::any::Any;
use std::time::Instant;
use streamkernel_core::{Context, NodeError, NodeOutput, Payload};

/// Opaque per-invocation state token.
///
/// Whatever `before_node` returns is handed back to the matching
/// `after_node` or `on_node_error` call; the runner never inspects it.
pub type InvocationState = Box<dyn Any + Send>;

/// Hooks invoked by the runner around every node invocation
pub trait ObservabilityService {
    /// Called before a node is invoked
    fn before_node(
        &self,
        node: &str,
        payload: &Payload,
        ctx: &Context,
        trace_id: Option<&str>,
    ) -> InvocationState;

    /// Called after a successful invocation, with the produced outputs
    fn after_node(
        &self,
        node: &str,
        payload: &Payload,
        ctx: &Context,
        trace_id: Option<&str>,
        outputs: &[NodeOutput],
        state: InvocationState,
    );

    /// Called when an invocation fails, before the error propagates
    fn on_node_error(
        &self,
        node: &str,
        payload: &Payload,
        ctx: &Context,
        trace_id: Option<&str>,
        error: &NodeError,
        state: InvocationState,
    );

    /// Called once when the run loop drains without error
    fn on_run_end(&self);
}

/// Default no-op observability
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObservability;

impl ObservabilityService for NoopObservability {
    fn before_node(
        &self,
        _node: &str,
        _payload: &Payload,
        _ctx: &Context,
        _trace_id: Option<&str>,
    ) -> InvocationState {
        Box::new(())
    }

    fn after_node(
        &self,
        _node: &str,
        _payload: &Payload,
        _ctx: &Context,
        _trace_id: Option<&str>,
        _outputs: &[NodeOutput],
        _state: InvocationState,
    ) {
    }

    fn on_node_error(
        &self,
        _node: &str,
        _payload: &Payload,
        _ctx: &Context,
        _trace_id: Option<&str>,
        _error: &NodeError,
        _state: InvocationState,
    ) {
    }

    fn on_run_end(&self) {}
}

/// Observability adapter emitting `tracing` events.
///
/// The invocation state carries the start instant so `after_node` can
/// report elapsed wall time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservability;

impl ObservabilityService for TracingObservability {
    fn before_node(
        &self,
        node: &str,
        payload: &Payload,
        _ctx: &Context,
        trace_id: Option<&str>,
    ) -> InvocationState {
        tracing::debug!(node, message_type = %payload.message_type(), trace_id, "invoking node");
        Box::new(Instant::now())
    }

    fn after_node(
        &self,
        node: &str,
        _payload: &Payload,
        _ctx: &Context,
        trace_id: Option<&str>,
        outputs: &[NodeOutput],
        state: InvocationState,
    ) {
        let elapsed = state.downcast::<Instant>().map(|start| start.elapsed());
        tracing::debug!(node, trace_id, outputs = outputs.len(), ?elapsed, "node completed");
    }

    fn on_node_error(
        &self,
        node: &str,
        _payload: &Payload,
        _ctx: &Context,
        trace_id: Option<&str>,
        error: &NodeError,
        _state: InvocationState,
    ) {
        tracing::error!(node, trace_id, %error, "node failed");
    }

    fn on_run_end(&self) {
        tracing::debug!("run complete");
    }
}
