//! Trace context service.
//!
//! Correlates per-message metadata by trace id. Internal bookkeeping
//! keys are prefixed with `__` and stripped unless a node is registered
//! as a full-context consumer.

use indexmap::IndexMap;
use serde_json::json;
use streamkernel_core::{Context, Payload, RunId, ScenarioId};

/// Prefix marking internal bookkeeping keys in trace context
pub const INTERNAL_KEY_PREFIX: &str = "__";

/// Per-trace metadata store
pub trait ContextService {
    /// Record the initial context for a trace
    fn seed(&mut self, trace_id: &str, payload: &Payload, run_id: RunId, scenario_id: ScenarioId);

    /// Metadata for a trace; internal keys stripped unless `full`.
    ///
    /// A missing trace yields an empty map, never an error.
    fn metadata(&self, trace_id: &str, full: bool) -> Context;

    /// Attach an additional metadata entry to a trace
    fn annotate(&mut self, trace_id: &str, key: &str, value: serde_json::Value);
}

/// In-memory context service
#[derive(Debug, Clone, Default)]
pub struct InMemoryContextService {
    traces: IndexMap<String, Context>,
}

impl InMemoryContextService {
    /// Create an empty service
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextService for InMemoryContextService {
    fn seed(&mut self, trace_id: &str, payload: &Payload, run_id: RunId, scenario_id: ScenarioId) {
        let mut ctx = Context::new();
        ctx.insert("message_type".to_string(), json!(payload.message_type().as_str()));
        ctx.insert("__run_id".to_string(), json!(run_id.to_string()));
        ctx.insert("__scenario_id".to_string(), json!(scenario_id.to_string()));
        self.traces.insert(trace_id.to_string(), ctx);
    }

    fn metadata(&self, trace_id: &str, full: bool) -> Context {
        let Some(ctx) = self.traces.get(trace_id) else {
            return Context::new();
        };
        if full {
            return ctx.clone();
        }
        ctx.iter()
            .filter(|(key, _)| !key.starts_with(INTERNAL_KEY_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn annotate(&mut self, trace_id: &str, key: &str, value: serde_json::Value) {
        self.traces
            .entry(trace_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamkernel_core::TypedValue;

    fn seeded() -> InMemoryContextService {
        let mut service = InMemoryContextService::new();
        let payload = TypedValue::marker("load").into_payload();
        service.seed("t-1", &payload, RunId::new(), ScenarioId::new());
        service
    }

    #[test]
    fn test_metadata_full_includes_internal_keys() {
        let service = seeded();
        let ctx = service.metadata("t-1", true);
        assert!(ctx.contains_key("__run_id"));
        assert!(ctx.contains_key("__scenario_id"));
        assert_eq!(ctx["message_type"], "load");
    }

    #[test]
    fn test_metadata_strips_internal_keys() {
        let service = seeded();
        let ctx = service.metadata("t-1", false);
        assert!(!ctx.keys().any(|k| k.starts_with(INTERNAL_KEY_PREFIX)));
        assert_eq!(ctx["message_type"], "load");
    }

    #[test]
    fn test_metadata_missing_trace_is_empty() {
        let service = seeded();
        assert!(service.metadata("missing", true).is_empty());
        assert!(service.metadata("missing", false).is_empty());
    }

    #[test]
    fn test_annotate() {
        let mut service = seeded();
        service.annotate("t-1", "customer", serde_json::json!("c-42"));
        let ctx = service.metadata("t-1", false);
        assert_eq!(ctx["customer"], "c-42");
    }
}
