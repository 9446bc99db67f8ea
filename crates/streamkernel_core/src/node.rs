//! The node trait and its invocation surface.

use crate::envelope::Envelope;
use crate::message::Payload;
use crate::port::DependencySpec;
use indexmap::IndexMap;

/// Per-message context metadata handed to a node at invocation
pub type Context = IndexMap<String, serde_json::Value>;

/// Error raised by a node's own logic.
///
/// The runner never retries or swallows these; they propagate out of
/// `run()` after the observability hook has been notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeError {
    message: String,
}

impl NodeError {
    /// Create a new node error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for NodeError {}

/// One output produced by a node invocation.
///
/// Bare payloads take the default type-based fan-out; wrapped envelopes
/// may carry an explicit target or topic.
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// A bare payload, routed by its runtime type
    Message(Payload),
    /// A pre-wrapped envelope with explicit routing metadata
    Wrapped(Envelope),
}

impl NodeOutput {
    /// Normalize into an envelope
    #[must_use]
    pub fn into_envelope(self) -> Envelope {
        match self {
            Self::Message(payload) => Envelope::new(payload),
            Self::Wrapped(envelope) => envelope,
        }
    }
}

impl From<Payload> for NodeOutput {
    fn from(payload: Payload) -> Self {
        Self::Message(payload)
    }
}

impl From<Envelope> for NodeOutput {
    fn from(envelope: Envelope) -> Self {
        Self::Wrapped(envelope)
    }
}

/// A unit of processing with declared dependencies.
///
/// The contract (consumed/emitted types) lives separately in
/// [`crate::NodeContract`]; the trait carries only behavior.
pub trait Node: Send + Sync {
    /// The node's unique name, matching its contract
    fn name(&self) -> &str;

    /// Injected dependencies this node requires.
    ///
    /// The default is no dependencies. The execution planner uses these
    /// declarations to classify the node into a sync or async pool.
    fn dependencies(&self) -> Vec<DependencySpec> {
        Vec::new()
    }

    /// Process one payload and produce zero or more outputs
    ///
    /// # Errors
    ///
    /// Any error aborts the run; this layer performs no retries.
    fn invoke(&self, payload: Payload, ctx: &Context) -> Result<Vec<NodeOutput>, NodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TypedValue;

    struct Echo;

    impl Node for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn invoke(&self, payload: Payload, _ctx: &Context) -> Result<Vec<NodeOutput>, NodeError> {
            Ok(vec![NodeOutput::Message(payload)])
        }
    }

    #[test]
    fn test_node_invoke() {
        let node = Echo;
        let payload = TypedValue::marker("x").into_payload();
        let outputs = node.invoke(payload, &Context::new()).unwrap();
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn test_node_default_dependencies() {
        assert!(Echo.dependencies().is_empty());
    }

    #[test]
    fn test_node_output_into_envelope() {
        let payload = TypedValue::marker("x").into_payload();
        let env = NodeOutput::Message(payload).into_envelope();
        assert!(env.target.is_none());

        let wrapped = Envelope::new(TypedValue::marker("y").into_payload()).with_target("sink");
        let env = NodeOutput::Wrapped(wrapped).into_envelope();
        assert!(env.target.is_some());
    }

    #[test]
    fn test_node_error_display() {
        let err = NodeError::new("parse failed");
        assert_eq!(format!("{}", err), "parse failed");
        assert_eq!(err.message(), "parse failed");
    }
}
