//! Envelopes - the routed unit of work.
//!
//! An envelope wraps a payload with optional trace correlation, explicit
//! routing targets, and a topic. All optional string fields must be
//! non-empty when present so an envelope can never express "route
//! nowhere" ambiguously.

use crate::message::Payload;

/// Error from envelope validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Trace id is present but empty
    EmptyTraceId,
    /// Topic is present but empty
    EmptyTopic,
    /// Target list is present but empty
    EmptyTargetList,
    /// A target name is empty
    EmptyTargetName,
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTraceId => write!(f, "trace id must not be empty"),
            Self::EmptyTopic => write!(f, "topic must not be empty"),
            Self::EmptyTargetList => write!(f, "target list must not be empty"),
            Self::EmptyTargetName => write!(f, "target name must not be empty"),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// Explicit routing target: one node or several
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Deliver to a single named node
    One(String),
    /// Deliver to each named node, in order
    Many(Vec<String>),
}

impl Target {
    /// Resolved target names, in declaration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Validate that no target name is empty
    ///
    /// # Errors
    ///
    /// Returns error on an empty list or an empty name.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        match self {
            Self::One(name) => {
                if name.is_empty() {
                    return Err(EnvelopeError::EmptyTargetName);
                }
            }
            Self::Many(names) => {
                if names.is_empty() {
                    return Err(EnvelopeError::EmptyTargetList);
                }
                if names.iter().any(String::is_empty) {
                    return Err(EnvelopeError::EmptyTargetName);
                }
            }
        }
        Ok(())
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::One(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

/// The routed unit of work: a payload plus routing metadata
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The payload being routed
    pub payload: Payload,
    /// Optional trace correlation id
    pub trace_id: Option<String>,
    /// Optional explicit target(s), bypassing type-based fan-out
    pub target: Option<Target>,
    /// Optional topic for boundary collaborators
    pub topic: Option<String>,
}

impl Envelope {
    /// Create an envelope with just a payload
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            trace_id: None,
            target: None,
            topic: None,
        }
    }

    /// Set the trace id
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Set an explicit routing target
    #[must_use]
    pub fn with_target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the topic
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Validate the envelope invariants
    ///
    /// # Errors
    ///
    /// Returns error if any present optional field is empty.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.trace_id.as_deref() == Some("") {
            return Err(EnvelopeError::EmptyTraceId);
        }
        if self.topic.as_deref() == Some("") {
            return Err(EnvelopeError::EmptyTopic);
        }
        if let Some(target) = &self.target {
            target.validate()?;
        }
        Ok(())
    }
}

impl From<Payload> for Envelope {
    fn from(payload: Payload) -> Self {
        Self::new(payload)
    }
}
