//! Injection port taxonomy.
//!
//! Ports classify the dependencies a node can request from the
//! injection registry. The port kind plus the Rust type plus an
//! optional qualifier form the binding key.

use serde::{Deserialize, Serialize};
use std::any::TypeId;

/// Kind of injected port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    /// Continuous message stream
    Stream,
    /// Key-value store
    Kv,
    /// Change stream over a key-value store
    KvStream,
    /// Request side of a request/response pair
    Request,
    /// Response side of a request/response pair
    Response,
    /// Opaque service handle
    Service,
    /// Work queue
    Queue,
    /// Named topic
    Topic,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stream => "stream",
            Self::Kv => "kv",
            Self::KvStream => "kv_stream",
            Self::Request => "request",
            Self::Response => "response",
            Self::Service => "service",
            Self::Queue => "queue",
            Self::Topic => "topic",
        };
        write!(f, "{}", s)
    }
}

/// Explicit declaration of one injected dependency.
///
/// Nodes declare their dependencies through [`crate::Node::dependencies`]
/// rather than being introspected at runtime; the declaration captures
/// the Rust type statically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencySpec {
    /// Port kind
    pub port: PortType,
    /// Type identity of the dependency
    pub data_type: TypeId,
    /// Human-readable type name, for diagnostics
    pub type_name: &'static str,
    /// Optional qualifier distinguishing same-typed bindings
    pub qualifier: Option<String>,
}

impl DependencySpec {
    /// Declare a dependency on a `T` behind the given port
    #[must_use]
    pub fn new<T: 'static>(port: PortType) -> Self {
        Self {
            port,
            data_type: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: None,
        }
    }

    /// Set the qualifier
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}
