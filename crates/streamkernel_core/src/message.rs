//! Runtime-typed message payloads.
//!
//! Routing decisions are made purely on a payload's [`MessageType`], so
//! every payload must be able to name its own type at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier for a message type.
///
/// Message types are the currency of graph construction and routing:
/// contracts declare which types a node consumes and emits, and the
/// router fans a payload out to the consumers of its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageType(String);

impl MessageType {
    /// Create a new message type identifier
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is empty (invalid)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MessageType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A payload that knows its own message type.
///
/// Implementations carry whatever body they like; the runtime only ever
/// inspects the type identifier.
pub trait Message: fmt::Debug + Send + Sync {
    /// The runtime type of this payload, used for routing
    fn message_type(&self) -> &MessageType;
}

/// Shared handle to an in-flight payload.
///
/// Payloads are reference-counted so that fan-out to several consumers
/// never copies the body.
pub type Payload = Arc<dyn Message>;

/// Generic message carrier pairing a type identifier with a JSON body.
///
/// Concrete node implementations are free to define their own
/// [`Message`] types; this carrier exists for boundary adapters and
/// tests that work with dynamic data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    /// The message type of this value
    pub message_type: MessageType,
    /// The JSON body
    pub body: serde_json::Value,
}

impl TypedValue {
    /// Create a new typed value
    #[must_use]
    pub fn new(message_type: impl Into<MessageType>, body: serde_json::Value) -> Self {
        Self {
            message_type: message_type.into(),
            body,
        }
    }

    /// Create a typed value with a null body
    #[must_use]
    pub fn marker(message_type: impl Into<MessageType>) -> Self {
        Self::new(message_type, serde_json::Value::Null)
    }

    /// Wrap into a shared payload handle
    #[must_use]
    pub fn into_payload(self) -> Payload {
        Arc::new(self)
    }
}

impl Message for TypedValue {
    fn message_type(&self) -> &MessageType {
        &self.message_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_new() {
        let mt = MessageType::new("funds.load_request");
        assert_eq!(mt.as_str(), "funds.load_request");
        assert!(!mt.is_empty());
    }

    #[test]
    fn test_message_type_display() {
        let mt = MessageType::from("decision");
        assert_eq!(format!("{}", mt), "decision");
    }

    #[test]
    fn test_message_type_ordering() {
        let a = MessageType::from("a");
        let b = MessageType::from("b");
        assert!(a < b);
    }

    #[test]
    fn test_typed_value_payload() {
        let payload = TypedValue::new("load", json!({"amount": "100.00"})).into_payload();
        assert_eq!(payload.message_type().as_str(), "load");
    }

    #[test]
    fn test_typed_value_marker() {
        let value = TypedValue::marker("tick");
        assert_eq!(value.body, serde_json::Value::Null);
    }

    #[test]
    fn test_payload_is_shared() {
        let payload = TypedValue::marker("tick").into_payload();
        let clone = Arc::clone(&payload);
        assert_eq!(payload.message_type(), clone.message_type());
    }
}
