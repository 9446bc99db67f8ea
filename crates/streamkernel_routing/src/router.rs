//! Router - computes concrete deliveries from produced outputs.
//!
//! Explicitly targeted envelopes bypass type-based fan-out; everything
//! else is delivered to the registered consumers of the payload's
//! runtime type, with the producing node filtered out to prevent
//! accidental self-delivery. Whether an unsatisfiable delivery raises
//! or is dropped is a policy switch, fixed per router instance.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use streamkernel_core::{Envelope, EnvelopeError, MessageType, NodeOutput, Payload};
use thiserror::Error;

/// Policy controlling unsatisfiable deliveries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// Raise an error on any unsatisfiable delivery
    #[default]
    Strict,
    /// Silently drop unsatisfiable deliveries (logged at warn level)
    Lenient,
}

/// Why a delivery was not made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Explicit target names a node the registry does not know
    UnknownTarget {
        /// The unknown name
        target: String,
    },
    /// Explicit target exists but does not consume the payload's type
    TargetTypeMismatch {
        /// The mismatched target
        target: String,
        /// The payload's runtime type
        message_type: MessageType,
    },
    /// No consumers registered for the payload's type
    NoConsumers {
        /// The unconsumed type
        message_type: MessageType,
    },
    /// Source filtering emptied the consumer list; self-loops need an
    /// explicit target
    SelfLoopRequiresExplicitTarget {
        /// The producing node
        node: String,
        /// The payload's runtime type
        message_type: MessageType,
    },
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTarget { target } => write!(f, "unknown routing target: {}", target),
            Self::TargetTypeMismatch {
                target,
                message_type,
            } => write!(f, "target {} is not a consumer of {}", target, message_type),
            Self::NoConsumers { message_type } => {
                write!(f, "no consumers registered for {}", message_type)
            }
            Self::SelfLoopRequiresExplicitTarget { node, message_type } => write!(
                f,
                "self-loop on {} for {} requires an explicit target",
                node, message_type
            ),
        }
    }
}

/// Outcome of one low-level routing decision.
///
/// A tagged result lets callers distinguish an intentional drop from an
/// error without relying on control flow.
#[derive(Debug, Clone)]
pub enum RouteDecision {
    /// Deliver the payload to the named node
    Delivered {
        /// Target node name
        target: String,
        /// Payload to deliver
        payload: Payload,
    },
    /// The delivery was not made
    Dropped {
        /// Why
        reason: DropReason,
    },
}

/// Routing error, raised only under [`RoutingPolicy::Strict`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Explicit target unknown to the registry
    #[error("unknown routing target: {target}")]
    UnknownTarget {
        /// The unknown name
        target: String,
    },

    /// Explicit target does not consume the payload's type
    #[error("target {target} is not a consumer of {message_type}")]
    TargetTypeMismatch {
        /// The mismatched target
        target: String,
        /// The payload's runtime type
        message_type: MessageType,
    },

    /// No consumers registered for the payload's type
    #[error("no consumers registered for {message_type}")]
    NoConsumers {
        /// The unconsumed type
        message_type: MessageType,
    },

    /// Self-delivery on default fan-out
    #[error("self-loop on {node} for {message_type} requires an explicit target")]
    SelfLoopRequiresExplicitTarget {
        /// The producing node
        node: String,
        /// The payload's runtime type
        message_type: MessageType,
    },

    /// The envelope itself violates its invariants
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[from] EnvelopeError),
}

impl From<DropReason> for RouteError {
    fn from(reason: DropReason) -> Self {
        match reason {
            DropReason::UnknownTarget { target } => Self::UnknownTarget { target },
            DropReason::TargetTypeMismatch {
                target,
                message_type,
            } => Self::TargetTypeMismatch {
                target,
                message_type,
            },
            DropReason::NoConsumers { message_type } => Self::NoConsumers { message_type },
            DropReason::SelfLoopRequiresExplicitTarget { node, message_type } => {
                Self::SelfLoopRequiresExplicitTarget { node, message_type }
            }
        }
    }
}

/// Computed deliveries for a batch of outputs.
///
/// Only `local_deliveries` is populated by the in-process router; the
/// boundary and terminal lists are reserved for cross-boundary
/// collaborators that wrap this runtime.
#[derive(Debug, Clone, Default)]
pub struct RoutingResult {
    /// In-process (target, payload) deliveries, in decision order
    pub local_deliveries: Vec<(String, Payload)>,
    /// Payloads bound for a boundary transport
    pub boundary_deliveries: Vec<Payload>,
    /// Payloads that are terminal results of the pipeline
    pub terminal_outputs: Vec<Payload>,
}

impl RoutingResult {
    /// Create an empty result
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of deliveries across all categories
    #[must_use]
    pub fn len(&self) -> usize {
        self.local_deliveries.len() + self.boundary_deliveries.len() + self.terminal_outputs.len()
    }

    /// Check whether nothing was delivered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Type-based message router over a materialized consumer map
pub struct Router {
    consumers: IndexMap<MessageType, Vec<String>>,
    // Derived once at construction for O(1) known-target checks.
    known_nodes: IndexSet<String>,
    policy: RoutingPolicy,
}

impl Router {
    /// Create a router over a consumer map
    #[must_use]
    pub fn new(consumers: IndexMap<MessageType, Vec<String>>, policy: RoutingPolicy) -> Self {
        let known_nodes = consumers
            .values()
            .flat_map(|names| names.iter().cloned())
            .collect();
        Self {
            consumers,
            known_nodes,
            policy,
        }
    }

    /// The policy this router was built with
    #[must_use]
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Route a batch of outputs produced by `source`.
    ///
    /// Outputs are normalized to envelopes; bare payloads take default
    /// type-based fan-out. `source`, when given, is removed from default
    /// fan-out lists to prevent accidental self-delivery; explicit
    /// targets are always honored, even when equal to `source`.
    ///
    /// # Errors
    ///
    /// Under [`RoutingPolicy::Strict`], any dropped delivery becomes a
    /// [`RouteError`]. Invalid envelopes error under both policies.
    pub fn route<I>(&self, outputs: I, source: Option<&str>) -> Result<RoutingResult, RouteError>
    where
        I: IntoIterator<Item = NodeOutput>,
    {
        let mut result = RoutingResult::new();
        for output in outputs {
            let envelope = output.into_envelope();
            envelope.validate()?;

            for decision in self.decide(&envelope, source) {
                match decision {
                    RouteDecision::Delivered { target, payload } => {
                        result.local_deliveries.push((target, payload));
                    }
                    RouteDecision::Dropped { reason } => match self.policy {
                        RoutingPolicy::Strict => return Err(reason.into()),
                        RoutingPolicy::Lenient => {
                            tracing::warn!(%reason, "dropping delivery");
                        }
                    },
                }
            }
        }
        Ok(result)
    }

    /// Low-level routing decisions for one envelope.
    ///
    /// Never errors; every unsatisfiable delivery is reported as a
    /// tagged [`RouteDecision::Dropped`].
    #[must_use]
    pub fn decide(&self, envelope: &Envelope, source: Option<&str>) -> Vec<RouteDecision> {
        let message_type = envelope.payload.message_type();

        if let Some(target) = &envelope.target {
            return target
                .names()
                .into_iter()
                .map(|name| self.decide_targeted(name, message_type, &envelope.payload))
                .collect();
        }

        let consumers = match self.consumers.get(message_type) {
            Some(list) if !list.is_empty() => list,
            _ => {
                return vec![RouteDecision::Dropped {
                    reason: DropReason::NoConsumers {
                        message_type: message_type.clone(),
                    },
                }];
            }
        };

        let filtered: Vec<&String> = consumers
            .iter()
            .filter(|name| Some(name.as_str()) != source)
            .collect();

        if filtered.is_empty() {
            if let Some(node) = source {
                return vec![RouteDecision::Dropped {
                    reason: DropReason::SelfLoopRequiresExplicitTarget {
                        node: node.to_string(),
                        message_type: message_type.clone(),
                    },
                }];
            }
        }

        filtered
            .into_iter()
            .map(|name| RouteDecision::Delivered {
                target: name.clone(),
                payload: envelope.payload.clone(),
            })
            .collect()
    }

    fn decide_targeted(
        &self,
        target: &str,
        message_type: &MessageType,
        payload: &Payload,
    ) -> RouteDecision {
        if !self.known_nodes.contains(target) {
            return RouteDecision::Dropped {
                reason: DropReason::UnknownTarget {
                    target: target.to_string(),
                },
            };
        }

        let is_consumer = self
            .consumers
            .get(message_type)
            .is_some_and(|list| list.iter().any(|name| name == target));
        if !is_consumer {
            return RouteDecision::Dropped {
                reason: DropReason::TargetTypeMismatch {
                    target: target.to_string(),
                    message_type: message_type.clone(),
                },
            };
        }

        RouteDecision::Delivered {
            target: target.to_string(),
            payload: payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamkernel_core::TypedValue;

    fn consumers(entries: &[(&str, &[&str])]) -> IndexMap<MessageType, Vec<String>> {
        entries
            .iter()
            .map(|(t, names)| {
                (
                    MessageType::from(*t),
                    names.iter().map(|n| (*n).to_string()).collect(),
                )
            })
            .collect()
    }

    fn message(message_type: &str) -> NodeOutput {
        NodeOutput::Message(TypedValue::marker(message_type).into_payload())
    }

    fn targets(result: &RoutingResult) -> Vec<&str> {
        result
            .local_deliveries
            .iter()
            .map(|(t, _)| t.as_str())
            .collect()
    }

    #[test]
    fn test_route_default_fan_out() {
        let router = Router::new(consumers(&[("x", &["b", "c"])]), RoutingPolicy::Strict);
        let result = router.route([message("x")], None).unwrap();
        assert_eq!(targets(&result), ["b", "c"]);
        assert!(result.boundary_deliveries.is_empty());
        assert!(result.terminal_outputs.is_empty());
    }

    #[test]
    fn test_route_source_filtered() {
        let router = Router::new(consumers(&[("x", &["b", "c"])]), RoutingPolicy::Strict);
        let result = router.route([message("x")], Some("b")).unwrap();
        assert_eq!(targets(&result), ["c"]);
    }

    #[test]
    fn test_route_explicit_target_honored_with_source_filtering() {
        let router = Router::new(consumers(&[("x", &["b", "c"])]), RoutingPolicy::Strict);
        let envelope =
            Envelope::new(TypedValue::marker("x").into_payload()).with_target("b");
        let result = router
            .route([NodeOutput::Wrapped(envelope)], Some("b"))
            .unwrap();
        assert_eq!(targets(&result), ["b"]);
    }

    #[test]
    fn test_route_strict_self_loop_errors() {
        let router = Router::new(consumers(&[("x", &["b"])]), RoutingPolicy::Strict);
        let result = router.route([message("x")], Some("b"));
        assert_eq!(
            result.unwrap_err(),
            RouteError::SelfLoopRequiresExplicitTarget {
                node: "b".to_string(),
                message_type: MessageType::from("x"),
            }
        );
    }

    #[test]
    fn test_route_lenient_self_loop_drops() {
        let router = Router::new(consumers(&[("x", &["b"])]), RoutingPolicy::Lenient);
        let result = router.route([message("x")], Some("b")).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_route_strict_no_consumers_errors() {
        let router = Router::new(consumers(&[]), RoutingPolicy::Strict);
        let result = router.route([message("x")], None);
        assert_eq!(
            result.unwrap_err(),
            RouteError::NoConsumers {
                message_type: MessageType::from("x"),
            }
        );
    }

    #[test]
    fn test_route_lenient_no_consumers_drops() {
        let router = Router::new(consumers(&[]), RoutingPolicy::Lenient);
        let result = router.route([message("x")], None).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_route_unknown_target() {
        let router = Router::new(consumers(&[("x", &["b"])]), RoutingPolicy::Strict);
        let envelope =
            Envelope::new(TypedValue::marker("x").into_payload()).with_target("ghost");
        let result = router.route([NodeOutput::Wrapped(envelope)], None);
        assert_eq!(
            result.unwrap_err(),
            RouteError::UnknownTarget {
                target: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_route_target_type_mismatch() {
        let router = Router::new(
            consumers(&[("x", &["b"]), ("y", &["c"])]),
            RoutingPolicy::Strict,
        );
        // c is known but does not consume x.
        let envelope = Envelope::new(TypedValue::marker("x").into_payload()).with_target("c");
        let result = router.route([NodeOutput::Wrapped(envelope)], None);
        assert_eq!(
            result.unwrap_err(),
            RouteError::TargetTypeMismatch {
                target: "c".to_string(),
                message_type: MessageType::from("x"),
            }
        );
    }

    #[test]
    fn test_route_lenient_mixed_targets_keeps_valid() {
        let router = Router::new(consumers(&[("x", &["b"])]), RoutingPolicy::Lenient);
        let envelope = Envelope::new(TypedValue::marker("x").into_payload()).with_target(
            streamkernel_core::Target::Many(vec!["ghost".to_string(), "b".to_string()]),
        );
        let result = router.route([NodeOutput::Wrapped(envelope)], None).unwrap();
        assert_eq!(targets(&result), ["b"]);
    }

    #[test]
    fn test_route_invalid_envelope_errors_in_both_policies() {
        for policy in [RoutingPolicy::Strict, RoutingPolicy::Lenient] {
            let router = Router::new(consumers(&[("x", &["b"])]), policy);
            let envelope =
                Envelope::new(TypedValue::marker("x").into_payload()).with_trace_id("");
            let result = router.route([NodeOutput::Wrapped(envelope)], None);
            assert!(matches!(result, Err(RouteError::InvalidEnvelope(_))));
        }
    }

    #[test]
    fn test_route_preserves_emission_order() {
        let router = Router::new(consumers(&[("x", &["b"]), ("y", &["c"])]), RoutingPolicy::Strict);
        let result = router
            .route([message("x"), message("y"), message("x")], None)
            .unwrap();
        assert_eq!(targets(&result), ["b", "c", "b"]);
    }

    #[test]
    fn test_decide_reports_drops_without_error() {
        let router = Router::new(consumers(&[]), RoutingPolicy::Strict);
        let envelope = Envelope::new(TypedValue::marker("x").into_payload());
        let decisions = router.decide(&envelope, None);
        assert_eq!(decisions.len(), 1);
        assert!(matches!(
            &decisions[0],
            RouteDecision::Dropped {
                reason: DropReason::NoConsumers { .. }
            }
        ));
    }
}
