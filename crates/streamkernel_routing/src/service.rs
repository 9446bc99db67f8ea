//! Routing service - a cache-optimizing façade over router and registry.
//!
//! Materializing the consumer map from the registry on every routing
//! call would dominate hot-path cost; the service rebuilds it only when
//! the registry's version counter has moved.

use crate::registry::ConsumerRegistry;
use crate::router::{Router, RouteError, RoutingPolicy, RoutingResult};
use indexmap::IndexMap;
use streamkernel_core::{MessageType, NodeOutput};

/// Version-cached routing façade
pub struct RoutingService<R: ConsumerRegistry> {
    registry: R,
    policy: RoutingPolicy,
    seen_version: u64,
    router: Router,
}

impl<R: ConsumerRegistry> RoutingService<R> {
    /// Create a service, materializing the initial consumer map eagerly
    #[must_use]
    pub fn new(registry: R, policy: RoutingPolicy) -> Self {
        let seen_version = registry.version();
        let router = Router::new(materialize(&registry), policy);
        Self {
            registry,
            policy,
            seen_version,
            router,
        }
    }

    /// The underlying registry
    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable access to the registry, for runtime re-registration
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// The routing policy fixed at construction
    #[must_use]
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Route a batch of outputs, rebuilding the cached map only if the
    /// registry version moved since the last call.
    ///
    /// # Errors
    ///
    /// Propagates [`RouteError`] from the underlying router.
    pub fn route<I>(&mut self, outputs: I, source: Option<&str>) -> Result<RoutingResult, RouteError>
    where
        I: IntoIterator<Item = NodeOutput>,
    {
        let version = self.registry.version();
        if version != self.seen_version {
            tracing::debug!(version, "consumer registry changed; rebuilding router");
            self.router = Router::new(materialize(&self.registry), self.policy);
            self.seen_version = version;
        }
        self.router.route(outputs, source)
    }
}

fn materialize<R: ConsumerRegistry>(registry: &R) -> IndexMap<MessageType, Vec<String>> {
    registry
        .list_tokens()
        .into_iter()
        .map(|token| {
            let consumers = registry.get_consumers(&token);
            (token, consumers)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryConsumerRegistry;
    use std::cell::Cell;
    use std::rc::Rc;
    use streamkernel_core::TypedValue;

    /// Registry wrapper counting materialization calls.
    struct CountingRegistry {
        inner: InMemoryConsumerRegistry,
        reads: Rc<Cell<u64>>,
    }

    impl ConsumerRegistry for CountingRegistry {
        fn get_consumers(&self, message_type: &MessageType) -> Vec<String> {
            self.reads.set(self.reads.get() + 1);
            self.inner.get_consumers(message_type)
        }

        fn has_node(&self, name: &str) -> bool {
            self.inner.has_node(name)
        }

        fn list_tokens(&self) -> Vec<MessageType> {
            self.reads.set(self.reads.get() + 1);
            self.inner.list_tokens()
        }

        fn register(&mut self, message_type: MessageType, consumers: Vec<String>) {
            self.inner.register(message_type, consumers);
        }

        fn version(&self) -> u64 {
            self.inner.version()
        }
    }

    fn message(message_type: &str) -> NodeOutput {
        NodeOutput::Message(TypedValue::marker(message_type).into_payload())
    }

    #[test]
    fn test_service_routes_through_registry() {
        let mut registry = InMemoryConsumerRegistry::new();
        registry.register(MessageType::from("x"), vec!["sink".to_string()]);

        let mut service = RoutingService::new(registry, RoutingPolicy::Strict);
        let result = service.route([message("x")], None).unwrap();
        assert_eq!(result.local_deliveries.len(), 1);
        assert_eq!(result.local_deliveries[0].0, "sink");
    }

    #[test]
    fn test_service_caches_until_version_moves() {
        let reads = Rc::new(Cell::new(0));
        let mut inner = InMemoryConsumerRegistry::new();
        inner.register(MessageType::from("x"), vec!["sink".to_string()]);

        let registry = CountingRegistry {
            inner,
            reads: Rc::clone(&reads),
        };
        let mut service = RoutingService::new(registry, RoutingPolicy::Strict);
        let reads_after_build = reads.get();

        service.route([message("x")], None).unwrap();
        service.route([message("x")], None).unwrap();
        // Unchanged version: no re-materialization.
        assert_eq!(reads.get(), reads_after_build);

        service
            .registry_mut()
            .register(MessageType::from("y"), vec!["other".to_string()]);
        service.route([message("x")], None).unwrap();
        assert!(reads.get() > reads_after_build);
    }

    #[test]
    fn test_service_sees_new_registrations() {
        let registry = InMemoryConsumerRegistry::new();
        let mut service = RoutingService::new(registry, RoutingPolicy::Lenient);

        // Nothing registered yet; lenient mode drops.
        let result = service.route([message("x")], None).unwrap();
        assert!(result.is_empty());

        service
            .registry_mut()
            .register(MessageType::from("x"), vec!["sink".to_string()]);
        let result = service.route([message("x")], None).unwrap();
        assert_eq!(result.local_deliveries.len(), 1);
    }
}
