//! Scenario scope - singleton-per-scope dependency resolution.

use crate::binding::{BindingKey, Instance};
use crate::registry::{InjectError, InjectionRegistry};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use streamkernel_core::{DependencySpec, PortType, ScenarioId};

/// Per-scenario cache of resolved dependency instances.
///
/// Repeated resolution of the same binding within one scope returns the
/// identical instance; the same binding resolved from another scope
/// yields an independently constructed instance. Concurrent resolution
/// within one scope serializes on an internal lock.
pub struct ScenarioScope {
    registry: Arc<InjectionRegistry>,
    scenario_id: ScenarioId,
    cache: Mutex<HashMap<BindingKey, Instance>>,
}

impl ScenarioScope {
    pub(crate) fn new(registry: Arc<InjectionRegistry>, scenario_id: ScenarioId) -> Self {
        Self {
            registry,
            scenario_id,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The scenario this scope belongs to
    #[must_use]
    pub fn scenario_id(&self) -> ScenarioId {
        self.scenario_id
    }

    /// Resolve a `T` behind a port, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::BindingNotFound`] when no factory matches,
    /// or [`InjectError::TypeMismatch`] on a downcast failure.
    pub fn resolve<T: Send + Sync + 'static>(
        &self,
        port: PortType,
        qualifier: Option<&str>,
    ) -> Result<Arc<T>, InjectError> {
        let key = BindingKey::of::<T>(port, qualifier);
        let instance = self.resolve_key(&key, std::any::type_name::<T>())?;
        instance.downcast::<T>().map_err(|_| InjectError::TypeMismatch {
            port,
            requested: std::any::type_name::<T>().to_string(),
            actual: "<erased>".to_string(),
        })
    }

    /// Resolve a `T`, treating a missing binding as absent rather than
    /// an error.
    ///
    /// # Errors
    ///
    /// Still returns [`InjectError::TypeMismatch`] on a downcast failure.
    pub fn resolve_optional<T: Send + Sync + 'static>(
        &self,
        port: PortType,
        qualifier: Option<&str>,
    ) -> Result<Option<Arc<T>>, InjectError> {
        match self.resolve::<T>(port, qualifier) {
            Ok(instance) => Ok(Some(instance)),
            Err(InjectError::BindingNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolve a declared dependency without knowing its type statically.
    ///
    /// Used by the scenario build step to verify every declared
    /// dependency is constructible before the first message.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::BindingNotFound`] when no factory matches.
    pub fn resolve_spec(&self, spec: &DependencySpec) -> Result<Instance, InjectError> {
        self.resolve_key(&BindingKey::from(spec), spec.type_name)
    }

    fn resolve_key(&self, key: &BindingKey, type_name: &str) -> Result<Instance, InjectError> {
        let mut cache = self.cache.lock().unwrap();
        if let Some(existing) = cache.get(key) {
            return Ok(Arc::clone(existing));
        }

        let binding = self.registry.get(key).ok_or_else(|| InjectError::BindingNotFound {
            port: key.port,
            type_name: type_name.to_string(),
            qualifier: key.qualifier.clone(),
        })?;

        tracing::trace!(scenario = %self.scenario_id, port = %key.port, type_name, "constructing instance");
        let instance = binding.instantiate();
        cache.insert(key.clone(), Arc::clone(&instance));
        Ok(instance)
    }

    /// Number of instances constructed so far in this scope
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Whether the registry could satisfy `(port, data_type)` at all
    #[must_use]
    pub fn is_async_binding(&self, port: PortType, data_type: TypeId) -> bool {
        self.registry.is_async_binding(port, data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn registry_with_counter() -> (Arc<InjectionRegistry>, Arc<AtomicU64>) {
        let constructed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&constructed);
        let mut registry = InjectionRegistry::new();
        registry
            .register_factory::<u64, _>(
                PortType::Kv,
                move || counter.fetch_add(1, Ordering::SeqCst),
                None,
                false,
            )
            .unwrap();
        (Arc::new(registry), constructed)
    }

    #[test]
    fn test_scope_memoizes_within_scope() {
        let (registry, constructed) = registry_with_counter();
        let scope = registry.instantiate_for_scenario(ScenarioId::new());

        let first = scope.resolve::<u64>(PortType::Kv, None).unwrap();
        let second = scope.resolve::<u64>(PortType::Kv, None).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert_eq!(scope.resolved_count(), 1);
    }

    #[test]
    fn test_distinct_scopes_get_distinct_instances() {
        let (registry, constructed) = registry_with_counter();
        let scope1 = registry.instantiate_for_scenario(ScenarioId::new());
        let scope2 = registry.instantiate_for_scenario(ScenarioId::new());

        let a = scope1.resolve::<u64>(PortType::Kv, None).unwrap();
        let b = scope2.resolve::<u64>(PortType::Kv, None).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_scope_missing_binding() {
        let (registry, _) = registry_with_counter();
        let scope = registry.instantiate_for_scenario(ScenarioId::new());

        let result = scope.resolve::<String>(PortType::Kv, None);
        assert!(matches!(result, Err(InjectError::BindingNotFound { .. })));
    }

    #[test]
    fn test_scope_resolve_optional_absent() {
        let (registry, _) = registry_with_counter();
        let scope = registry.instantiate_for_scenario(ScenarioId::new());

        let absent = scope.resolve_optional::<String>(PortType::Kv, None).unwrap();
        assert!(absent.is_none());

        let present = scope.resolve_optional::<u64>(PortType::Kv, None).unwrap();
        assert!(present.is_some());
    }

    #[test]
    fn test_scope_resolve_spec_shares_cache_with_typed_resolve() {
        let (registry, constructed) = registry_with_counter();
        let scope = registry.instantiate_for_scenario(ScenarioId::new());

        let spec = DependencySpec::new::<u64>(PortType::Kv);
        scope.resolve_spec(&spec).unwrap();
        scope.resolve::<u64>(PortType::Kv, None).unwrap();

        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scope_qualifier_isolated() {
        let mut registry = InjectionRegistry::new();
        registry
            .register_factory::<u64, _>(PortType::Kv, || 1, Some("a"), false)
            .unwrap();
        registry
            .register_factory::<u64, _>(PortType::Kv, || 2, Some("b"), false)
            .unwrap();
        let registry = Arc::new(registry);
        let scope = registry.instantiate_for_scenario(ScenarioId::new());

        let a = scope.resolve::<u64>(PortType::Kv, Some("a")).unwrap();
        let b = scope.resolve::<u64>(PortType::Kv, Some("b")).unwrap();
        assert_eq!((*a, *b), (1, 2));
    }
}
