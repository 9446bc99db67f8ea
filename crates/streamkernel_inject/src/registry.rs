//! Injection registry - the composition-time binding table.

use crate::binding::{Binding, BindingKey};
use crate::scope::ScenarioScope;
use indexmap::IndexMap;
use std::any::TypeId;
use std::sync::Arc;
use streamkernel_core::{PortType, ScenarioId};
use thiserror::Error;

/// Error from binding registration or resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    /// No factory registered for the requested key
    #[error("no binding for {port} port of type {type_name} (qualifier {qualifier:?})")]
    BindingNotFound {
        /// Requested port kind
        port: PortType,
        /// Requested type name
        type_name: String,
        /// Requested qualifier
        qualifier: Option<String>,
    },

    /// A factory is already registered under this key
    #[error("binding for {port} port of type {type_name} (qualifier {qualifier:?}) already registered")]
    DuplicateBinding {
        /// Conflicting port kind
        port: PortType,
        /// Conflicting type name
        type_name: String,
        /// Conflicting qualifier
        qualifier: Option<String>,
    },

    /// The stored instance does not have the requested type
    #[error("binding for {port} port resolved to {actual}, not {requested}")]
    TypeMismatch {
        /// Requested port kind
        port: PortType,
        /// Type that was requested
        requested: String,
        /// Type the binding actually holds
        actual: String,
    },
}

/// Registry of typed, qualified dependency factories.
///
/// Factories are registered once at composition time; construction
/// happens lazily inside a [`ScenarioScope`], at most once per binding
/// per scope.
#[derive(Debug, Default)]
pub struct InjectionRegistry {
    bindings: IndexMap<BindingKey, Binding>,
}

impl InjectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zero-arg factory for a `T` behind a port.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::DuplicateBinding`] if the key is taken.
    pub fn register_factory<T, F>(
        &mut self,
        port: PortType,
        factory: F,
        qualifier: Option<&str>,
        is_async: bool,
    ) -> Result<(), InjectError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let key = BindingKey::of::<T>(port, qualifier);
        if self.bindings.contains_key(&key) {
            return Err(InjectError::DuplicateBinding {
                port,
                type_name: std::any::type_name::<T>().to_string(),
                qualifier: qualifier.map(str::to_string),
            });
        }
        tracing::debug!(%port, type_name = std::any::type_name::<T>(), is_async, "registering binding");
        self.bindings.insert(key, Binding::new(factory, is_async));
        Ok(())
    }

    /// Whether any qualifier variant of `(port, data_type)` is async-capable.
    ///
    /// Consumed solely by the execution planner.
    #[must_use]
    pub fn is_async_binding(&self, port: PortType, data_type: TypeId) -> bool {
        self.bindings
            .iter()
            .any(|(key, binding)| {
                key.port == port && key.data_type == data_type && binding.is_async()
            })
    }

    /// Look up a binding by key
    #[must_use]
    pub fn get(&self, key: &BindingKey) -> Option<&Binding> {
        self.bindings.get(key)
    }

    /// Whether a binding exists for the key
    #[must_use]
    pub fn contains(&self, key: &BindingKey) -> bool {
        self.bindings.contains_key(key)
    }

    /// Number of registered bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Create a resolution scope for one running scenario instance.
    ///
    /// Scopes created from the same registry share bindings but never
    /// share constructed instances.
    #[must_use]
    pub fn instantiate_for_scenario(self: &Arc<Self>, scenario_id: ScenarioId) -> ScenarioScope {
        ScenarioScope::new(Arc::clone(self), scenario_id)
    }
}
