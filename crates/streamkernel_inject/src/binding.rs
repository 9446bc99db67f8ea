//! Binding identity and stored factories.

use std::any::{Any, TypeId};
use std::sync::Arc;
use streamkernel_core::{DependencySpec, PortType};

/// Type-erased instance handle produced by a factory
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Identity of a binding: port kind, Rust type, optional qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    /// Port kind
    pub port: PortType,
    /// Type identity of the bound value
    pub data_type: TypeId,
    /// Optional qualifier distinguishing same-typed bindings
    pub qualifier: Option<String>,
}

impl BindingKey {
    /// Create a key for a `T` behind the given port
    #[must_use]
    pub fn of<T: 'static>(port: PortType, qualifier: Option<&str>) -> Self {
        Self {
            port,
            data_type: TypeId::of::<T>(),
            qualifier: qualifier.map(str::to_string),
        }
    }
}

impl From<&DependencySpec> for BindingKey {
    fn from(spec: &DependencySpec) -> Self {
        Self {
            port: spec.port,
            data_type: spec.data_type,
            qualifier: spec.qualifier.clone(),
        }
    }
}

/// A registered factory plus its execution classification
pub struct Binding {
    factory: Arc<dyn Fn() -> Instance + Send + Sync>,
    type_name: &'static str,
    is_async: bool,
}

impl Binding {
    /// Wrap a concrete factory into a type-erased binding
    #[must_use]
    pub fn new<T, F>(factory: F, is_async: bool) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || Arc::new(factory()) as Instance),
            type_name: std::any::type_name::<T>(),
            is_async,
        }
    }

    /// Invoke the factory
    #[must_use]
    pub fn instantiate(&self) -> Instance {
        (self.factory)()
    }

    /// The human-readable name of the bound type
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the binding was registered as async-capable
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.is_async
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("type_name", &self.type_name)
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_key_of() {
        let a = BindingKey::of::<String>(PortType::Kv, None);
        let b = BindingKey::of::<String>(PortType::Kv, None);
        let c = BindingKey::of::<String>(PortType::Kv, Some("other"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_binding_key_from_spec() {
        let spec = DependencySpec::new::<u64>(PortType::Queue).with_qualifier("q");
        let key = BindingKey::from(&spec);
        assert_eq!(key, BindingKey::of::<u64>(PortType::Queue, Some("q")));
    }

    #[test]
    fn test_binding_instantiate() {
        let binding = Binding::new(|| 42u64, false);
        let instance = binding.instantiate();
        let value = instance.downcast::<u64>().unwrap();
        assert_eq!(*value, 42);
        assert!(!binding.is_async());
    }

    #[test]
    fn test_binding_factory_called_per_instantiate() {
        let binding = Binding::new(String::new, false);
        let a = binding.instantiate();
        let b = binding.instantiate();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
