//! Consumer registry - the live mapping from message type to consumers.
//!
//! The DAG validates graph shape once at preflight; the registry is what
//! every routing decision actually consults, and it may be mutated at
//! runtime (a node group relocating, a consumer draining). The version
//! counter exists purely for downstream cache invalidation.

use indexmap::{IndexMap, IndexSet};
use streamkernel_core::{MessageType, NodeContract};

/// Live, versioned mapping from message type to subscribed node names
pub trait ConsumerRegistry {
    /// Consumers of a type, in registration order; empty for unknown types
    fn get_consumers(&self, message_type: &MessageType) -> Vec<String>;

    /// Whether any consumer list mentions this node name; O(1)
    fn has_node(&self, name: &str) -> bool;

    /// All registered message types, in insertion order
    fn list_tokens(&self) -> Vec<MessageType>;

    /// Replace the full consumer list for a type and bump the version
    fn register(&mut self, message_type: MessageType, consumers: Vec<String>);

    /// Monotonically increasing change counter
    fn version(&self) -> u64;
}

/// In-memory consumer registry
#[derive(Debug, Clone, Default)]
pub struct InMemoryConsumerRegistry {
    map: IndexMap<MessageType, Vec<String>>,
    // Derived node set, rebuilt on every register call.
    nodes: IndexSet<String>,
    version: u64,
}

impl InMemoryConsumerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a registry from node contracts in discovery order.
    ///
    /// Each consumed type maps to the nodes consuming it, ordered by
    /// contract discovery order.
    #[must_use]
    pub fn from_contracts(contracts: &[NodeContract]) -> Self {
        let mut map: IndexMap<MessageType, Vec<String>> = IndexMap::new();
        for contract in contracts {
            for consumed in &contract.consumes {
                map.entry(consumed.clone())
                    .or_default()
                    .push(contract.name.clone());
            }
        }

        let mut registry = Self::new();
        for (message_type, consumers) in map {
            registry.register(message_type, consumers);
        }
        registry
    }

    fn rebuild_node_set(&mut self) {
        self.nodes = self
            .map
            .values()
            .flat_map(|consumers| consumers.iter().cloned())
            .collect();
    }
}

impl ConsumerRegistry for InMemoryConsumerRegistry {
    fn get_consumers(&self, message_type: &MessageType) -> Vec<String> {
        self.map.get(message_type).cloned().unwrap_or_default()
    }

    fn has_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    fn list_tokens(&self) -> Vec<MessageType> {
        self.map.keys().cloned().collect()
    }

    fn register(&mut self, message_type: MessageType, consumers: Vec<String>) {
        self.map.insert(message_type, consumers);
        self.rebuild_node_set();
        self.version += 1;
    }

    fn version(&self) -> u64 {
        self.version
    }
}
