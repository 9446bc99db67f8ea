//! Node contracts - the declared shape of each processing unit.
//!
//! A contract names a node and the message types it consumes and emits.
//! Contracts are produced once at composition time and are immutable
//! thereafter; the DAG builder and the consumer registry are both
//! derived from the same contract set.

use crate::message::MessageType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Error from contract validation or registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Contract has an empty name
    EmptyName,
    /// A consumed or emitted type identifier is empty
    EmptyType { name: String },
    /// The same type appears twice in `consumes`
    DuplicateConsume { name: String, message_type: MessageType },
    /// The same type appears twice in `emits`
    DuplicateEmit { name: String, message_type: MessageType },
    /// Two contracts share the same name
    DuplicateName { name: String },
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "contract name must not be empty"),
            Self::EmptyType { name } => {
                write!(f, "contract {} declares an empty message type", name)
            }
            Self::DuplicateConsume { name, message_type } => {
                write!(f, "contract {} consumes {} more than once", name, message_type)
            }
            Self::DuplicateEmit { name, message_type } => {
                write!(f, "contract {} emits {} more than once", name, message_type)
            }
            Self::DuplicateName { name } => {
                write!(f, "duplicate contract name: {}", name)
            }
        }
    }
}

impl std::error::Error for ContractError {}

/// Declared unit of work: a name plus consumed and emitted message types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContract {
    /// Unique node name
    pub name: String,
    /// Message types this node consumes, in declaration order
    pub consumes: Vec<MessageType>,
    /// Message types this node emits, in declaration order
    pub emits: Vec<MessageType>,
    /// Whether this is an external/boundary source or sink
    pub external: bool,
    /// Optional stage label for grouping in diagnostics
    pub stage: Option<String>,
}

impl NodeContract {
    /// Create a new contract with no declared types
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            consumes: Vec::new(),
            emits: Vec::new(),
            external: false,
            stage: None,
        }
    }

    /// Set the consumed message types
    #[must_use]
    pub fn with_consumes<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<MessageType>,
    {
        self.consumes = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the emitted message types
    #[must_use]
    pub fn with_emits<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<MessageType>,
    {
        self.emits = types.into_iter().map(Into::into).collect();
        self
    }

    /// Mark this contract as an external boundary source or sink
    #[must_use]
    pub fn with_external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    /// Set the stage label
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Check whether this contract is a declared source (no inputs)
    #[must_use]
    pub fn is_source(&self) -> bool {
        self.consumes.is_empty()
    }

    /// Validate the contract invariants
    ///
    /// # Errors
    ///
    /// Returns error on empty name, empty type identifiers, or duplicate
    /// entries in `consumes` or `emits`.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.name.is_empty() {
            return Err(ContractError::EmptyName);
        }

        for mt in self.consumes.iter().chain(self.emits.iter()) {
            if mt.is_empty() {
                return Err(ContractError::EmptyType {
                    name: self.name.clone(),
                });
            }
        }

        for (i, mt) in self.consumes.iter().enumerate() {
            if self.consumes[..i].contains(mt) {
                return Err(ContractError::DuplicateConsume {
                    name: self.name.clone(),
                    message_type: mt.clone(),
                });
            }
        }

        for (i, mt) in self.emits.iter().enumerate() {
            if self.emits[..i].contains(mt) {
                return Err(ContractError::DuplicateEmit {
                    name: self.name.clone(),
                    message_type: mt.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Ordered name-to-contract table with duplicate detection.
///
/// This is the explicit registration surface that stands in for
/// module-scanning discovery: composition code inserts every contract
/// exactly once, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSet {
    contracts: IndexMap<String, NodeContract>,
}

impl ContractSet {
    /// Create an empty contract set
    #[must_use]
    pub fn new() -> Self {
        Self {
            contracts: IndexMap::new(),
        }
    }

    /// Insert a contract, validating it first
    ///
    /// # Errors
    ///
    /// Returns error if the contract is invalid or its name is taken.
    pub fn insert(&mut self, contract: NodeContract) -> Result<(), ContractError> {
        contract.validate()?;
        if self.contracts.contains_key(&contract.name) {
            return Err(ContractError::DuplicateName {
                name: contract.name.clone(),
            });
        }
        self.contracts.insert(contract.name.clone(), contract);
        Ok(())
    }

    /// Get a contract by node name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NodeContract> {
        self.contracts.get(name)
    }

    /// Check whether a node name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Iterate contracts in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &NodeContract> {
        self.contracts.values()
    }

    /// All contracts in discovery order
    #[must_use]
    pub fn to_vec(&self) -> Vec<NodeContract> {
        self.contracts.values().cloned().collect()
    }

    /// Number of contracts
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Check if the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
