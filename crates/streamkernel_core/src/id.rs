//! Run and scenario identifiers.
//!
//! Both are random v4 UUIDs behind newtypes; the prefixed `Display`
//! forms are what show up in logs and trace context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run identifier - identifies a single runner loop execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run_{}", self.0)
    }
}

/// Scenario identifier - identifies a running scenario instance
///
/// Injection scopes are keyed by scenario id: distinct scenarios never
/// share resolved dependency instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioId(Uuid);

impl ScenarioId {
    /// Create a new random ScenarioId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScenarioId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scn_{}", self.0)
    }
}
