//! Session state shared across the stages of a cycle.
//!
//! Stages never write to the session directly. Each stage reads a snapshot
//! through [`SessionState`] and returns a [`StateDelta`]; the controller
//! commits it before the next stage starts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Well-known session keys.
pub mod keys {
    /// The triggering request, verbatim.
    pub const USER_QUERY: &str = "user_query";
    /// Optional expected answer; explicit null when not supplied.
    pub const GROUND_TRUTH: &str = "ground_truth";
    /// Durable, app-level key of the persisted playbook.
    pub const PLAYBOOK: &str = "app:playbook";
    pub const GENERATOR_OUTPUT: &str = "generator_output";
    pub const REFLECTOR_OUTPUT: &str = "reflector_output";
    pub const CURATOR_OUTPUT: &str = "curator_output";
}

/// Read access plus commit for a per-conversation key-value store.
///
/// Implementations back this with whatever persistence the host uses.
pub trait SessionState: Send + Sync {
    fn get(&self, key: &str) -> Option<&Value>;

    /// Apply every change in the delta.
    fn commit(&mut self, delta: StateDelta);

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// A set of key-value changes produced by one stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateDelta {
    changes: BTreeMap<String, Value>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change, replacing any earlier change to the same key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.changes.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.changes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

impl IntoIterator for StateDelta {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// In-process session state.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    values: HashMap<String, Value>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, e.g. a playbook carried over from an earlier session.
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionState for MemorySession {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn commit(&mut self, delta: StateDelta) {
        self.values.extend(delta);
    }
}
