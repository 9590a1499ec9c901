//! Pipeline state tracking.
//!
//! Tracks which processing items have been applied to the current rule and
//! stores key-value state set by `SetState` transformations (for example
//! the selected dataset identifier). One state instance belongs to exactly
//! one rule's trip through the pipeline; rules never observe each other's
//! state.

use std::collections::{HashMap, HashSet};

/// Mutable state carried through a pipeline's application to one rule.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Identifiers of processing items applied to the current rule.
    applied: HashSet<String>,

    /// Arbitrary key-value state set by `SetState` transformations.
    state: HashMap<String, serde_json::Value>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a processing item with the given identifier was applied.
    pub fn mark_applied(&mut self, id: &str) {
        self.applied.insert(id.to_string());
    }

    /// Check if a processing item with the given identifier was applied.
    pub fn was_applied(&self, id: &str) -> bool {
        self.applied.contains(id)
    }

    /// Get a state value.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.state.get(key)
    }

    /// Set a state value.
    pub fn set(&mut self, key: String, val: serde_json::Value) {
        self.state.insert(key, val);
    }

    /// Check if a state key has a specific string value.
    pub fn matches(&self, key: &str, val: &str) -> bool {
        self.state
            .get(key)
            .and_then(|v| v.as_str())
            .is_some_and(|s| s == val)
    }

    /// Reset per-rule tracking (called before processing each rule).
    pub fn reset_rule(&mut self) {
        self.applied.clear();
        self.state.clear();
    }
}
