//! String Set
//!
//! Minimal set of strings used to track the dependents of a source.

use std::collections::HashSet;

/// Unordered set of strings. Not synchronized; the owner serializes access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringSet {
    items: HashSet<String>,
}

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: impl Into<String>) {
        self.items.insert(value.into());
    }

    /// Returns whether the value was present.
    pub fn remove(&mut self, value: &str) -> bool {
        self.items.remove(value)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Owned snapshot of the members, in no particular order.
    pub fn values(&self) -> Vec<String> {
        self.items.iter().cloned().collect()
    }
}
