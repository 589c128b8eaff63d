//! Dependency Index
//!
//! Tracks which targets declared a replication link to which source.
//! Keys are rendered `namespace/name` strings and are not validated.

use crate::domain::services::StringSet;
use std::collections::HashMap;

/// Source key -> set of dependent target keys.
///
/// Owned by a single engine; never shared across threads.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    edges: HashMap<String, StringSet>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<&StringSet> {
        self.edges.get(source)
    }

    /// Dependent set of `source`, created empty if absent.
    pub fn ensure(&mut self, source: &str) -> &mut StringSet {
        self.edges.entry(source.to_string()).or_default()
    }

    pub fn record_edge(&mut self, source: &str, target: &str) {
        self.ensure(source).add(target);
    }

    /// Remove one edge. The (possibly empty) entry for `source` is kept.
    pub fn remove_edge(&mut self, source: &str, target: &str) -> bool {
        self.edges
            .get_mut(source)
            .map(|set| set.remove(target))
            .unwrap_or(false)
    }

    pub fn has_dependents(&self, source: &str) -> bool {
        self.edges.get(source).is_some_and(|set| !set.is_empty())
    }

    /// Snapshot of the dependents of `source`; empty when there are none.
    pub fn dependents(&self, source: &str) -> Vec<String> {
        self.edges.get(source).map(StringSet::values).unwrap_or_default()
    }

    /// Number of sources with an entry, including emptied ones.
    pub fn source_count(&self) -> usize {
        self.edges.len()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(StringSet::len).sum()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_get_absent() {
        let index = DependencyIndex::new();
        assert!(index.get("src/a").is_none());
        assert!(!index.has_dependents("src/a"));
        assert!(index.dependents("src/a").is_empty());
    }

    #[test]
    fn test_ensure_creates_empty_entry() {
        let mut index = DependencyIndex::new();
        assert!(index.ensure("src/a").is_empty());
        assert!(index.get("src/a").is_some());
        assert!(!index.has_dependents("src/a"));
        assert_eq!(index.source_count(), 1);
    }

    #[test]
    fn test_record_edges() {
        let mut index = DependencyIndex::new();
        index.record_edge("src/a", "ns1/t1");
        index.record_edge("src/a", "ns2/t2");
        index.record_edge("src/a", "ns1/t1");
        index.record_edge("src/b", "ns1/t3");

        assert!(index.has_dependents("src/a"));
        assert_eq!(index.get("src/a").unwrap().len(), 2);
        assert_eq!(index.edge_count(), 3);

        let mut deps = index.dependents("src/a");
        deps.sort();
        assert_eq!(deps, vec!["ns1/t1", "ns2/t2"]);
    }

    #[test]
    fn test_remove_edge_keeps_entry() {
        let mut index = DependencyIndex::new();
        index.record_edge("src/a", "ns1/t1");

        assert!(index.remove_edge("src/a", "ns1/t1"));
        assert!(!index.has_dependents("src/a"));
        assert!(index.get("src/a").is_some());

        // Removing twice or from an unknown source is a no-op
        assert!(!index.remove_edge("src/a", "ns1/t1"));
        assert!(!index.remove_edge("src/zzz", "ns1/t1"));
    }
}
