//! Permission Policy
//!
//! Decides whether a target may mirror a source. Sources opt in by listing
//! namespace patterns in their allowed-namespaces annotation; a source
//! without the annotation cannot be replicated at all.

use crate::domain::entities::ManagedResource;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed,
    /// Human-readable reason naming both resources
    Denied { reason: String },
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Compiled patterns of one source, tagged with the annotation value they
/// were compiled from.
struct CompiledPatterns {
    value: String,
    patterns: Arc<Vec<Regex>>,
}

/// Namespace allow-list evaluation with compiled-pattern caching.
///
/// The annotation value is split on `,` and every piece is used verbatim as
/// a regular expression searched anywhere in the namespace (`prod` matches
/// `production`; anchor with `^...$` for exact matches). An empty piece
/// matches every namespace.
///
/// Compiled patterns are cached per source and replaced when the source's
/// annotation value changes, so the cache holds at most one entry per live
/// source.
pub struct PermissionPolicy {
    annotation: String,
    compiled: HashMap<String, CompiledPatterns>,
}

impl PermissionPolicy {
    /// Create a policy reading patterns from the given annotation key.
    pub fn new(allowed_namespaces_annotation: impl Into<String>) -> Self {
        Self {
            annotation: allowed_namespaces_annotation.into(),
            compiled: HashMap::new(),
        }
    }

    /// Check whether `target` may replicate from `source`.
    pub fn check(&mut self, source: &ManagedResource, target: &ManagedResource) -> PolicyDecision {
        if self.is_allowed(source, &target.namespace) {
            return PolicyDecision::Allowed;
        }

        PolicyDecision::Denied {
            reason: format!(
                "source {} {}/{} does not allow replication in namespace {}; {}/{} will not be replicated",
                source.kind,
                source.namespace,
                source.name,
                target.namespace,
                target.namespace,
                target.name
            ),
        }
    }

    /// Whether `target_namespace` matches at least one allowed pattern of
    /// `source`. Absence of the annotation denies.
    pub fn is_allowed(&mut self, source: &ManagedResource, target_namespace: &str) -> bool {
        let Some(value) = source.annotation(&self.annotation) else {
            self.forget(&source.key().to_string());
            return false;
        };

        self.patterns(&source.key().to_string(), value)
            .iter()
            .any(|pattern| pattern.is_match(target_namespace))
    }

    /// Drop the cached patterns of a source, e.g. after it was deleted.
    pub fn forget(&mut self, source_key: &str) {
        self.compiled.remove(source_key);
    }

    /// Number of sources with cached patterns.
    pub fn cached_pattern_sets(&self) -> usize {
        self.compiled.len()
    }

    fn patterns(&mut self, source_key: &str, value: &str) -> Arc<Vec<Regex>> {
        if let Some(cached) = self.compiled.get(source_key) {
            if cached.value == value {
                return cached.patterns.clone();
            }
        }

        let patterns = Arc::new(compile_patterns(value));
        self.compiled.insert(
            source_key.to_string(),
            CompiledPatterns {
                value: value.to_string(),
                patterns: patterns.clone(),
            },
        );
        patterns
    }
}

/// Split on commas and compile each piece as written. Invalid patterns
/// never match and are skipped with a warning.
fn compile_patterns(value: &str) -> Vec<Regex> {
    value
        .split(',')
        .filter_map(|raw| match Regex::new(raw) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("ignoring invalid namespace pattern {:?}: {}", raw, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::value_objects::{AnnotationKeys, ResourceKind};

    fn keys() -> AnnotationKeys {
        AnnotationKeys::default()
    }

    fn policy() -> PermissionPolicy {
        PermissionPolicy::new(keys().allowed_namespaces)
    }

    fn source(allowed: Option<&str>) -> ManagedResource {
        let r = ManagedResource::new(ResourceKind::ConfigMap, "src-ns", "shared");
        match allowed {
            Some(v) => r.with_annotation(keys().allowed_namespaces, v),
            None => r,
        }
    }

    fn target(namespace: &str) -> ManagedResource {
        ManagedResource::new(ResourceKind::ConfigMap, namespace, "copy")
    }

    // ===== Opt-in Tests =====

    #[test]
    fn test_missing_annotation_denies() {
        let decision = policy().check(&source(None), &target("anything"));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_empty_annotation_allows_every_namespace() {
        let mut p = policy();
        assert!(p.check(&source(Some("")), &target("ns1")).is_allowed());
        assert!(p.check(&source(Some("")), &target("kube-system")).is_allowed());
    }

    #[test]
    fn test_trailing_comma_allows_every_namespace() {
        let mut p = policy();
        let src = source(Some("^ns1$,"));
        assert!(p.check(&src, &target("ns1")).is_allowed());
        assert!(p.check(&src, &target("other")).is_allowed());
    }

    #[test]
    fn test_denial_reason_names_both_resources() {
        let decision = policy().check(&source(Some("^prod$")), &target("staging"));
        match decision {
            PolicyDecision::Denied { reason } => {
                assert!(reason.contains("src-ns/shared"));
                assert!(reason.contains("staging/copy"));
            }
            PolicyDecision::Allowed => panic!("expected denial"),
        }
    }

    // ===== Matching Tests =====

    #[test]
    fn test_anchored_pattern() {
        let mut p = policy();
        let src = source(Some("^prod$"));
        assert!(p.check(&src, &target("prod")).is_allowed());
        assert!(!p.check(&src, &target("staging")).is_allowed());
        assert!(!p.check(&src, &target("production")).is_allowed());
    }

    #[test]
    fn test_unanchored_pattern_is_substring_search() {
        let mut p = policy();
        let src = source(Some("prod"));
        assert!(p.check(&src, &target("production")).is_allowed());
        assert!(p.check(&src, &target("preprod")).is_allowed());
        assert!(!p.check(&src, &target("dev")).is_allowed());
    }

    #[test]
    fn test_any_pattern_allows() {
        let mut p = policy();
        let src = source(Some("^team-a$,^team-b-.*"));
        assert!(p.check(&src, &target("team-a")).is_allowed());
        assert!(p.check(&src, &target("team-b-dev")).is_allowed());
        assert!(!p.check(&src, &target("team-c")).is_allowed());
    }

    #[test]
    fn test_patterns_are_not_trimmed() {
        let mut p = policy();
        let src = source(Some("ns1, ns2"));
        assert!(p.check(&src, &target("ns1")).is_allowed());
        // The second pattern is " ns2", which a namespace never contains
        assert!(!p.check(&src, &target("ns2")).is_allowed());
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let mut p = policy();
        let src = source(Some("([,^ns1$"));
        assert!(p.check(&src, &target("ns1")).is_allowed());
        assert!(!p.check(&src, &target("([")).is_allowed());
    }

    #[test]
    fn test_is_allowed_by_namespace() {
        let mut p = policy();
        assert!(!p.is_allowed(&source(None), "ns1"));
        assert!(p.is_allowed(&source(Some("ns1")), "ns1"));
    }

    // ===== Cache Tests =====

    fn named_source(name: &str, allowed: &str) -> ManagedResource {
        ManagedResource::new(ResourceKind::ConfigMap, "src-ns", name)
            .with_annotation(keys().allowed_namespaces, allowed)
    }

    #[test]
    fn test_patterns_cached_once_per_source() {
        let mut p = policy();
        let a = named_source("a", "^a$");
        let b = named_source("b", "^a$");

        p.check(&a, &target("a"));
        p.check(&a, &target("x"));
        p.check(&b, &target("a"));

        assert_eq!(p.cached_pattern_sets(), 2);
    }

    #[test]
    fn test_changed_annotation_replaces_cache_entry() {
        let mut p = policy();
        for i in 0..50 {
            let src = named_source("a", &format!("^ns{}$", i));
            assert!(p.check(&src, &target(&format!("ns{}", i))).is_allowed());
        }
        assert_eq!(p.cached_pattern_sets(), 1);

        // The old value no longer applies
        let src = named_source("a", "^ns49$");
        assert!(!p.check(&src, &target("ns0")).is_allowed());
    }

    #[test]
    fn test_forget_and_removed_annotation_evict() {
        let mut p = policy();
        p.check(&named_source("a", "ns1"), &target("ns1"));
        p.check(&named_source("b", "ns1"), &target("ns1"));
        assert_eq!(p.cached_pattern_sets(), 2);

        p.forget("src-ns/a");
        assert_eq!(p.cached_pattern_sets(), 1);

        let stripped = ManagedResource::new(ResourceKind::ConfigMap, "src-ns", "b");
        assert!(!p.check(&stripped, &target("ns1")).is_allowed());
        assert_eq!(p.cached_pattern_sets(), 0);
    }
}
