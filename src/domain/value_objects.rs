//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};

/// Default prefix for the replication annotation keys.
pub const DEFAULT_ANNOTATION_PREFIX: &str = "replicator.v1.mittwald.de";

/// Cluster-unique identity of a resource of a given kind.
///
/// Rendered and parsed as `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `namespace/name` key.
    ///
    /// Splits on the first `/` only. Returns `None` when the separator is
    /// missing or either half is empty.
    ///
    /// # Examples
    /// ```
    /// use resource_replicator::domain::value_objects::ResourceKey;
    ///
    /// let key = ResourceKey::parse("shared/tls-ca").unwrap();
    /// assert_eq!(key.namespace, "shared");
    /// assert_eq!(key.name, "tls-ca");
    /// assert!(ResourceKey::parse("no-separator").is_none());
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let (namespace, name) = s.split_once('/')?;
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(namespace, name))
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Kind of key/value resource being replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    ConfigMap,
    Secret,
}

impl ResourceKind {
    /// Parse a kind name as used in configuration (`configmap`, `secret`).
    ///
    /// Accepts the plural and API spellings too, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "configmap" | "configmaps" | "cm" => Some(Self::ConfigMap),
            "secret" | "secrets" => Some(Self::Secret),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
        }
    }

    /// Collection segment used in API paths.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::ConfigMap => "configmaps",
            Self::Secret => "secrets",
        }
    }

    /// Value of the `kind` field on the wire.
    pub fn api_kind(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four annotation keys carrying replication metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationKeys {
    /// On a target: `namespace/name` of its source
    pub replicate_from: String,
    /// Written by the engine: RFC3339 time of the last sync
    pub replicated_at: String,
    /// Written by the engine: source version absorbed by the last sync
    pub replicated_from_version: String,
    /// On a source: comma-separated namespace patterns allowed to mirror it
    pub allowed_namespaces: String,
}

impl AnnotationKeys {
    /// Derive all keys from a common prefix, e.g. `example.com` gives
    /// `example.com/replicate-from`.
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            replicate_from: format!("{}/replicate-from", prefix),
            replicated_at: format!("{}/replicated-at", prefix),
            replicated_from_version: format!("{}/replicated-from-version", prefix),
            allowed_namespaces: format!("{}/replication-allowed-namespaces", prefix),
        }
    }
}

impl Default for AnnotationKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_ANNOTATION_PREFIX)
    }
}

/// JSON patch verb (RFC 6902 subset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

/// A single JSON patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl PatchOperation {
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }

    pub fn add(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value),
        }
    }
}

/// Escape a map key for use as a JSON pointer segment.
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape_pointer_segment`].
pub fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
