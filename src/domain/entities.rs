//! Domain Entities - Core business objects
//!
//! A [`ManagedResource`] is the unit of replication: a keyed, versioned
//! key/value payload plus the annotations that link targets to sources.

use crate::domain::errors::ReplicationError;
use crate::domain::value_objects::{
    unescape_pointer_segment, PatchOp, PatchOperation, ResourceKey, ResourceKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A uniquely keyed key/value resource observed in the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedResource {
    /// Kind of the resource (config map, secret)
    pub kind: ResourceKind,
    /// Owner scope of the resource
    pub namespace: String,
    /// Name, unique within the namespace
    pub name: String,
    /// Opaque version token assigned by the store on every write
    #[serde(default)]
    pub version: String,
    /// Metadata annotations, including replication metadata
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// The mirrored payload; `None` when the resource carries no data field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
    /// Wire fields the engine does not own, carried through unchanged on writes
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ManagedResource {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
            version: String::new(),
            annotations: BTreeMap::new(),
            data: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.namespace, &self.name)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Apply JSON patch operations in order.
    ///
    /// Supported paths are `/data`, `/data/<key>` and
    /// `/metadata/annotations/<key>`. The resource is left untouched when any
    /// operation fails.
    pub fn apply_patch(&mut self, ops: &[PatchOperation]) -> Result<(), ReplicationError> {
        let mut patched = self.clone();
        for op in ops {
            patched.apply_one(op)?;
        }
        *self = patched;
        Ok(())
    }

    fn apply_one(&mut self, op: &PatchOperation) -> Result<(), ReplicationError> {
        let invalid = |reason: &str| ReplicationError::InvalidPatch {
            path: op.path.clone(),
            reason: reason.to_string(),
        };

        if op.path == "/data" {
            return match op.op {
                PatchOp::Remove => self.data.take().map(|_| ()).ok_or_else(|| invalid("no data")),
                PatchOp::Replace if self.data.is_none() => Err(invalid("no data")),
                PatchOp::Add | PatchOp::Replace => {
                    self.data = Some(string_map(op.value.as_ref()).ok_or_else(|| {
                        invalid("value must be an object of strings")
                    })?);
                    Ok(())
                }
            };
        }

        let (map, segment) = if let Some(rest) = op.path.strip_prefix("/data/") {
            let data = self.data.as_mut().ok_or_else(|| invalid("no data"))?;
            (data, rest)
        } else if let Some(rest) = op.path.strip_prefix("/metadata/annotations/") {
            (&mut self.annotations, rest)
        } else {
            return Err(invalid("unsupported path"));
        };

        let field = unescape_pointer_segment(segment);
        match op.op {
            PatchOp::Remove => map.remove(&field).map(|_| ()).ok_or_else(|| invalid("no such key")),
            PatchOp::Replace if !map.contains_key(&field) => Err(invalid("no such key")),
            PatchOp::Add | PatchOp::Replace => {
                let value = op
                    .value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| invalid("value must be a string"))?;
                map.insert(field, value.to_string());
                Ok(())
            }
        }
    }
}

fn string_map(value: Option<&serde_json::Value>) -> Option<BTreeMap<String, String>> {
    value?
        .as_object()?
        .iter()
        .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

/// A change notification delivered by the watch feed.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Added(ManagedResource),
    /// Also used for periodic resync redelivery
    Updated(ManagedResource),
    Deleted(ManagedResource),
}

impl WatchEvent {
    pub fn resource(&self) -> &ManagedResource {
        match self {
            Self::Added(r) | Self::Updated(r) | Self::Deleted(r) => r,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> ManagedResource {
        ManagedResource::new(ResourceKind::ConfigMap, "ns1", "t")
            .with_version("7")
            .with_annotation("example.com/replicated-at", "2024-01-01T00:00:00Z")
            .with_data("a", "1")
            .with_data("b", "2")
    }

    // ===== ManagedResource Tests =====

    #[test]
    fn test_new_resource_is_empty() {
        let r = ManagedResource::new(ResourceKind::Secret, "ns", "name");
        assert_eq!(r.key(), ResourceKey::new("ns", "name"));
        assert!(r.version.is_empty());
        assert!(r.annotations.is_empty());
        assert!(r.data.is_none());
    }

    #[test]
    fn test_annotation_lookup() {
        let r = target();
        assert_eq!(r.annotation("example.com/replicated-at"), Some("2024-01-01T00:00:00Z"));
        assert_eq!(r.annotation("missing"), None);
    }

    // ===== apply_patch Tests =====

    #[test]
    fn test_patch_remove_data() {
        let mut r = target();
        r.apply_patch(&[PatchOperation::remove("/data")]).unwrap();
        assert!(r.data.is_none());
        assert_eq!(r.annotations.len(), 1);
    }

    #[test]
    fn test_patch_remove_missing_data_fails() {
        let mut r = ManagedResource::new(ResourceKind::ConfigMap, "ns", "n");
        let err = r.apply_patch(&[PatchOperation::remove("/data")]).unwrap_err();
        assert!(matches!(err, ReplicationError::InvalidPatch { .. }));
    }

    #[test]
    fn test_patch_add_data_key() {
        let mut r = target();
        r.apply_patch(&[PatchOperation::add("/data/c", json!("3"))]).unwrap();
        assert_eq!(r.data.unwrap().get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_patch_replace_whole_data() {
        let mut r = target();
        r.apply_patch(&[PatchOperation::replace("/data", json!({"z": "26"}))])
            .unwrap();
        let data = r.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["z"], "26");
    }

    #[test]
    fn test_patch_escaped_annotation_key() {
        let mut r = target();
        r.apply_patch(&[PatchOperation::remove(
            "/metadata/annotations/example.com~1replicated-at",
        )])
        .unwrap();
        assert!(r.annotations.is_empty());
    }

    #[test]
    fn test_patch_is_atomic() {
        let mut r = target();
        let before = r.clone();
        let result = r.apply_patch(&[
            PatchOperation::remove("/data/a"),
            PatchOperation::remove("/spec"),
        ]);
        assert!(result.is_err());
        assert_eq!(r, before);
    }

    #[test]
    fn test_patch_rejects_non_string_value() {
        let mut r = target();
        let err = r
            .apply_patch(&[PatchOperation::add("/data/n", json!(5))])
            .unwrap_err();
        assert!(err.to_string().contains("/data/n"));
    }

    // ===== WatchEvent Tests =====

    #[test]
    fn test_watch_event_resource() {
        let r = target();
        for event in [
            WatchEvent::Added(r.clone()),
            WatchEvent::Updated(r.clone()),
            WatchEvent::Deleted(r.clone()),
        ] {
            assert_eq!(event.resource(), &r);
        }
    }
}
