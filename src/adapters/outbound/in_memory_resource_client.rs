//! In-Memory Resource Client
//!
//! Implements ResourceClient against an in-process object store that behaves
//! like the API server: every write assigns a fresh version token, updates
//! carrying a stale version are rejected, and patches are applied
//! server-side.

use crate::domain::entities::ManagedResource;
use crate::domain::errors::ReplicationError;
use crate::domain::ports::ResourceClient;
use crate::domain::value_objects::{PatchOperation, ResourceKey, ResourceKind};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct InMemoryResourceClient {
    objects: DashMap<(ResourceKind, ResourceKey), ManagedResource>,
    version: AtomicU64,
    updates: AtomicU64,
    patches: AtomicU64,
}

impl InMemoryResourceClient {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            version: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            patches: AtomicU64::new(0),
        }
    }

    /// Create or overwrite an object, as an external writer would.
    pub fn create(&self, resource: ManagedResource) -> ManagedResource {
        let stored = resource.with_version(self.next_version());
        self.objects
            .insert((stored.kind, stored.key()), stored.clone());
        stored
    }

    pub fn get(&self, kind: ResourceKind, key: &ResourceKey) -> Option<ManagedResource> {
        self.objects
            .get(&(kind, key.clone()))
            .map(|e| e.value().clone())
    }

    pub fn delete(&self, kind: ResourceKind, key: &ResourceKey) -> Option<ManagedResource> {
        self.objects.remove(&(kind, key.clone())).map(|(_, r)| r)
    }

    /// Number of successful `update` calls.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::SeqCst)
    }

    /// Number of successful `patch` calls.
    pub fn patch_count(&self) -> u64 {
        self.patches.load(Ordering::SeqCst)
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

impl Default for InMemoryResourceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceClient for InMemoryResourceClient {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ManagedResource>, ReplicationError> {
        let mut items: Vec<ManagedResource> = self
            .objects
            .iter()
            .filter(|e| e.key().0 == kind)
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|r| r.key());
        Ok(items)
    }

    async fn update(&self, resource: &ManagedResource) -> Result<ManagedResource, ReplicationError> {
        let key = resource.key();
        let mut entry = self
            .objects
            .get_mut(&(resource.kind, key.clone()))
            .ok_or_else(|| ReplicationError::not_found(&key))?;

        if !resource.version.is_empty() && resource.version != entry.version {
            return Err(ReplicationError::StoreWrite {
                key: key.to_string(),
                message: format!(
                    "conflict: object has been modified (have {}, got {})",
                    entry.version, resource.version
                ),
            });
        }

        let stored = resource.clone().with_version(self.next_version());
        *entry = stored.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        key: &ResourceKey,
        ops: &[PatchOperation],
    ) -> Result<ManagedResource, ReplicationError> {
        let mut entry = self
            .objects
            .get_mut(&(kind, key.clone()))
            .ok_or_else(|| ReplicationError::not_found(key))?;

        let mut patched = entry.clone();
        patched
            .apply_patch(ops)
            .map_err(|e| ReplicationError::StoreWrite {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        patched.version = self.next_version();

        *entry = patched.clone();
        self.patches.fetch_add(1, Ordering::SeqCst);
        Ok(patched)
    }
}
