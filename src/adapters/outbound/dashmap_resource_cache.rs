//! DashMap Resource Cache
//!
//! Implements ResourceCache using DashMap.

use crate::domain::entities::ManagedResource;
use crate::domain::errors::ReplicationError;
use crate::domain::ports::ResourceCache;
use crate::domain::value_objects::ResourceKey;
use dashmap::DashMap;

/// DashMap-backed cache of observed resources, keyed by `namespace/name`.
pub struct DashMapResourceCache {
    resources: DashMap<ResourceKey, ManagedResource>,
}

impl DashMapResourceCache {
    pub fn new() -> Self {
        Self {
            resources: DashMap::new(),
        }
    }
}

impl Default for DashMapResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache for DashMapResourceCache {
    fn get_by_key(&self, key: &ResourceKey) -> Result<Option<ManagedResource>, ReplicationError> {
        Ok(self.resources.get(key).map(|e| e.value().clone()))
    }

    fn insert(&self, resource: ManagedResource) {
        self.resources.insert(resource.key(), resource);
    }

    fn remove(&self, key: &ResourceKey) -> Option<ManagedResource> {
        self.resources.remove(key).map(|(_, r)| r)
    }

    fn list(&self) -> Vec<ManagedResource> {
        self.resources.iter().map(|e| e.value().clone()).collect()
    }

    fn len(&self) -> usize {
        self.resources.len()
    }
}
