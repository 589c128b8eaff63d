//! Store Adapter
//!
//! Translates engine intents into calls against the cache and the client
//! ports, and keeps the cache consistent with every successful write.

use crate::domain::entities::ManagedResource;
use crate::domain::errors::{ReplicationError, Result};
use crate::domain::ports::{ResourceCache, ResourceClient};
use crate::domain::value_objects::{PatchOperation, ResourceKey, ResourceKind};
use std::sync::Arc;

/// Engine-facing facade over the local cache and the server client for one kind.
#[derive(Clone)]
pub struct StoreAdapter {
    kind: ResourceKind,
    cache: Arc<dyn ResourceCache>,
    client: Arc<dyn ResourceClient>,
}

impl StoreAdapter {
    pub fn new(
        kind: ResourceKind,
        cache: Arc<dyn ResourceCache>,
        client: Arc<dyn ResourceClient>,
    ) -> Self {
        Self { kind, cache, client }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn cache(&self) -> &Arc<dyn ResourceCache> {
        &self.cache
    }

    /// Fetch a resource from the local cache by its `namespace/name` key.
    ///
    /// A miss (including an unparseable key) is [`ReplicationError::NotFound`].
    pub fn fetch(&self, key: &str) -> Result<ManagedResource> {
        let parsed = ResourceKey::parse(key).ok_or_else(|| ReplicationError::not_found(key))?;
        self.cache
            .get_by_key(&parsed)?
            .ok_or_else(|| ReplicationError::not_found(key))
    }

    /// Replace the resource server-side and cache the returned object.
    pub async fn write_update(
        &self,
        resource: &ManagedResource,
    ) -> Result<ManagedResource> {
        let updated = self.client.update(resource).await?;
        self.cache.insert(updated.clone());
        Ok(updated)
    }

    /// Patch the resource server-side and cache the returned object.
    pub async fn write_patch(
        &self,
        key: &ResourceKey,
        ops: &[PatchOperation],
    ) -> Result<ManagedResource> {
        let patched = self.client.patch(self.kind, key, ops).await?;
        self.cache.insert(patched.clone());
        Ok(patched)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::{DashMapResourceCache, InMemoryResourceClient};

    fn setup() -> (StoreAdapter, Arc<DashMapResourceCache>, Arc<InMemoryResourceClient>) {
        let cache = Arc::new(DashMapResourceCache::new());
        let client = Arc::new(InMemoryResourceClient::new());
        let store = StoreAdapter::new(ResourceKind::ConfigMap, cache.clone(), client.clone());
        (store, cache, client)
    }

    #[test]
    fn test_fetch_hit() {
        let (store, cache, _) = setup();
        cache.insert(ManagedResource::new(ResourceKind::ConfigMap, "ns", "a"));

        let found = store.fetch("ns/a").unwrap();
        assert_eq!(found.name, "a");
    }

    #[test]
    fn test_fetch_miss_is_not_found() {
        let (store, _, _) = setup();
        assert!(store.fetch("ns/missing").unwrap_err().is_not_found());
        assert!(store.fetch("garbage").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_write_update_refreshes_cache() {
        let (store, cache, client) = setup();
        let created = client.create(ManagedResource::new(ResourceKind::ConfigMap, "ns", "a"));
        cache.insert(created.clone());

        let updated = store
            .write_update(&created.clone().with_data("k", "v"))
            .await
            .unwrap();

        assert_ne!(updated.version, created.version);
        let cached = store.fetch("ns/a").unwrap();
        assert_eq!(cached.version, updated.version);
        assert_eq!(cached.data.unwrap()["k"], "v");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let (store, cache, _) = setup();
        let ghost = ManagedResource::new(ResourceKind::ConfigMap, "ns", "ghost").with_version("1");
        cache.insert(ghost.clone());

        let result = store.write_update(&ghost.clone().with_data("k", "v")).await;

        assert!(result.is_err());
        assert_eq!(store.fetch("ns/ghost").unwrap(), ghost);
    }

    #[tokio::test]
    async fn test_write_patch_refreshes_cache() {
        let (store, cache, client) = setup();
        let created = client.create(
            ManagedResource::new(ResourceKind::ConfigMap, "ns", "a").with_data("k", "v"),
        );
        cache.insert(created.clone());

        store
            .write_patch(&created.key(), &[PatchOperation::remove("/data")])
            .await
            .unwrap();

        assert!(store.fetch("ns/a").unwrap().data.is_none());
    }
}
