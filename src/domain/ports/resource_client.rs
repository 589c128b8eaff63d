//! Resource Client Port
//!
//! Defines the interface for reading and writing resources on the server.

use crate::domain::entities::ManagedResource;
use crate::domain::errors::Result;
use crate::domain::value_objects::{PatchOperation, ResourceKey, ResourceKind};
use async_trait::async_trait;

/// Client for the authoritative resource store.
///
/// Every write returns the server's copy of the object, carrying its new
/// version token. Timeouts and retries, if any, are the implementation's
/// business.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// List every resource of a kind across all namespaces.
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ManagedResource>>;

    /// Replace the whole resource server-side.
    async fn update(&self, resource: &ManagedResource) -> Result<ManagedResource>;

    /// Apply a JSON patch server-side.
    async fn patch(
        &self,
        kind: ResourceKind,
        key: &ResourceKey,
        ops: &[PatchOperation],
    ) -> Result<ManagedResource>;
}
