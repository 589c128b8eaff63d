//! Resource Cache Port
//!
//! Defines the interface for the local cache of observed resources.
//! The watch feed fills it; the engine reads from it and refreshes it with
//! the objects returned by its own writes.

use crate::domain::entities::ManagedResource;
use crate::domain::errors::Result;
use crate::domain::value_objects::ResourceKey;

/// Local, point-lookup cache of resources of one kind.
///
/// This is an outbound port. Implementations may be plain in-memory maps or
/// shared informer stores.
pub trait ResourceCache: Send + Sync {
    /// Look up a resource by key.
    ///
    /// `Ok(None)` is a miss; `Err` is a lookup failure.
    fn get_by_key(&self, key: &ResourceKey) -> Result<Option<ManagedResource>>;

    /// Insert or replace a resource.
    fn insert(&self, resource: ManagedResource);

    /// Remove a resource, returning the last cached copy.
    fn remove(&self, key: &ResourceKey) -> Option<ManagedResource>;

    /// Snapshot of every cached resource.
    fn list(&self) -> Vec<ManagedResource>;

    /// Number of cached resources.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
