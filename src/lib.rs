//! resource-replicator Library
//!
//! Mirrors the data of annotated config maps and secrets from a source
//! object into any number of target objects, subject to the source's
//! namespace allow-list. Exposed as a library for integration tests and
//! embedding.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::inbound::ListWatcher;
pub use adapters::outbound::{
    ApiClientConfig, DashMapResourceCache, HttpResourceClient, InMemoryResourceClient,
};
pub use application::{Controller, EngineStats, ReplicationEngine, StoreAdapter, SyncOutcome};
pub use config::{load_config, Config, ConfigError};
pub use domain::entities::{ManagedResource, WatchEvent};
pub use domain::errors::ReplicationError;
pub use domain::ports::{ResourceCache, ResourceClient};
pub use domain::services::{DependencyIndex, PermissionPolicy, PolicyDecision, StringSet};
pub use domain::value_objects::{AnnotationKeys, PatchOperation, ResourceKey, ResourceKind};
pub use infrastructure::Shutdown;
