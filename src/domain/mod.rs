//! Domain Layer
//!
//! Resources, replication metadata, the ports the engine talks through and
//! the bookkeeping services it is built from. Nothing here performs I/O.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{ManagedResource, WatchEvent};
pub use errors::ReplicationError;
pub use value_objects::{AnnotationKeys, PatchOp, PatchOperation, ResourceKey, ResourceKind};
