//! Application Layer
//!
//! Use cases built on the domain: the replication engine, the store facade
//! it writes through, and the controller loop that feeds it events.

mod controller;
mod replication_engine;
mod stats;
mod store_adapter;

pub use controller::Controller;
pub use replication_engine::{ReplicationEngine, SyncOutcome};
pub use stats::EngineStats;
pub use store_adapter::StoreAdapter;
