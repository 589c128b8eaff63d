mod dashmap_resource_cache;
mod http_resource_client;
mod in_memory_resource_client;

pub use dashmap_resource_cache::DashMapResourceCache;
pub use http_resource_client::{from_wire, to_wire, ApiClientConfig, HttpResourceClient};
pub use in_memory_resource_client::InMemoryResourceClient;
