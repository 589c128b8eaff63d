mod resource_cache;
mod resource_client;

pub use resource_cache::ResourceCache;
pub use resource_client::ResourceClient;
