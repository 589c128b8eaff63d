//! resource-replicator - annotation-driven config map and secret replication
//!
//! This is the composition root that wires together all the components.

use anyhow::Context;
use resource_replicator::adapters::inbound::ListWatcher;
use resource_replicator::adapters::outbound::{DashMapResourceCache, HttpResourceClient};
use resource_replicator::application::{Controller, ReplicationEngine, StoreAdapter};
use resource_replicator::config::load_config;
use resource_replicator::domain::ports::ResourceClient;
use resource_replicator::infrastructure::{wait_for_signal, Shutdown};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of each watcher-to-controller event channel.
const EVENT_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;
    cfg.validate().context("invalid configuration")?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    let kinds = cfg.resource_kinds();
    tracing::info!(
        "starting resource-replicator api={} kinds={:?} prefix={}",
        cfg.api_url,
        kinds,
        cfg.annotation_prefix
    );

    // ===== COMPOSITION ROOT =====

    // 1. Shared outbound client
    let client: Arc<dyn ResourceClient> = Arc::new(HttpResourceClient::new(cfg.api_client_config())?);

    let shutdown = Shutdown::new();
    let mut watchers = Vec::new();
    let mut controllers = Vec::new();

    // 2. One cache, engine, controller and watcher per kind
    for kind in kinds {
        let cache = Arc::new(DashMapResourceCache::new());
        let store = StoreAdapter::new(kind, cache, client.clone());
        let engine = ReplicationEngine::new(store, cfg.annotation_keys());
        let controller = Controller::new(engine, cfg.resync_interval());

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let watcher = ListWatcher::new(kind, client.clone(), cfg.poll_interval());
        watchers.push(watcher.spawn(tx, shutdown.subscribe()));
        controllers.push((kind, tokio::spawn(controller.run(rx, shutdown.subscribe()))));
    }

    // 3. Run until signalled
    wait_for_signal(shutdown).await;

    for handle in watchers {
        if let Err(e) = handle.await {
            tracing::error!("watcher task failed: {}", e);
        }
    }
    for (kind, handle) in controllers {
        match handle.await {
            Ok(stats) => tracing::info!("{} controller stopped ({})", kind, stats),
            Err(e) => tracing::error!("{} controller task failed: {}", kind, e),
        }
    }

    Ok(())
}
