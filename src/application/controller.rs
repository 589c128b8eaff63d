//! Replication Controller
//!
//! Owns one [`ReplicationEngine`] and feeds it watch events strictly one at
//! a time. Applies each event to the local cache before dispatching it and
//! periodically redelivers every cached object as an update (resync).

use crate::application::replication_engine::ReplicationEngine;
use crate::application::stats::EngineStats;
use crate::domain::entities::WatchEvent;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub struct Controller {
    engine: ReplicationEngine,
    resync_interval: Duration,
}

impl Controller {
    pub fn new(engine: ReplicationEngine, resync_interval: Duration) -> Self {
        Self {
            engine,
            resync_interval,
        }
    }

    pub fn engine(&self) -> &ReplicationEngine {
        &self.engine
    }

    /// Apply one event to the cache and hand it to the engine.
    pub async fn handle(&mut self, event: WatchEvent) {
        let cache = self.engine.store().cache().clone();
        match event {
            WatchEvent::Added(resource) | WatchEvent::Updated(resource) => {
                cache.insert(resource.clone());
                self.engine.on_upsert(&resource).await;
            }
            WatchEvent::Deleted(resource) => {
                cache.remove(&resource.key());
                self.engine.on_delete(&resource).await;
            }
        }
    }

    /// Redeliver every cached resource as an update.
    ///
    /// Each object is re-read right before dispatch so writes made earlier
    /// in the same pass are seen. Returns the number of objects delivered.
    pub async fn resync(&mut self) -> usize {
        let cache = self.engine.store().cache().clone();
        let mut keys: Vec<_> = cache.list().iter().map(|r| r.key()).collect();
        keys.sort();

        let mut delivered = 0;
        for key in keys {
            match cache.get_by_key(&key) {
                Ok(Some(current)) => {
                    self.engine.on_upsert(&current).await;
                    delivered += 1;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("resync could not read {}: {}", key, e),
            }
        }

        tracing::info!(
            "{} resync delivered {} objects ({})",
            self.engine.store().kind(),
            delivered,
            self.engine.stats()
        );
        delivered
    }

    /// Process events until shutdown or until the feed closes.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<WatchEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> EngineStats {
        let kind = self.engine.store().kind();
        tracing::info!(
            "running {} controller (resync every {:?})",
            kind,
            self.resync_interval
        );

        let mut resync = interval_at(Instant::now() + self.resync_interval, self.resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("{} controller shutting down", kind);
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        tracing::info!("{} event feed closed", kind);
                        break;
                    }
                },
                _ = resync.tick() => {
                    self.resync().await;
                }
            }
        }

        self.engine.stats().clone()
    }
}
