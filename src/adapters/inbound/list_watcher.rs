//! List Watcher
//!
//! Turns periodic `list` calls into a stream of watch events by diffing each
//! listing against the previous one. Objects whose version token changed are
//! reported as updates; objects that disappeared are reported as deletions
//! carrying their last known state.

use crate::domain::entities::{ManagedResource, WatchEvent};
use crate::domain::errors::ReplicationError;
use crate::domain::ports::ResourceClient;
use crate::domain::value_objects::{ResourceKey, ResourceKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

pub struct ListWatcher {
    kind: ResourceKind,
    client: Arc<dyn ResourceClient>,
    poll_interval: Duration,
    known: HashMap<ResourceKey, ManagedResource>,
}

impl ListWatcher {
    pub fn new(kind: ResourceKind, client: Arc<dyn ResourceClient>, poll_interval: Duration) -> Self {
        Self {
            kind,
            client,
            poll_interval,
            known: HashMap::new(),
        }
    }

    /// Number of objects seen in the last successful listing.
    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// List once and return the changes since the previous listing.
    ///
    /// Additions and updates come first in listing order, deletions last in
    /// key order. On error the previous listing is kept.
    pub async fn poll(&mut self) -> Result<Vec<WatchEvent>, ReplicationError> {
        let listed = self.client.list(self.kind).await?;

        let mut events = Vec::new();
        let mut current = HashMap::with_capacity(listed.len());
        for resource in listed {
            let key = resource.key();
            match self.known.remove(&key) {
                None => events.push(WatchEvent::Added(resource.clone())),
                Some(previous) if previous.version != resource.version => {
                    events.push(WatchEvent::Updated(resource.clone()))
                }
                Some(_) => {}
            }
            current.insert(key, resource);
        }

        let mut gone: Vec<ManagedResource> = self.known.drain().map(|(_, r)| r).collect();
        gone.sort_by_key(|r| r.key());
        events.extend(gone.into_iter().map(WatchEvent::Deleted));

        self.known = current;
        Ok(events)
    }

    /// Poll until shutdown, forwarding events to the controller.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn spawn(
        mut self,
        events: mpsc::Sender<WatchEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "watching {} (poll every {:?})",
                self.kind,
                self.poll_interval
            );
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {}
                }

                let batch = match self.poll().await {
                    Ok(batch) => batch,
                    Err(e) => {
                        tracing::warn!("{} list failed: {}", self.kind, e);
                        continue;
                    }
                };

                if !batch.is_empty() {
                    tracing::debug!("{} watcher observed {} changes", self.kind, batch.len());
                }
                for event in batch {
                    if events.send(event).await.is_err() {
                        tracing::info!("{} event consumer gone, stopping watcher", self.kind);
                        return;
                    }
                }
            }

            tracing::info!("{} watcher stopped", self.kind);
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::InMemoryResourceClient;
    use crate::domain::value_objects::PatchOperation;
    use async_trait::async_trait;

    fn setup() -> (ListWatcher, Arc<InMemoryResourceClient>) {
        let client = Arc::new(InMemoryResourceClient::new());
        let watcher = ListWatcher::new(ResourceKind::ConfigMap, client.clone(), Duration::from_millis(10));
        (watcher, client)
    }

    fn config_map(ns: &str, name: &str) -> ManagedResource {
        ManagedResource::new(ResourceKind::ConfigMap, ns, name).with_data("k", "v")
    }

    fn names(events: &[WatchEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| {
                let tag = match e {
                    WatchEvent::Added(_) => "added",
                    WatchEvent::Updated(_) => "updated",
                    WatchEvent::Deleted(_) => "deleted",
                };
                format!("{} {}", tag, e.resource().key())
            })
            .collect()
    }

    // ===== Poll Tests =====

    #[tokio::test]
    async fn test_first_poll_reports_everything_added() {
        let (mut watcher, client) = setup();
        client.create(config_map("ns", "b"));
        client.create(config_map("ns", "a"));

        let events = watcher.poll().await.unwrap();

        assert_eq!(names(&events), vec!["added ns/a", "added ns/b"]);
        assert_eq!(watcher.known_count(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_listing_is_quiet() {
        let (mut watcher, client) = setup();
        client.create(config_map("ns", "a"));
        watcher.poll().await.unwrap();

        assert!(watcher.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_version_change_is_update() {
        let (mut watcher, client) = setup();
        let a = client.create(config_map("ns", "a"));
        watcher.poll().await.unwrap();

        client
            .patch(ResourceKind::ConfigMap, &a.key(), &[PatchOperation::remove("/data")])
            .await
            .unwrap();
        let events = watcher.poll().await.unwrap();

        assert_eq!(names(&events), vec!["updated ns/a"]);
        assert!(events[0].resource().data.is_none());
    }

    #[tokio::test]
    async fn test_disappearance_is_delete_with_last_state() {
        let (mut watcher, client) = setup();
        let a = client.create(config_map("ns", "a"));
        client.create(config_map("ns", "b"));
        watcher.poll().await.unwrap();

        client.delete(ResourceKind::ConfigMap, &a.key());
        let events = watcher.poll().await.unwrap();

        assert_eq!(names(&events), vec!["deleted ns/a"]);
        assert_eq!(events[0].resource(), &a);
        assert_eq!(watcher.known_count(), 1);
    }

    #[tokio::test]
    async fn test_only_watches_its_kind() {
        let (mut watcher, client) = setup();
        client.create(ManagedResource::new(ResourceKind::Secret, "ns", "s"));

        assert!(watcher.poll().await.unwrap().is_empty());
    }

    struct FailingClient;

    #[async_trait]
    impl ResourceClient for FailingClient {
        async fn list(&self, _: ResourceKind) -> Result<Vec<ManagedResource>, ReplicationError> {
            Err(ReplicationError::StoreRead {
                key: "configmaps".to_string(),
                message: "connection refused".to_string(),
            })
        }

        async fn update(&self, r: &ManagedResource) -> Result<ManagedResource, ReplicationError> {
            Err(ReplicationError::not_found(r.key()))
        }

        async fn patch(
            &self,
            _: ResourceKind,
            key: &ResourceKey,
            _: &[PatchOperation],
        ) -> Result<ManagedResource, ReplicationError> {
            Err(ReplicationError::not_found(key))
        }
    }

    #[tokio::test]
    async fn test_poll_error_propagates() {
        let mut watcher = ListWatcher::new(
            ResourceKind::ConfigMap,
            Arc::new(FailingClient),
            Duration::from_millis(10),
        );
        let err = watcher.poll().await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    // ===== Spawn Tests =====

    #[tokio::test]
    async fn test_spawn_forwards_events_and_stops_on_shutdown() {
        let (watcher, client) = setup();
        client.create(config_map("ns", "a"));
        let (tx, mut rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = watcher.spawn(tx, shutdown_rx);

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event")
            .unwrap();
        assert!(matches!(first, WatchEvent::Added(_)));

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_spawn_stops_when_consumer_dropped() {
        let (watcher, client) = setup();
        client.create(config_map("ns", "a"));
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        drop(rx);

        let handle = watcher.spawn(tx, shutdown_rx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}
