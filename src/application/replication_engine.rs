//! Replication Engine - Main application use case
//!
//! Reacts to upsert and delete events for one resource kind:
//! 1. Re-syncs every dependent of a changed source (cascade)
//! 2. Registers links declared by targets and syncs them (link)
//! 3. Clears the mirrored data of dependents when a source disappears
//!
//! Events must be delivered one at a time; the engine owns its
//! [`DependencyIndex`] and takes `&mut self` for every event.

use crate::application::stats::EngineStats;
use crate::application::store_adapter::StoreAdapter;
use crate::domain::entities::ManagedResource;
use crate::domain::errors::ReplicationError;
use crate::domain::services::{DependencyIndex, PermissionPolicy, PolicyDecision};
use crate::domain::value_objects::{AnnotationKeys, PatchOperation, ResourceKey};
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;

/// Result of a successful [`ReplicationEngine::synchronize`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The target was written; carries the server's copy
    Replicated(ManagedResource),
    /// The target already reflects this source version; nothing was written
    UpToDate,
}

pub struct ReplicationEngine {
    store: StoreAdapter,
    keys: AnnotationKeys,
    policy: PermissionPolicy,
    index: DependencyIndex,
    stats: EngineStats,
}

impl ReplicationEngine {
    pub fn new(store: StoreAdapter, keys: AnnotationKeys) -> Self {
        let policy = PermissionPolicy::new(keys.allowed_namespaces.clone());
        Self {
            store,
            keys,
            policy,
            index: DependencyIndex::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn store(&self) -> &StoreAdapter {
        &self.store
    }

    pub fn annotation_keys(&self) -> &AnnotationKeys {
        &self.keys
    }

    pub fn dependency_index(&self) -> &DependencyIndex {
        &self.index
    }

    pub fn permission_policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Handle a created or updated resource.
    pub async fn on_upsert(&mut self, resource: &ManagedResource) {
        self.stats.events += 1;
        let kind = self.store.kind();
        let key = resource.key().to_string();

        if self.index.has_dependents(&key) {
            let dependents = self.index.dependents(&key);
            tracing::info!("{} {} has {} dependents", kind, key, dependents.len());
            for dependent_key in dependents {
                self.update_dependent(resource, &dependent_key).await;
            }
        }

        let Some(link) = resource.annotation(&self.keys.replicate_from) else {
            return;
        };
        tracing::debug!("{} {} is replicated from {}", kind, key, link);

        let source_key = match ResourceKey::parse(link) {
            Some(parsed) if parsed.to_string() != key => parsed.to_string(),
            _ => {
                let err = ReplicationError::MalformedLink {
                    key,
                    value: link.to_string(),
                };
                tracing::warn!("{}", err);
                return;
            }
        };

        let source = match self.store.fetch(&source_key) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("could not get source {} {} for {}: {}", kind, source_key, key, e);
                return;
            }
        };

        self.index.record_edge(&source_key, &key);
        self.sync_and_log(resource, &source).await;
    }

    /// Handle a deleted resource: clear the data of every live dependent.
    pub async fn on_delete(&mut self, resource: &ManagedResource) {
        self.stats.events += 1;
        let kind = self.store.kind();
        let key = resource.key().to_string();
        self.policy.forget(&key);

        let Some(dependents) = self.index.get(&key).map(|set| set.values()) else {
            tracing::debug!("{} {} has no dependents and can be deleted without issues", kind, key);
            return;
        };

        for dependent_key in dependents {
            let target = match self.store.fetch(&dependent_key) {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!("could not load dependent {} {}: {}", kind, dependent_key, e);
                    self.index.remove_edge(&key, &dependent_key);
                    continue;
                }
            };

            let patch = vec![PatchOperation::remove("/data")];
            tracing::info!("clearing dependent {} {}", kind, dependent_key);
            tracing::debug!("patch for {}: {:?}", dependent_key, patch);

            match self.store.write_patch(&target.key(), &patch).await {
                Ok(_) => self.stats.cleared += 1,
                Err(e) => {
                    self.stats.failed += 1;
                    tracing::error!("error while patching {} {}: {}", kind, dependent_key, e);
                }
            }
        }
    }

    /// Mirror `source` into `target`.
    ///
    /// Source keys overwrite target keys; target-only keys are kept. The
    /// cached target is only replaced after the server accepted the write.
    pub async fn synchronize(
        &mut self,
        target: &ManagedResource,
        source: &ManagedResource,
    ) -> Result<SyncOutcome, ReplicationError> {
        if let PolicyDecision::Denied { reason } = self.policy.check(source, target) {
            self.stats.denied += 1;
            return Err(ReplicationError::PermissionDenied { reason });
        }

        if target.annotation(&self.keys.replicated_from_version) == Some(source.version.as_str()) {
            self.stats.up_to_date += 1;
            return Ok(SyncOutcome::UpToDate);
        }

        let mut copy = target.clone();
        let data = copy.data.get_or_insert_with(BTreeMap::new);
        if let Some(source_data) = &source.data {
            for (k, v) in source_data {
                data.insert(k.clone(), v.clone());
            }
        }

        copy.annotations.insert(
            self.keys.replicated_at.clone(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        copy.annotations.insert(
            self.keys.replicated_from_version.clone(),
            source.version.clone(),
        );

        tracing::info!("updating {} {} from {}", self.store.kind(), target.key(), source.key());

        match self.store.write_update(&copy).await {
            Ok(updated) => {
                self.stats.replicated += 1;
                Ok(SyncOutcome::Replicated(updated))
            }
            Err(e) => {
                self.stats.failed += 1;
                Err(e)
            }
        }
    }

    async fn update_dependent(&mut self, source: &ManagedResource, dependent_key: &str) {
        let kind = self.store.kind();
        tracing::debug!("updating dependent {} {} -> {}", kind, source.key(), dependent_key);

        match self.store.fetch(dependent_key) {
            Ok(target) => self.sync_and_log(&target, source).await,
            Err(e) => {
                tracing::warn!("could not get dependent {} {}: {}", kind, dependent_key, e);
            }
        }
    }

    async fn sync_and_log(&mut self, target: &ManagedResource, source: &ManagedResource) {
        let kind = self.store.kind();
        match self.synchronize(target, source).await {
            Ok(SyncOutcome::Replicated(updated)) => {
                tracing::debug!("{} {} now at version {}", kind, updated.key(), updated.version);
            }
            Ok(SyncOutcome::UpToDate) => {
                tracing::debug!("{} {} is already up-to-date", kind, target.key());
            }
            Err(ReplicationError::PermissionDenied { reason }) => {
                tracing::warn!("{}", reason);
            }
            Err(e) => {
                tracing::error!(
                    "could not replicate {} {} into {}: {}",
                    kind,
                    source.key(),
                    target.key(),
                    e
                );
            }
        }
    }
}
