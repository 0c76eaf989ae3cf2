/*
 Copyright (c) 2025 Mark Hughes

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as published by
 the Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

//! VersionStore owns one History per resource and computes deltas between
//! a resource's versions using the configured diff engine.
//!
//! Locking: the map of histories is behind a Mutex that is only held to look
//! up or insert a History. Each History has its own RwLock, so requests for
//! different resources never wait on each other and diffs are computed after
//! all locks have been released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use log::debug;
use parking_lot::{Mutex, RwLock};
use schnellru::{ByLength, LruMap};

use super::history::{History, HistorySummary};
use super::version::{ResourceId, Version, VersionId};
use crate::delta::{DeltaError, DiffEngine};

// TODO: tune this value
pub const DEFAULT_MAX_RESOURCES: u32 = 10_000; // When exceeded, the least recently written History is forgotten

#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Oldest versions beyond this are dropped (None keeps everything)
    pub max_versions_per_resource: Option<usize>,
    /// Histories beyond this are dropped, least recently written first
    pub max_resources: u32,
    /// Apply each delta to its base and compare with the current version before use
    pub verify_deltas: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            max_versions_per_resource: None,
            max_resources: DEFAULT_MAX_RESOURCES,
            verify_deltas: false,
        }
    }
}

/// Result of diffing a known base version against the current version
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Base and current content are identical
    Unchanged,
    /// Patch that turns the base content into the current content
    Patch(Bytes),
}

type SharedHistory = Arc<RwLock<History>>;

pub struct VersionStore {
    histories: Mutex<LruMap<ResourceId, SharedHistory>>,
    engine: Arc<dyn DiffEngine>,
    config: StoreConfig,
    /// Random per-store prefix so ids from another process never resolve here
    instance: String,
    /// Shared by all resources, so an id never names versions of two resources
    next_sequence: AtomicU64,
}

impl VersionStore {
    pub fn new(engine: Arc<dyn DiffEngine>) -> VersionStore {
        VersionStore::with_config(engine, StoreConfig::default())
    }

    pub fn with_config(engine: Arc<dyn DiffEngine>, config: StoreConfig) -> VersionStore {
        let instance = hex::encode(rand::random::<[u8; 4]>());
        debug!(
            "VersionStore {instance} using '{}' with {config:?}",
            engine.token()
        );
        VersionStore {
            histories: Mutex::new(LruMap::new(ByLength::new(config.max_resources.max(1)))),
            engine,
            config,
            instance,
            next_sequence: AtomicU64::new(1),
        }
    }

    pub fn engine(&self) -> &Arc<dyn DiffEngine> {
        &self.engine
    }

    /// The instance-manipulation token of the store's diff engine
    pub fn token(&self) -> &str {
        self.engine.token()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn history(&self, resource_id: &str) -> Option<SharedHistory> {
        self.histories.lock().peek(resource_id).map(Arc::clone)
    }

    /// Append content as the new current version of a resource, creating its
    /// History if needed, and return the new VersionId.
    pub fn add_version(&self, resource_id: &str, content: impl Into<Bytes>) -> VersionId {
        let history = {
            let mut histories = self.histories.lock();
            if let Some(history) = histories.get(resource_id).map(|history| Arc::clone(history)) {
                history
            } else {
                let history = Arc::new(RwLock::new(History::new(
                    self.config.max_versions_per_resource,
                )));
                histories.insert(resource_id.to_string(), Arc::clone(&history));
                history
            }
        };

        let content = content.into();
        let size = content.len();
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}-{sequence}", self.instance);
        history.write().add_version(id.clone(), content);
        debug!("VersionStore added version \"{id}\" ({size} bytes) for '{resource_id}'");
        id
    }

    pub fn has_version(&self, resource_id: &str, version_id: &str) -> bool {
        self.history(resource_id)
            .is_some_and(|history| history.read().has_version(version_id))
    }

    /// Compute a delta from `base_id` to the current version of the resource.
    ///
    /// Returns Ok(None) when the resource or base version is unknown (never
    /// issued, evicted, or from another resource), and `Unchanged` when the
    /// base content equals the current content.
    pub fn get_delta(
        &self,
        resource_id: &str,
        base_id: &str,
    ) -> Result<Option<DeltaOutcome>, DeltaError> {
        self.delta(resource_id, base_id, None)
    }

    /// As get_delta() but diffs against `target_id` rather than whatever is
    /// current by now. A responder uses this with the id it has just added so
    /// that a concurrent add_version() can't change the body under its ETag.
    pub fn get_delta_to(
        &self,
        resource_id: &str,
        base_id: &str,
        target_id: &str,
    ) -> Result<Option<DeltaOutcome>, DeltaError> {
        self.delta(resource_id, base_id, Some(target_id))
    }

    fn delta(
        &self,
        resource_id: &str,
        base_id: &str,
        target_id: Option<&str>,
    ) -> Result<Option<DeltaOutcome>, DeltaError> {
        let Some(history) = self.history(resource_id) else {
            return Ok(None);
        };

        // Snapshot both under one read lock, then diff without holding it
        let (base, target) = {
            let history = history.read();
            let target = match target_id {
                Some(target_id) => history.version(target_id),
                None => history.current(),
            };
            match (history.version(base_id), target) {
                (Some(base), Some(target)) => (base.content().clone(), target.content().clone()),
                _ => return Ok(None),
            }
        };

        if base == target {
            return Ok(Some(DeltaOutcome::Unchanged));
        }

        let patch = self.engine.encode(&base, &target)?;
        if self.config.verify_deltas {
            let rebuilt = self.engine.apply(&base, &patch)?;
            if rebuilt.as_slice() != target.as_ref() {
                return Err(DeltaError::Inconsistent);
            }
        }
        Ok(Some(DeltaOutcome::Patch(Bytes::from(patch))))
    }

    /// Whether a version's content equals the current content, without diffing.
    /// None when the version is unknown.
    pub fn content_matches_current(&self, resource_id: &str, version_id: &str) -> Option<bool> {
        let history = self.history(resource_id)?;
        let history = history.read();
        let version = history.version(version_id)?;
        let current = history.current()?;
        Some(version.content() == current.content())
    }

    pub fn current(&self, resource_id: &str) -> Option<Version> {
        self.history(resource_id)?.read().current().cloned()
    }

    pub fn version(&self, resource_id: &str, version_id: &str) -> Option<Version> {
        self.history(resource_id)?.read().version(version_id).cloned()
    }

    pub fn summary(&self, resource_id: &str) -> Option<HistorySummary> {
        let history = self.history(resource_id)?;
        let summary = history.read().summary(resource_id);
        Some(summary)
    }

    /// All resources with a History, sorted
    pub fn resources(&self) -> Vec<ResourceId> {
        let mut resources: Vec<ResourceId> = self
            .histories
            .lock()
            .iter()
            .map(|(resource_id, _)| resource_id.clone())
            .collect();
        resources.sort();
        resources
    }
}
