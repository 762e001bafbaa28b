// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache manager.
//!
//! The [`CacheManager`] is the orchestrator that ties together all components:
//! - Object registry plus type and directory registries
//! - Per-tier recency trackers
//! - Memory, SSD and disk occupancy counters
//! - Admission and replacement agents, each behind its own lock
//! - Batched learning passes, scheduled every N read/write events
//!
//! # Request Flow
//!
//! ```text
//! request_admission ──► encode state ──► AdmissionAgent ──► TierPosition
//! notify_update ──────► registries / trackers / counters ──► maybe schedule learning
//! request_replacement ► LRU scan ──► ReplacementAgent ──► victim key
//! ```
//!
//! # Example
//!
//! ```
//! use tiering_engine::{CacheEvent, CacheManager, Tier, TierPosition, TieringConfig};
//!
//! let manager = CacheManager::new(TieringConfig::default()).unwrap();
//!
//! // A never-seen object is always admitted to memory.
//! let position = manager.request_admission("/data/report.pdf", 4_096, false);
//! assert!(position.contains(Tier::Memory));
//!
//! manager.notify_update(CacheEvent::Create, "/data/report.pdf", 4_096, position, 0);
//! assert_eq!(manager.occupancy_bytes(Tier::Memory), 4_096);
//! assert_eq!(manager.request_replacement(Tier::Memory).as_deref(), Some("/data/report.pdf"));
//! ```

mod api;
mod events;
mod learning;
mod types;

pub use learning::LearningReport;
pub use types::{
    CacheEvent, EventOutcome, IgnoreReason, LearnerState, ManagerStats, ObjectSnapshot,
};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, TieringConfig};
use crate::descriptor::{
    DirectoryRegistry, FileType, FrequencyClass, GroupDescriptor, ObjectRecord, TypeRegistry,
};
use crate::learning::{AdmissionAgent, DecisionAgent, ReplacementAction, ReplacementAgent};
use crate::position::{Tier, TierPosition};
use crate::recency::RecencyTracker;
use crate::state::{StateFeatures, StateKey};

use learning::LearningPass;

fn tier_slot(tier: Tier) -> usize {
    match tier {
        Tier::Disk => 0,
        Tier::Ssd => 1,
        Tier::Memory => 2,
    }
}

/// Multi-tier cache admission and replacement engine.
///
/// Construct once and share via `Arc`. All methods take `&self`.
pub struct CacheManager {
    config: TieringConfig,
    clock: Arc<dyn Clock>,

    objects: Arc<DashMap<String, ObjectRecord>>,
    /// Keys fully evicted from every tier, with the eviction time.
    deleted: DashMap<String, u64>,
    types: TypeRegistry,
    directories: DirectoryRegistry,

    recency: [Mutex<RecencyTracker<Arc<str>>>; 3],
    occupancy: [AtomicU64; 3],

    /// Read/write events since the last scheduled pass.
    updates: AtomicUsize,
    /// Replacement verdicts awaiting the host's delete-or-downgrade call.
    /// Any applied create or delete of the key discards its verdict.
    pending_evictions: DashMap<String, ReplacementAction>,

    admission: Arc<Mutex<AdmissionAgent>>,
    replacement: Arc<Mutex<ReplacementAgent>>,
    passes_completed: Arc<AtomicU64>,

    learning_tx: mpsc::Sender<LearningPass>,
    learning_rx: Mutex<Option<mpsc::Receiver<LearningPass>>>,
    learner_state: watch::Sender<LearnerState>,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("tiers", &self.config.tiers)
            .field("objects", &self.objects.len())
            .field("deleted", &self.deleted.len())
            .field("learner_state", &*self.learner_state.borrow())
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    /// Create a manager using the wall clock.
    pub fn new(config: TieringConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit time source.
    ///
    /// The configuration is validated first; nothing is built if it is rejected.
    pub fn with_clock(config: TieringConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let (learning_tx, learning_rx) = mpsc::channel(config.learning_queue_capacity);
        let (learner_state, _) = watch::channel(LearnerState::Detached);
        let (shutdown, _) = watch::channel(false);

        info!(
            tiers = config.tiers,
            memory_capacity_bytes = config.memory_capacity_bytes,
            disk_capacity_bytes = config.disk_capacity_bytes,
            max_updates_before_learning = config.max_updates_before_learning,
            exploration = ?config.exploration,
            "Cache manager created"
        );

        Ok(Self {
            admission: Arc::new(Mutex::new(AdmissionAgent::new(&config))),
            replacement: Arc::new(Mutex::new(ReplacementAgent::new(&config))),
            config,
            clock,
            objects: Arc::new(DashMap::new()),
            deleted: DashMap::new(),
            types: TypeRegistry::new(),
            directories: DirectoryRegistry::new(),
            recency: Default::default(),
            occupancy: Default::default(),
            updates: AtomicUsize::new(0),
            pending_evictions: DashMap::new(),
            passes_completed: Arc::new(AtomicU64::new(0)),
            learning_tx,
            learning_rx: Mutex::new(Some(learning_rx)),
            learner_state,
            shutdown,
        })
    }

    #[must_use]
    pub fn config(&self) -> &TieringConfig {
        &self.config
    }

    fn now(&self) -> u64 {
        self.clock.now_secs()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Introspection
    // ═══════════════════════════════════════════════════════════════════════

    /// Snapshot of a live object.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<ObjectSnapshot> {
        self.objects.get(key).map(|r| ObjectSnapshot::from(&*r))
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Whether `key` was fully evicted and has not been placed again since.
    #[must_use]
    pub fn is_deleted(&self, key: &str) -> bool {
        self.deleted.contains_key(key)
    }

    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    #[must_use]
    pub fn type_descriptor(&self, file_type: FileType) -> Option<GroupDescriptor> {
        self.types.get(&file_type)
    }

    #[must_use]
    pub fn directory_descriptor(&self, directory: &str) -> Option<GroupDescriptor> {
        self.directories.get(directory)
    }

    /// Bytes currently charged to `tier`.
    #[must_use]
    pub fn occupancy_bytes(&self, tier: Tier) -> u64 {
        self.occupancy[tier_slot(tier)].load(Ordering::Acquire)
    }

    /// Keys tracked in `tier`, least recently used first.
    #[must_use]
    pub fn recency_order(&self, tier: Tier) -> Vec<String> {
        self.recency[tier_slot(tier)]
            .lock()
            .iter_lru()
            .map(|k| k.to_string())
            .collect()
    }

    /// Current admission values for `state`, if it has been seen.
    #[must_use]
    pub fn admission_row(&self, state: StateKey) -> Option<Vec<f64>> {
        self.admission.lock().store().row(state).map(<[f64]>::to_vec)
    }

    /// Current replacement values for `state`, if it has been seen.
    #[must_use]
    pub fn replacement_row(&self, state: StateKey) -> Option<Vec<f64>> {
        self.replacement.lock().store().row(state).map(<[f64]>::to_vec)
    }

    /// State key an object would be judged under right now.
    #[must_use]
    pub fn state_of(&self, key: &str) -> Option<StateKey> {
        self.features_of(key).and_then(|(features, _)| features.encode().ok())
    }

    /// Run `f` against the admission agent under its lock.
    pub fn with_admission_agent<R>(&self, f: impl FnOnce(&mut AdmissionAgent) -> R) -> R {
        f(&mut self.admission.lock())
    }

    /// Run `f` against the replacement agent under its lock.
    pub fn with_replacement_agent<R>(&self, f: impl FnOnce(&mut ReplacementAgent) -> R) -> R {
        f(&mut self.replacement.lock())
    }

    /// Set the learning rate of both agents.
    pub fn reset_alpha(&self, alpha: f64) {
        self.admission.lock().store_mut().reset_alpha(alpha);
        self.replacement.lock().store_mut().reset_alpha(alpha);
        info!(alpha, "Learning rate reset");
    }

    /// Reset every learned value to the configured initial vectors.
    pub fn reset_q_values(&self) {
        self.admission
            .lock()
            .store_mut()
            .reset_values(&self.config.admission_initial_q);
        self.replacement
            .lock()
            .store_mut()
            .reset_values(&self.config.replacement_initial_q);
        info!("Q-values reset to initial vectors");
    }

    /// Manager-wide counters.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        let (admission_pending, admission_states) = {
            let agent = self.admission.lock();
            (agent.pending_decisions(), agent.store().len())
        };
        let (replacement_pending, replacement_states) = {
            let agent = self.replacement.lock();
            (agent.pending_decisions(), agent.store().len())
        };
        let memory_bytes = self.occupancy_bytes(Tier::Memory);
        let disk_bytes = self.occupancy_bytes(Tier::Disk);
        ManagerStats {
            objects: self.objects.len(),
            deleted: self.deleted.len(),
            types: self.types.len(),
            directories: self.directories.len(),
            memory_bytes,
            ssd_bytes: self.occupancy_bytes(Tier::Ssd),
            disk_bytes,
            memory_ratio: ratio(memory_bytes, self.config.memory_capacity_bytes),
            disk_ratio: ratio(disk_bytes, self.config.disk_capacity_bytes),
            admission_pending,
            replacement_pending,
            admission_states,
            replacement_states,
            pending_evictions: self.pending_evictions.len(),
            updates_since_pass: self.updates.load(Ordering::Acquire),
            passes_completed: self.passes_completed.load(Ordering::Acquire),
        }
    }

    /// Push registry, occupancy and agent gauges to the metrics recorder.
    pub fn update_gauge_metrics(&self) {
        let stats = self.stats();
        crate::metrics::set_registry_size("objects", stats.objects);
        crate::metrics::set_registry_size("deleted", stats.deleted);
        crate::metrics::set_registry_size("types", stats.types);
        crate::metrics::set_registry_size("directories", stats.directories);
        for tier in Tier::ALL {
            crate::metrics::set_occupancy_bytes(tier.as_str(), self.occupancy_bytes(tier));
            let tracked = self.recency[tier_slot(tier)].lock().len();
            crate::metrics::set_recency_entries(tier.as_str(), tracked);
        }
        crate::metrics::set_occupancy_ratio(Tier::Memory.as_str(), stats.memory_ratio);
        crate::metrics::set_occupancy_ratio(Tier::Disk.as_str(), stats.disk_ratio);
        crate::metrics::set_pending_decisions("admission", stats.admission_pending);
        crate::metrics::set_pending_decisions("replacement", stats.replacement_pending);
        crate::metrics::set_q_table_states("admission", stats.admission_states);
        crate::metrics::set_q_table_states("replacement", stats.replacement_states);
    }

    /// Drop an object from every registry, releasing its tiers and groups.
    ///
    /// Returns `false` if the key is unknown.
    pub fn forget(&self, key: &str) -> bool {
        let Entry::Occupied(slot) = self.objects.entry(key.to_string()) else {
            return false;
        };
        let record = slot.get();
        self.discharge(record.position(), record.size());
        self.untrack(key, record.position());
        let type_dropped = self.types.detach(&record.file_type());
        let directory_dropped = self.directories.detach(record.directory());
        self.pending_evictions.remove(key);
        self.deleted.remove(key);
        slot.remove();
        info!(
            key,
            type_dropped,
            directory_dropped,
            "Object forgotten"
        );
        true
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internal helpers
    // ═══════════════════════════════════════════════════════════════════════

    /// Features and position of a live object.
    fn features_of(&self, key: &str) -> Option<(StateFeatures, TierPosition)> {
        let record = self.objects.get(key)?;
        let now = self.now();
        let file_type = self
            .types
            .get(&record.file_type())
            .unwrap_or_else(|| GroupDescriptor::new(now));
        let directory = self
            .directories
            .get(record.directory())
            .unwrap_or_else(|| GroupDescriptor::new(now));
        Some((
            StateFeatures::from_descriptors(&record, &file_type, &directory),
            record.position(),
        ))
    }

    fn frequency_of(objects: &DashMap<String, ObjectRecord>, key: &str) -> Option<FrequencyClass> {
        objects.get(key).map(|r| r.frequency())
    }

    fn charge(&self, position: TierPosition, bytes: u64) {
        for tier in position.tiers() {
            self.occupancy[tier_slot(tier)].fetch_add(bytes, Ordering::AcqRel);
        }
    }

    fn discharge(&self, position: TierPosition, bytes: u64) {
        for tier in position.tiers() {
            let _ = self.occupancy[tier_slot(tier)].fetch_update(
                Ordering::AcqRel,
                Ordering::Acquire,
                |v| Some(v.saturating_sub(bytes)),
            );
        }
    }

    /// Correct the charge of every tier in `position` for a size change.
    fn recharge(&self, position: TierPosition, old: u64, new: u64) {
        if new >= old {
            self.charge(position, new - old);
        } else {
            self.discharge(position, old - new);
        }
    }

    fn track(&self, key: &Arc<str>, position: TierPosition) {
        for tier in position.tiers() {
            self.recency[tier_slot(tier)].lock().touch(Arc::clone(key));
        }
    }

    fn untrack(&self, key: &str, position: TierPosition) {
        for tier in position.tiers() {
            self.recency[tier_slot(tier)].lock().remove(key);
        }
    }

    /// Refresh `key` in every tracker that holds it.
    fn touch_everywhere(&self, key: &str) {
        for tracker in &self.recency {
            tracker.lock().touch_existing(key);
        }
    }
}

fn ratio(used: u64, capacity: u64) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        used as f64 / capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    pub(super) fn create_test_manager() -> CacheManager {
        create_test_manager_with(TieringConfig {
            memory_capacity_bytes: 10_000,
            memory_threshold_percent: 50,
            disk_capacity_bytes: 100_000,
            disk_threshold_percent: 50,
            max_updates_before_learning: 1_000,
            rng_seed: Some(11),
            ..Default::default()
        })
    }

    pub(super) fn create_test_manager_with(config: TieringConfig) -> CacheManager {
        CacheManager::with_clock(config, Arc::new(ManualClock::new(1_000_000))).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = CacheManager::new(TieringConfig { tiers: 9, ..Default::default() });
        assert!(matches!(result, Err(ConfigError::TierCount(9))));
    }

    #[test]
    fn test_new_manager_is_empty() {
        let manager = create_test_manager();
        let stats = manager.stats();
        assert_eq!(stats.objects, 0);
        assert_eq!(stats.memory_bytes, 0);
        assert_eq!(stats.passes_completed, 0);
        assert_eq!(*manager.learner_state_receiver().borrow(), LearnerState::Detached);
    }

    #[test]
    fn test_charge_and_discharge_per_tier() {
        let manager = create_test_manager();
        manager.charge(TierPosition::DiskMemory, 100);
        assert_eq!(manager.occupancy_bytes(Tier::Memory), 100);
        assert_eq!(manager.occupancy_bytes(Tier::Disk), 100);
        assert_eq!(manager.occupancy_bytes(Tier::Ssd), 0);

        manager.recharge(TierPosition::Memory, 100, 40);
        assert_eq!(manager.occupancy_bytes(Tier::Memory), 40);

        // never wraps below zero
        manager.discharge(TierPosition::Memory, 1_000);
        assert_eq!(manager.occupancy_bytes(Tier::Memory), 0);
    }

    #[test]
    fn test_forget_releases_everything() {
        let manager = create_test_manager();
        manager.request_admission("/a/x.txt", 10, false);
        manager.notify_update(CacheEvent::Create, "/a/x.txt", 10, TierPosition::Memory, 0);
        assert_eq!(manager.type_count(), 1);
        assert_eq!(manager.directory_count(), 1);

        assert!(manager.forget("/a/x.txt"));
        assert_eq!(manager.object_count(), 0);
        assert_eq!(manager.type_count(), 0);
        assert_eq!(manager.directory_count(), 0);
        assert_eq!(manager.occupancy_bytes(Tier::Memory), 0);
        assert!(manager.recency_order(Tier::Memory).is_empty());
        assert!(!manager.forget("/a/x.txt"));
    }

    #[test]
    fn test_shared_groups_survive_partial_forget() {
        let manager = create_test_manager();
        manager.request_admission("/a/x.txt", 10, false);
        manager.request_admission("/a/y.txt", 10, false);
        assert_eq!(manager.directory_descriptor("/a").map(|d| d.live_objects()), Some(2));
        manager.forget("/a/x.txt");
        assert_eq!(manager.directory_descriptor("/a").map(|d| d.live_objects()), Some(1));
        assert_eq!(manager.type_count(), 1);
    }

    #[test]
    fn test_reset_q_values_and_alpha() {
        let manager = create_test_manager();
        manager.request_admission("/a/x.txt", 10, false);
        let state = manager.state_of("/a/x.txt").unwrap();
        manager.with_admission_agent(|agent| agent.store_mut().set_value(state, 0, 9.0));
        assert_eq!(manager.admission_row(state).map(|r| r[0]), Some(9.0));

        manager.reset_q_values();
        assert_eq!(manager.admission_row(state).map(|r| r[0]), Some(0.5));

        manager.reset_alpha(0.3);
        let alpha = manager.with_admission_agent(|agent| agent.store_mut().get_alpha(state, 0));
        assert_eq!(alpha, 0.3);
    }

    #[test]
    fn test_update_gauge_metrics_runs_without_recorder() {
        let manager = create_test_manager();
        manager.request_admission("/a/x.txt", 10, false);
        manager.update_gauge_metrics();
    }
}
