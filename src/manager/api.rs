// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Decision API: admission, replacement, delete-or-downgrade and misses.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use super::{tier_slot, CacheManager};
use crate::descriptor::ObjectRecord;
use crate::learning::{AdmissionRequest, ReplacementAction};
use crate::metrics::LatencyTimer;
use crate::position::{Tier, TierPosition};

impl CacheManager {
    /// Decide which tiers `key` should be placed in.
    ///
    /// Unknown objects are registered at [`TierPosition::None`] first. The
    /// decision is logged for the next learning pass.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn request_admission(&self, key: &str, size: u64, is_read: bool) -> TierPosition {
        let _timer = LatencyTimer::new("request_admission");
        self.ensure_object(key, size);

        let Some((features, current)) = self.features_of(key) else {
            // forgotten between registration and lookup
            return TierPosition::None;
        };
        let state = match features.encode() {
            Ok(state) => state,
            Err(e) => {
                warn!(key, error = %e, "Cannot encode object state, keeping current position");
                crate::metrics::record_encoding_error("admission");
                return current;
            }
        };

        let request = AdmissionRequest {
            state,
            object_key: Arc::from(key),
            current,
            is_read,
            memory_used_bytes: self.occupancy_bytes(Tier::Memory),
            disk_used_bytes: self.occupancy_bytes(Tier::Disk),
        };
        let position = self.admission.lock().act(&request);

        crate::metrics::record_admission(position.as_str(), is_read);
        debug!(key, %state, %current, %position, "Admission decided");
        position
    }

    /// Pick a victim from `tier`, scanning from the least recently used end.
    ///
    /// The first candidate the replacement agent wants gone is returned and
    /// its verdict remembered for [`request_delete_or_downgrade`]. If none is
    /// chosen within the scan limit the least recently used key is returned.
    /// `None` means the tier tracks nothing.
    ///
    /// [`request_delete_or_downgrade`]: Self::request_delete_or_downgrade
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn request_replacement(&self, tier: Tier) -> Option<String> {
        let _timer = LatencyTimer::new("request_replacement");
        let candidates = self.recency[tier_slot(tier)]
            .lock()
            .lru_items(self.config.max_recency_scan);

        let Some(oldest) = candidates.first() else {
            debug!(%tier, "No objects tracked in tier, nothing to replace");
            crate::metrics::record_replacement(tier.as_str(), "empty", 0);
            return None;
        };

        for (scanned, key) in candidates.iter().enumerate() {
            let Some((features, current)) = self.features_of(key) else {
                continue;
            };
            let state = match features.encode() {
                Ok(state) => state,
                Err(e) => {
                    warn!(key = %key, error = %e, "Cannot encode candidate state, skipping");
                    crate::metrics::record_encoding_error("replacement");
                    continue;
                }
            };
            let action = self.replacement.lock().act(state, key, current);
            if action.is_evict() {
                self.pending_evictions.insert(key.to_string(), action);
                crate::metrics::record_replacement(tier.as_str(), action.as_str(), scanned + 1);
                debug!(key = %key, %tier, %action, "Replacement victim chosen");
                return Some(key.to_string());
            }
        }

        crate::metrics::record_replacement(tier.as_str(), "lru_fallback", candidates.len());
        debug!(key = %oldest, %tier, "No candidate chosen, falling back to least recent");
        Some(oldest.to_string())
    }

    /// Whether a victim should be kept at a lower tier (`true`) or deleted
    /// outright (`false`).
    ///
    /// Reuses the verdict from [`request_replacement`](Self::request_replacement)
    /// when there is one. Unknown keys are downgraded.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn request_delete_or_downgrade(&self, key: &str) -> bool {
        let _timer = LatencyTimer::new("request_delete_or_downgrade");
        if !self.objects.contains_key(key) {
            self.pending_evictions.remove(key);
            crate::metrics::record_delete_or_downgrade("unknown");
            return true;
        }

        let remembered = self.pending_evictions.remove(key).map(|(_, action)| action);
        let action = match remembered {
            Some(action) => action,
            None => {
                let Some((features, current)) = self.features_of(key) else {
                    return true;
                };
                match features.encode() {
                    Ok(state) => self.replacement.lock().act(state, &Arc::from(key), current),
                    Err(e) => {
                        warn!(key, error = %e, "Cannot encode object state, downgrading");
                        crate::metrics::record_encoding_error("delete_or_downgrade");
                        return true;
                    }
                }
            }
        };

        if action.is_evict() {
            if let Some(mut record) = self.objects.get_mut(key) {
                record.set_evict_pending(true);
            }
        }

        let downgrade = action != ReplacementAction::EvictToNone;
        crate::metrics::record_delete_or_downgrade(if downgrade { "downgrade" } else { "delete" });
        debug!(key, %action, downgrade, "Delete-or-downgrade decided");
        downgrade
    }

    /// Record a host-side miss for `key`, correcting its size.
    pub fn record_miss(&self, key: &str, size: u64) {
        let Some(mut record) = self.objects.get_mut(key) else {
            info!(key, "Miss reported for an object never seen");
            crate::metrics::record_miss(false);
            return;
        };
        let old_size = record.set_size(size);
        record.record_miss();
        self.recharge(record.position(), old_size, size);
        drop(record);
        crate::metrics::record_miss(true);
    }

    /// Register `key` at no tier if it is not known yet.
    pub(super) fn ensure_object(&self, key: &str, size: u64) {
        if self.objects.contains_key(key) {
            return;
        }
        let now = self.now();
        if let Entry::Vacant(slot) = self.objects.entry(key.to_string()) {
            let record = ObjectRecord::new(key, size, now);
            self.types.attach(record.file_type(), now);
            self.directories.attach(record.directory().to_string(), now);
            slot.insert(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::create_test_manager;
    use super::super::CacheEvent;
    use super::*;
    use crate::descriptor::FrequencyClass;
    use crate::learning::DecisionAgent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Counts ERROR-level events.
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Create `key` in disk + memory and make evict-to-none its learned favourite.
    fn create_doomed(manager: &CacheManager, key: &str) {
        manager.notify_update(CacheEvent::Create, key, 10, TierPosition::DiskMemory, 0);
        let state = manager.state_of(key).unwrap();
        manager.with_replacement_agent(|agent| agent.store_mut().set_value(state, 2, 4.0));
    }

    #[test]
    fn test_new_object_admitted_to_memory() {
        let manager = create_test_manager();
        let position = manager.request_admission("/a/b.txt", 500, false);
        assert!(position.contains(Tier::Memory));

        let snap = manager.object("/a/b.txt").unwrap();
        assert_eq!(snap.position, TierPosition::None);
        assert_eq!(snap.size, 500);
        assert_eq!(snap.frequency, FrequencyClass::NotFamous);
        assert_eq!(manager.type_count(), 1);
        assert_eq!(manager.directory_count(), 1);
        assert_eq!(manager.stats().admission_pending, 1);
    }

    #[test]
    fn test_repeat_admission_does_not_duplicate_groups() {
        let manager = create_test_manager();
        manager.request_admission("/a/b.txt", 500, false);
        manager.request_admission("/a/b.txt", 500, false);
        assert_eq!(manager.directory_descriptor("/a").map(|d| d.live_objects()), Some(1));
        assert_eq!(manager.object_count(), 1);
    }

    #[test]
    fn test_replacement_on_empty_tier() {
        let manager = create_test_manager();
        assert_eq!(manager.request_replacement(Tier::Disk), None);
    }

    #[test]
    fn test_empty_tier_is_not_logged_as_error() {
        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(Arc::clone(&errors)));
        let manager = create_test_manager();

        tracing::subscriber::with_default(subscriber, || {
            assert_eq!(manager.request_replacement(Tier::Ssd), None);
        });
        assert_eq!(errors.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_replacement_falls_back_to_least_recent() {
        let manager = create_test_manager();
        for key in ["/a/1.txt", "/a/2.txt", "/a/3.txt"] {
            manager.notify_update(CacheEvent::Create, key, 10, TierPosition::Memory, 0);
        }
        // fresh states tie at 0.5, so the agent keeps every candidate
        assert_eq!(manager.request_replacement(Tier::Memory).as_deref(), Some("/a/1.txt"));
        assert_eq!(manager.stats().replacement_pending, 3);
    }

    #[test]
    fn test_replacement_remembers_verdict() {
        let manager = create_test_manager();
        manager.notify_update(CacheEvent::Create, "/a/1.txt", 10, TierPosition::DiskMemory, 0);
        let state = manager.state_of("/a/1.txt").unwrap();
        manager.with_replacement_agent(|agent| {
            agent.store_mut().set_value(state, 2, 4.0);
        });

        assert_eq!(manager.request_replacement(Tier::Memory).as_deref(), Some("/a/1.txt"));
        let pending = manager.stats().replacement_pending;

        // remembered evict-to-none means delete, and no second decision is logged
        assert!(!manager.request_delete_or_downgrade("/a/1.txt"));
        assert_eq!(manager.stats().replacement_pending, pending);
        assert!(manager.object("/a/1.txt").unwrap().evict_pending);
    }

    #[test]
    fn test_delete_event_discards_remembered_verdict() {
        let manager = create_test_manager();
        create_doomed(&manager, "/a/1.txt");
        assert_eq!(manager.request_replacement(Tier::Memory).as_deref(), Some("/a/1.txt"));
        assert_eq!(manager.stats().pending_evictions, 1);

        // host evicts from memory without asking delete-or-downgrade
        manager.notify_update(CacheEvent::Delete, "/a/1.txt", 10, TierPosition::Memory, 0);
        assert_eq!(manager.stats().pending_evictions, 0);
        assert!(!manager.object("/a/1.txt").unwrap().evict_pending);

        // a later verdict is decided afresh, so a new decision is logged
        let pending = manager.stats().replacement_pending;
        manager.request_delete_or_downgrade("/a/1.txt");
        assert_eq!(manager.stats().replacement_pending, pending + 1);
    }

    #[test]
    fn test_create_event_discards_remembered_verdict() {
        let manager = create_test_manager();
        create_doomed(&manager, "/a/1.txt");
        manager.request_replacement(Tier::Memory);
        assert_eq!(manager.stats().pending_evictions, 1);

        manager.notify_update(CacheEvent::Create, "/a/1.txt", 10, TierPosition::Ssd, 0);
        assert_eq!(manager.stats().pending_evictions, 0);
    }

    #[test]
    fn test_full_delete_discards_remembered_verdict() {
        let manager = create_test_manager();
        create_doomed(&manager, "/a/1.txt");
        manager.request_replacement(Tier::Disk);
        manager.notify_update(CacheEvent::Delete, "/a/1.txt", 10, TierPosition::DiskMemory, 0);
        assert_eq!(manager.stats().pending_evictions, 0);
        assert!(manager.is_deleted("/a/1.txt"));
    }

    #[test]
    fn test_delete_or_downgrade_decides_fresh() {
        let manager = create_test_manager();
        manager.notify_update(CacheEvent::Create, "/a/1.txt", 10, TierPosition::Disk, 0);
        // fresh state: not-evict wins the tie, which means keep
        assert!(manager.request_delete_or_downgrade("/a/1.txt"));
        assert!(!manager.object("/a/1.txt").unwrap().evict_pending);
        assert_eq!(manager.stats().replacement_pending, 1);
    }

    #[test]
    fn test_delete_or_downgrade_unknown_key() {
        let manager = create_test_manager();
        assert!(manager.request_delete_or_downgrade("/nope"));
        assert_eq!(manager.stats().replacement_pending, 0);
    }

    #[test]
    fn test_memory_only_victim_is_downgraded() {
        let manager = create_test_manager();
        manager.notify_update(CacheEvent::Create, "/a/1.txt", 10, TierPosition::Memory, 0);
        let state = manager.state_of("/a/1.txt").unwrap();
        manager.with_replacement_agent(|agent| agent.store_mut().set_value(state, 2, 4.0));
        assert!(manager.request_delete_or_downgrade("/a/1.txt"));
    }

    #[test]
    fn test_record_miss_corrects_size() {
        let manager = create_test_manager();
        manager.notify_update(CacheEvent::Create, "/a/1.txt", 100, TierPosition::DiskMemory, 0);
        manager.record_miss("/a/1.txt", 40);

        let snap = manager.object("/a/1.txt").unwrap();
        assert_eq!(snap.size, 40);
        assert_eq!(snap.misses, 1);
        assert_eq!(manager.occupancy_bytes(Tier::Memory), 40);
        assert_eq!(manager.occupancy_bytes(Tier::Disk), 40);

        manager.record_miss("/unknown", 1);
        assert_eq!(manager.object_count(), 1);
    }
}
