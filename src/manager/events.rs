// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Host event handling: create, read, write and delete.
//!
//! Every event is applied under the object's registry entry, including its
//! occupancy, recency and deleted-set side effects, so events for the same
//! key are linearized. Locks are taken in one order: registry entry first,
//! then trackers and the auxiliary maps. Events never fail; anything
//! inconsistent with the recorded position is logged and reported as
//! ignored.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tracing::{debug, error, warn};

use super::types::{CacheEvent, EventOutcome, IgnoreReason};
use super::CacheManager;
use crate::descriptor::ObjectRecord;
use crate::metrics::LatencyTimer;
use crate::position::TierPosition;

impl CacheManager {
    /// Apply a completed host-side action to the engine's view of `key`.
    ///
    /// `position` is the tier set the event happened in. Reads and writes
    /// count toward the next learning pass whether or not they applied.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn notify_update(
        &self,
        event: CacheEvent,
        key: &str,
        size: u64,
        position: TierPosition,
        last_modified_secs: u64,
    ) -> EventOutcome {
        let _timer = LatencyTimer::new("notify_update");

        let outcome = if position.is_none() {
            warn!(key, %event, "Event carried no tier position, ignoring");
            EventOutcome::Ignored(IgnoreReason::EmptyPosition)
        } else {
            match event {
                CacheEvent::Create => self.on_create(key, size, position, last_modified_secs),
                CacheEvent::Read => self.on_read(key, size, position),
                CacheEvent::Write => self.on_write(key, size, position, last_modified_secs),
                CacheEvent::Delete => self.on_delete(key, position),
            }
        };

        if event.counts_as_update() {
            self.updates.fetch_add(1, Ordering::AcqRel);
        }
        crate::metrics::record_event(event.as_str(), outcome.as_str());
        self.maybe_schedule_learning();
        outcome
    }

    fn on_create(
        &self,
        key: &str,
        size: u64,
        position: TierPosition,
        last_modified_secs: u64,
    ) -> EventOutcome {
        let now = self.now();
        let record = match self.objects.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                let mut record = ObjectRecord::new(key, size, now);
                self.types.attach(record.file_type(), now);
                self.directories.attach(record.directory().to_string(), now);
                record.set_position(position);
                record.set_last_modified(last_modified_secs);
                self.charge(position, size);
                slot.insert(record)
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                let current = record.position();
                let old_size = record.set_size(size);
                self.recharge(current, old_size, size);

                let added = TierPosition::from_bits(position.bits() & !current.bits());
                self.charge(added, size);
                record.set_position(current.combine(position));
                record.set_last_modified(last_modified_secs);
                record.set_evict_pending(false);
                slot.into_ref()
            }
        };

        self.deleted.remove(key);
        self.pending_evictions.remove(key);
        self.track(&Arc::from(key), position);
        drop(record);
        debug!(key, %position, size, "Object placed");
        EventOutcome::Applied
    }

    fn on_read(&self, key: &str, size: u64, position: TierPosition) -> EventOutcome {
        let now = self.now();
        let Some(mut record) = self.objects.get_mut(key) else {
            error!(key, "Read for an object that does not exist");
            return EventOutcome::Ignored(IgnoreReason::UnknownObject);
        };
        let current = record.position();

        if current.contains_position(position) {
            record.record_access(now);
            self.types.record_access(&record.file_type(), now);
            self.directories.record_access(record.directory(), now);
            self.touch_everywhere(key);
            EventOutcome::Applied
        } else if current.is_none() {
            // Read straight into a tier without a create: adopt the placement.
            let old_size = record.set_size(size);
            record.set_position(position);
            self.charge(position, size);
            self.track(&Arc::from(key), position);
            self.deleted.remove(key);
            drop(record);
            debug!(key, %position, old_size, size, "Read placed an unplaced object");
            EventOutcome::Applied
        } else {
            drop(record);
            warn!(
                key,
                %current,
                requested = %position,
                "Read from a tier the object does not occupy"
            );
            crate::metrics::record_inconsistent_request("read");
            EventOutcome::Ignored(IgnoreReason::InconsistentPosition)
        }
    }

    fn on_write(
        &self,
        key: &str,
        size: u64,
        position: TierPosition,
        last_modified_secs: u64,
    ) -> EventOutcome {
        let now = self.now();
        let Some(mut record) = self.objects.get_mut(key) else {
            error!(key, "Write for an object that does not exist");
            return EventOutcome::Ignored(IgnoreReason::UnknownObject);
        };
        let current = record.position();

        if current.contains_position(position) {
            let old_size = record.set_size(size);
            record.set_last_modified(last_modified_secs);
            self.types.touch(&record.file_type(), now);
            self.directories.touch(record.directory(), now);
            self.recharge(current, old_size, size);
            self.touch_everywhere(key);
            EventOutcome::Applied
        } else if current.is_none() {
            record.set_size(size);
            record.set_position(position);
            record.set_last_modified(last_modified_secs);
            self.charge(position, size);
            self.track(&Arc::from(key), position);
            self.deleted.remove(key);
            EventOutcome::Applied
        } else {
            drop(record);
            warn!(
                key,
                %current,
                requested = %position,
                "Write to a tier the object does not occupy"
            );
            crate::metrics::record_inconsistent_request("write");
            EventOutcome::Ignored(IgnoreReason::InconsistentPosition)
        }
    }

    fn on_delete(&self, key: &str, position: TierPosition) -> EventOutcome {
        let Some(mut record) = self.objects.get_mut(key) else {
            error!(key, "Delete for an object that does not exist");
            return EventOutcome::Ignored(IgnoreReason::UnknownObject);
        };
        let current = record.position();
        let size = record.size();

        if current == position {
            record.set_position(TierPosition::None);
            record.set_evict_pending(false);
            self.discharge(position, size);
            self.untrack(key, position);
            self.pending_evictions.remove(key);
            self.deleted.insert(key.to_string(), self.now());
            drop(record);
            debug!(key, %position, "Object evicted from every tier");
            EventOutcome::Applied
        } else if let Some(rest) = current.subtract(position) {
            record.set_position(rest);
            self.discharge(position, size);
            self.untrack(key, position);
            self.pending_evictions.remove(key);
            drop(record);
            debug!(key, removed = %position, remaining = %rest, "Object removed from tier");
            EventOutcome::Applied
        } else {
            drop(record);
            error!(
                key,
                %current,
                requested = %position,
                "Object does not exist in the requested tier"
            );
            crate::metrics::record_inconsistent_request("delete");
            EventOutcome::Ignored(IgnoreReason::NotInTier)
        }
    }
}
