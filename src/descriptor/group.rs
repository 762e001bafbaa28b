// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Shared statistics for every object of one type or in one directory.

use std::borrow::Borrow;
use std::hash::Hash;

use dashmap::DashMap;

use super::classes::{FileType, FrequencyClass, RecencyClass};

/// Running access statistics shared by a group of objects.
///
/// The live-object count acts as a reference count: the owning registry
/// drops the descriptor when it reaches zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescriptor {
    last_access_secs: u64,
    last_access_class: RecencyClass,
    accesses: u32,
    frequency: FrequencyClass,
    live_objects: usize,
}

impl GroupDescriptor {
    /// A freshly sighted group: one access, recent, no live objects yet.
    #[must_use]
    pub fn new(now_secs: u64) -> Self {
        Self {
            last_access_secs: now_secs,
            last_access_class: RecencyClass::Recent,
            accesses: 1,
            frequency: FrequencyClass::for_group(1),
            live_objects: 0,
        }
    }

    pub fn record_access(&mut self, now_secs: u64) {
        self.accesses = self.accesses.saturating_add(1);
        self.frequency = FrequencyClass::for_group(self.accesses);
        self.touch(now_secs);
    }

    /// Refresh recency without counting an access (writes).
    pub fn touch(&mut self, now_secs: u64) {
        self.last_access_class = RecencyClass::from_elapsed(self.last_access_secs, now_secs);
        self.last_access_secs = now_secs;
    }

    #[must_use]
    pub fn last_access_class(&self) -> RecencyClass {
        self.last_access_class
    }

    #[must_use]
    pub fn frequency(&self) -> FrequencyClass {
        self.frequency
    }

    #[must_use]
    pub fn accesses(&self) -> u32 {
        self.accesses
    }

    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.live_objects
    }
}

pub type TypeDescriptor = GroupDescriptor;
pub type DirectoryDescriptor = GroupDescriptor;

/// Concurrent registry of group descriptors keyed by type or directory.
#[derive(Debug)]
pub struct GroupRegistry<K: Eq + Hash> {
    groups: DashMap<K, GroupDescriptor>,
}

pub type TypeRegistry = GroupRegistry<FileType>;
pub type DirectoryRegistry = GroupRegistry<String>;

impl<K: Eq + Hash + Clone> GroupRegistry<K> {
    #[must_use]
    pub fn new() -> Self {
        Self { groups: DashMap::new() }
    }

    /// Register one more live object, creating the group on first sighting.
    ///
    /// Returns `true` when the group was created.
    pub fn attach(&self, key: K, now_secs: u64) -> bool {
        let mut created = false;
        self.groups
            .entry(key)
            .or_insert_with(|| {
                created = true;
                GroupDescriptor::new(now_secs)
            })
            .live_objects += 1;
        created
    }

    /// Release one live object; the group disappears when none remain.
    ///
    /// Returns `true` when the group was dropped.
    pub fn detach<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        // Decrement and removal share one shard lock so a concurrent attach
        // either lands before the count reaches zero or recreates the group.
        self.groups
            .remove_if_mut(key, |_, group| {
                group.live_objects = group.live_objects.saturating_sub(1);
                group.live_objects == 0
            })
            .is_some()
    }

    pub fn record_access<Q>(&self, key: &Q, now_secs: u64)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(mut group) = self.groups.get_mut(key) {
            group.record_access(now_secs);
        }
    }

    pub fn touch<Q>(&self, key: &Q, now_secs: u64)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(mut group) = self.groups.get_mut(key) {
            group.touch(now_secs);
        }
    }

    /// Snapshot of a group's statistics.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<GroupDescriptor>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.groups.get(key).map(|g| g.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for GroupRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group_is_recent_and_not_famous() {
        let g = GroupDescriptor::new(1_000);
        assert_eq!(g.accesses(), 1);
        assert_eq!(g.frequency(), FrequencyClass::NotFamous);
        assert_eq!(g.last_access_class(), RecencyClass::Recent);
        assert_eq!(g.live_objects(), 0);
    }

    #[test]
    fn test_record_access_advances_frequency() {
        let mut g = GroupDescriptor::new(0);
        g.record_access(10);
        assert_eq!(g.frequency(), FrequencyClass::NotFamous);
        g.record_access(20);
        assert_eq!(g.accesses(), 3);
        assert_eq!(g.frequency(), FrequencyClass::LessFamous);
        g.record_access(20 + 7_200);
        assert_eq!(g.last_access_class(), RecencyClass::MuchLessRecent);
    }

    #[test]
    fn test_touch_keeps_count() {
        let mut g = GroupDescriptor::new(0);
        g.touch(120);
        assert_eq!(g.accesses(), 1);
        assert_eq!(g.last_access_class(), RecencyClass::LessRecent);
    }

    #[test]
    fn test_registry_lifecycle() {
        let reg: DirectoryRegistry = GroupRegistry::new();
        reg.attach("/a".to_string(), 0);
        reg.attach("/a".to_string(), 5);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&"/a".to_string()).map(|g| g.live_objects()), Some(2));

        assert!(!reg.detach(&"/a".to_string()));
        assert!(reg.detach(&"/a".to_string()));
        assert!(reg.is_empty());
        assert!(!reg.detach(&"/a".to_string()));
    }

    #[test]
    fn test_detach_reports_drop_only_when_group_is_gone() {
        let reg: TypeRegistry = GroupRegistry::new();
        assert!(reg.attach(FileType::Image, 0));
        assert!(!reg.attach(FileType::Image, 0));

        assert!(!reg.detach(&FileType::Image));
        assert_eq!(reg.get(&FileType::Image).map(|g| g.live_objects()), Some(1));
        assert!(reg.detach(&FileType::Image));
        assert!(reg.get(&FileType::Image).is_none());
    }

    #[test]
    fn test_concurrent_attach_detach_balances_creations_and_drops() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let reg: Arc<DirectoryRegistry> = Arc::new(GroupRegistry::new());
        let created = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let created = Arc::clone(&created);
                let dropped = Arc::clone(&dropped);
                std::thread::spawn(move || {
                    for _ in 0..2000 {
                        if reg.attach("/shared".to_string(), 0) {
                            created.fetch_add(1, Ordering::Relaxed);
                        }
                        if reg.detach("/shared") {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(reg.is_empty());
        assert_eq!(created.load(Ordering::Relaxed), dropped.load(Ordering::Relaxed));
    }

    #[test]
    fn test_registry_access_on_missing_group_is_noop() {
        let reg: TypeRegistry = GroupRegistry::new();
        reg.record_access(&FileType::Video, 10);
        assert!(reg.get(&FileType::Video).is_none());
    }
}
