// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-object record.

use super::classes::{directory_of, FileType, FrequencyClass, RecencyClass, SizeClass};
use crate::position::TierPosition;

/// Everything the engine knows about one cached object.
///
/// Type and directory statistics live in their registries; the record only
/// holds the keys needed to find them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    key: String,
    size: u64,
    size_class: SizeClass,
    last_modified_secs: u64,
    last_modified_class: RecencyClass,
    last_access_secs: u64,
    last_access_class: RecencyClass,
    accesses: u32,
    frequency: FrequencyClass,
    file_type: FileType,
    directory: String,
    position: TierPosition,
    evict: bool,
    misses: u32,
}

impl ObjectRecord {
    /// A newly sighted object. Creation counts as the first access.
    #[must_use]
    pub fn new(key: impl Into<String>, size: u64, now_secs: u64) -> Self {
        let key = key.into();
        let file_type = FileType::from_key(&key);
        let directory = directory_of(&key).to_string();
        Self {
            size,
            size_class: SizeClass::from_bytes(size),
            last_modified_secs: now_secs,
            last_modified_class: RecencyClass::Recent,
            last_access_secs: now_secs,
            last_access_class: RecencyClass::Recent,
            accesses: 1,
            frequency: FrequencyClass::for_object(1),
            file_type,
            directory,
            position: TierPosition::None,
            evict: false,
            misses: 0,
            key,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Update the size, returning the previous one.
    pub fn set_size(&mut self, size: u64) -> u64 {
        let old = self.size;
        self.size = size;
        self.size_class = SizeClass::from_bytes(size);
        old
    }

    #[must_use]
    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    pub fn set_last_modified(&mut self, secs: u64) {
        self.last_modified_class = RecencyClass::from_elapsed(self.last_modified_secs, secs);
        self.last_modified_secs = secs;
    }

    #[must_use]
    pub fn last_modified_secs(&self) -> u64 {
        self.last_modified_secs
    }

    #[must_use]
    pub fn last_modified_class(&self) -> RecencyClass {
        self.last_modified_class
    }

    /// Count one access and refresh the access recency.
    pub fn record_access(&mut self, now_secs: u64) {
        self.accesses = self.accesses.saturating_add(1);
        self.frequency = FrequencyClass::for_object(self.accesses);
        self.last_access_class = RecencyClass::from_elapsed(self.last_access_secs, now_secs);
        self.last_access_secs = now_secs;
    }

    #[must_use]
    pub fn last_access_class(&self) -> RecencyClass {
        self.last_access_class
    }

    #[must_use]
    pub fn accesses(&self) -> u32 {
        self.accesses
    }

    #[must_use]
    pub fn frequency(&self) -> FrequencyClass {
        self.frequency
    }

    #[must_use]
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    #[must_use]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    #[must_use]
    pub fn position(&self) -> TierPosition {
        self.position
    }

    pub fn set_position(&mut self, position: TierPosition) {
        self.position = position;
    }

    #[must_use]
    pub fn is_evict_pending(&self) -> bool {
        self.evict
    }

    pub fn set_evict_pending(&mut self, evict: bool) {
        self.evict = evict;
    }

    #[must_use]
    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn record_miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }
}
