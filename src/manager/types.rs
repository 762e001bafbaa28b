// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the cache manager.

use crate::descriptor::{FileType, FrequencyClass, ObjectRecord};
use crate::position::TierPosition;

/// Host-side change to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    /// Object placed in (or re-added to) a tier.
    Create,
    Read,
    Write,
    /// Object removed from a tier.
    Delete,
}

impl CacheEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }

    /// Whether this event counts toward the next learning pass.
    #[must_use]
    pub fn counts_as_update(self) -> bool {
        matches!(self, Self::Read | Self::Write)
    }
}

impl std::fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an event left the engine's state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The key has never been seen.
    UnknownObject,
    /// Delete from a tier the object does not occupy.
    NotInTier,
    /// Read or write for a tier that contradicts the recorded position.
    InconsistentPosition,
    /// Event carried an empty position.
    EmptyPosition,
}

impl IgnoreReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownObject => "unknown_object",
            Self::NotInTier => "not_in_tier",
            Self::InconsistentPosition => "inconsistent_position",
            Self::EmptyPosition => "empty_position",
        }
    }
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`super::CacheManager::notify_update`].
///
/// Events never fail; an ignored event is logged and reported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl EventOutcome {
    #[must_use]
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Ignored(reason) => reason.as_str(),
        }
    }
}

/// Learning worker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnerState {
    /// No worker attached; passes only run through `run_learning_pass`.
    Detached,
    /// Worker waiting for a pass request.
    Idle,
    /// Worker applying a pass.
    Learning,
    Stopped,
}

impl std::fmt::Display for LearnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detached => write!(f, "Detached"),
            Self::Idle => write!(f, "Idle"),
            Self::Learning => write!(f, "Learning"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Point-in-time copy of one object's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSnapshot {
    pub key: String,
    pub size: u64,
    pub position: TierPosition,
    pub accesses: u32,
    pub frequency: FrequencyClass,
    pub misses: u32,
    pub evict_pending: bool,
    pub file_type: FileType,
    pub directory: String,
    pub last_modified_secs: u64,
}

impl From<&ObjectRecord> for ObjectSnapshot {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            key: record.key().to_string(),
            size: record.size(),
            position: record.position(),
            accesses: record.accesses(),
            frequency: record.frequency(),
            misses: record.misses(),
            evict_pending: record.is_evict_pending(),
            file_type: record.file_type(),
            directory: record.directory().to_string(),
            last_modified_secs: record.last_modified_secs(),
        }
    }
}

/// Manager-wide counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerStats {
    pub objects: usize,
    pub deleted: usize,
    pub types: usize,
    pub directories: usize,
    pub memory_bytes: u64,
    pub ssd_bytes: u64,
    pub disk_bytes: u64,
    /// Memory bytes over capacity (0 when capacity is 0).
    pub memory_ratio: f64,
    pub disk_ratio: f64,
    pub admission_pending: usize,
    pub replacement_pending: usize,
    pub admission_states: usize,
    pub replacement_states: usize,
    /// Replacement verdicts not yet consumed by delete-or-downgrade or an eviction.
    pub pending_evictions: usize,
    pub updates_since_pass: usize,
    pub passes_completed: u64,
}
