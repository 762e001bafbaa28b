// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tier placement algebra.
//!
//! A [`TierPosition`] is one of the eight subsets of {disk, ssd, memory}.
//! The discriminant doubles as a bitmask, so union is a bitwise OR and
//! subset tests are a bitwise AND:
//!
//! ```text
//!   bit 2    bit 1    bit 0
//! ┌────────┬────────┬────────┐
//! │ Memory │  Ssd   │  Disk  │
//! └────────┴────────┴────────┘
//!   None=0  Disk=1  Ssd=2  DiskSsd=3  Memory=4  DiskMemory=5  SsdMemory=6  All=7
//! ```
//!
//! # Example
//!
//! ```
//! use tiering_engine::{Tier, TierPosition};
//!
//! let p = TierPosition::Disk.combine(TierPosition::Memory);
//! assert_eq!(p, TierPosition::DiskMemory);
//! assert_eq!(p.highest_tier(), TierPosition::Memory);
//! assert_eq!(p.exclude(Tier::Memory), Some(TierPosition::Disk));
//! assert_eq!(TierPosition::Disk.exclude(Tier::Memory), None);
//! ```

use std::cmp::Ordering;

/// A single physical storage tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Disk,
    Ssd,
    Memory,
}

impl Tier {
    /// All tiers, slowest first.
    pub const ALL: [Tier; 3] = [Tier::Disk, Tier::Ssd, Tier::Memory];

    /// The single-tier position for this tier.
    #[must_use]
    pub fn position(self) -> TierPosition {
        match self {
            Tier::Disk => TierPosition::Disk,
            Tier::Ssd => TierPosition::Ssd,
            Tier::Memory => TierPosition::Memory,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Disk => "disk",
            Tier::Ssd => "ssd",
            Tier::Memory => "memory",
        }
    }

    fn bit(self) -> u8 {
        self.position() as u8
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of tiers an object currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TierPosition {
    /// Not cached anywhere.
    #[default]
    None = 0,
    Disk = 1,
    Ssd = 2,
    DiskSsd = 3,
    Memory = 4,
    DiskMemory = 5,
    SsdMemory = 6,
    DiskSsdMemory = 7,
}

impl TierPosition {
    /// Every position in ordinal order.
    pub const ALL: [TierPosition; 8] = [
        TierPosition::None,
        TierPosition::Disk,
        TierPosition::Ssd,
        TierPosition::DiskSsd,
        TierPosition::Memory,
        TierPosition::DiskMemory,
        TierPosition::SsdMemory,
        TierPosition::DiskSsdMemory,
    ];

    const ONE_TIER: [TierPosition; 2] = [TierPosition::None, TierPosition::Memory];
    const TWO_TIERS: [TierPosition; 4] = [
        TierPosition::None,
        TierPosition::Disk,
        TierPosition::Memory,
        TierPosition::DiskMemory,
    ];

    /// Positions reachable in a deployment with `tier_count` tiers.
    ///
    /// One tier is memory only, two tiers are memory plus disk, three tiers
    /// admit every combination. The index into the returned slice is the
    /// admission agent's action index.
    #[must_use]
    pub fn valid_positions(tier_count: u8) -> &'static [TierPosition] {
        match tier_count {
            0 => &[],
            1 => &Self::ONE_TIER,
            2 => &Self::TWO_TIERS,
            _ => &Self::ALL,
        }
    }

    /// Whether this position is reachable with `tier_count` tiers.
    #[must_use]
    pub fn is_valid_for(self, tier_count: u8) -> bool {
        Self::valid_positions(tier_count).contains(&self)
    }

    /// Build a position from its 3-bit mask. Higher bits are ignored.
    #[must_use]
    pub fn from_bits(bits: u8) -> TierPosition {
        Self::ALL[(bits & 0b111) as usize]
    }

    /// The 3-bit mask (also the ordinal).
    #[must_use]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Union of two positions.
    #[must_use]
    pub fn combine(self, other: TierPosition) -> TierPosition {
        Self::from_bits(self.bits() | other.bits())
    }

    /// This position with `tier` removed.
    ///
    /// Returns `None` when `tier` is not part of the position, or when
    /// removing it would leave the object nowhere.
    #[must_use]
    pub fn exclude(self, tier: Tier) -> Option<TierPosition> {
        if !self.contains(tier) {
            return None;
        }
        match Self::from_bits(self.bits() & !tier.bit()) {
            TierPosition::None => None,
            rest => Some(rest),
        }
    }

    /// This position with every tier of `other` removed.
    ///
    /// Same contract as [`exclude`](Self::exclude), generalized to a set of
    /// tiers: `other` must be a non-empty subset and something must remain.
    #[must_use]
    pub fn subtract(self, other: TierPosition) -> Option<TierPosition> {
        if other.is_none() || !self.contains_position(other) {
            return None;
        }
        match Self::from_bits(self.bits() & !other.bits()) {
            TierPosition::None => None,
            rest => Some(rest),
        }
    }

    #[must_use]
    pub fn contains(self, tier: Tier) -> bool {
        self.bits() & tier.bit() != 0
    }

    /// Whether every tier of `other` is part of this position.
    #[must_use]
    pub fn contains_position(self, other: TierPosition) -> bool {
        self.bits() & other.bits() == other.bits()
    }

    /// The fastest tier held, as a single-tier position (`None` when empty).
    #[must_use]
    pub fn highest_tier(self) -> TierPosition {
        if self.contains(Tier::Memory) {
            TierPosition::Memory
        } else if self.contains(Tier::Ssd) {
            TierPosition::Ssd
        } else if self.contains(Tier::Disk) {
            TierPosition::Disk
        } else {
            TierPosition::None
        }
    }

    /// Compare positions by their highest tier.
    #[must_use]
    pub fn compare_highest(self, other: TierPosition) -> Ordering {
        self.highest_tier().bits().cmp(&other.highest_tier().bits())
    }

    /// The single tiers making up this position, slowest first.
    pub fn tiers(self) -> impl Iterator<Item = Tier> {
        Tier::ALL.into_iter().filter(move |t| self.contains(*t))
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        self == TierPosition::None
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TierPosition::None => "none",
            TierPosition::Disk => "disk",
            TierPosition::Ssd => "ssd",
            TierPosition::DiskSsd => "disk_ssd",
            TierPosition::Memory => "memory",
            TierPosition::DiskMemory => "disk_memory",
            TierPosition::SsdMemory => "ssd_memory",
            TierPosition::DiskSsdMemory => "disk_ssd_memory",
        }
    }
}

impl std::fmt::Display for TierPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed form of [`TierPosition::compare_highest`]: -1, 0 or 1.
#[must_use]
pub fn compare_highest_signum(a: TierPosition, b: TierPosition) -> i8 {
    match a.compare_highest(b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}
