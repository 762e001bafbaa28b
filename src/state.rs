// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! State encoding.
//!
//! Nine 2-bit features are packed into an 18-bit key, field `i` at bit
//! offset `2 * i`:
//!
//! ```text
//!  17 16 15 14 13 12 11 10  9  8  7  6  5  4  3  2  1  0
//! ├─────┼─────┼─────┼─────┼─────┼─────┼─────┼─────┼─────┤
//! │dfreq│dacc │tfreq│tacc │type │freq │acc  │mod  │size │
//! ```

use thiserror::Error;

use crate::descriptor::{GroupDescriptor, ObjectRecord};

/// Number of features in a state.
pub const FEATURE_COUNT: usize = 9;

/// Bits per feature.
pub const BITS_PER_FEATURE: u32 = 2;

const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "size",
    "last_modified",
    "last_access",
    "frequency",
    "file_type",
    "type_last_access",
    "type_frequency",
    "directory_last_access",
    "directory_frequency",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("feature '{feature}' has ordinal {ordinal}, which does not fit in 2 bits")]
    OrdinalOutOfRange { feature: &'static str, ordinal: u8 },
}

/// Packed state key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey(u32);

impl StateKey {
    /// Largest possible key (all fields at ordinal 3).
    pub const MAX: StateKey = StateKey((1 << (FEATURE_COUNT as u32 * BITS_PER_FEATURE)) - 1);

    /// Pack nine ordinals, in field order.
    pub fn encode(ordinals: [u8; FEATURE_COUNT]) -> Result<StateKey, EncodingError> {
        let mut key = 0u32;
        for (i, ordinal) in ordinals.into_iter().enumerate() {
            if ordinal > 3 {
                return Err(EncodingError::OrdinalOutOfRange {
                    feature: FEATURE_NAMES[i],
                    ordinal,
                });
            }
            key |= u32::from(ordinal) << (i as u32 * BITS_PER_FEATURE);
        }
        Ok(StateKey(key))
    }

    /// Unpack back into the nine ordinals.
    #[must_use]
    pub fn decode(self) -> [u8; FEATURE_COUNT] {
        let mut ordinals = [0u8; FEATURE_COUNT];
        for (i, slot) in ordinals.iter_mut().enumerate() {
            *slot = ((self.0 >> (i as u32 * BITS_PER_FEATURE)) & 0b11) as u8;
        }
        ordinals
    }

    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl From<StateKey> for u32 {
    fn from(key: StateKey) -> u32 {
        key.0
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Feature snapshot of one object and its two groups.
///
/// Built while the registries are locked, encoded after they are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFeatures {
    pub ordinals: [u8; FEATURE_COUNT],
}

impl StateFeatures {
    #[must_use]
    pub fn from_descriptors(
        object: &ObjectRecord,
        file_type: &GroupDescriptor,
        directory: &GroupDescriptor,
    ) -> Self {
        Self {
            ordinals: [
                object.size_class().ordinal(),
                object.last_modified_class().ordinal(),
                object.last_access_class().ordinal(),
                object.frequency().ordinal(),
                object.file_type().ordinal(),
                file_type.last_access_class().ordinal(),
                file_type.frequency().ordinal(),
                directory.last_access_class().ordinal(),
                directory.frequency().ordinal(),
            ],
        }
    }

    pub fn encode(&self) -> Result<StateKey, EncodingError> {
        StateKey::encode(self.ordinals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offsets() {
        assert_eq!(StateKey::encode([1, 0, 0, 0, 0, 0, 0, 0, 0]).map(StateKey::raw), Ok(1));
        assert_eq!(StateKey::encode([0, 1, 0, 0, 0, 0, 0, 0, 0]).map(StateKey::raw), Ok(4));
        assert_eq!(StateKey::encode([0, 0, 0, 0, 0, 0, 0, 0, 3]).map(StateKey::raw), Ok(3 << 16));
        assert_eq!(StateKey::encode([3; 9]), Ok(StateKey::MAX));
        assert_eq!(StateKey::MAX.raw(), 0x3FFFF);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = StateKey::encode([0, 0, 0, 4, 0, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err, EncodingError::OrdinalOutOfRange { feature: "frequency", ordinal: 4 });
        assert!(err.to_string().contains("frequency"));
    }

    #[test]
    fn test_decode_inverts_encode() {
        let ordinals = [3, 2, 1, 0, 1, 2, 3, 0, 2];
        let key = StateKey::encode(ordinals).unwrap();
        assert_eq!(key.decode(), ordinals);
    }

    #[test]
    fn test_features_from_descriptors() {
        let obj = ObjectRecord::new("/a/b.mp4", 2_000, 0);
        let group = GroupDescriptor::new(0);
        let features = StateFeatures::from_descriptors(&obj, &group, &group);
        // medium size, video type, everything else at zero
        assert_eq!(features.ordinals, [1, 0, 0, 0, 2, 0, 0, 0, 0]);
        assert_eq!(features.encode().map(StateKey::raw), Ok(1 | (2 << 8)));
    }
}
