//! Feature bitmasks
//!
//! A `FeatureSet` holds one 64-bit mask for a single feature kind. Bit `i`
//! set means feature code `i` is present.

use crate::modules::feature::Feature;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// 64-bit mask of feature codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(u64);

impl FeatureSet {
    /// The empty set
    pub const EMPTY: FeatureSet = FeatureSet(0);

    /// Wrap a raw mask
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        FeatureSet(bits)
    }

    /// Build a set from features, ignoring their architecture
    pub fn from_features<I: IntoIterator<Item = Feature>>(features: I) -> Self {
        features.into_iter().fold(FeatureSet::EMPTY, |set, f| set.with(f))
    }

    /// Raw mask
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether the bit for `code` is set
    #[inline]
    pub const fn contains_code(self, code: u32) -> bool {
        code < 64 && (self.0 >> code) & 1 == 1
    }

    /// Whether the bit for `feature` is set
    #[inline]
    pub const fn contains(self, feature: Feature) -> bool {
        self.0 & feature.mask() != 0
    }

    /// Whether every bit of `other` is also set here
    #[inline]
    pub const fn is_superset_of(self, other: FeatureSet) -> bool {
        other.0 & !self.0 == 0
    }

    /// Copy with `feature` added
    #[inline]
    #[must_use]
    pub const fn with(self, feature: Feature) -> Self {
        FeatureSet(self.0 | feature.mask())
    }

    /// Copy with `feature` removed
    #[inline]
    #[must_use]
    pub const fn without(self, feature: Feature) -> Self {
        FeatureSet(self.0 & !feature.mask())
    }

    /// Add `feature` in place
    #[inline]
    pub fn insert(&mut self, feature: Feature) {
        self.0 |= feature.mask();
    }

    /// Remove `feature` in place
    #[inline]
    pub fn remove(&mut self, feature: Feature) {
        self.0 &= !feature.mask();
    }

    /// Number of set bits
    #[inline]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether no bits are set
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set bit positions in ascending order
    pub fn codes(self) -> impl Iterator<Item = u32> {
        (0..64u32).filter(move |&code| self.contains_code(code))
    }
}

impl From<u64> for FeatureSet {
    fn from(bits: u64) -> Self {
        FeatureSet(bits)
    }
}

impl From<FeatureSet> for u64 {
    fn from(set: FeatureSet) -> Self {
        set.0
    }
}

impl BitOr for FeatureSet {
    type Output = FeatureSet;

    fn bitor(self, rhs: FeatureSet) -> FeatureSet {
        FeatureSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for FeatureSet {
    fn bitor_assign(&mut self, rhs: FeatureSet) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FeatureSet {
    type Output = FeatureSet;

    fn bitand(self, rhs: FeatureSet) -> FeatureSet {
        FeatureSet(self.0 & rhs.0)
    }
}

impl Not for FeatureSet {
    type Output = FeatureSet;

    fn not(self) -> FeatureSet {
        FeatureSet(!self.0)
    }
}

impl fmt::LowerHex for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::feature::x86;
    use proptest::prelude::*;

    #[test]
    fn test_insert_remove() {
        let mut set = FeatureSet::EMPTY;
        set.insert(x86::simd::SSE);
        set.insert(x86::simd::AVX2);
        assert!(set.contains(x86::simd::SSE));
        assert!(set.contains_code(15));
        assert_eq!(set.len(), 2);

        set.remove(x86::simd::SSE);
        assert!(!set.contains(x86::simd::SSE));
        assert_eq!(set.bits(), 1 << 15);
    }

    #[test]
    fn test_superset() {
        let detected = FeatureSet::from_features([x86::simd::SSE, x86::simd::SSE2, x86::simd::AVX]);
        let required = FeatureSet::from_features([x86::simd::SSE2, x86::simd::AVX]);
        assert!(detected.is_superset_of(required));
        assert!(!required.is_superset_of(detected));
        assert!(detected.is_superset_of(FeatureSet::EMPTY));
    }

    #[test]
    fn test_high_codes() {
        let set = FeatureSet::EMPTY.with(x86::system::BND);
        assert!(set.contains_code(56));
        assert!(!set.contains_code(64));
        assert_eq!(set.codes().collect::<Vec<_>>(), vec![56]);
    }

    proptest! {
        #[test]
        fn prop_codes_match_bits(bits in any::<u64>()) {
            let set = FeatureSet::from_bits(bits);
            let rebuilt = set.codes().fold(0u64, |acc, code| acc | (1u64 << code));
            prop_assert_eq!(rebuilt, bits);
            prop_assert_eq!(set.codes().count() as u32, set.len());
        }

        #[test]
        fn prop_superset_is_mask_inclusion(a in any::<u64>(), b in any::<u64>()) {
            let union = FeatureSet::from_bits(a) | FeatureSet::from_bits(b);
            prop_assert!(union.is_superset_of(FeatureSet::from_bits(a)));
            prop_assert_eq!(FeatureSet::from_bits(a).is_superset_of(FeatureSet::from_bits(b)), a & b == b);
        }
    }
}
