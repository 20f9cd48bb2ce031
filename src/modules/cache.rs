//! Cache hierarchy description

use serde::{Deserialize, Serialize};

/// Associativity value reported for fully associative caches
pub const FULLY_ASSOCIATIVE: u32 = u32::MAX;

/// Parameters of one cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheLevel {
    /// Total size in bytes; 0 when unknown
    pub size: u32,
    /// Line size in bytes
    pub line_size: u32,
    /// Number of ways, or `FULLY_ASSOCIATIVE`
    pub associativity: u32,
}

impl CacheLevel {
    /// Cache with the given parameters
    pub const fn new(size: u32, line_size: u32, associativity: u32) -> Self {
        Self {
            size,
            line_size,
            associativity,
        }
    }

    /// Whether anything is known about this cache
    pub const fn is_known(&self) -> bool {
        self.size != 0
    }
}

/// Sizes of the instruction, data and unified caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheInfo {
    pub l1i: CacheLevel,
    pub l1d: CacheLevel,
    /// Unified second-level cache
    pub l2: CacheLevel,
    /// Unified third-level cache
    pub l3: CacheLevel,
}

impl CacheInfo {
    /// Size of the data (or unified) cache at `level`, if known
    pub fn data_cache_size(&self, level: u32) -> Option<u32> {
        let cache = match level {
            1 => self.l1d,
            2 => self.l2,
            3 => self.l3,
            _ => return None,
        };
        cache.is_known().then_some(cache.size)
    }

    /// Size of the instruction (or unified) cache at `level`, if known
    pub fn instruction_cache_size(&self, level: u32) -> Option<u32> {
        let cache = match level {
            1 => self.l1i,
            2 => self.l2,
            3 => self.l3,
            _ => return None,
        };
        cache.is_known().then_some(cache.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        let info = CacheInfo {
            l1i: CacheLevel::new(32 * 1024, 64, 8),
            l1d: CacheLevel::new(48 * 1024, 64, 12),
            l2: CacheLevel::new(1024 * 1024, 64, 16),
            l3: CacheLevel::default(),
        };
        assert_eq!(info.data_cache_size(1), Some(48 * 1024));
        assert_eq!(info.instruction_cache_size(1), Some(32 * 1024));
        // Level 2 is unified
        assert_eq!(info.data_cache_size(2), info.instruction_cache_size(2));
        assert_eq!(info.data_cache_size(3), None);
        assert_eq!(info.data_cache_size(0), None);
        assert_eq!(info.instruction_cache_size(4), None);
    }
}
