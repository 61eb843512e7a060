//! Byte regions on a block device

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, start + length)` on some device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start: u64,
    pub length: u64,
}

impl Region {
    pub fn new(start: u64, length: u64) -> Self {
        Region { start, length }
    }

    /// First byte past the end of the region.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn contains(&self, other: &Region) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Region {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.start
            .cmp(&other.start)
            .then(self.length.cmp(&other.length))
    }
}
