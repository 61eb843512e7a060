//! Planned bcache devices

use crate::model::{CacheMode, PtableKind};
use crate::planned::{PlannedCommon, PlannedPartition};

/// An intended bcache device with a backing role and an optional caching
/// role, each resolved from tagged partitions or named existing devices.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedBcache {
    pub common: PlannedCommon,
    /// Kernel name, e.g. `/dev/bcache0`.
    pub name: String,
    pub cache_mode: CacheMode,
    /// Existing device for the backing role, unless a partition is tagged.
    pub backing_device: Option<String>,
    /// Existing device for the caching role. A bcache without a caching set
    /// is legal.
    pub caching_device: Option<String>,
    pub ptable: Option<PtableKind>,
    pub partitions: Vec<PlannedPartition>,
}

impl PlannedBcache {
    pub fn new(name: &str) -> Self {
        PlannedBcache {
            common: PlannedCommon::default(),
            name: name.to_string(),
            cache_mode: CacheMode::default(),
            backing_device: None,
            caching_device: None,
            ptable: None,
            partitions: Vec::new(),
        }
    }
}
