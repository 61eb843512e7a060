//! Planned software RAID arrays

use crate::model::{MdLevel, PtableKind};
use crate::planned::{PlannedCommon, PlannedPartition};
use crate::utils::units::DiskSize;

/// An intended MD array built from tagged member partitions and/or named
/// existing devices.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMd {
    pub common: PlannedCommon,
    /// Kernel name, e.g. `/dev/md0`.
    pub name: String,
    pub level: MdLevel,
    pub chunk_size: Option<DiskSize>,
    /// Existing devices to use as members, in addition to partitions tagged
    /// with [`ComponentRole::Md`](crate::planned::ComponentRole).
    pub members: Vec<String>,
    /// Partition table to install on the array, when it is partitioned.
    pub ptable: Option<PtableKind>,
    pub partitions: Vec<PlannedPartition>,
}

impl PlannedMd {
    pub fn new(name: &str, level: MdLevel) -> Self {
        PlannedMd {
            common: PlannedCommon::default(),
            name: name.to_string(),
            level,
            chunk_size: None,
            members: Vec::new(),
            ptable: None,
            partitions: Vec::new(),
        }
    }
}
