//! Planned multi-device btrfs filesystems

use crate::planned::PlannedCommon;
use serde::{Deserialize, Serialize};

/// Btrfs profile for data or metadata across member devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BtrfsRaidLevel {
    #[default]
    Single,
    Dup,
    Raid0,
    Raid1,
    Raid10,
}

/// An intended btrfs filesystem spanning several block devices.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedBtrfs {
    pub common: PlannedCommon,
    /// Symbolic name used to tag member partitions.
    pub name: String,
    pub data_raid_level: BtrfsRaidLevel,
    pub metadata_raid_level: BtrfsRaidLevel,
    /// Existing devices to span, in addition to tagged partitions.
    pub devices: Vec<String>,
}

impl PlannedBtrfs {
    pub fn new(name: &str) -> Self {
        PlannedBtrfs {
            common: PlannedCommon::default(),
            name: name.to_string(),
            data_raid_level: BtrfsRaidLevel::default(),
            metadata_raid_level: BtrfsRaidLevel::default(),
            devices: Vec::new(),
        }
    }
}
