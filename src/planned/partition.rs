//! Planned partitions

use crate::model::{FsKind, PartitionId};
use crate::planned::PlannedCommon;
use crate::utils::units::DiskSize;

/// Role a planned partition plays as a component of a stacked device.
///
/// The orchestrator cross-references these tags against the names produced
/// by earlier pipeline stages to resolve RAID members, bcache roles, btrfs
/// member devices and LVM physical volumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentRole {
    /// Member of the named RAID array.
    Md(String),
    /// Backing device of the named bcache.
    BcacheBacking(String),
    /// Caching device of the named bcache.
    BcacheCaching(String),
    /// Member of the named multi-device btrfs filesystem.
    Btrfs(String),
    /// Physical volume of the named volume group.
    LvmPv(String),
}

/// An intended partition, on a named disk or wherever it fits.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlannedPartition {
    pub common: PlannedCommon,
    /// Hard constraint: the partition must land on this disk.
    pub disk: Option<String>,
    /// Soft placement preference: only candidate spaces starting at or
    /// before this offset are considered.
    pub max_start_offset: Option<u64>,
    /// Must occupy a primary slot (never logical).
    pub primary: bool,
    pub partition_id: Option<PartitionId>,
    pub component_of: Option<ComponentRole>,
}

impl PlannedPartition {
    pub fn new(min_size: DiskSize, max_size: DiskSize, weight: f64) -> Self {
        PlannedPartition {
            common: PlannedCommon {
                min_size,
                max_size,
                weight,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Partition id to advertise in the table: an explicit id wins, then the
    /// component role, then the filesystem kind.
    pub fn effective_partition_id(&self) -> PartitionId {
        if let Some(id) = self.partition_id {
            return id;
        }
        match &self.component_of {
            Some(ComponentRole::Md(_)) => PartitionId::Raid,
            Some(ComponentRole::LvmPv(_)) => PartitionId::Lvm,
            Some(_) => PartitionId::Linux,
            None => match self.common.filesystem {
                Some(FsKind::Swap) => PartitionId::Swap,
                Some(FsKind::Vfat) if self.mounted_at("/boot/efi") => PartitionId::Esp,
                _ => PartitionId::Linux,
            },
        }
    }

    fn mounted_at(&self, path: &str) -> bool {
        self.common.mount_point.as_deref() == Some(path)
    }

    /// The VG this partition contributes to as a physical volume, if any.
    pub fn lvm_volume_group(&self) -> Option<&str> {
        match &self.component_of {
            Some(ComponentRole::LvmPv(vg)) => Some(vg.as_str()),
            _ => None,
        }
    }

    pub fn raid_name(&self) -> Option<&str> {
        match &self.component_of {
            Some(ComponentRole::Md(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn btrfs_name(&self) -> Option<&str> {
        match &self.component_of {
            Some(ComponentRole::Btrfs(name)) => Some(name.as_str()),
            _ => None,
        }
    }
}
