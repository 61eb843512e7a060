//! Device-graph nodes

use crate::model::ptable::{PartitionType, PtableKind};
use crate::model::region::Region;
use crate::utils::units::DiskSize;
use serde::{Deserialize, Serialize};

/// Filesystem type recorded on a formatted device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsKind {
    Ext2,
    Ext4,
    Xfs,
    Btrfs,
    Vfat,
    Swap,
    Nfs,
    Tmpfs,
}

impl std::fmt::Display for FsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FsKind::Ext2 => "ext2",
            FsKind::Ext4 => "ext4",
            FsKind::Xfs => "xfs",
            FsKind::Btrfs => "btrfs",
            FsKind::Vfat => "vfat",
            FsKind::Swap => "swap",
            FsKind::Nfs => "nfs",
            FsKind::Tmpfs => "tmpfs",
        };
        write!(f, "{}", name)
    }
}

/// A filesystem signature plus mount intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filesystem {
    pub kind: FsKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Set when the payload sits inside a LUKS container.
    #[serde(default)]
    pub encrypted: bool,
}

impl Filesystem {
    pub fn new(kind: FsKind, mount_point: Option<String>) -> Self {
        Filesystem {
            kind,
            mount_point,
            label: None,
            encrypted: false,
        }
    }
}

/// Software RAID level of an MD array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MdLevel {
    Raid0,
    Raid1,
    Raid5,
    Raid6,
    Raid10,
}

impl MdLevel {
    /// Minimum number of member devices the level requires.
    pub fn min_members(&self) -> usize {
        match self {
            MdLevel::Raid0 => 2,
            MdLevel::Raid1 => 2,
            MdLevel::Raid5 => 3,
            MdLevel::Raid6 => 4,
            MdLevel::Raid10 => 4,
        }
    }

    /// Usable array size for the given member sizes.
    pub fn array_size(&self, member_sizes: &[DiskSize]) -> DiskSize {
        if member_sizes.is_empty() {
            return DiskSize::zero();
        }
        let smallest = member_sizes
            .iter()
            .copied()
            .fold(DiskSize::unlimited(), DiskSize::min);
        let n = member_sizes.len() as u64;
        match self {
            MdLevel::Raid0 => member_sizes.iter().copied().sum(),
            MdLevel::Raid1 => smallest,
            MdLevel::Raid5 => DiskSize::b(smallest.bytes() * (n - 1)),
            MdLevel::Raid6 => DiskSize::b(smallest.bytes() * n.saturating_sub(2)),
            MdLevel::Raid10 => DiskSize::b(smallest.bytes() * (n / 2)),
        }
    }
}

impl std::fmt::Display for MdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MdLevel::Raid0 => "raid0",
            MdLevel::Raid1 => "raid1",
            MdLevel::Raid5 => "raid5",
            MdLevel::Raid6 => "raid6",
            MdLevel::Raid10 => "raid10",
        };
        write!(f, "{}", name)
    }
}

/// Bcache writeback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    #[default]
    Writethrough,
    Writeback,
    Writearound,
    None,
}

/// Partition id, the role advertised in the partition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartitionId {
    #[default]
    Linux,
    Swap,
    Esp,
    Lvm,
    Raid,
    BiosBoot,
    Extended,
}

/// What a graph node is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Disk,
    /// A whole block device with no partition-table capability (e.g. a Xen
    /// virtual partition). Formatted directly or used as a member.
    StrayBlock,
    Partition {
        ptype: PartitionType,
        id: PartitionId,
        region: Region,
        number: u32,
    },
    Md {
        level: MdLevel,
        #[serde(skip_serializing_if = "Option::is_none")]
        chunk_size: Option<DiskSize>,
        members: Vec<String>,
    },
    Bcache {
        backing: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caching: Option<String>,
        mode: CacheMode,
    },
    LvmVg {
        extent_size: DiskSize,
        pvs: Vec<String>,
    },
    LvmLv,
}

/// One node of the device graph, addressed by its kernel name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceNode {
    pub name: String,
    pub kind: DeviceKind,
    pub size: DiskSize,
    /// Container this node lives in: the disk for a partition, the VG for
    /// an LV. Membership in MD/bcache/VG is recorded on the container side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Partition table installed on this node, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptable: Option<PtableKind>,
    /// Alignment grain for partitions created on this node.
    pub grain: DiskSize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<Filesystem>,
}

impl DeviceNode {
    /// Whether the node can carry a partition table.
    pub fn is_disk_like(&self) -> bool {
        matches!(
            self.kind,
            DeviceKind::Disk | DeviceKind::Md { .. } | DeviceKind::Bcache { .. }
        )
    }

    pub fn is_partition(&self) -> bool {
        matches!(self.kind, DeviceKind::Partition { .. })
    }

    pub fn partition_type(&self) -> Option<PartitionType> {
        match self.kind {
            DeviceKind::Partition { ptype, .. } => Some(ptype),
            _ => None,
        }
    }

    pub fn partition_region(&self) -> Option<Region> {
        match self.kind {
            DeviceKind::Partition { region, .. } => Some(region),
            _ => None,
        }
    }

    pub fn partition_number(&self) -> Option<u32> {
        match self.kind {
            DeviceKind::Partition { number, .. } => Some(number),
            _ => None,
        }
    }
}
