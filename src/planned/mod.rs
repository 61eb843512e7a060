//! Planned devices: storage intents not yet materialized
//!
//! A planned device describes what should exist (size bounds, weight, reuse
//! target, filesystem and mount intent) without saying where it lands. The
//! space-distribution calculator reads them, the extra-space distributor
//! writes their final `size`, and the creators turn them into device-graph
//! mutations.

pub mod bcache;
pub mod btrfs;
pub mod collection;
pub mod disk;
pub mod lvm;
pub mod partition;
pub mod raid;

pub use bcache::PlannedBcache;
pub use btrfs::{BtrfsRaidLevel, PlannedBtrfs};
pub use collection::{split_reuse, DevicesCollection};
pub use disk::{PlannedDisk, PlannedNfs, PlannedStrayBlock, PlannedTmpfs};
pub use lvm::{MakeSpacePolicy, PlannedLv, PlannedVg};
pub use partition::{ComponentRole, PlannedPartition};
pub use raid::PlannedMd;

use crate::model::FsKind;
use crate::utils::error::{DiskplanError, Result};
use crate::utils::units::DiskSize;

/// Fields shared by every planned device kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCommon {
    pub min_size: DiskSize,
    pub max_size: DiskSize,
    /// Used only when growing beyond `min_size`.
    pub weight: f64,
    /// Size expressed as a percentage of the (not yet known) parent size.
    pub percent_size: Option<f64>,
    /// Name of an existing device to reuse instead of creating a new one.
    pub reuse_name: Option<String>,
    /// Resize the reused device to the planned bounds instead of keeping its
    /// current size.
    pub resize: bool,
    pub mount_point: Option<String>,
    pub filesystem: Option<FsKind>,
    pub encryption_password: Option<String>,
    pub label: Option<String>,
    /// Final size, written by the extra-space distributor.
    pub size: DiskSize,
}

impl Default for PlannedCommon {
    fn default() -> Self {
        PlannedCommon {
            min_size: DiskSize::zero(),
            max_size: DiskSize::unlimited(),
            weight: 0.0,
            percent_size: None,
            reuse_name: None,
            resize: false,
            mount_point: None,
            filesystem: None,
            encryption_password: None,
            label: None,
            size: DiskSize::zero(),
        }
    }
}

impl PlannedCommon {
    pub fn reuse(&self) -> bool {
        self.reuse_name.is_some()
    }

    /// Resolve a percent size against the actual parent size, turning it
    /// into an exact min = max bound.
    pub fn resolve_percent_size(&mut self, parent_size: DiskSize) {
        if let Some(percent) = self.percent_size {
            let resolved = DiskSize::percent_of(percent, parent_size);
            self.min_size = resolved;
            self.max_size = resolved;
        }
    }

    /// Flexible-retry rewrite: the original minimum becomes the weight and
    /// the minimum drops to a single byte, so a layout is found whenever
    /// any layout exists.
    pub fn make_flexible(&mut self) {
        self.weight = self.min_size.bytes().max(1) as f64;
        self.min_size = DiskSize::b(1);
    }

    pub fn validate(&self, what: &str) -> Result<()> {
        if self.min_size > self.max_size {
            return Err(DiskplanError::ConfigError(format!(
                "{}: min size {} exceeds max size {}",
                what, self.min_size, self.max_size
            )));
        }
        if self.weight < 0.0 {
            return Err(DiskplanError::ConfigError(format!(
                "{}: negative weight {}",
                what, self.weight
            )));
        }
        Ok(())
    }
}

/// Access to the shared planning fields, for code that works across device
/// kinds (notably the extra-space distributor).
pub trait WithCommon {
    fn common(&self) -> &PlannedCommon;
    fn common_mut(&mut self) -> &mut PlannedCommon;
}

impl WithCommon for PlannedPartition {
    fn common(&self) -> &PlannedCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PlannedCommon {
        &mut self.common
    }
}

impl WithCommon for PlannedLv {
    fn common(&self) -> &PlannedCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PlannedCommon {
        &mut self.common
    }
}

impl WithCommon for PlannedDevice {
    fn common(&self) -> &PlannedCommon {
        PlannedDevice::common(self)
    }

    fn common_mut(&mut self) -> &mut PlannedCommon {
        PlannedDevice::common_mut(self)
    }
}

/// The unit of intent, closed over all supported device kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedDevice {
    Partition(PlannedPartition),
    /// A volume group with its nested logical volumes.
    VolumeGroup(PlannedVg),
    LogicalVolume(PlannedLv),
    RaidArray(PlannedMd),
    Bcache(PlannedBcache),
    Btrfs(PlannedBtrfs),
    Disk(PlannedDisk),
    StrayBlock(PlannedStrayBlock),
    Nfs(PlannedNfs),
    Tmpfs(PlannedTmpfs),
}

impl PlannedDevice {
    pub fn common(&self) -> &PlannedCommon {
        match self {
            PlannedDevice::Partition(d) => &d.common,
            PlannedDevice::VolumeGroup(d) => &d.common,
            PlannedDevice::LogicalVolume(d) => &d.common,
            PlannedDevice::RaidArray(d) => &d.common,
            PlannedDevice::Bcache(d) => &d.common,
            PlannedDevice::Btrfs(d) => &d.common,
            PlannedDevice::Disk(d) => &d.common,
            PlannedDevice::StrayBlock(d) => &d.common,
            PlannedDevice::Nfs(d) => &d.common,
            PlannedDevice::Tmpfs(d) => &d.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut PlannedCommon {
        match self {
            PlannedDevice::Partition(d) => &mut d.common,
            PlannedDevice::VolumeGroup(d) => &mut d.common,
            PlannedDevice::LogicalVolume(d) => &mut d.common,
            PlannedDevice::RaidArray(d) => &mut d.common,
            PlannedDevice::Bcache(d) => &mut d.common,
            PlannedDevice::Btrfs(d) => &mut d.common,
            PlannedDevice::Disk(d) => &mut d.common,
            PlannedDevice::StrayBlock(d) => &mut d.common,
            PlannedDevice::Nfs(d) => &mut d.common,
            PlannedDevice::Tmpfs(d) => &mut d.common,
        }
    }

    pub fn min_size(&self) -> DiskSize {
        self.common().min_size
    }

    pub fn max_size(&self) -> DiskSize {
        self.common().max_size
    }

    pub fn weight(&self) -> f64 {
        self.common().weight
    }

    pub fn reuse(&self) -> bool {
        self.common().reuse()
    }

    pub fn resolve_percent_size(&mut self, parent_size: DiskSize) {
        self.common_mut().resolve_percent_size(parent_size);
    }

    /// Short human label for logs and error messages.
    pub fn describe(&self) -> String {
        let common = self.common();
        let kind = match self {
            PlannedDevice::Partition(_) => "partition",
            PlannedDevice::VolumeGroup(vg) => return format!("VG {}", vg.name),
            PlannedDevice::LogicalVolume(lv) => return format!("LV {}", lv.name),
            PlannedDevice::RaidArray(md) => return format!("RAID {}", md.name),
            PlannedDevice::Bcache(b) => return format!("bcache {}", b.name),
            PlannedDevice::Btrfs(b) => return format!("btrfs {}", b.name),
            PlannedDevice::Disk(_) => "disk",
            PlannedDevice::StrayBlock(_) => "stray block device",
            PlannedDevice::Nfs(nfs) => return format!("NFS {}:{}", nfs.server, nfs.path),
            PlannedDevice::Tmpfs(_) => "tmpfs",
        };
        match (&common.mount_point, &common.reuse_name) {
            (Some(mp), _) => format!("{} for {}", kind, mp),
            (None, Some(reused)) => format!("{} reusing {}", kind, reused),
            _ => kind.to_string(),
        }
    }
}
