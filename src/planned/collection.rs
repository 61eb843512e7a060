//! Collections of planned devices with kind and reuse filters

use crate::planned::{
    PlannedBcache, PlannedBtrfs, PlannedDevice, PlannedDisk, PlannedMd, PlannedNfs,
    PlannedPartition, PlannedStrayBlock, PlannedTmpfs, PlannedVg,
};
use crate::utils::error::Result;

/// All planned devices of one run, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicesCollection {
    devices: Vec<PlannedDevice>,
}

impl DevicesCollection {
    pub fn new(devices: Vec<PlannedDevice>) -> Self {
        DevicesCollection { devices }
    }

    pub fn push(&mut self, device: PlannedDevice) {
        self.devices.push(device);
    }

    pub fn all(&self) -> &[PlannedDevice] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Top-level planned partitions (nested ones live inside their
    /// container's plan).
    pub fn partitions(&self) -> Vec<&PlannedPartition> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::Partition(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn mds(&self) -> Vec<&PlannedMd> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::RaidArray(md) => Some(md),
                _ => None,
            })
            .collect()
    }

    pub fn bcaches(&self) -> Vec<&PlannedBcache> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::Bcache(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn vgs(&self) -> Vec<&PlannedVg> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::VolumeGroup(vg) => Some(vg),
                _ => None,
            })
            .collect()
    }

    pub fn btrfs_filesystems(&self) -> Vec<&PlannedBtrfs> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::Btrfs(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn disks(&self) -> Vec<&PlannedDisk> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::Disk(disk) => Some(disk),
                _ => None,
            })
            .collect()
    }

    pub fn stray_blocks(&self) -> Vec<&PlannedStrayBlock> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::StrayBlock(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn nfs_mounts(&self) -> Vec<&PlannedNfs> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::Nfs(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn tmpfs_mounts(&self) -> Vec<&PlannedTmpfs> {
        self.devices
            .iter()
            .filter_map(|d| match d {
                PlannedDevice::Tmpfs(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        for device in &self.devices {
            device.common().validate(&device.describe())?;
        }
        Ok(())
    }
}

/// Split a partition list into (reuse set, create set).
pub fn split_reuse(partitions: &[PlannedPartition]) -> (Vec<PlannedPartition>, Vec<PlannedPartition>) {
    let (reuse, create): (Vec<_>, Vec<_>) =
        partitions.iter().cloned().partition(|p| p.common.reuse());
    (reuse, create)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::units::DiskSize;

    #[test]
    fn filters_by_kind() {
        let collection = DevicesCollection::new(vec![
            PlannedDevice::Partition(PlannedPartition::new(
                DiskSize::gib(1),
                DiskSize::gib(2),
                1.0,
            )),
            PlannedDevice::Tmpfs(PlannedTmpfs::default()),
        ]);
        assert_eq!(collection.partitions().len(), 1);
        assert_eq!(collection.tmpfs_mounts().len(), 1);
        assert!(collection.mds().is_empty());
    }

    #[test]
    fn split_reuse_partitions() {
        let mut reused = PlannedPartition::new(DiskSize::gib(1), DiskSize::gib(1), 0.0);
        reused.common.reuse_name = Some("/dev/sda3".into());
        let fresh = PlannedPartition::new(DiskSize::gib(1), DiskSize::gib(2), 1.0);
        let (reuse, create) = split_reuse(&[reused, fresh]);
        assert_eq!(reuse.len(), 1);
        assert_eq!(create.len(), 1);
        assert!(reuse[0].common.reuse());
    }

    #[test]
    fn validation_rejects_inverted_bounds() {
        let bad = PlannedPartition::new(DiskSize::gib(10), DiskSize::gib(1), 1.0);
        let collection = DevicesCollection::new(vec![PlannedDevice::Partition(bad)]);
        assert!(collection.validate().is_err());
    }
}
