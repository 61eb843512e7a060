//! Multi-device btrfs filesystems

use crate::creators::CreatorResult;
use crate::model::{DeviceGraph, Filesystem, FsKind};
use crate::planned::{BtrfsRaidLevel, PlannedBtrfs, PlannedDevice};
use crate::utils::error::{DiskplanError, Result};

fn min_devices(level: BtrfsRaidLevel) -> usize {
    match level {
        BtrfsRaidLevel::Single | BtrfsRaidLevel::Dup => 1,
        BtrfsRaidLevel::Raid0 | BtrfsRaidLevel::Raid1 => 2,
        BtrfsRaidLevel::Raid10 => 4,
    }
}

/// Turns planned btrfs filesystems into signatures across their members.
pub struct BtrfsCreator;

impl BtrfsCreator {
    /// Span a btrfs filesystem over its named devices plus the partitions
    /// tagged for it. Every member gets the signature; the first one also
    /// carries the mount intent.
    pub fn create_filesystem(
        graph: &DeviceGraph,
        planned: &PlannedBtrfs,
        tagged_devices: &[String],
    ) -> Result<CreatorResult> {
        let mut members = planned.devices.clone();
        members.extend(tagged_devices.iter().cloned());
        if members.is_empty() {
            return Err(DiskplanError::ConfigError(format!(
                "btrfs {} has no member devices",
                planned.name
            )));
        }
        let required = min_devices(planned.data_raid_level)
            .max(min_devices(planned.metadata_raid_level));
        if members.len() < required {
            return Err(DiskplanError::ConfigError(format!(
                "btrfs {} needs at least {} devices, got {}",
                planned.name,
                required,
                members.len()
            )));
        }

        let mut result = CreatorResult::new(graph.duplicate());
        for (i, member) in members.iter().enumerate() {
            result.graph.remove_descendants(member)?;
            let mut fs = Filesystem::new(FsKind::Btrfs, None);
            fs.label = planned.common.label.clone();
            fs.encrypted = planned.common.encryption_password.is_some();
            if i == 0 {
                fs.mount_point = planned.common.mount_point.clone();
            }
            result.graph.format(member, fs)?;
        }
        result.register(&members[0], PlannedDevice::Btrfs(planned.clone()));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PartitionId, PartitionType, PtableKind, Region};
    use crate::utils::units::DiskSize;

    fn graph_with_parts(count: u64) -> (DeviceGraph, Vec<String>) {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sda", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sda", PtableKind::Gpt)
            .unwrap();
        let mut parts = Vec::new();
        for i in 0..count {
            let part = graph
                .create_partition(
                    "/dev/sda",
                    Region::new(
                        DiskSize::mib(1).bytes() + i * DiskSize::gib(20).bytes(),
                        DiskSize::gib(20).bytes(),
                    ),
                    PartitionType::Primary,
                    PartitionId::Linux,
                )
                .unwrap();
            parts.push(part);
        }
        (graph, parts)
    }

    #[test]
    fn every_member_gets_the_signature_and_one_the_mount() {
        let (graph, parts) = graph_with_parts(2);
        let mut planned = PlannedBtrfs::new("pool");
        planned.data_raid_level = BtrfsRaidLevel::Raid1;
        planned.metadata_raid_level = BtrfsRaidLevel::Raid1;
        planned.common.mount_point = Some("/srv/pool".into());

        let result = BtrfsCreator::create_filesystem(&graph, &planned, &parts).unwrap();
        let mounted: Vec<_> = parts
            .iter()
            .map(|p| result.graph.get(p).unwrap())
            .collect();
        assert!(mounted
            .iter()
            .all(|n| n.filesystem.as_ref().map(|fs| fs.kind) == Some(FsKind::Btrfs)));
        let mounts: Vec<_> = mounted
            .iter()
            .filter(|n| n.filesystem.as_ref().and_then(|fs| fs.mount_point.as_deref()).is_some())
            .collect();
        assert_eq!(mounts.len(), 1);
        assert!(result.devices.contains_key(&parts[0]));
    }

    #[test]
    fn raid_profiles_need_enough_devices() {
        let (graph, parts) = graph_with_parts(1);
        let mut planned = PlannedBtrfs::new("pool");
        planned.data_raid_level = BtrfsRaidLevel::Raid1;
        let err = BtrfsCreator::create_filesystem(&graph, &planned, &parts).unwrap_err();
        assert!(matches!(err, DiskplanError::ConfigError(_)));
    }
}
