//! Scenario files
//!
//! A scenario is a TOML description of the starting hardware (disks, their
//! partition tables and existing partitions) together with the planned
//! devices to lay out on it. `build()` turns it into the device-graph
//! snapshot and the planned-device collection the orchestrator consumes.

use crate::model::{
    DeviceGraph, FsKind, Filesystem, MdLevel, PartitionId, PartitionType, PtableKind, Region,
};
use crate::planned::{
    BtrfsRaidLevel, ComponentRole, DevicesCollection, MakeSpacePolicy, PlannedBcache,
    PlannedBtrfs, PlannedCommon, PlannedDevice, PlannedLv, PlannedMd, PlannedNfs,
    PlannedPartition, PlannedTmpfs, PlannedVg,
};
use crate::utils::error::{DiskplanError, Result};
use crate::utils::units::DiskSize;
use serde::{Deserialize, Serialize};

fn default_grain() -> DiskSize {
    DiskSize::mib(1)
}

fn default_extent() -> DiskSize {
    DiskSize::mib(4)
}

fn default_weight() -> f64 {
    0.0
}

/// A disk present before planning starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSpec {
    /// Kernel name, e.g. `/dev/sda`.
    pub name: String,
    pub size: DiskSize,
    /// Alignment grain for partitions on this disk.
    #[serde(default = "default_grain")]
    pub grain: DiskSize,
    /// Partition table already on the disk, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptable: Option<PtableKind>,
    /// Existing partitions, laid out back to back from the start of the
    /// usable area.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<ExistingPartitionSpec>,
}

/// A partition that already exists on a disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingPartitionSpec {
    pub size: DiskSize,
    #[serde(default)]
    pub id: PartitionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FsKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
}

/// Shared sizing fields of every planned entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SizeSpec {
    /// Exact size, shorthand for equal min and max.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<DiskSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<DiskSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<DiskSize>,
    /// Percentage of the containing device, resolved at planning time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl SizeSpec {
    fn apply(&self, common: &mut PlannedCommon) {
        if let Some(size) = self.size {
            common.min_size = size;
            common.max_size = size;
        }
        if let Some(min) = self.min {
            common.min_size = min;
        }
        if let Some(max) = self.max {
            common.max_size = max;
        }
        common.percent_size = self.percent;
        common.weight = self.weight;
    }
}

/// A planned partition.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartitionSpec {
    #[serde(flatten)]
    pub sizing: SizeSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FsKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_password: Option<String>,
    /// Pin to a disk instead of letting the calculator choose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<String>,
    /// Force a primary slot on msdos tables.
    #[serde(default)]
    pub primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,
    /// Reuse this existing partition instead of creating one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reuse: Option<String>,
    #[serde(default)]
    pub resize: bool,
    /// Component tags; at most one may be set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub btrfs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcache_backing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcache_caching: Option<String>,
}

impl PartitionSpec {
    fn component_role(&self) -> Result<Option<ComponentRole>> {
        let mut roles = Vec::new();
        if let Some(name) = &self.raid {
            roles.push(ComponentRole::Md(name.clone()));
        }
        if let Some(name) = &self.volume_group {
            roles.push(ComponentRole::LvmPv(name.clone()));
        }
        if let Some(name) = &self.btrfs {
            roles.push(ComponentRole::Btrfs(name.clone()));
        }
        if let Some(name) = &self.bcache_backing {
            roles.push(ComponentRole::BcacheBacking(name.clone()));
        }
        if let Some(name) = &self.bcache_caching {
            roles.push(ComponentRole::BcacheCaching(name.clone()));
        }
        if roles.len() > 1 {
            return Err(DiskplanError::ConfigError(
                "a partition can play at most one component role".into(),
            ));
        }
        Ok(roles.into_iter().next())
    }

    fn to_planned(&self) -> Result<PlannedPartition> {
        let mut part = PlannedPartition::default();
        self.sizing.apply(&mut part.common);
        part.common.filesystem = self.filesystem;
        part.common.mount_point = self.mount_point.clone();
        part.common.label = self.label.clone();
        part.common.encryption_password = self.encryption_password.clone();
        part.common.reuse_name = self.reuse.clone();
        part.common.resize = self.resize;
        part.disk = self.disk.clone();
        part.primary = self.primary;
        part.partition_id = self.partition_id;
        part.component_of = self.component_role()?;
        Ok(part)
    }
}

/// A planned logical volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LvSpec {
    pub name: String,
    #[serde(flatten)]
    pub sizing: SizeSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FsKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A planned volume group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VgSpec {
    pub name: String,
    #[serde(default = "default_extent")]
    pub extent_size: DiskSize,
    #[serde(default)]
    pub make_space: MakeSpacePolicy,
    /// Reuse this existing VG instead of creating one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reuse: Option<String>,
    #[serde(default)]
    pub lvs: Vec<LvSpec>,
}

/// A planned MD array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaidSpec {
    pub name: String,
    pub level: MdLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<DiskSize>,
    /// Existing devices to use as members, beyond tagged partitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptable: Option<PtableKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FsKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
}

/// A planned bcache device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BcacheSpec {
    pub name: String,
    #[serde(default)]
    pub cache_mode: crate::model::CacheMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backing_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caching_device: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FsKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
}

/// A planned multi-device btrfs filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtrfsSpec {
    pub name: String,
    #[serde(default)]
    pub data_raid_level: BtrfsRaidLevel,
    #[serde(default)]
    pub metadata_raid_level: BtrfsRaidLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NfsSpec {
    pub server: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmpfsSpec {
    pub mount_point: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<DiskSize>,
}

/// The whole scenario file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Scenario {
    #[serde(default)]
    pub disks: Vec<DiskSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raids: Vec<RaidSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_groups: Vec<VgSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcaches: Vec<BcacheSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub btrfs: Vec<BtrfsSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nfs: Vec<NfsSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tmpfs: Vec<TmpfsSpec>,
}

impl std::str::FromStr for Scenario {
    type Err = DiskplanError;

    fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl Scenario {
    /// Load a scenario from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let scenario: Scenario = content.parse()?;
        Ok(scenario)
    }

    /// Build the starting device graph described by the `disks` section.
    pub fn build_graph(&self) -> Result<DeviceGraph> {
        let mut graph = DeviceGraph::new();
        for disk in &self.disks {
            graph.add_disk(&disk.name, disk.size, disk.grain)?;
            if disk.ptable.is_none() && !disk.partitions.is_empty() {
                return Err(DiskplanError::ConfigError(format!(
                    "{} lists partitions but no partition table",
                    disk.name
                )));
            }
            if let Some(kind) = disk.ptable {
                graph.create_partition_table(&disk.name, kind)?;
            }
            let mut cursor = graph.usable_region(&disk.name)?.start;
            for existing in &disk.partitions {
                let length = existing.size.ceil(disk.grain).bytes();
                let name = graph.create_partition(
                    &disk.name,
                    Region::new(cursor, length),
                    PartitionType::Primary,
                    existing.id,
                )?;
                cursor += length;
                if let Some(kind) = existing.filesystem {
                    graph.format(
                        &name,
                        Filesystem::new(kind, existing.mount_point.clone()),
                    )?;
                }
            }
        }
        Ok(graph)
    }

    /// Build the planned-device collection, in declaration order.
    pub fn build_planned(&self) -> Result<DevicesCollection> {
        let mut collection = DevicesCollection::default();
        for spec in &self.partitions {
            collection.push(PlannedDevice::Partition(spec.to_planned()?));
        }
        for spec in &self.raids {
            let mut md = PlannedMd::new(&spec.name, spec.level);
            md.chunk_size = spec.chunk_size;
            md.members = spec.members.clone();
            md.ptable = spec.ptable;
            for part in &spec.partitions {
                md.partitions.push(part.to_planned()?);
            }
            md.common.filesystem = spec.filesystem;
            md.common.mount_point = spec.mount_point.clone();
            collection.push(PlannedDevice::RaidArray(md));
        }
        for spec in &self.bcaches {
            let mut bcache = PlannedBcache::new(&spec.name);
            bcache.cache_mode = spec.cache_mode;
            bcache.backing_device = spec.backing_device.clone();
            bcache.caching_device = spec.caching_device.clone();
            for part in &spec.partitions {
                bcache.partitions.push(part.to_planned()?);
            }
            bcache.common.filesystem = spec.filesystem;
            bcache.common.mount_point = spec.mount_point.clone();
            collection.push(PlannedDevice::Bcache(bcache));
        }
        for spec in &self.volume_groups {
            let mut vg = PlannedVg::new(&spec.name);
            vg.extent_size = spec.extent_size;
            vg.make_space_policy = spec.make_space;
            vg.common.reuse_name = spec.reuse.clone();
            for lv_spec in &spec.lvs {
                let mut lv = PlannedLv::new(
                    &lv_spec.name,
                    DiskSize::zero(),
                    DiskSize::unlimited(),
                    0.0,
                );
                lv_spec.sizing.apply(&mut lv.common);
                lv.common.filesystem = lv_spec.filesystem;
                lv.common.mount_point = lv_spec.mount_point.clone();
                lv.common.label = lv_spec.label.clone();
                vg.lvs.push(lv);
            }
            collection.push(PlannedDevice::VolumeGroup(vg));
        }
        for spec in &self.btrfs {
            let mut fs = PlannedBtrfs::new(&spec.name);
            fs.data_raid_level = spec.data_raid_level;
            fs.metadata_raid_level = spec.metadata_raid_level;
            fs.devices = spec.devices.clone();
            fs.common.mount_point = spec.mount_point.clone();
            fs.common.label = spec.label.clone();
            collection.push(PlannedDevice::Btrfs(fs));
        }
        for spec in &self.nfs {
            let mut nfs = PlannedNfs {
                server: spec.server.clone(),
                path: spec.path.clone(),
                ..Default::default()
            };
            nfs.common.filesystem = Some(FsKind::Nfs);
            nfs.common.mount_point = spec.mount_point.clone();
            collection.push(PlannedDevice::Nfs(nfs));
        }
        for spec in &self.tmpfs {
            let mut tmpfs = PlannedTmpfs::default();
            tmpfs.common.filesystem = Some(FsKind::Tmpfs);
            tmpfs.common.mount_point = Some(spec.mount_point.clone());
            if let Some(size) = spec.size {
                tmpfs.common.min_size = size;
                tmpfs.common.max_size = size;
            }
            collection.push(PlannedDevice::Tmpfs(tmpfs));
        }
        collection.validate()?;
        Ok(collection)
    }

    /// A small self-contained example, used by `generate-scenario`.
    pub fn sample() -> Self {
        Scenario {
            disks: vec![DiskSpec {
                name: "/dev/sda".into(),
                size: DiskSize::gib(100),
                grain: default_grain(),
                ptable: None,
                partitions: Vec::new(),
            }],
            partitions: vec![
                PartitionSpec {
                    sizing: SizeSpec {
                        size: Some(DiskSize::mib(512)),
                        ..Default::default()
                    },
                    filesystem: Some(FsKind::Vfat),
                    mount_point: Some("/boot/efi".into()),
                    ..Default::default()
                },
                PartitionSpec {
                    sizing: SizeSpec {
                        min: Some(DiskSize::gib(20)),
                        max: Some(DiskSize::unlimited()),
                        weight: 3.0,
                        ..Default::default()
                    },
                    filesystem: Some(FsKind::Ext4),
                    mount_point: Some("/".into()),
                    ..Default::default()
                },
                PartitionSpec {
                    sizing: SizeSpec {
                        min: Some(DiskSize::gib(10)),
                        max: Some(DiskSize::unlimited()),
                        weight: 1.0,
                        ..Default::default()
                    },
                    filesystem: Some(FsKind::Xfs),
                    mount_point: Some("/home".into()),
                    ..Default::default()
                },
                PartitionSpec {
                    sizing: SizeSpec {
                        size: Some(DiskSize::gib(2)),
                        ..Default::default()
                    },
                    filesystem: Some(FsKind::Swap),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sample_round_trips_through_toml() {
        let sample = Scenario::sample();
        let toml = toml::to_string_pretty(&sample).unwrap();
        let parsed = Scenario::from_str(&toml).unwrap();
        assert_eq!(parsed.disks.len(), 1);
        assert_eq!(parsed.partitions.len(), 4);
        assert_eq!(parsed.partitions[0].sizing.size, Some(DiskSize::mib(512)));
    }

    #[test]
    fn builds_graph_with_existing_partitions() {
        let scenario = Scenario::from_str(
            r#"
            [[disks]]
            name = "/dev/sda"
            size = "50 GiB"
            ptable = "gpt"

            [[disks.partitions]]
            size = "512 MiB"
            id = "esp"
            filesystem = "vfat"
            mount_point = "/boot/efi"

            [[disks.partitions]]
            size = "20 GiB"
            filesystem = "ext4"
            "#,
        )
        .unwrap();
        let graph = scenario.build_graph().unwrap();
        let parts = graph.partitions_of("/dev/sda");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].size, DiskSize::mib(512));
        assert_eq!(
            parts[0].filesystem.as_ref().map(|fs| fs.kind),
            Some(FsKind::Vfat)
        );
        assert_eq!(parts[1].size, DiskSize::gib(20));
    }

    #[test]
    fn builds_planned_devices_with_component_tags() {
        let scenario = Scenario::from_str(
            r#"
            [[disks]]
            name = "/dev/sda"
            size = "100 GiB"

            [[partitions]]
            min = "10 GiB"
            raid = "/dev/md0"

            [[partitions]]
            min = "10 GiB"
            volume_group = "system"

            [[raids]]
            name = "/dev/md0"
            level = "raid1"

            [[volume_groups]]
            name = "system"

            [[volume_groups.lvs]]
            name = "root"
            min = "8 GiB"
            filesystem = "ext4"
            mount_point = "/"
            "#,
        )
        .unwrap();
        let planned = scenario.build_planned().unwrap();
        assert_eq!(planned.partitions().len(), 2);
        assert_eq!(planned.mds().len(), 1);
        let vgs = planned.vgs();
        assert_eq!(vgs.len(), 1);
        assert_eq!(vgs[0].lvs.len(), 1);
        assert_eq!(
            planned.partitions()[0].raid_name(),
            Some("/dev/md0")
        );
        assert_eq!(
            planned.partitions()[1].lvm_volume_group(),
            Some("system")
        );
    }

    #[test]
    fn conflicting_component_tags_are_rejected() {
        let scenario = Scenario::from_str(
            r#"
            [[partitions]]
            min = "1 GiB"
            raid = "/dev/md0"
            volume_group = "system"
            "#,
        )
        .unwrap();
        assert!(scenario.build_planned().is_err());
    }
}
