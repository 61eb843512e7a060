//! Device-graph snapshot and its mutation primitives

use crate::model::device::{
    CacheMode, DeviceKind, DeviceNode, Filesystem, MdLevel, PartitionId,
};
use crate::model::ptable::{PartitionType, PtableKind};
use crate::model::region::Region;
use crate::utils::error::{DiskplanError, Result};
use crate::utils::units::DiskSize;
use std::collections::BTreeMap;
use tracing::debug;

/// Space reserved per physical volume for LVM metadata.
pub const PV_METADATA_OVERHEAD: DiskSize = DiskSize::mib(1);

/// Bcache superblock at the start of the backing device.
const BCACHE_HEADER: DiskSize = DiskSize::kib(8);

/// Partition naming prefix for a device.
/// e.g., /dev/sda -> /dev/sda, /dev/nvme0n1 -> /dev/nvme0n1p
fn partition_prefix(device: &str) -> String {
    if device.contains("nvme") || device.contains("mmcblk") || device.contains("loop") {
        format!("{}p", device)
    } else {
        device.to_string()
    }
}

/// Kernel name of partition `number` on `device`.
pub fn partition_path(device: &str, number: u32) -> String {
    format!("{}{}", partition_prefix(device), number)
}

/// Value-type snapshot of the storage topology. `clone()` is the §6
/// `duplicate` primitive: planning steps clone, mutate their copy and hand
/// the copy back only on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceGraph {
    devices: BTreeMap<String, DeviceNode>,
}

impl DeviceGraph {
    pub fn new() -> Self {
        DeviceGraph::default()
    }

    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&DeviceNode> {
        self.devices.get(name)
    }

    pub fn get(&self, name: &str) -> Result<&DeviceNode> {
        self.devices
            .get(name)
            .ok_or_else(|| DiskplanError::DeviceNotFound(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut DeviceNode> {
        self.devices
            .get_mut(name)
            .ok_or_else(|| DiskplanError::DeviceNotFound(name.to_string()))
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceNode> {
        self.devices.values()
    }

    pub fn disks(&self) -> impl Iterator<Item = &DeviceNode> {
        self.devices
            .values()
            .filter(|d| matches!(d.kind, DeviceKind::Disk))
    }

    pub fn add_disk(&mut self, name: &str, size: DiskSize, grain: DiskSize) -> Result<()> {
        self.insert_new(DeviceNode {
            name: name.to_string(),
            kind: DeviceKind::Disk,
            size,
            parent: None,
            ptable: None,
            grain,
            filesystem: None,
        })
    }

    pub fn add_stray_block(&mut self, name: &str, size: DiskSize) -> Result<()> {
        self.insert_new(DeviceNode {
            name: name.to_string(),
            kind: DeviceKind::StrayBlock,
            size,
            parent: None,
            ptable: None,
            grain: DiskSize::mib(1),
            filesystem: None,
        })
    }

    fn insert_new(&mut self, node: DeviceNode) -> Result<()> {
        if self.devices.contains_key(&node.name) {
            return Err(DiskplanError::ConfigError(format!(
                "duplicate device name '{}'",
                node.name
            )));
        }
        self.devices.insert(node.name.clone(), node);
        Ok(())
    }

    /// Region of a disk-like device that partitions may occupy. One grain at
    /// the front holds the partition table; GPT keeps a backup at the end.
    pub fn usable_region(&self, name: &str) -> Result<Region> {
        let node = self.get(name)?;
        let grain = node.grain.bytes();
        let mut end = node.size.bytes();
        if node.ptable == Some(PtableKind::Gpt) {
            end = end.saturating_sub(grain);
        }
        Ok(Region::new(grain, end.saturating_sub(grain)))
    }

    /// Partitions on `parent`, sorted by start offset.
    pub fn partitions_of(&self, parent: &str) -> Vec<&DeviceNode> {
        let mut parts: Vec<&DeviceNode> = self
            .devices
            .values()
            .filter(|d| d.is_partition() && d.parent.as_deref() == Some(parent))
            .collect();
        parts.sort_by_key(|p| p.partition_region().map(|r| r.start).unwrap_or(0));
        parts
    }

    pub fn extended_partition(&self, disk: &str) -> Option<&DeviceNode> {
        self.partitions_of(disk)
            .into_iter()
            .find(|p| p.partition_type() == Some(PartitionType::Extended))
    }

    /// Number of primary slots already consumed (extended counts as one).
    pub fn primary_count(&self, disk: &str) -> usize {
        self.partitions_of(disk)
            .iter()
            .filter(|p| p.partition_type() != Some(PartitionType::Logical))
            .count()
    }

    pub fn create_partition_table(&mut self, name: &str, kind: PtableKind) -> Result<()> {
        let node = self.get(name)?;
        if !node.is_disk_like() {
            return Err(DiskplanError::WrongDeviceKind {
                name: name.to_string(),
                expected: "disk-like device".to_string(),
            });
        }
        let stale: Vec<String> = self
            .partitions_of(name)
            .iter()
            .map(|p| p.name.clone())
            .collect();
        for part in stale {
            self.remove_device(&part)?;
        }
        let node = self.get_mut(name)?;
        node.ptable = Some(kind);
        node.filesystem = None;
        debug!("created {} partition table on {}", kind, name);
        Ok(())
    }

    fn next_partition_number(
        &self,
        disk: &str,
        kind: PtableKind,
        ptype: PartitionType,
    ) -> Result<u32> {
        let parts = self.partitions_of(disk);
        if ptype == PartitionType::Logical {
            let logicals = parts
                .iter()
                .filter(|p| p.partition_type() == Some(PartitionType::Logical))
                .count() as u32;
            return Ok(5 + logicals);
        }
        let max = kind.max_primary() as u32;
        let used: Vec<u32> = parts.iter().filter_map(|p| p.partition_number()).collect();
        (1..=max)
            .find(|n| !used.contains(n))
            .ok_or(DiskplanError::PrimarySlotsExhausted {
                disk: disk.to_string(),
            })
    }

    /// Create a partition on `disk` covering `region`. Returns the kernel
    /// name of the new partition.
    pub fn create_partition(
        &mut self,
        disk: &str,
        region: Region,
        ptype: PartitionType,
        id: PartitionId,
    ) -> Result<String> {
        let node = self.get(disk)?;
        let kind = node.ptable.ok_or_else(|| {
            DiskplanError::ConfigError(format!("{} has no partition table", disk))
        })?;
        if ptype != PartitionType::Primary && !kind.supports_extended() {
            return Err(DiskplanError::ConfigError(format!(
                "{} partitions not supported on {}",
                ptype, kind
            )));
        }
        if ptype == PartitionType::Extended && self.extended_partition(disk).is_some() {
            return Err(DiskplanError::ConfigError(format!(
                "{} already has an extended partition",
                disk
            )));
        }
        let usable = self.usable_region(disk)?;
        if !usable.contains(&region) {
            return Err(DiskplanError::ConfigError(format!(
                "partition region [{}..{}) outside usable area of {}",
                region.start,
                region.end(),
                disk
            )));
        }
        match ptype {
            PartitionType::Logical => {
                let ext = self.extended_partition(disk).ok_or_else(|| {
                    DiskplanError::ConfigError(format!(
                        "no extended partition on {} for a logical partition",
                        disk
                    ))
                })?;
                let ext_region = ext.partition_region().unwrap();
                if !ext_region.contains(&region) {
                    return Err(DiskplanError::ConfigError(format!(
                        "logical partition outside the extended partition of {}",
                        disk
                    )));
                }
                for part in self.partitions_of(disk) {
                    if part.partition_type() == Some(PartitionType::Logical)
                        && part.partition_region().unwrap().overlaps(&region)
                    {
                        return Err(DiskplanError::ConfigError(format!(
                            "partition overlap with {}",
                            part.name
                        )));
                    }
                }
            }
            _ => {
                for part in self.partitions_of(disk) {
                    if part.partition_type() != Some(PartitionType::Logical)
                        && part.partition_region().unwrap().overlaps(&region)
                    {
                        return Err(DiskplanError::ConfigError(format!(
                            "partition overlap with {}",
                            part.name
                        )));
                    }
                }
            }
        }
        let number = self.next_partition_number(disk, kind, ptype)?;
        let name = partition_path(disk, number);
        let grain = self.get(disk)?.grain;
        self.insert_new(DeviceNode {
            name: name.clone(),
            kind: DeviceKind::Partition {
                ptype,
                id,
                region,
                number,
            },
            size: DiskSize::b(region.length),
            parent: Some(disk.to_string()),
            ptable: None,
            grain,
            filesystem: None,
        })?;
        debug!(
            "created {} partition {} ({})",
            ptype,
            name,
            DiskSize::b(region.length)
        );
        Ok(name)
    }

    /// Devices stacked directly on top of `name`: partitions on it, LVs of a
    /// VG, and any MD/bcache/VG that uses it as a member.
    fn direct_descendants(&self, name: &str) -> Vec<String> {
        self.devices
            .values()
            .filter(|d| {
                if d.parent.as_deref() == Some(name) {
                    return true;
                }
                match &d.kind {
                    DeviceKind::Md { members, .. } => members.iter().any(|m| m == name),
                    DeviceKind::Bcache {
                        backing, caching, ..
                    } => backing == name || caching.as_deref() == Some(name),
                    DeviceKind::LvmVg { pvs, .. } => pvs.iter().any(|p| p == name),
                    _ => false,
                }
            })
            .map(|d| d.name.clone())
            .collect()
    }

    /// Wipe everything built on top of `name`: filesystem signature,
    /// partition table and all stacked devices, recursively.
    pub fn remove_descendants(&mut self, name: &str) -> Result<()> {
        for child in self.direct_descendants(name) {
            self.remove_device(&child)?;
        }
        let node = self.get_mut(name)?;
        node.filesystem = None;
        node.ptable = None;
        Ok(())
    }

    /// Remove a device and everything on top of it.
    pub fn remove_device(&mut self, name: &str) -> Result<()> {
        self.get(name)?;
        for child in self.direct_descendants(name) {
            self.remove_device(&child)?;
        }
        self.devices.remove(name);
        debug!("removed device {}", name);
        Ok(())
    }

    /// Resize a partition or logical volume.
    pub fn resize(&mut self, name: &str, new_size: DiskSize) -> Result<()> {
        let node = self.get(name)?;
        match node.kind {
            DeviceKind::Partition { ptype, .. } => {
                let region = node.partition_region().unwrap();
                let grain = node.grain;
                let parent = node.parent.clone().unwrap();
                let new_len = new_size.ceil(grain).bytes();
                if new_len > region.length {
                    let limit = self.growth_limit(&parent, name, ptype)?;
                    if region.start + new_len > limit {
                        return Err(DiskplanError::NoSpace {
                            needed: DiskSize::b(new_len),
                            available: DiskSize::b(limit - region.start),
                        });
                    }
                }
                let node = self.get_mut(name)?;
                if let DeviceKind::Partition { ref mut region, .. } = node.kind {
                    region.length = new_len;
                }
                node.size = DiskSize::b(new_len);
            }
            DeviceKind::LvmLv => {
                let vg_name = node.parent.clone().unwrap();
                let old = node.size;
                let extent = self.vg_extent_size(&vg_name)?;
                let rounded = new_size.ceil(extent);
                if rounded > old {
                    let free = self.vg_free(&vg_name)?;
                    if rounded - old > free {
                        return Err(DiskplanError::NoSpace {
                            needed: rounded - old,
                            available: free,
                        });
                    }
                }
                self.get_mut(name)?.size = rounded;
            }
            _ => {
                return Err(DiskplanError::WrongDeviceKind {
                    name: name.to_string(),
                    expected: "partition or logical volume".to_string(),
                })
            }
        }
        debug!("resized {} to {}", name, new_size);
        Ok(())
    }

    /// Highest end offset partition `name` may grow to without touching its
    /// next sibling (or the container boundary).
    fn growth_limit(&self, parent: &str, name: &str, ptype: PartitionType) -> Result<u64> {
        let this_start = self
            .get(name)?
            .partition_region()
            .map(|r| r.start)
            .unwrap_or(0);
        let mut limit = if ptype == PartitionType::Logical {
            self.extended_partition(parent)
                .and_then(|e| e.partition_region())
                .map(|r| r.end())
                .unwrap_or(0)
        } else {
            self.usable_region(parent)?.end()
        };
        for part in self.partitions_of(parent) {
            if part.name == name {
                continue;
            }
            let other_logical = part.partition_type() == Some(PartitionType::Logical);
            if other_logical != (ptype == PartitionType::Logical) {
                continue;
            }
            let start = part.partition_region().unwrap().start;
            if start > this_start {
                limit = limit.min(start);
            }
        }
        Ok(limit)
    }

    pub fn format(&mut self, name: &str, filesystem: Filesystem) -> Result<()> {
        let node = self.get_mut(name)?;
        node.filesystem = Some(filesystem);
        Ok(())
    }

    pub fn create_md(
        &mut self,
        name: &str,
        level: MdLevel,
        chunk_size: Option<DiskSize>,
        members: Vec<String>,
    ) -> Result<()> {
        if members.len() < level.min_members() {
            return Err(DiskplanError::ConfigError(format!(
                "{} needs at least {} members, got {}",
                level,
                level.min_members(),
                members.len()
            )));
        }
        let mut sizes = Vec::with_capacity(members.len());
        for member in &members {
            sizes.push(self.get(member)?.size);
        }
        let size = level.array_size(&sizes);
        self.insert_new(DeviceNode {
            name: name.to_string(),
            kind: DeviceKind::Md {
                level,
                chunk_size,
                members,
            },
            size,
            parent: None,
            ptable: None,
            grain: DiskSize::mib(1),
            filesystem: None,
        })?;
        debug!("created {} array {} ({})", level, name, size);
        Ok(())
    }

    pub fn create_bcache(
        &mut self,
        name: &str,
        backing: &str,
        caching: Option<&str>,
        mode: CacheMode,
    ) -> Result<()> {
        let backing_size = self.get(backing)?.size;
        if let Some(cset) = caching {
            self.get(cset)?;
        }
        self.insert_new(DeviceNode {
            name: name.to_string(),
            kind: DeviceKind::Bcache {
                backing: backing.to_string(),
                caching: caching.map(str::to_string),
                mode,
            },
            size: backing_size - BCACHE_HEADER,
            parent: None,
            ptable: None,
            grain: DiskSize::mib(1),
            filesystem: None,
        })?;
        debug!("created bcache {} over {}", name, backing);
        Ok(())
    }

    /// Attach a caching set to an existing bcache device.
    pub fn add_bcache_caching_set(&mut self, bcache: &str, cset: &str) -> Result<()> {
        self.get(cset)?;
        let node = self.get_mut(bcache)?;
        match node.kind {
            DeviceKind::Bcache {
                ref mut caching, ..
            } => {
                *caching = Some(cset.to_string());
                Ok(())
            }
            _ => Err(DiskplanError::WrongDeviceKind {
                name: bcache.to_string(),
                expected: "bcache device".to_string(),
            }),
        }
    }

    pub fn create_lvm_vg(&mut self, name: &str, extent_size: DiskSize) -> Result<()> {
        self.insert_new(DeviceNode {
            name: name.to_string(),
            kind: DeviceKind::LvmVg {
                extent_size,
                pvs: Vec::new(),
            },
            size: DiskSize::zero(),
            parent: None,
            ptable: None,
            grain: extent_size,
            filesystem: None,
        })?;
        debug!("created volume group {}", name);
        Ok(())
    }

    pub fn add_physical_volume(&mut self, vg: &str, device: &str) -> Result<()> {
        let extent = self.vg_extent_size(vg)?;
        let dev_size = self.get(device)?.size;
        let usable = (dev_size - PV_METADATA_OVERHEAD).floor(extent);
        let node = self.get_mut(vg)?;
        match node.kind {
            DeviceKind::LvmVg { ref mut pvs, .. } => {
                pvs.push(device.to_string());
                node.size += usable;
                debug!("added PV {} to {} (+{})", device, vg, usable);
                Ok(())
            }
            _ => Err(DiskplanError::WrongDeviceKind {
                name: vg.to_string(),
                expected: "volume group".to_string(),
            }),
        }
    }

    pub fn vg_extent_size(&self, vg: &str) -> Result<DiskSize> {
        match self.get(vg)?.kind {
            DeviceKind::LvmVg { extent_size, .. } => Ok(extent_size),
            _ => Err(DiskplanError::WrongDeviceKind {
                name: vg.to_string(),
                expected: "volume group".to_string(),
            }),
        }
    }

    pub fn lvs_of(&self, vg: &str) -> Vec<&DeviceNode> {
        let mut lvs: Vec<&DeviceNode> = self
            .devices
            .values()
            .filter(|d| matches!(d.kind, DeviceKind::LvmLv) && d.parent.as_deref() == Some(vg))
            .collect();
        lvs.sort_by(|a, b| a.name.cmp(&b.name));
        lvs
    }

    pub fn vg_free(&self, vg: &str) -> Result<DiskSize> {
        let total = self.get(vg)?.size;
        let used: DiskSize = self.lvs_of(vg).iter().map(|lv| lv.size).sum();
        Ok(total - used)
    }

    pub fn create_lvm_lv(&mut self, vg: &str, lv_name: &str, size: DiskSize) -> Result<String> {
        let extent = self.vg_extent_size(vg)?;
        let rounded = size.floor(extent);
        if rounded.is_zero() {
            return Err(DiskplanError::ConfigError(format!(
                "logical volume {} would be smaller than one extent",
                lv_name
            )));
        }
        let free = self.vg_free(vg)?;
        if rounded > free {
            return Err(DiskplanError::NoSpace {
                needed: rounded,
                available: free,
            });
        }
        let vg_base = vg.trim_start_matches("/dev/");
        let name = format!("/dev/{}/{}", vg_base, lv_name);
        self.insert_new(DeviceNode {
            name: name.clone(),
            kind: DeviceKind::LvmLv,
            size: rounded,
            parent: Some(vg.to_string()),
            ptable: None,
            grain: extent,
            filesystem: None,
        })?;
        debug!("created LV {} ({})", name, rounded);
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::FsKind;

    fn disk_graph() -> DeviceGraph {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sda", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sda", PtableKind::Gpt)
            .unwrap();
        graph
    }

    #[test]
    fn partition_names_follow_kernel_conventions() {
        assert_eq!(partition_path("/dev/sda", 3), "/dev/sda3");
        assert_eq!(partition_path("/dev/nvme0n1", 2), "/dev/nvme0n1p2");
        assert_eq!(partition_path("/dev/mmcblk0", 1), "/dev/mmcblk0p1");
    }

    #[test]
    fn creates_partitions_with_increasing_numbers() {
        let mut graph = disk_graph();
        let grain = DiskSize::mib(1).bytes();
        let p1 = graph
            .create_partition(
                "/dev/sda",
                Region::new(grain, DiskSize::gib(1).bytes()),
                PartitionType::Primary,
                PartitionId::Esp,
            )
            .unwrap();
        let p2 = graph
            .create_partition(
                "/dev/sda",
                Region::new(grain + DiskSize::gib(1).bytes(), DiskSize::gib(10).bytes()),
                PartitionType::Primary,
                PartitionId::Linux,
            )
            .unwrap();
        assert_eq!(p1, "/dev/sda1");
        assert_eq!(p2, "/dev/sda2");
        assert_eq!(graph.partitions_of("/dev/sda").len(), 2);
    }

    #[test]
    fn rejects_overlapping_partitions() {
        let mut graph = disk_graph();
        let grain = DiskSize::mib(1).bytes();
        graph
            .create_partition(
                "/dev/sda",
                Region::new(grain, DiskSize::gib(10).bytes()),
                PartitionType::Primary,
                PartitionId::Linux,
            )
            .unwrap();
        let clash = graph.create_partition(
            "/dev/sda",
            Region::new(grain + DiskSize::gib(5).bytes(), DiskSize::gib(10).bytes()),
            PartitionType::Primary,
            PartitionId::Linux,
        );
        assert!(clash.is_err());
    }

    #[test]
    fn msdos_primary_slots_are_finite() {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sdb", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sdb", PtableKind::Msdos)
            .unwrap();
        let gib = DiskSize::gib(1).bytes();
        let grain = DiskSize::mib(1).bytes();
        for i in 0..4u64 {
            graph
                .create_partition(
                    "/dev/sdb",
                    Region::new(grain + i * gib, gib),
                    PartitionType::Primary,
                    PartitionId::Linux,
                )
                .unwrap();
        }
        let fifth = graph.create_partition(
            "/dev/sdb",
            Region::new(grain + 4 * gib, gib),
            PartitionType::Primary,
            PartitionId::Linux,
        );
        assert!(matches!(
            fifth,
            Err(DiskplanError::PrimarySlotsExhausted { .. })
        ));
    }

    #[test]
    fn logical_partitions_number_from_five() {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sdb", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sdb", PtableKind::Msdos)
            .unwrap();
        let grain = DiskSize::mib(1).bytes();
        graph
            .create_partition(
                "/dev/sdb",
                Region::new(grain, DiskSize::gib(50).bytes()),
                PartitionType::Extended,
                PartitionId::Extended,
            )
            .unwrap();
        let logical = graph
            .create_partition(
                "/dev/sdb",
                Region::new(grain + grain, DiskSize::gib(10).bytes()),
                PartitionType::Logical,
                PartitionId::Linux,
            )
            .unwrap();
        assert_eq!(logical, "/dev/sdb5");
    }

    #[test]
    fn remove_descendants_wipes_stacked_devices() {
        let mut graph = disk_graph();
        let grain = DiskSize::mib(1).bytes();
        let part = graph
            .create_partition(
                "/dev/sda",
                Region::new(grain, DiskSize::gib(10).bytes()),
                PartitionType::Primary,
                PartitionId::Lvm,
            )
            .unwrap();
        graph.create_lvm_vg("/dev/vg0", DiskSize::mib(4)).unwrap();
        graph.add_physical_volume("/dev/vg0", &part).unwrap();
        graph
            .create_lvm_lv("/dev/vg0", "root", DiskSize::gib(5))
            .unwrap();

        graph.remove_descendants(&part).unwrap();
        assert!(graph.find_by_name("/dev/vg0").is_none());
        assert!(graph.find_by_name("/dev/vg0/root").is_none());
        assert!(graph.find_by_name(&part).is_some());
    }

    #[test]
    fn vg_accounting_subtracts_pv_overhead() {
        let mut graph = disk_graph();
        let grain = DiskSize::mib(1).bytes();
        let part = graph
            .create_partition(
                "/dev/sda",
                Region::new(grain, DiskSize::gib(10).bytes()),
                PartitionType::Primary,
                PartitionId::Lvm,
            )
            .unwrap();
        graph.create_lvm_vg("/dev/vg0", DiskSize::mib(4)).unwrap();
        graph.add_physical_volume("/dev/vg0", &part).unwrap();
        let total = graph.get("/dev/vg0").unwrap().size;
        assert!(total < DiskSize::gib(10));
        assert_eq!(total, (DiskSize::gib(10) - DiskSize::mib(1)).floor(DiskSize::mib(4)));
        graph
            .create_lvm_lv("/dev/vg0", "root", DiskSize::gib(5))
            .unwrap();
        assert_eq!(graph.vg_free("/dev/vg0").unwrap(), total - DiskSize::gib(5));
    }

    #[test]
    fn partition_shrink_and_grow() {
        let mut graph = disk_graph();
        let grain = DiskSize::mib(1).bytes();
        let part = graph
            .create_partition(
                "/dev/sda",
                Region::new(grain, DiskSize::gib(10).bytes()),
                PartitionType::Primary,
                PartitionId::Linux,
            )
            .unwrap();
        graph.resize(&part, DiskSize::gib(5)).unwrap();
        assert_eq!(graph.get(&part).unwrap().size, DiskSize::gib(5));
        graph.resize(&part, DiskSize::gib(20)).unwrap();
        assert_eq!(graph.get(&part).unwrap().size, DiskSize::gib(20));
        // growing past the end of the disk fails
        assert!(graph.resize(&part, DiskSize::gib(200)).is_err());
    }

    #[test]
    fn format_records_signature() {
        let mut graph = disk_graph();
        let grain = DiskSize::mib(1).bytes();
        let part = graph
            .create_partition(
                "/dev/sda",
                Region::new(grain, DiskSize::gib(10).bytes()),
                PartitionType::Primary,
                PartitionId::Linux,
            )
            .unwrap();
        graph
            .format(&part, Filesystem::new(FsKind::Ext4, Some("/".into())))
            .unwrap();
        let fs = graph.get(&part).unwrap().filesystem.clone().unwrap();
        assert_eq!(fs.kind, FsKind::Ext4);
        assert_eq!(fs.mount_point.as_deref(), Some("/"));
    }
}
