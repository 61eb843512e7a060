//! Volume-group creation and reuse

use crate::creators::CreatorResult;
use crate::model::{DeviceGraph, Filesystem};
use crate::planned::{MakeSpacePolicy, PlannedDevice, PlannedLv, PlannedVg};
use crate::space::distribute_extra_space;
use crate::utils::error::{DiskplanError, Result};
use crate::utils::units::DiskSize;
use tracing::{debug, warn};

/// Turns planned volume groups into VGs, PVs and logical volumes.
pub struct LvmCreator;

impl LvmCreator {
    /// Create a new volume group over `pv_names` and carve the planned
    /// logical volumes out of it. Any signature on a physical volume is
    /// wiped before it joins the group.
    pub fn create_volume_group(
        graph: &DeviceGraph,
        planned: &PlannedVg,
        pv_names: &[String],
    ) -> Result<CreatorResult> {
        if pv_names.is_empty() {
            return Err(DiskplanError::ConfigError(format!(
                "volume group {} has no physical volumes",
                planned.name
            )));
        }
        let mut result = CreatorResult::new(graph.duplicate());
        let vg_name = planned.device_name();
        result.graph.create_lvm_vg(&vg_name, planned.extent_size)?;
        for pv in pv_names {
            result.graph.remove_descendants(pv)?;
            result.graph.add_physical_volume(&vg_name, pv)?;
        }
        result.register(&vg_name, PlannedDevice::VolumeGroup(planned.clone()));
        Self::create_logical_volumes(&mut result, planned, &vg_name)?;
        Ok(result)
    }

    /// Reuse an existing volume group, making room for the planned logical
    /// volumes according to the make-space policy.
    pub fn reuse_volume_group(graph: &DeviceGraph, planned: &PlannedVg) -> Result<CreatorResult> {
        let vg_name = planned.common.reuse_name.clone().ok_or_else(|| {
            DiskplanError::VgPolicy(format!(
                "volume group {} has no reuse target",
                planned.name
            ))
        })?;
        let mut result = CreatorResult::new(graph.duplicate());
        // fails early when the target is missing or not a VG
        result.graph.vg_extent_size(&vg_name)?;

        match planned.make_space_policy {
            MakeSpacePolicy::Keep => {}
            MakeSpacePolicy::Remove => {
                let victims: Vec<String> = result
                    .graph
                    .lvs_of(&vg_name)
                    .iter()
                    .map(|lv| lv.name.clone())
                    .collect();
                for victim in victims {
                    result.graph.remove_device(&victim)?;
                }
            }
            MakeSpacePolicy::Needed => {
                Self::evict_until_fits(&mut result.graph, planned, &vg_name)?;
            }
        }

        result.register(&vg_name, PlannedDevice::VolumeGroup(planned.clone()));
        Self::create_logical_volumes(&mut result, planned, &vg_name)?;
        Ok(result)
    }

    /// Remove existing logical volumes, smallest first, until the planned
    /// ones fit at their minimum sizes.
    fn evict_until_fits(
        graph: &mut DeviceGraph,
        planned: &PlannedVg,
        vg_name: &str,
    ) -> Result<()> {
        let needed = planned.target_size();
        loop {
            let free = graph.vg_free(vg_name)?;
            if free >= needed {
                return Ok(());
            }
            let victim = graph
                .lvs_of(vg_name)
                .iter()
                .min_by_key(|lv| lv.size)
                .map(|lv| lv.name.clone());
            match victim {
                Some(name) => {
                    debug!("evicting {} to make room in {}", name, vg_name);
                    graph.remove_device(&name)?;
                }
                None => {
                    return Err(DiskplanError::NoSpace {
                        needed,
                        available: free,
                    })
                }
            }
        }
    }

    /// Grow the planned LVs into the free extents and create them. When the
    /// minimums do not fit, the flexible retry shrinks them proportionally.
    fn create_logical_volumes(
        result: &mut CreatorResult,
        planned: &PlannedVg,
        vg_name: &str,
    ) -> Result<()> {
        if planned.lvs.is_empty() {
            return Ok(());
        }
        let extent = result.graph.vg_extent_size(vg_name)?;
        let free = result.graph.vg_free(vg_name)?;
        let vg_total = result.graph.get(vg_name)?.size;
        let mut lvs = planned.lvs.clone();

        // Percent sizes resolve against the group's actual size, which is
        // only known once the physical volumes have joined it.
        for lv in &mut lvs {
            lv.common.resolve_percent_size(vg_total);
        }

        let total_min: DiskSize = lvs
            .iter()
            .map(|lv| lv.common.min_size.ceil(extent))
            .sum();
        if total_min > free {
            warn!(
                "{} needs {} but has {} free, retrying with flexible minimums",
                vg_name, total_min, free
            );
            for lv in &mut lvs {
                lv.common.make_flexible();
            }
            let floor: DiskSize =
                DiskSize::b(extent.bytes() * lvs.len() as u64);
            if floor > free {
                return Err(DiskplanError::NoSpace {
                    needed: total_min,
                    available: free,
                });
            }
        }

        distribute_extra_space(&mut lvs, free, extent, None);
        for lv in &lvs {
            let name = result
                .graph
                .create_lvm_lv(vg_name, &lv.name, lv.common.size)?;
            Self::format_lv(&mut result.graph, &name, lv)?;
            result.register(&name, PlannedDevice::LogicalVolume(lv.clone()));
        }
        Ok(())
    }

    fn format_lv(graph: &mut DeviceGraph, name: &str, lv: &PlannedLv) -> Result<()> {
        if let Some(kind) = lv.common.filesystem {
            let mut fs = Filesystem::new(kind, lv.common.mount_point.clone());
            fs.label = lv.common.label.clone();
            fs.encrypted = lv.common.encryption_password.is_some();
            graph.format(name, fs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FsKind, PartitionId, PartitionType, PtableKind, Region};

    fn graph_with_pv(pv_gib: u64) -> (DeviceGraph, String) {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sda", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sda", PtableKind::Gpt)
            .unwrap();
        let pv = graph
            .create_partition(
                "/dev/sda",
                Region::new(DiskSize::mib(1).bytes(), DiskSize::gib(pv_gib).bytes()),
                PartitionType::Primary,
                PartitionId::Lvm,
            )
            .unwrap();
        (graph, pv)
    }

    fn vg_with_lvs() -> PlannedVg {
        let mut vg = PlannedVg::new("system");
        let mut root = PlannedLv::new("root", DiskSize::gib(10), DiskSize::unlimited(), 1.0);
        root.common.filesystem = Some(FsKind::Ext4);
        root.common.mount_point = Some("/".into());
        vg.lvs.push(root);
        vg.lvs
            .push(PlannedLv::new("swap", DiskSize::gib(2), DiskSize::gib(2), 0.0));
        vg
    }

    #[test]
    fn creates_vg_lvs_and_formats() {
        let (graph, pv) = graph_with_pv(30);
        let planned = vg_with_lvs();
        let result =
            LvmCreator::create_volume_group(&graph, &planned, &[pv.clone()]).unwrap();

        let vg_size = result.graph.get("/dev/system").unwrap().size;
        assert_eq!(
            vg_size,
            (DiskSize::gib(30) - DiskSize::mib(1)).floor(DiskSize::mib(4))
        );
        let root = result.graph.get("/dev/system/root").unwrap();
        let swap = result.graph.get("/dev/system/swap").unwrap();
        // swap is capped, root takes everything else
        assert_eq!(swap.size, DiskSize::gib(2));
        assert_eq!(root.size, vg_size - DiskSize::gib(2));
        assert_eq!(
            root.filesystem.as_ref().map(|fs| fs.kind),
            Some(FsKind::Ext4)
        );
        assert!(result.devices.contains_key("/dev/system"));
        assert!(result.devices.contains_key("/dev/system/root"));
    }

    #[test]
    fn lv_minimums_shrink_flexibly_in_a_small_vg() {
        let (graph, pv) = graph_with_pv(10);
        let mut planned = PlannedVg::new("small");
        planned.lvs.push(PlannedLv::new(
            "a",
            DiskSize::gib(8),
            DiskSize::unlimited(),
            1.0,
        ));
        planned.lvs.push(PlannedLv::new(
            "b",
            DiskSize::gib(8),
            DiskSize::unlimited(),
            1.0,
        ));
        let result = LvmCreator::create_volume_group(&graph, &planned, &[pv]).unwrap();
        let free = result.graph.vg_free("/dev/small").unwrap();
        assert!(free < DiskSize::mib(8));
        let a = result.graph.get("/dev/small/a").unwrap().size;
        let b = result.graph.get("/dev/small/b").unwrap().size;
        // equal weights, so the halves differ by at most one extent
        assert!(a.max(b) - a.min(b) <= DiskSize::mib(4));
    }

    #[test]
    fn percent_lv_resolves_against_vg_size() {
        let (graph, pv) = graph_with_pv(40);
        let mut planned = PlannedVg::new("system");
        let mut half = PlannedLv::new("half", DiskSize::zero(), DiskSize::unlimited(), 0.0);
        half.common.percent_size = Some(50.0);
        planned.lvs.push(half);

        let result = LvmCreator::create_volume_group(&graph, &planned, &[pv]).unwrap();
        // VG holds just under 40 GiB; half of it rounds to 20 GiB of extents
        let lv = result.graph.get("/dev/system/half").unwrap();
        assert_eq!(lv.size, DiskSize::gib(20));
    }

    fn reusable_vg(pv_gib: u64, lv_sizes_gib: &[(&str, u64)]) -> DeviceGraph {
        let (mut graph, pv) = graph_with_pv(pv_gib);
        graph.create_lvm_vg("/dev/old", DiskSize::mib(4)).unwrap();
        graph.add_physical_volume("/dev/old", &pv).unwrap();
        for (name, gib) in lv_sizes_gib {
            graph
                .create_lvm_lv("/dev/old", name, DiskSize::gib(*gib))
                .unwrap();
        }
        graph
    }

    #[test]
    fn keep_policy_preserves_existing_lvs() {
        let graph = reusable_vg(30, &[("data", 10)]);
        let mut planned = vg_with_lvs();
        planned.common.reuse_name = Some("/dev/old".into());
        planned.make_space_policy = MakeSpacePolicy::Keep;

        let result = LvmCreator::reuse_volume_group(&graph, &planned).unwrap();
        assert!(result.graph.find_by_name("/dev/old/data").is_some());
        assert!(result.graph.find_by_name("/dev/old/root").is_some());
    }

    #[test]
    fn remove_policy_purges_existing_lvs() {
        let graph = reusable_vg(30, &[("data", 10), ("scratch", 5)]);
        let mut planned = vg_with_lvs();
        planned.common.reuse_name = Some("/dev/old".into());
        planned.make_space_policy = MakeSpacePolicy::Remove;

        let result = LvmCreator::reuse_volume_group(&graph, &planned).unwrap();
        assert!(result.graph.find_by_name("/dev/old/data").is_none());
        assert!(result.graph.find_by_name("/dev/old/scratch").is_none());
        assert!(result.graph.find_by_name("/dev/old/root").is_some());
    }

    #[test]
    fn needed_policy_evicts_smallest_first() {
        // VG holds just under 31 GiB; existing LVs use 10 + 8 + 5 GiB. The
        // plan needs 12 GiB, so evicting the 5 GiB LV is enough.
        let graph = reusable_vg(31, &[("big", 10), ("mid", 8), ("small", 5)]);
        let mut planned = vg_with_lvs();
        planned.common.reuse_name = Some("/dev/old".into());
        planned.make_space_policy = MakeSpacePolicy::Needed;

        let result = LvmCreator::reuse_volume_group(&graph, &planned).unwrap();
        assert!(result.graph.find_by_name("/dev/old/small").is_none());
        assert!(result.graph.find_by_name("/dev/old/big").is_some());
        assert!(result.graph.find_by_name("/dev/old/mid").is_some());
        assert!(result.graph.find_by_name("/dev/old/root").is_some());
    }

    #[test]
    fn needed_policy_fails_when_eviction_cannot_help() {
        let graph = reusable_vg(30, &[("data", 10)]);
        let mut planned = PlannedVg::new("system");
        planned.common.reuse_name = Some("/dev/old".into());
        planned.make_space_policy = MakeSpacePolicy::Needed;
        planned.lvs.push(PlannedLv::new(
            "huge",
            DiskSize::gib(200),
            DiskSize::unlimited(),
            1.0,
        ));
        let err = LvmCreator::reuse_volume_group(&graph, &planned).unwrap_err();
        assert!(matches!(err, DiskplanError::NoSpace { .. }));
    }
}
