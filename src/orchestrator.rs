//! Top-level planning pipeline
//!
//! Takes a device-graph snapshot plus a collection of planned devices and
//! produces the mutated snapshot in which every plan is satisfied. Stages
//! run bottom-up: whole devices and reused partitions first, then the space
//! distribution for new partitions, then the stacked devices that consume
//! them. Each stage works on a duplicate of the snapshot, so a failure at
//! any point leaves the input untouched.

use crate::creators::{
    BcacheCreator, BtrfsCreator, CreatorResult, LvmCreator, MdCreator, PartitionCreator,
};
use crate::creators::partition::plan_distribution;
use crate::model::{DeviceGraph, Filesystem, FreeDiskSpace};
use crate::planned::{
    split_reuse, DevicesCollection, PlannedCommon, PlannedDevice, PlannedPartition, PlannedVg,
};
use crate::utils::error::{DiskplanError, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outcome of a planning run: the final snapshot and the mapping from real
/// device names to the plans they satisfy.
#[derive(Debug, Clone)]
pub struct PlanResult {
    pub graph: DeviceGraph,
    pub devices: BTreeMap<String, PlannedDevice>,
}

/// Plan and materialize `planned` against `graph`. New partitions may only
/// land on `candidate_disks`; an empty slice admits every disk in the
/// snapshot. Reuse plans address their device by name and are not filtered.
pub fn plan_and_materialize(
    graph: &DeviceGraph,
    planned: &DevicesCollection,
    candidate_disks: &[String],
) -> Result<PlanResult> {
    planned.validate()?;
    info!("planning {} devices", planned.len());

    let mut result = CreatorResult::new(graph.duplicate());
    result = process_whole_devices(result, planned)?;
    result = process_partitions(result, planned, candidate_disks)?;
    result = process_md_arrays(result, planned)?;
    result = process_bcaches(result, planned)?;
    result = process_volume_groups(result, planned)?;
    result = process_btrfs(result, planned)?;
    register_mount_only(&mut result, planned);

    Ok(PlanResult {
        graph: result.graph,
        devices: result.devices,
    })
}

fn format_in_place(
    result: &mut CreatorResult,
    name: &str,
    common: &PlannedCommon,
) -> Result<()> {
    result.graph.remove_descendants(name)?;
    if let Some(kind) = common.filesystem {
        let mut fs = Filesystem::new(kind, common.mount_point.clone());
        fs.label = common.label.clone();
        fs.encrypted = common.encryption_password.is_some();
        result.graph.format(name, fs)?;
    }
    Ok(())
}

/// Whole disks and stray block devices consumed without a partition table.
fn process_whole_devices(
    mut result: CreatorResult,
    planned: &DevicesCollection,
) -> Result<CreatorResult> {
    for disk in planned.disks() {
        let name = disk.common.reuse_name.clone().ok_or_else(|| {
            DiskplanError::ConfigError("a whole-disk plan must name its disk".into())
        })?;
        format_in_place(&mut result, &name, &disk.common)?;
        result.register(&name, PlannedDevice::Disk(disk.clone()));
    }
    for stray in planned.stray_blocks() {
        let name = stray.common.reuse_name.clone().ok_or_else(|| {
            DiskplanError::ConfigError("a stray-block plan must name its device".into())
        })?;
        format_in_place(&mut result, &name, &stray.common)?;
        result.register(&name, PlannedDevice::StrayBlock(stray.clone()));
    }
    Ok(result)
}

/// Free spaces across the candidate disks, or every disk of the snapshot
/// when no candidates are named.
fn candidate_free_spaces(
    graph: &DeviceGraph,
    candidate_disks: &[String],
) -> Result<Vec<FreeDiskSpace>> {
    let disks: Vec<String> = graph
        .disks()
        .map(|d| d.name.clone())
        .filter(|name| candidate_disks.is_empty() || candidate_disks.contains(name))
        .collect();
    let mut spaces = Vec::new();
    for disk in disks {
        spaces.extend(graph.free_spaces(&disk)?);
    }
    Ok(spaces)
}

/// The first volume group that still needs space beyond its explicitly
/// tagged physical volumes; the calculator may synthesize PVs for it.
fn pending_vg<'a>(
    planned: &'a DevicesCollection,
    partitions: &[PlannedPartition],
) -> Option<&'a PlannedVg> {
    planned.vgs().into_iter().find(|vg| {
        if vg.common.reuse() {
            return false;
        }
        let contributed: crate::utils::units::DiskSize = partitions
            .iter()
            .filter(|p| p.lvm_volume_group() == Some(vg.name.as_str()))
            .map(|p| {
                (p.common.min_size.saturating_sub(crate::model::graph::PV_METADATA_OVERHEAD))
                    .floor(vg.extent_size)
            })
            .sum();
        !vg.missing_space(contributed).is_zero()
    })
}

/// Reuse the partitions that name an existing device, then find the best
/// space distribution for the rest and create them.
fn process_partitions(
    mut result: CreatorResult,
    planned: &DevicesCollection,
    candidate_disks: &[String],
) -> Result<CreatorResult> {
    let top_level: Vec<PlannedPartition> =
        planned.partitions().into_iter().cloned().collect();
    let (reuse, mut create) = split_reuse(&top_level);

    if !reuse.is_empty() {
        let reused = PartitionCreator::reuse_partitions(&result.graph, &reuse)?;
        result = result.merge(reused);
    }
    if create.is_empty() {
        return Ok(result);
    }

    // Percent sizes resolve against the pinned disk before planning; with
    // no disk pin there is no parent to resolve them against.
    for part in &mut create {
        match &part.disk {
            Some(disk) => {
                let size = result.graph.get(disk)?.size;
                part.common.resolve_percent_size(size);
            }
            None if part.common.percent_size.is_some() => {
                return Err(DiskplanError::ConfigError(format!(
                    "{} has a percent size but no disk to resolve it against",
                    PlannedDevice::Partition(part.clone()).describe()
                )));
            }
            None => {}
        }
    }

    let spaces = candidate_free_spaces(&result.graph, candidate_disks)?;
    let vg = pending_vg(planned, &create);
    let distribution = plan_distribution(&create, &spaces, vg)?;
    debug!(
        "best distribution uses {} regions, wastes {}",
        distribution.used_regions(),
        distribution.wasted_bytes()
    );
    let created = PartitionCreator::create_partitions(&result.graph, &distribution)?;
    Ok(result.merge(created))
}

fn process_md_arrays(
    mut result: CreatorResult,
    planned: &DevicesCollection,
) -> Result<CreatorResult> {
    for md in planned.mds() {
        let step = if md.common.reuse() {
            MdCreator::reuse_array(&result.graph, md)?
        } else {
            let tagged = result.names_where(|d| match d {
                PlannedDevice::Partition(p) => p.raid_name() == Some(md.name.as_str()),
                _ => false,
            });
            MdCreator::create_array(&result.graph, md, &tagged)?
        };
        result = result.merge(step);
    }
    Ok(result)
}

fn process_bcaches(
    mut result: CreatorResult,
    planned: &DevicesCollection,
) -> Result<CreatorResult> {
    use crate::planned::ComponentRole;
    for bcache in planned.bcaches() {
        let backing = result
            .names_where(|d| match d {
                PlannedDevice::Partition(p) => {
                    p.component_of == Some(ComponentRole::BcacheBacking(bcache.name.clone()))
                }
                _ => false,
            })
            .into_iter()
            .next();
        let caching = result
            .names_where(|d| match d {
                PlannedDevice::Partition(p) => {
                    p.component_of == Some(ComponentRole::BcacheCaching(bcache.name.clone()))
                }
                _ => false,
            })
            .into_iter()
            .next();
        let step = BcacheCreator::create_bcache(
            &result.graph,
            bcache,
            backing.as_deref(),
            caching.as_deref(),
        )?;
        result = result.merge(step);
    }
    Ok(result)
}

fn process_volume_groups(
    mut result: CreatorResult,
    planned: &DevicesCollection,
) -> Result<CreatorResult> {
    for vg in planned.vgs() {
        let step = if vg.common.reuse() {
            LvmCreator::reuse_volume_group(&result.graph, vg)?
        } else {
            let pvs = result.names_where(|d| match d {
                PlannedDevice::Partition(p) => {
                    p.lvm_volume_group() == Some(vg.name.as_str())
                }
                _ => false,
            });
            LvmCreator::create_volume_group(&result.graph, vg, &pvs)?
        };
        result = result.merge(step);
    }
    Ok(result)
}

fn process_btrfs(
    mut result: CreatorResult,
    planned: &DevicesCollection,
) -> Result<CreatorResult> {
    for btrfs in planned.btrfs_filesystems() {
        let tagged = result.names_where(|d| match d {
            PlannedDevice::Partition(p) => p.btrfs_name() == Some(btrfs.name.as_str()),
            _ => false,
        });
        let step = BtrfsCreator::create_filesystem(&result.graph, btrfs, &tagged)?;
        result = result.merge(step);
    }
    Ok(result)
}

/// NFS and tmpfs entries carry mount intent only; they never touch the
/// graph but still appear in the result so callers can emit fstab lines.
fn register_mount_only(result: &mut CreatorResult, planned: &DevicesCollection) {
    for nfs in planned.nfs_mounts() {
        let key = format!("nfs:{}:{}", nfs.server, nfs.path);
        result.register(&key, PlannedDevice::Nfs(nfs.clone()));
    }
    for tmpfs in planned.tmpfs_mounts() {
        let mount = tmpfs.common.mount_point.as_deref().unwrap_or("/tmp");
        let key = format!("tmpfs:{}", mount);
        result.register(&key, PlannedDevice::Tmpfs(tmpfs.clone()));
    }
}
