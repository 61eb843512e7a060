//! Partition creation and reuse

use crate::creators::CreatorResult;
use crate::model::{
    DeviceGraph, Filesystem, FreeDiskSpace, PartitionId, PartitionType, PtableKind, Region,
};
use crate::planned::{PlannedDevice, PlannedPartition, PlannedVg};
use crate::space::{
    distribute_extra_space, AssignedSpace, Infeasible, SpaceDistribution,
    SpaceDistributionCalculator,
};
use crate::utils::error::{DiskplanError, Result};
use tracing::{debug, warn};

/// Find the best space distribution for `partitions`, falling back to the
/// flexible retry when the planned minimums do not fit. In the retry every
/// minimum drops to one byte and the original minimum becomes the growth
/// weight, so devices shrink proportionally instead of failing outright.
///
/// Exhausted primary slots are never retried; no relaxation of sizes can fix
/// a partition-table limit.
pub(crate) fn plan_distribution(
    partitions: &[PlannedPartition],
    free_spaces: &[FreeDiskSpace],
    planned_vg: Option<&PlannedVg>,
) -> Result<SpaceDistribution> {
    let calculator = match planned_vg {
        Some(vg) => SpaceDistributionCalculator::with_vg(vg),
        None => SpaceDistributionCalculator::new(),
    };
    match calculator.best_distribution(partitions, free_spaces) {
        Ok(distribution) => Ok(distribution),
        Err(Infeasible::PrimarySlots { disk }) => {
            Err(DiskplanError::PrimarySlotsExhausted { disk })
        }
        Err(Infeasible::NoSpace) => {
            warn!("planned sizes do not fit, retrying with flexible minimums");
            let flexible: Vec<PlannedPartition> = partitions
                .iter()
                .cloned()
                .map(|mut part| {
                    part.common.make_flexible();
                    part
                })
                .collect();
            match calculator.best_distribution(&flexible, free_spaces) {
                Ok(distribution) => Ok(distribution),
                Err(_) => Err(DiskplanError::NoSpace {
                    needed: partitions.iter().map(|p| p.common.min_size).sum(),
                    available: free_spaces.iter().map(|s| s.size()).sum(),
                }),
            }
        }
    }
}

/// Turns space distributions into concrete partitions.
pub struct PartitionCreator;

impl PartitionCreator {
    /// Materialize a space distribution: grow the assigned partitions to
    /// their final sizes, create them in order and format the ones that are
    /// not components of a stacked device.
    pub fn create_partitions(
        graph: &DeviceGraph,
        distribution: &SpaceDistribution,
    ) -> Result<CreatorResult> {
        let mut result = CreatorResult::new(graph.duplicate());
        for assigned in distribution.used_spaces() {
            Self::process_space(&mut result, assigned)?;
        }
        Ok(result)
    }

    fn process_space(result: &mut CreatorResult, assigned: &AssignedSpace) -> Result<()> {
        let disk = assigned.space.disk.clone();
        let grain = assigned.space.grain;
        if result.graph.get(&disk)?.ptable.is_none() {
            result.graph.create_partition_table(&disk, PtableKind::Gpt)?;
        }

        if assigned.partition_type == Some(PartitionType::Extended) {
            result.graph.create_partition(
                &disk,
                assigned.space.region,
                PartitionType::Extended,
                PartitionId::Extended,
            )?;
        }

        let mut parts = assigned.partitions.clone();
        let leftover = distribute_extra_space(
            &mut parts,
            assigned.usable_size(),
            grain,
            assigned.enforced_last,
        );
        if !leftover.is_zero() {
            debug!("{} in {} left unassigned", leftover, assigned.space.id());
        }

        let mut order: Vec<usize> = (0..parts.len())
            .filter(|&i| Some(i) != assigned.enforced_last)
            .collect();
        if let Some(i) = assigned.enforced_last {
            order.push(i);
        }

        let logical = matches!(
            assigned.partition_type,
            Some(PartitionType::Logical) | Some(PartitionType::Extended)
        );
        let mut cursor = assigned.space.region.start;
        let mut first = true;
        for idx in order {
            let planned = &parts[idx];
            // Every logical partition is preceded by one grain holding its
            // EBR, except the first one of a freshly created extended
            // partition, whose EBR lives in the extended slot itself.
            if logical && (assigned.space.in_extended || !first) {
                cursor += grain.bytes();
            }
            first = false;
            let region = Region::new(cursor, planned.common.size.bytes());
            let ptype = if logical {
                PartitionType::Logical
            } else {
                PartitionType::Primary
            };
            let name = result.graph.create_partition(
                &disk,
                region,
                ptype,
                planned.effective_partition_id(),
            )?;
            cursor = region.end();
            Self::format_leaf(&mut result.graph, &name, planned)?;
            result.register(&name, PlannedDevice::Partition(planned.clone()));
        }
        Ok(())
    }

    fn format_leaf(
        graph: &mut DeviceGraph,
        name: &str,
        planned: &PlannedPartition,
    ) -> Result<()> {
        if planned.component_of.is_some() {
            return Ok(());
        }
        if let Some(kind) = planned.common.filesystem {
            let mut fs = Filesystem::new(kind, planned.common.mount_point.clone());
            fs.label = planned.common.label.clone();
            fs.encrypted = planned.common.encryption_password.is_some();
            graph.format(name, fs)?;
        }
        Ok(())
    }

    /// Adopt existing partitions named by `reuse_name`, resizing the ones
    /// marked for it. All shrinks run before any grow, so a grow can use
    /// space a shrink frees within the same container.
    pub fn reuse_partitions(
        graph: &DeviceGraph,
        planned: &[PlannedPartition],
    ) -> Result<CreatorResult> {
        let mut result = CreatorResult::new(graph.duplicate());
        let mut shrinks = Vec::new();
        let mut grows = Vec::new();
        for part in planned {
            let name = part.common.reuse_name.clone().ok_or_else(|| {
                DiskplanError::ConfigError(format!(
                    "{} is not marked for reuse",
                    PlannedDevice::Partition(part.clone()).describe()
                ))
            })?;
            let current = result.graph.get(&name)?.size;
            if part.common.resize {
                let target = current.max(part.common.min_size).min(part.common.max_size);
                if target < current {
                    shrinks.push((name.clone(), target));
                } else if target > current {
                    grows.push((name.clone(), target));
                }
            }
            result.register(&name, PlannedDevice::Partition(part.clone()));
        }
        for (name, target) in shrinks.into_iter().chain(grows) {
            result.graph.resize(&name, target)?;
        }
        Ok(result)
    }

    /// Partition a single disk-like device, such as a disk handed over
    /// wholesale or a freshly created MD array or bcache. Percent sizes
    /// resolve against the device size and every partition is pinned to the
    /// device before planning.
    pub fn partition_device(
        graph: &DeviceGraph,
        name: &str,
        partitions: &[PlannedPartition],
        ptable: Option<PtableKind>,
    ) -> Result<CreatorResult> {
        let mut graph = graph.duplicate();
        let size = graph.get(name)?.size;
        let wanted = ptable.unwrap_or(PtableKind::Gpt);
        if graph.get(name)?.ptable != Some(wanted) {
            graph.create_partition_table(name, wanted)?;
        }
        let mut scoped: Vec<PlannedPartition> = partitions.to_vec();
        for part in &mut scoped {
            part.common.resolve_percent_size(size);
            part.disk = Some(name.to_string());
        }
        let spaces = graph.free_spaces(name)?;
        let distribution = plan_distribution(&scoped, &spaces, None)?;
        Self::create_partitions(&graph, &distribution)
    }
}
