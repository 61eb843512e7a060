//! Best assignment of planned partitions to free disk regions
//!
//! The calculator enumerates every legal way of binding the planned
//! partitions to the available free spaces, filters the combinations through
//! fit and partition-table legality checks, optionally injects synthetic
//! physical volumes for a pending volume group, and picks the minimum under
//! the [`SpaceDistribution`] total order.
//!
//! "No solution" is a sentinel value, not an error: callers decide whether
//! to retry with relaxed sizing or to give up.

use crate::model::graph::PV_METADATA_OVERHEAD;
use crate::model::{FreeDiskSpace, PartitionType, PtableKind};
use crate::planned::{ComponentRole, PlannedPartition, PlannedVg};
use crate::space::assigned::AssignedSpace;
use crate::space::distribution::SpaceDistribution;
use crate::utils::units::DiskSize;
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Recoverable "no solution" outcome of a planning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Infeasible {
    /// The planned devices cannot fit in the available spaces.
    NoSpace,
    /// Every otherwise-fitting combination needs more primary slots than the
    /// partition table offers. Not recoverable by relaxed sizing.
    PrimarySlots { disk: String },
}

enum Legality {
    Valid,
    SlotsExhausted(String),
    Invalid,
}

/// Calculates the best [`SpaceDistribution`] for a set of planned
/// partitions, optionally securing space for a pending volume group.
#[derive(Debug, Default)]
pub struct SpaceDistributionCalculator<'a> {
    planned_vg: Option<&'a PlannedVg>,
}

impl<'a> SpaceDistributionCalculator<'a> {
    pub fn new() -> Self {
        SpaceDistributionCalculator { planned_vg: None }
    }

    pub fn with_vg(planned_vg: &'a PlannedVg) -> Self {
        SpaceDistributionCalculator {
            planned_vg: Some(planned_vg),
        }
    }

    /// Space the pending VG still needs once the physical volumes already
    /// present among `partitions` are accounted for.
    fn vg_missing(&self, partitions: &[PlannedPartition]) -> DiskSize {
        let Some(vg) = self.planned_vg else {
            return DiskSize::zero();
        };
        let contributed: DiskSize = partitions
            .iter()
            .filter(|p| p.lvm_volume_group() == Some(vg.name.as_str()))
            .map(|p| (p.common.min_size - PV_METADATA_OVERHEAD).floor(vg.extent_size))
            .sum();
        vg.missing_space(contributed)
    }

    /// The best valid distribution, or [`Infeasible`] when none exists.
    pub fn best_distribution(
        &self,
        partitions: &[PlannedPartition],
        free_spaces: &[FreeDiskSpace],
    ) -> Result<SpaceDistribution, Infeasible> {
        let vg_missing = self.vg_missing(partitions);

        // Fast feasibility check before any enumeration.
        let total_free: DiskSize = free_spaces.iter().map(|s| s.size()).sum();
        let mut total_min: DiskSize = partitions.iter().map(|p| p.common.min_size).sum();
        if !vg_missing.is_zero() {
            // Optimistic: assume a single new PV will do.
            total_min += vg_missing + self.planned_vg.unwrap().single_pv_overhead();
        }
        if total_min > total_free {
            debug!(
                "infeasible: {} needed, {} free",
                total_min, total_free
            );
            return Err(Infeasible::NoSpace);
        }

        if partitions.is_empty() {
            let base = SpaceDistribution::new(
                free_spaces
                    .iter()
                    .map(|s| AssignedSpace::new(s.clone(), Vec::new()))
                    .collect(),
            );
            return self.finish(vec![base], vg_missing);
        }

        // Candidate spaces per device.
        let mut candidates: Vec<Vec<usize>> = Vec::with_capacity(partitions.len());
        for part in partitions {
            let spaces: Vec<usize> = free_spaces
                .iter()
                .enumerate()
                .filter(|(_, s)| Self::hosts(part, s))
                .map(|(i, _)| i)
                .collect();
            if spaces.is_empty() {
                debug!(
                    "infeasible: no candidate space for {:?}",
                    part.common.mount_point
                );
                return Err(Infeasible::NoSpace);
            }
            candidates.push(spaces);
        }

        // Every combination of (device -> one of its candidate spaces).
        let mut survivors: Vec<SpaceDistribution> = Vec::new();
        let mut slot_failures: BTreeMap<String, usize> = BTreeMap::new();
        for combo in candidates
            .iter()
            .map(|c| c.iter().copied())
            .multi_cartesian_product()
        {
            let mut by_space: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (device_idx, space_idx) in combo.into_iter().enumerate() {
                by_space.entry(space_idx).or_default().push(device_idx);
            }
            let assigned: Vec<AssignedSpace> = free_spaces
                .iter()
                .enumerate()
                .map(|(i, space)| {
                    let devices = by_space
                        .get(&i)
                        .map(|idxs| idxs.iter().map(|&d| partitions[d].clone()).collect())
                        .unwrap_or_default();
                    AssignedSpace::new(space.clone(), devices)
                })
                .collect();
            let mut dist = SpaceDistribution::new(assigned);
            match Self::validate(&mut dist) {
                Legality::Valid => survivors.push(dist),
                Legality::SlotsExhausted(disk) => {
                    *slot_failures.entry(disk).or_default() += 1;
                }
                Legality::Invalid => {}
            }
        }
        trace!("{} candidate distributions survive", survivors.len());

        self.finish(survivors, vg_missing)
            .map_err(|err| match err {
                Infeasible::NoSpace if !slot_failures.is_empty() => {
                    let disk = slot_failures.keys().next().unwrap().clone();
                    Infeasible::PrimarySlots { disk }
                }
                other => other,
            })
    }

    /// Can `space` legally host `part`?
    fn hosts(part: &PlannedPartition, space: &FreeDiskSpace) -> bool {
        if let Some(disk) = &part.disk {
            if disk != &space.disk {
                return false;
            }
        }
        if part.primary && space.in_extended {
            return false;
        }
        if let Some(offset) = part.max_start_offset {
            if space.region.start > offset {
                return false;
            }
        }
        space.size() >= part.common.min_size
    }

    /// Steps 4 and 5: fit check (with the enforced-last tie-break) and the
    /// partition-type legality pass.
    fn validate(dist: &mut SpaceDistribution) -> Legality {
        for space in dist.spaces.iter_mut().filter(|s| s.is_used()) {
            if !space.fits() {
                return Legality::Invalid;
            }
        }

        // Partition-type legality, per disk.
        let disks: Vec<String> = dist
            .spaces
            .iter()
            .filter(|s| s.is_used())
            .map(|s| s.space.disk.clone())
            .unique()
            .collect();
        for disk in disks {
            match Self::assign_types(dist, &disk) {
                Legality::Valid => {}
                other => return other,
            }
        }

        // Retyping may have added logical-partition overhead.
        for space in dist.spaces.iter_mut().filter(|s| s.is_used()) {
            if !space.fits() {
                return Legality::Invalid;
            }
            if space.partition_type == Some(PartitionType::Logical)
                || space.partition_type == Some(PartitionType::Extended)
            {
                if space.partitions.iter().any(|p| p.primary) {
                    return Legality::Invalid;
                }
            }
        }
        Legality::Valid
    }

    fn assign_types(dist: &mut SpaceDistribution, disk: &str) -> Legality {
        let indices: Vec<usize> = dist
            .spaces
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_used() && s.space.disk == disk)
            .map(|(i, _)| i)
            .collect();
        let sample = &dist.spaces[indices[0]].space;
        let primary_free = sample.primary_free;
        let table = sample.ptable;
        let has_extended = sample.disk_has_extended;

        match table {
            // Table still to be created (GPT by default): no constraints.
            None => Legality::Valid,
            Some(PtableKind::Gpt) => {
                let total: usize = indices.iter().map(|&i| dist.spaces[i].partitions.len()).sum();
                if total > primary_free {
                    return Legality::SlotsExhausted(disk.to_string());
                }
                Legality::Valid
            }
            Some(PtableKind::Msdos) if has_extended => {
                let mut primaries = 0;
                for &i in &indices {
                    let space = &mut dist.spaces[i];
                    if space.space.in_extended {
                        space.partition_type = Some(PartitionType::Logical);
                    } else {
                        space.partition_type = Some(PartitionType::Primary);
                        primaries += space.partitions.len();
                    }
                }
                if primaries > primary_free {
                    return Legality::SlotsExhausted(disk.to_string());
                }
                Legality::Valid
            }
            Some(PtableKind::Msdos) => {
                let total: usize = indices.iter().map(|&i| dist.spaces[i].partitions.len()).sum();
                if total <= primary_free {
                    for &i in &indices {
                        dist.spaces[i].partition_type = Some(PartitionType::Primary);
                    }
                    return Legality::Valid;
                }
                // Designate one space as the future extended partition: the
                // one with most devices, tie-broken by lowest start offset.
                let extended_idx = *indices
                    .iter()
                    .max_by_key(|&&i| {
                        (
                            dist.spaces[i].partitions.len(),
                            std::cmp::Reverse(dist.spaces[i].space.region.start),
                        )
                    })
                    .unwrap();
                let mut primaries = 1; // the extended partition itself
                for &i in &indices {
                    let space = &mut dist.spaces[i];
                    if i == extended_idx {
                        space.partition_type = Some(PartitionType::Extended);
                    } else {
                        space.partition_type = Some(PartitionType::Primary);
                        primaries += space.partitions.len();
                    }
                }
                if primaries > primary_free {
                    return Legality::SlotsExhausted(disk.to_string());
                }
                Legality::Valid
            }
        }
    }

    /// Step 6 and 7: inject synthetic PVs where a VG still needs space, then
    /// select the minimum under the total order.
    fn finish(
        &self,
        survivors: Vec<SpaceDistribution>,
        vg_missing: DiskSize,
    ) -> Result<SpaceDistribution, Infeasible> {
        let finalists: Vec<SpaceDistribution> = if vg_missing.is_zero() {
            survivors
        } else {
            let vg = self.planned_vg.unwrap();
            survivors
                .iter()
                .flat_map(|base| self.augmented(base, vg, vg_missing))
                .collect()
        };
        finalists
            .into_iter()
            .min_by(|a, b| a.better_than(b))
            .ok_or(Infeasible::NoSpace)
    }

    /// All ways of giving the pending VG its missing space by adding one
    /// synthetic PV partition to each space of a chosen subset.
    fn augmented(
        &self,
        base: &SpaceDistribution,
        vg: &PlannedVg,
        missing: DiskSize,
    ) -> Vec<SpaceDistribution> {
        // Only spaces that can hold at least a minimal PV take part in the
        // enumeration; the largest ones win when there are too many to
        // enumerate exhaustively.
        let min_pv = vg.single_pv_overhead() + vg.extent_size;
        let mut eligible: Vec<usize> = base
            .spaces
            .iter()
            .enumerate()
            .filter(|(_, s)| s.space.size() >= min_pv)
            .map(|(i, _)| i)
            .collect();
        if eligible.len() > 16 {
            eligible.sort_by_key(|&i| std::cmp::Reverse(base.spaces[i].space.size()));
            eligible.truncate(16);
            eligible.sort_unstable();
        }
        let n = eligible.len();
        if n == 0 {
            return Vec::new();
        }
        let mut out = Vec::new();
        for mask in 1u32..(1 << n) {
            let chosen: Vec<usize> = (0..n)
                .filter(|b| mask & (1 << b) != 0)
                .map(|b| eligible[b])
                .collect();
            let k = chosen.len() as u64;
            let per_pv_payload =
                DiskSize::b(missing.bytes().div_ceil(k)).ceil(vg.extent_size);
            let min_size = per_pv_payload + vg.single_pv_overhead();
            let max_size = vg.pv_ceiling();

            let mut dist = base.clone();
            for &i in &chosen {
                let weight = dist.spaces[i].total_weight();
                let mut pv = PlannedPartition::new(min_size, max_size, weight);
                pv.component_of = Some(ComponentRole::LvmPv(vg.name.clone()));
                pv.disk = Some(dist.spaces[i].space.disk.clone());
                dist.spaces[i].partitions.push(pv);
            }
            dist.num_synthetic_pvs = chosen.len();
            if let Legality::Valid = Self::validate(&mut dist) {
                out.push(dist);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planned::PlannedLv;

    fn space_at(disk: &str, start_mib: u64, length_mib: u64) -> FreeDiskSpace {
        FreeDiskSpace {
            disk: disk.into(),
            region: crate::model::Region::new(
                DiskSize::mib(start_mib).bytes(),
                DiskSize::mib(length_mib).bytes(),
            ),
            grain: DiskSize::mib(1),
            growing: false,
            in_extended: false,
            disk_has_extended: false,
            ptable: Some(PtableKind::Gpt),
            primary_free: 120,
        }
    }

    fn part(min_gib: u64, max: DiskSize, weight: f64) -> PlannedPartition {
        PlannedPartition::new(DiskSize::gib(min_gib), max, weight)
    }

    #[test]
    fn both_partitions_land_in_the_single_space() {
        // Scenario: one disk, 100 GiB free, two growable partitions.
        let spaces = vec![space_at("/dev/sda", 1, 100 * 1024)];
        let partitions = vec![
            part(10, DiskSize::gib(20), 1.0),
            part(5, DiskSize::unlimited(), 3.0),
        ];
        let calc = SpaceDistributionCalculator::new();
        let dist = calc.best_distribution(&partitions, &spaces).unwrap();
        assert_eq!(dist.used_regions(), 1);
        assert_eq!(dist.used_spaces().next().unwrap().partitions.len(), 2);
    }

    #[test]
    fn infeasible_when_minimums_exceed_free_space() {
        let spaces = vec![space_at("/dev/sda", 1, 10 * 1024)];
        let partitions = vec![part(20, DiskSize::unlimited(), 1.0)];
        let calc = SpaceDistributionCalculator::new();
        assert_eq!(
            calc.best_distribution(&partitions, &spaces),
            Err(Infeasible::NoSpace)
        );
    }

    #[test]
    fn disk_constraint_narrows_candidates() {
        let spaces = vec![
            space_at("/dev/sda", 1, 50 * 1024),
            space_at("/dev/sdb", 1, 50 * 1024),
        ];
        let mut pinned = part(10, DiskSize::gib(10), 1.0);
        pinned.disk = Some("/dev/sdb".into());
        let calc = SpaceDistributionCalculator::new();
        let dist = calc.best_distribution(&[pinned], &spaces).unwrap();
        let used: Vec<_> = dist.used_spaces().collect();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].space.disk, "/dev/sdb");
    }

    #[test]
    fn max_start_offset_excludes_late_spaces() {
        let spaces = vec![
            space_at("/dev/sda", 90 * 1024, 8 * 1024),
            space_at("/dev/sda", 1, 1024),
        ];
        let mut boot = part(1, DiskSize::gib(1), 0.0);
        boot.max_start_offset = Some(DiskSize::gib(2).bytes());
        let calc = SpaceDistributionCalculator::new();
        let dist = calc.best_distribution(&[boot], &spaces).unwrap();
        let used: Vec<_> = dist.used_spaces().collect();
        assert_eq!(used[0].space.region.start, DiskSize::mib(1).bytes());
    }

    #[test]
    fn msdos_without_slots_synthesizes_an_extended_partition() {
        // Scenario: MS-DOS table, one primary slot left, two new partitions
        // requested in the same space.
        let mut space = space_at("/dev/sda", 1, 50 * 1024);
        space.ptable = Some(PtableKind::Msdos);
        space.primary_free = 1;
        let partitions = vec![
            part(10, DiskSize::gib(10), 1.0),
            part(10, DiskSize::gib(10), 1.0),
        ];
        let calc = SpaceDistributionCalculator::new();
        let dist = calc.best_distribution(&partitions, &[space]).unwrap();
        let used: Vec<_> = dist.used_spaces().collect();
        assert_eq!(used[0].partition_type, Some(PartitionType::Extended));
        assert_eq!(used[0].num_logical(), 2);
    }

    #[test]
    fn msdos_with_zero_slots_reports_slot_exhaustion() {
        let mut space = space_at("/dev/sda", 1, 50 * 1024);
        space.ptable = Some(PtableKind::Msdos);
        space.primary_free = 0;
        let partitions = vec![part(10, DiskSize::gib(10), 1.0)];
        let calc = SpaceDistributionCalculator::new();
        assert!(matches!(
            calc.best_distribution(&partitions, &[space]),
            Err(Infeasible::PrimarySlots { .. })
        ));
    }

    #[test]
    fn pending_vg_gets_a_synthetic_pv() {
        let mut vg = PlannedVg::new("system");
        vg.lvs.push(PlannedLv::new(
            "root",
            DiskSize::gib(10),
            DiskSize::gib(20),
            1.0,
        ));
        let spaces = vec![space_at("/dev/sda", 1, 100 * 1024)];
        let partitions = vec![part(5, DiskSize::gib(5), 1.0)];
        let calc = SpaceDistributionCalculator::with_vg(&vg);
        let dist = calc.best_distribution(&partitions, &spaces).unwrap();
        assert_eq!(dist.num_synthetic_pvs, 1);
        let used: Vec<_> = dist.used_spaces().collect();
        let pv = used[0]
            .partitions
            .iter()
            .find(|p| p.lvm_volume_group() == Some("system"))
            .expect("synthetic PV present");
        assert!(pv.common.min_size >= DiskSize::gib(10));
    }

    #[test]
    fn fragmented_disks_still_get_synthetic_pvs() {
        // Scenario: many slivers of free space plus one region big enough
        // for a physical volume.
        let mut vg = PlannedVg::new("system");
        vg.lvs.push(PlannedLv::new(
            "root",
            DiskSize::gib(10),
            DiskSize::gib(20),
            1.0,
        ));
        let mut spaces: Vec<FreeDiskSpace> = (0..19)
            .map(|i| space_at("/dev/sda", 100 + i * 10, 4))
            .collect();
        spaces.push(space_at("/dev/sda", 1024, 50 * 1024));

        let calc = SpaceDistributionCalculator::with_vg(&vg);
        let dist = calc.best_distribution(&[], &spaces).unwrap();
        assert_eq!(dist.num_synthetic_pvs, 1);
        let used: Vec<_> = dist.used_spaces().collect();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].space.size(), DiskSize::gib(50));
    }

    #[test]
    fn tagged_pvs_reduce_the_missing_vg_space() {
        let mut vg = PlannedVg::new("system");
        vg.lvs.push(PlannedLv::new(
            "root",
            DiskSize::gib(10),
            DiskSize::gib(10),
            1.0,
        ));
        let mut pv = part(11, DiskSize::gib(11), 1.0);
        pv.component_of = Some(ComponentRole::LvmPv("system".into()));
        let spaces = vec![space_at("/dev/sda", 1, 20 * 1024)];
        let calc = SpaceDistributionCalculator::with_vg(&vg);
        let dist = calc.best_distribution(&[pv], &spaces).unwrap();
        // The explicit PV already covers the VG; nothing synthesized.
        assert_eq!(dist.num_synthetic_pvs, 0);
    }
}
