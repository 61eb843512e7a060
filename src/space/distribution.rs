//! Full candidate solutions and their total order

use crate::space::assigned::AssignedSpace;
use crate::utils::units::DiskSize;
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

/// A full candidate solution: every free space (used or not) bound to the
/// planned partitions that will live in it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceDistribution {
    pub spaces: Vec<AssignedSpace>,
    /// Physical volumes synthesized by the LVM augmentation pass.
    pub num_synthetic_pvs: usize,
}

impl SpaceDistribution {
    pub fn new(spaces: Vec<AssignedSpace>) -> Self {
        SpaceDistribution {
            spaces,
            num_synthetic_pvs: 0,
        }
    }

    pub fn used_spaces(&self) -> impl Iterator<Item = &AssignedSpace> {
        self.spaces.iter().filter(|s| s.is_used())
    }

    /// Bytes sitting in regions no planned partition will use.
    pub fn wasted_bytes(&self) -> DiskSize {
        self.spaces
            .iter()
            .filter(|s| !s.is_used())
            .map(|s| s.space.size())
            .sum()
    }

    pub fn wasted_regions(&self) -> usize {
        self.spaces.iter().filter(|s| !s.is_used()).count()
    }

    pub fn used_regions(&self) -> usize {
        self.spaces.iter().filter(|s| s.is_used()).count()
    }

    /// Combined minimum size of everything placed by this distribution.
    pub fn total_provisioned(&self) -> DiskSize {
        self.used_spaces().map(|s| s.total_min()).sum()
    }

    /// Used spaces that only exist once a neighboring device is shrunk.
    pub fn growing_regions(&self) -> usize {
        self.used_spaces().filter(|s| s.space.growing).count()
    }

    /// Deterministic description used as the final comparison criterion, so
    /// equally-good candidates always resolve the same way.
    pub fn tiebreak_string(&self) -> String {
        let mut parts: Vec<String> = self
            .used_spaces()
            .map(|s| {
                let mounts: Vec<&str> = s
                    .partitions
                    .iter()
                    .map(|p| p.common.mount_point.as_deref().unwrap_or("-"))
                    .collect();
                format!("{}[{}]", s.space.id(), mounts.join(","))
            })
            .collect();
        parts.sort();
        parts.join(";")
    }

    fn sort_key(&self) -> (u64, usize, usize, usize, Reverse<u64>, usize, String) {
        (
            self.wasted_bytes().bytes(),
            self.wasted_regions(),
            self.num_synthetic_pvs,
            self.used_regions(),
            Reverse(self.total_provisioned().bytes()),
            self.growing_regions(),
            self.tiebreak_string(),
        )
    }

    /// Total order over candidates: less is better. Fewer wasted bytes win,
    /// then fewer wasted regions, then fewer synthetic PVs, then fewer used
    /// regions, then the larger provisioned total, then fewer growing
    /// regions, then the tiebreak string.
    pub fn better_than(&self, other: &SpaceDistribution) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }

    /// Used spaces grouped by the disk they belong to.
    pub fn spaces_by_disk(&self) -> BTreeMap<String, Vec<&AssignedSpace>> {
        let mut map: BTreeMap<String, Vec<&AssignedSpace>> = BTreeMap::new();
        for space in self.used_spaces() {
            map.entry(space.space.disk.clone()).or_default().push(space);
        }
        map
    }
}
