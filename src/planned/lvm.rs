//! Planned LVM volume groups and logical volumes

use crate::model::graph::PV_METADATA_OVERHEAD;
use crate::planned::PlannedCommon;
use crate::utils::units::DiskSize;
use serde::{Deserialize, Serialize};

/// What to do with pre-existing logical volumes when reusing a volume group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MakeSpacePolicy {
    /// Preserve every existing LV; planned LVs only use free extents.
    #[default]
    Keep,
    /// Purge all existing LVs before planning.
    Remove,
    /// Evict existing LVs smallest-first, just enough to fit the plan.
    Needed,
}

/// An intended logical volume inside a planned volume group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlannedLv {
    pub common: PlannedCommon,
    pub name: String,
}

impl PlannedLv {
    pub fn new(name: &str, min_size: DiskSize, max_size: DiskSize, weight: f64) -> Self {
        PlannedLv {
            common: PlannedCommon {
                min_size,
                max_size,
                weight,
                ..Default::default()
            },
            name: name.to_string(),
        }
    }
}

/// An intended volume group, fed by tagged physical volumes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedVg {
    pub common: PlannedCommon,
    /// Base name; the device node is `/dev/<name>`.
    pub name: String,
    pub extent_size: DiskSize,
    pub lvs: Vec<PlannedLv>,
    pub make_space_policy: MakeSpacePolicy,
}

impl PlannedVg {
    pub fn new(name: &str) -> Self {
        PlannedVg {
            common: PlannedCommon::default(),
            name: name.to_string(),
            extent_size: DiskSize::mib(4),
            lvs: Vec::new(),
            make_space_policy: MakeSpacePolicy::default(),
        }
    }

    pub fn device_name(&self) -> String {
        format!("/dev/{}", self.name)
    }

    /// Extents required to host every LV at its minimum size.
    pub fn target_size(&self) -> DiskSize {
        self.lvs
            .iter()
            .map(|lv| lv.common.min_size.ceil(self.extent_size))
            .sum()
    }

    /// VG space still missing once `available` has been secured from
    /// already-planned physical volumes.
    pub fn missing_space(&self, available: DiskSize) -> DiskSize {
        self.target_size().saturating_sub(available)
    }

    /// Overhead of contributing one more physical volume: its metadata area
    /// plus worst-case extent rounding loss.
    pub fn single_pv_overhead(&self) -> DiskSize {
        PV_METADATA_OVERHEAD + self.extent_size
    }

    /// Upper bound worth giving to a synthetic PV: everything the LVs could
    /// ever use, plus per-PV overhead. Unlimited when any LV is unbounded.
    pub fn pv_ceiling(&self) -> DiskSize {
        let max_total: DiskSize = self
            .lvs
            .iter()
            .map(|lv| lv.common.max_size.ceil(self.extent_size))
            .sum();
        if max_total.is_unlimited() {
            DiskSize::unlimited()
        } else {
            max_total + self.single_pv_overhead()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_size_rounds_lvs_to_extents() {
        let mut vg = PlannedVg::new("system");
        vg.lvs.push(PlannedLv::new(
            "root",
            DiskSize::mib(4097),
            DiskSize::unlimited(),
            1.0,
        ));
        vg.lvs
            .push(PlannedLv::new("swap", DiskSize::gib(2), DiskSize::gib(2), 0.0));
        // 4097 MiB rounds up to 4100 MiB with 4 MiB extents
        assert_eq!(vg.target_size(), DiskSize::mib(4100) + DiskSize::gib(2));
    }

    #[test]
    fn missing_space_accounts_for_secured_pvs() {
        let mut vg = PlannedVg::new("system");
        vg.lvs
            .push(PlannedLv::new("root", DiskSize::gib(10), DiskSize::gib(20), 1.0));
        assert_eq!(vg.missing_space(DiskSize::gib(4)), DiskSize::gib(6));
        assert_eq!(vg.missing_space(DiskSize::gib(20)), DiskSize::zero());
    }

    #[test]
    fn pv_ceiling_is_unlimited_with_unbounded_lvs() {
        let mut vg = PlannedVg::new("system");
        vg.lvs.push(PlannedLv::new(
            "home",
            DiskSize::gib(1),
            DiskSize::unlimited(),
            1.0,
        ));
        assert!(vg.pv_ceiling().is_unlimited());
    }
}
