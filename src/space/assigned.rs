//! Free spaces bound to the planned partitions that will live in them

use crate::model::{FreeDiskSpace, PartitionType};
use crate::planned::PlannedPartition;
use crate::utils::units::DiskSize;

/// A [`FreeDiskSpace`] together with the ordered planned partitions assigned
/// to it and the partition type they will get.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedSpace {
    pub space: FreeDiskSpace,
    pub partitions: Vec<PlannedPartition>,
    /// `None` when the disk imposes no type constraints (GPT with room).
    pub partition_type: Option<PartitionType>,
    /// Index of the partition that must be created last, flush against the
    /// end of the space, to absorb rounding slack. See [`Self::fits`].
    pub enforced_last: Option<usize>,
}

impl AssignedSpace {
    pub fn new(space: FreeDiskSpace, partitions: Vec<PlannedPartition>) -> Self {
        let partition_type = if space.in_extended {
            Some(PartitionType::Logical)
        } else {
            None
        };
        AssignedSpace {
            space,
            partitions,
            partition_type,
            enforced_last: None,
        }
    }

    pub fn is_used(&self) -> bool {
        !self.partitions.is_empty()
    }

    /// Number of child partitions that will be logical.
    pub fn num_logical(&self) -> usize {
        match self.partition_type {
            Some(PartitionType::Logical) | Some(PartitionType::Extended) => self.partitions.len(),
            _ => 0,
        }
    }

    /// Bookkeeping bytes lost to logical partitions: one grain (the EBR) per
    /// logical, except that the first logical of a future extended partition
    /// reuses the slot at the start of the space.
    pub fn overhead(&self) -> DiskSize {
        let n = self.num_logical();
        let billed = if self.space.in_extended {
            n
        } else {
            n.saturating_sub(1)
        };
        DiskSize::b(self.space.grain.bytes() * billed as u64)
    }

    /// Bytes actually available to the assigned partitions.
    pub fn usable_size(&self) -> DiskSize {
        self.space.size() - self.overhead()
    }

    /// Combined minimum of the assigned partitions, grain-rounded.
    pub fn total_min(&self) -> DiskSize {
        let grain = self.space.grain;
        self.partitions
            .iter()
            .map(|p| p.common.min_size.ceil(grain))
            .sum()
    }

    /// Whether the assigned partitions fit, allowing exactly one partition
    /// to be pushed flush against the end of the space to absorb rounding
    /// slack smaller than one grain. Sets `enforced_last` when that
    /// tie-break is needed.
    pub fn fits(&mut self) -> bool {
        let usable = self.usable_size();
        let total = self.total_min();
        if total <= usable {
            self.enforced_last = None;
            return true;
        }
        let missing = total - usable;
        if missing >= self.space.grain {
            return false;
        }
        let grain = self.space.grain;
        let absorber = self.partitions.iter().position(|p| {
            p.common.min_size.ceil(grain).saturating_sub(missing) >= p.common.min_size
        });
        match absorber {
            Some(idx) => {
                self.enforced_last = Some(idx);
                true
            }
            None => false,
        }
    }

    /// Partitions in creation order: the enforced-last one moved to the end.
    pub fn partitions_in_creation_order(&self) -> Vec<&PlannedPartition> {
        let mut order: Vec<&PlannedPartition> = Vec::with_capacity(self.partitions.len());
        let last = self.enforced_last;
        for (i, p) in self.partitions.iter().enumerate() {
            if Some(i) != last {
                order.push(p);
            }
        }
        if let Some(i) = last {
            order.push(&self.partitions[i]);
        }
        order
    }

    /// Sum of weights of the assigned partitions (used to weight synthetic
    /// physical volumes injected into this space).
    pub fn total_weight(&self) -> f64 {
        self.partitions.iter().map(|p| p.common.weight).sum()
    }
}
