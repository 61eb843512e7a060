//! Device creators: from validated plans to device-graph mutations
//!
//! Each creator duplicates the incoming snapshot, applies its mutations and
//! returns a [`CreatorResult`]. A failed creator propagates an error and the
//! duplicated snapshot is dropped, so callers never observe partial
//! mutations.

pub mod bcache;
pub mod btrfs;
pub mod lvm;
pub mod partition;
pub mod raid;

pub use bcache::BcacheCreator;
pub use btrfs::BtrfsCreator;
pub use lvm::LvmCreator;
pub use partition::PartitionCreator;
pub use raid::MdCreator;

use crate::model::DeviceGraph;
use crate::planned::PlannedDevice;
use std::collections::BTreeMap;

/// Output of a materialization step: the mutated snapshot plus the mapping
/// from real device names to the planned devices they satisfy.
#[derive(Debug, Clone)]
pub struct CreatorResult {
    pub graph: DeviceGraph,
    pub devices: BTreeMap<String, PlannedDevice>,
}

impl CreatorResult {
    pub fn new(graph: DeviceGraph) -> Self {
        CreatorResult {
            graph,
            devices: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, planned: PlannedDevice) {
        self.devices.insert(name.to_string(), planned);
    }

    /// Compose two results: the newer snapshot wins, the device maps union.
    pub fn merge(mut self, newer: CreatorResult) -> CreatorResult {
        self.graph = newer.graph;
        self.devices.extend(newer.devices);
        self
    }

    /// Names of created devices whose plan satisfies `predicate`.
    pub fn names_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&PlannedDevice) -> bool,
    {
        self.devices
            .iter()
            .filter(|(_, planned)| predicate(planned))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planned::{PlannedPartition, PlannedTmpfs};
    use crate::utils::units::DiskSize;

    #[test]
    fn merge_keeps_newest_graph_and_unions_maps() {
        let mut old_graph = DeviceGraph::new();
        old_graph
            .add_disk("/dev/sda", DiskSize::gib(10), DiskSize::mib(1))
            .unwrap();
        let mut new_graph = old_graph.duplicate();
        new_graph
            .add_disk("/dev/sdb", DiskSize::gib(10), DiskSize::mib(1))
            .unwrap();

        let mut a = CreatorResult::new(old_graph);
        a.register(
            "/dev/sda1",
            PlannedDevice::Partition(PlannedPartition::new(
                DiskSize::gib(1),
                DiskSize::gib(1),
                0.0,
            )),
        );
        let mut b = CreatorResult::new(new_graph);
        b.register("tmpfs:/tmp", PlannedDevice::Tmpfs(PlannedTmpfs::default()));

        let merged = a.merge(b);
        assert!(merged.graph.find_by_name("/dev/sdb").is_some());
        assert_eq!(merged.devices.len(), 2);
        assert!(merged.devices.contains_key("/dev/sda1"));
    }
}
