//! Free-region scanning on disk-like devices

use crate::model::device::DeviceNode;
use crate::model::graph::DeviceGraph;
use crate::model::ptable::{PartitionType, PtableKind};
use crate::model::region::Region;
use crate::utils::error::{DiskplanError, Result};
use crate::utils::units::DiskSize;

/// A candidate region for new partitions.
///
/// Carries enough context about its owning disk (table kind, remaining
/// primary slots, whether it sits inside an extended partition) for the
/// space-distribution calculator to reason about partition-type legality
/// without holding a reference to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeDiskSpace {
    pub disk: String,
    pub region: Region,
    pub grain: DiskSize,
    /// Space that only materializes once a neighboring device is shrunk.
    pub growing: bool,
    /// Inside a pre-existing extended partition; new partitions are logical.
    pub in_extended: bool,
    /// The owning disk already has an extended partition somewhere.
    pub disk_has_extended: bool,
    /// Table kind of the owning disk, if one is already installed.
    pub ptable: Option<PtableKind>,
    /// Primary slots still unused on the owning disk.
    pub primary_free: usize,
}

impl FreeDiskSpace {
    pub fn size(&self) -> DiskSize {
        DiskSize::b(self.region.length)
    }

    pub fn start(&self) -> u64 {
        self.region.start
    }

    /// Stable identifier used for deterministic tie-breaking.
    pub fn id(&self) -> String {
        format!("{}@{}", self.disk, self.region.start)
    }
}

/// Aligned sub-gaps of `bounds` not covered by any region in `used`.
fn gaps(bounds: Region, used: &[Region], grain: u64) -> Vec<Region> {
    let mut sorted = used.to_vec();
    sorted.sort();
    let mut out = Vec::new();
    let mut cursor = bounds.start;
    for r in sorted {
        if r.start > cursor {
            push_gap(&mut out, cursor, r.start.min(bounds.end()), grain);
        }
        cursor = cursor.max(r.end());
    }
    if cursor < bounds.end() {
        push_gap(&mut out, cursor, bounds.end(), grain);
    }
    out
}

// Starts are aligned up to the grain; ends stay where the neighbor begins,
// so the tail of a gap may be a fraction of a grain (the enforced-last
// placement in the calculator can still use it).
fn push_gap(out: &mut Vec<Region>, start: u64, end: u64, grain: u64) {
    let astart = start.div_ceil(grain) * grain;
    if end > astart && end - astart >= grain {
        out.push(Region::new(astart, end - astart));
    }
}

impl DeviceGraph {
    /// Free regions on a disk-like device, outside and inside any extended
    /// partition. Regions smaller than one grain are dropped.
    pub fn free_spaces(&self, name: &str) -> Result<Vec<FreeDiskSpace>> {
        let node = self.get(name)?;
        if !node.is_disk_like() {
            return Err(DiskplanError::WrongDeviceKind {
                name: name.to_string(),
                expected: "disk-like device".to_string(),
            });
        }
        let grain = node.grain;
        let g = grain.bytes();
        let ptable = node.ptable;
        let primary_free = match ptable {
            Some(kind) => kind.max_primary().saturating_sub(self.primary_count(name)),
            // Table yet to be created; GPT is the default and effectively
            // unconstrained at planning scale.
            None => PtableKind::Gpt.max_primary(),
        };

        let disk_has_extended = self.extended_partition(name).is_some();
        let bounds = if ptable.is_some() {
            self.usable_region(name)?
        } else {
            // No table yet: reserve one grain at each end, covering both
            // table kinds that may be installed later.
            Region::new(g, node.size.bytes().saturating_sub(2 * g))
        };

        let parts = self.partitions_of(name);
        let outer: Vec<Region> = parts
            .iter()
            .filter(|p| p.partition_type() != Some(PartitionType::Logical))
            .filter_map(|p| p.partition_region())
            .collect();

        let mut spaces: Vec<FreeDiskSpace> = gaps(bounds, &outer, g)
            .into_iter()
            .map(|region| FreeDiskSpace {
                disk: name.to_string(),
                region,
                grain,
                growing: false,
                in_extended: false,
                disk_has_extended,
                ptable,
                primary_free,
            })
            .collect();

        if let Some(ext) = self.extended_partition(name) {
            let ext_region = ext.partition_region().unwrap();
            let inner: Vec<Region> = parts
                .iter()
                .filter(|p| p.partition_type() == Some(PartitionType::Logical))
                .filter_map(|p| p.partition_region())
                .collect();
            spaces.extend(gaps(ext_region, &inner, g).into_iter().map(|region| {
                FreeDiskSpace {
                    disk: name.to_string(),
                    region,
                    grain,
                    growing: false,
                    in_extended: true,
                    disk_has_extended,
                    ptable,
                    primary_free,
                }
            }));
        }

        spaces.sort_by_key(|s| s.region.start);
        Ok(spaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::PartitionId;

    fn mib(n: u64) -> u64 {
        DiskSize::mib(n).bytes()
    }

    #[test]
    fn bare_disk_yields_single_space() {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sda", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sda", PtableKind::Gpt)
            .unwrap();
        let spaces = graph.free_spaces("/dev/sda").unwrap();
        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].region.start, mib(1));
        assert_eq!(spaces[0].size(), DiskSize::gib(100) - DiskSize::mib(2));
        assert!(!spaces[0].in_extended);
    }

    #[test]
    fn partitions_split_free_space_into_gaps() {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sda", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sda", PtableKind::Gpt)
            .unwrap();
        graph
            .create_partition(
                "/dev/sda",
                Region::new(mib(10240), mib(10240)),
                PartitionType::Primary,
                PartitionId::Linux,
            )
            .unwrap();
        let spaces = graph.free_spaces("/dev/sda").unwrap();
        assert_eq!(spaces.len(), 2);
        assert_eq!(spaces[0].region.start, mib(1));
        assert_eq!(spaces[0].region.end(), mib(10240));
        assert_eq!(spaces[1].region.start, mib(20480));
    }

    #[test]
    fn extended_partition_exposes_inner_gaps() {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sdb", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sdb", PtableKind::Msdos)
            .unwrap();
        graph
            .create_partition(
                "/dev/sdb",
                Region::new(mib(1), mib(51200)),
                PartitionType::Extended,
                PartitionId::Extended,
            )
            .unwrap();
        graph
            .create_partition(
                "/dev/sdb",
                Region::new(mib(1), mib(10240)),
                PartitionType::Logical,
                PartitionId::Linux,
            )
            .unwrap();
        let spaces = graph.free_spaces("/dev/sdb").unwrap();
        let inner: Vec<_> = spaces.iter().filter(|s| s.in_extended).collect();
        let outer: Vec<_> = spaces.iter().filter(|s| !s.in_extended).collect();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].region.start, mib(10241));
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].region.start, mib(51201));
    }

    #[test]
    fn primary_slot_count_reflects_existing_partitions() {
        let mut graph = DeviceGraph::new();
        graph
            .add_disk("/dev/sdb", DiskSize::gib(100), DiskSize::mib(1))
            .unwrap();
        graph
            .create_partition_table("/dev/sdb", PtableKind::Msdos)
            .unwrap();
        for i in 0..3u64 {
            graph
                .create_partition(
                    "/dev/sdb",
                    Region::new(mib(1 + i * 1024), mib(1024)),
                    PartitionType::Primary,
                    PartitionId::Linux,
                )
                .unwrap();
        }
        let spaces = graph.free_spaces("/dev/sdb").unwrap();
        assert!(spaces.iter().all(|s| s.primary_free == 1));
    }
}
