//! In-memory device-graph model
//!
//! A [`DeviceGraph`] is a value-type snapshot of the storage topology: disks,
//! partitions, MD arrays, bcache devices, LVM volume groups and logical
//! volumes. Every mutating planning step works on its own duplicate of the
//! snapshot and only the final result is handed back, so a failed attempt
//! never leaves the caller with a half-mutated topology.

pub mod device;
pub mod freespace;
pub mod graph;
pub mod ptable;
pub mod region;

pub use device::{CacheMode, DeviceKind, DeviceNode, Filesystem, FsKind, MdLevel, PartitionId};
pub use freespace::FreeDiskSpace;
pub use graph::{partition_path, DeviceGraph};
pub use ptable::{PartitionType, PtableKind};
pub use region::Region;
