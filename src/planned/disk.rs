//! Planned whole-disk, stray block, NFS and tmpfs devices
//!
//! These kinds skip space distribution entirely: a whole disk or stray block
//! device is formatted (or reused) in place, and NFS/tmpfs entries carry
//! mount intent only.

use crate::planned::PlannedCommon;

/// An entire disk consumed without a partition table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlannedDisk {
    pub common: PlannedCommon,
}

/// A whole block device that cannot hold a partition table (e.g. a Xen
/// virtual partition).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlannedStrayBlock {
    pub common: PlannedCommon,
}

/// A network filesystem mount. Occupies no local space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlannedNfs {
    pub common: PlannedCommon,
    pub server: String,
    pub path: String,
}

/// A tmpfs mount. Occupies no local space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlannedTmpfs {
    pub common: PlannedCommon,
}
