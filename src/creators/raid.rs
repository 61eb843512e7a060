//! MD array assembly

use crate::creators::{CreatorResult, PartitionCreator};
use crate::model::{DeviceGraph, DeviceKind, Filesystem};
use crate::planned::{PlannedDevice, PlannedMd};
use crate::utils::error::{DiskplanError, Result};

/// Turns planned MD arrays into graph nodes, partitioned or formatted.
pub struct MdCreator;

impl MdCreator {
    /// Assemble an array from its named members plus the partitions tagged
    /// for it by earlier stages. Member signatures are wiped before use.
    pub fn create_array(
        graph: &DeviceGraph,
        planned: &PlannedMd,
        tagged_members: &[String],
    ) -> Result<CreatorResult> {
        let mut members = planned.members.clone();
        members.extend(tagged_members.iter().cloned());
        if members.is_empty() {
            return Err(DiskplanError::ConfigError(format!(
                "RAID {} has no member devices",
                planned.name
            )));
        }
        let mut result = CreatorResult::new(graph.duplicate());
        for member in &members {
            result.graph.remove_descendants(member)?;
        }
        result
            .graph
            .create_md(&planned.name, planned.level, planned.chunk_size, members)?;
        result.register(&planned.name, PlannedDevice::RaidArray(planned.clone()));
        Self::fill_array(result, planned)
    }

    /// Adopt an existing array, repartitioning or reformatting it according
    /// to the plan.
    pub fn reuse_array(graph: &DeviceGraph, planned: &PlannedMd) -> Result<CreatorResult> {
        let name = planned.common.reuse_name.as_deref().ok_or_else(|| {
            DiskplanError::ConfigError(format!("RAID {} is not marked for reuse", planned.name))
        })?;
        let node = graph.get(name)?;
        if !matches!(node.kind, DeviceKind::Md { .. }) {
            return Err(DiskplanError::WrongDeviceKind {
                name: name.to_string(),
                expected: "MD array".to_string(),
            });
        }
        let mut result = CreatorResult::new(graph.duplicate());
        result.register(name, PlannedDevice::RaidArray(planned.clone()));
        Self::fill_array(result, planned)
    }

    fn fill_array(mut result: CreatorResult, planned: &PlannedMd) -> Result<CreatorResult> {
        let name = planned
            .common
            .reuse_name
            .clone()
            .unwrap_or_else(|| planned.name.clone());
        if !planned.partitions.is_empty() {
            let parted = PartitionCreator::partition_device(
                &result.graph,
                &name,
                &planned.partitions,
                planned.ptable,
            )?;
            return Ok(result.merge(parted));
        }
        if let Some(kind) = planned.common.filesystem {
            let mut fs = Filesystem::new(kind, planned.common.mount_point.clone());
            fs.label = planned.common.label.clone();
            fs.encrypted = planned.common.encryption_password.is_some();
            result.graph.format(&name, fs)?;
        }
        Ok(result)
    }
}
