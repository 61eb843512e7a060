//! Bcache assembly

use crate::creators::{CreatorResult, PartitionCreator};
use crate::model::{DeviceGraph, Filesystem};
use crate::planned::{PlannedBcache, PlannedDevice};
use crate::utils::error::{DiskplanError, Result};

/// Turns planned bcache devices into graph nodes.
pub struct BcacheCreator;

impl BcacheCreator {
    /// Build a bcache over its backing device and optional caching set,
    /// resolved from tagged partitions or named existing devices. A tagged
    /// partition wins over a configured name.
    pub fn create_bcache(
        graph: &DeviceGraph,
        planned: &PlannedBcache,
        tagged_backing: Option<&str>,
        tagged_caching: Option<&str>,
    ) -> Result<CreatorResult> {
        let backing = tagged_backing
            .map(str::to_string)
            .or_else(|| planned.backing_device.clone())
            .ok_or_else(|| {
                DiskplanError::ConfigError(format!(
                    "bcache {} has no backing device",
                    planned.name
                ))
            })?;
        let caching = tagged_caching
            .map(str::to_string)
            .or_else(|| planned.caching_device.clone());

        let mut result = CreatorResult::new(graph.duplicate());
        result.graph.remove_descendants(&backing)?;
        if let Some(cset) = &caching {
            result.graph.remove_descendants(cset)?;
        }
        result.graph.create_bcache(
            &planned.name,
            &backing,
            caching.as_deref(),
            planned.cache_mode,
        )?;
        result.register(&planned.name, PlannedDevice::Bcache(planned.clone()));

        if !planned.partitions.is_empty() {
            let parted = PartitionCreator::partition_device(
                &result.graph,
                &planned.name,
                &planned.partitions,
                planned.ptable,
            )?;
            return Ok(result.merge(parted));
        }
        if let Some(kind) = planned.common.filesystem {
            let mut fs = Filesystem::new(kind, planned.common.mount_point.clone());
            fs.label = planned.common.label.clone();
            fs.encrypted = planned.common.encryption_password.is_some();
            result.graph.format(&planned.name, fs)?;
        }
        Ok(result)
    }
}
