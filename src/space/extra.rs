//! Weighted distribution of space beyond the planned minimums
//!
//! Once a set of devices is bound to a concrete amount of space, each device
//! grows from its minimum toward its maximum. Growth is proportional to the
//! device weights, rounded down to the allocation grain, iterating as
//! devices saturate at their maximum.

use crate::planned::WithCommon;
use crate::utils::units::DiskSize;
use tracing::trace;

/// Grow `devices` to consume `available`, writing each device's final
/// `size`. Returns the undistributed remainder (zero when `available` was
/// reachable, sub-grain or weight-starved otherwise).
///
/// `enforced_last` names a device allowed to keep a non-grain-aligned size
/// so the set can fill a space whose end is not grain-aligned.
pub fn distribute_extra_space<D: WithCommon>(
    devices: &mut [D],
    available: DiskSize,
    grain: DiskSize,
    enforced_last: Option<usize>,
) -> DiskSize {
    if devices.is_empty() {
        return available;
    }

    // Start every device at its grain-rounded minimum.
    for device in devices.iter_mut() {
        let common = device.common_mut();
        common.size = common.min_size.ceil(grain);
    }
    let mut total: DiskSize = devices.iter().map(|d| d.common().size).sum();

    // The enforced-last device absorbs rounding slack: it may shrink below
    // its rounded size (never below its minimum) to end flush against the
    // end of the space.
    if total > available {
        if let Some(idx) = enforced_last {
            let deficit = total - available;
            let common = devices[idx].common_mut();
            if deficit < grain && common.size.saturating_sub(deficit) >= common.min_size {
                common.size -= deficit;
                total -= deficit;
            }
        }
    }

    let mut leftover = available.saturating_sub(total);
    while leftover >= grain {
        let candidates: Vec<usize> = devices
            .iter()
            .enumerate()
            .filter(|(_, d)| d.common().size < d.common().max_size)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            break;
        }
        let total_weight: f64 = candidates.iter().map(|&i| devices[i].common().weight).sum();
        if total_weight <= 0.0 {
            break;
        }

        let mut distributed = DiskSize::zero();
        for &i in &candidates {
            let common = devices[i].common_mut();
            let share = DiskSize::b(
                (leftover.bytes() as f64 * common.weight / total_weight) as u64,
            )
            .floor(grain);
            let headroom = common.max_size.saturating_sub(common.size);
            let add = share.min(headroom).floor(grain);
            common.size += add;
            distributed += add;
        }

        if distributed.is_zero() {
            // Every proportional share rounded below one grain. Hand one
            // grain to the heaviest candidate so the loop always advances.
            let heaviest = candidates
                .iter()
                .copied()
                .max_by(|&a, &b| {
                    devices[a]
                        .common()
                        .weight
                        .partial_cmp(&devices[b].common().weight)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap();
            let common = devices[heaviest].common_mut();
            let add = grain.min(common.max_size.saturating_sub(common.size));
            if add.is_zero() {
                break;
            }
            common.size += add;
            distributed = add;
        }
        leftover -= distributed;
    }

    // A final sub-grain remainder goes to the last device when it fits.
    if !leftover.is_zero() && leftover < grain {
        let last = devices.last_mut().unwrap().common_mut();
        if last.size + leftover <= last.max_size {
            last.size += leftover;
            leftover = DiskSize::zero();
        }
    }

    trace!(
        "distributed {} across {} devices, {} left",
        available,
        devices.len(),
        leftover
    );
    leftover
}
