//! Space planning: assignment of planned partitions to free regions and
//! weighted growth within the chosen regions

pub mod assigned;
pub mod calculator;
pub mod distribution;
pub mod extra;

pub use assigned::AssignedSpace;
pub use calculator::{Infeasible, SpaceDistributionCalculator};
pub use distribution::SpaceDistribution;
pub use extra::distribute_extra_space;
