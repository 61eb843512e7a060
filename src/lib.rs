//! diskplan library - storage layout planning and materialization

pub mod config;
pub mod creators;
pub mod model;
pub mod orchestrator;
pub mod planned;
pub mod space;
pub mod utils;

pub use config::Scenario;
pub use orchestrator::{plan_and_materialize, PlanResult};
pub use utils::error::{DiskplanError, Result};
pub use utils::units::DiskSize;
