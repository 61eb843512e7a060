//! Scenario configuration: TOML in, device graph and planned devices out

pub mod scenario;

pub use scenario::Scenario;
