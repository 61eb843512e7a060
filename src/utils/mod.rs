//! Shared utilities: error types and size arithmetic

pub mod error;
pub mod units;
