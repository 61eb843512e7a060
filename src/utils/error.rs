//! Error types for diskplan

use crate::utils::units::DiskSize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiskplanError {
    /// The planned devices cannot fit, even after the flexible retry.
    #[error("Not enough free space: {needed} needed but only {available} available")]
    NoSpace {
        needed: DiskSize,
        available: DiskSize,
    },

    #[error("Partition table on {disk} has no free primary slots")]
    PrimarySlotsExhausted { disk: String },

    #[error("No candidate space can host planned device '{0}'")]
    NoCandidateSpace(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device is not a {expected}: {name}")]
    WrongDeviceKind { name: String, expected: String },

    #[error("Volume group policy violation: {0}")]
    VgPolicy(String),

    #[error("Invalid size expression: {0}")]
    InvalidSize(String),

    #[error("Invalid scenario: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, DiskplanError>;
