//! Partition table kinds and structural limits

use serde::{Deserialize, Serialize};

/// Supported partition table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PtableKind {
    #[default]
    Gpt,
    Msdos,
}

impl PtableKind {
    /// How many primary slots the table offers. The extended partition
    /// occupies one of them on msdos.
    pub fn max_primary(&self) -> usize {
        match self {
            PtableKind::Gpt => 128,
            PtableKind::Msdos => 4,
        }
    }

    pub fn supports_extended(&self) -> bool {
        matches!(self, PtableKind::Msdos)
    }
}

impl std::fmt::Display for PtableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PtableKind::Gpt => write!(f, "gpt"),
            PtableKind::Msdos => write!(f, "msdos"),
        }
    }
}

/// Role of a partition within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PartitionType {
    #[default]
    Primary,
    Extended,
    Logical,
}

impl std::fmt::Display for PartitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionType::Primary => write!(f, "primary"),
            PartitionType::Extended => write!(f, "extended"),
            PartitionType::Logical => write!(f, "logical"),
        }
    }
}
