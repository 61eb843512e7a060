//! Byte-exact disk sizes with an "unlimited" upper bound
//!
//! All planning arithmetic is integer bytes. `DiskSize` is a thin newtype
//! over `u64` where `u64::MAX` stands for "unlimited" (a planned device with
//! no upper size bound). Arithmetic saturates at unlimited instead of
//! wrapping.

use crate::utils::error::{DiskplanError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*(B|KiB|MiB|GiB|TiB)?$").unwrap());

/// A size in bytes; `u64::MAX` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DiskSize(u64);

impl DiskSize {
    pub const fn zero() -> Self {
        DiskSize(0)
    }

    pub const fn unlimited() -> Self {
        DiskSize(u64::MAX)
    }

    pub const fn b(bytes: u64) -> Self {
        DiskSize(bytes)
    }

    pub const fn kib(n: u64) -> Self {
        DiskSize(n * KIB)
    }

    pub const fn mib(n: u64) -> Self {
        DiskSize(n * MIB)
    }

    pub const fn gib(n: u64) -> Self {
        DiskSize(n * GIB)
    }

    pub const fn tib(n: u64) -> Self {
        DiskSize(n * TIB)
    }

    pub const fn is_unlimited(&self) -> bool {
        self.0 == u64::MAX
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Raw byte count. Unlimited maps to `u64::MAX`.
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// Round up to the next multiple of `grain`. Unlimited stays unlimited.
    pub fn ceil(&self, grain: DiskSize) -> DiskSize {
        if self.is_unlimited() || grain.0 <= 1 {
            return *self;
        }
        let rem = self.0 % grain.0;
        if rem == 0 {
            *self
        } else {
            DiskSize(self.0 + (grain.0 - rem))
        }
    }

    /// Round down to the previous multiple of `grain`.
    pub fn floor(&self, grain: DiskSize) -> DiskSize {
        if self.is_unlimited() || grain.0 <= 1 {
            return *self;
        }
        DiskSize(self.0 - self.0 % grain.0)
    }

    pub fn saturating_sub(&self, other: DiskSize) -> DiskSize {
        if self.is_unlimited() {
            return *self;
        }
        DiskSize(self.0.saturating_sub(other.0))
    }

    pub fn min(self, other: DiskSize) -> DiskSize {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: DiskSize) -> DiskSize {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    /// Percentage of a concrete size, floored to whole bytes.
    pub fn percent_of(percent: f64, total: DiskSize) -> DiskSize {
        DiskSize((total.0 as f64 * percent / 100.0) as u64)
    }

    /// Parse "512 MiB", "1.5 GiB", "4096", "unlimited".
    pub fn parse(input: &str) -> Result<DiskSize> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("unlimited") || trimmed.eq_ignore_ascii_case("max") {
            return Ok(DiskSize::unlimited());
        }
        let caps = SIZE_RE
            .captures(trimmed)
            .ok_or_else(|| DiskplanError::InvalidSize(input.to_string()))?;
        let number: f64 = caps[1]
            .parse()
            .map_err(|_| DiskplanError::InvalidSize(input.to_string()))?;
        let unit = match caps.get(2).map(|m| m.as_str()) {
            None | Some("B") => 1,
            Some("KiB") => KIB,
            Some("MiB") => MIB,
            Some("GiB") => GIB,
            Some("TiB") => TIB,
            Some(_) => unreachable!(),
        };
        Ok(DiskSize((number * unit as f64) as u64))
    }
}

impl Add for DiskSize {
    type Output = DiskSize;

    fn add(self, other: DiskSize) -> DiskSize {
        if self.is_unlimited() || other.is_unlimited() {
            DiskSize::unlimited()
        } else {
            DiskSize(self.0.saturating_add(other.0))
        }
    }
}

impl AddAssign for DiskSize {
    fn add_assign(&mut self, other: DiskSize) {
        *self = *self + other;
    }
}

impl Sub for DiskSize {
    type Output = DiskSize;

    fn sub(self, other: DiskSize) -> DiskSize {
        self.saturating_sub(other)
    }
}

impl SubAssign for DiskSize {
    fn sub_assign(&mut self, other: DiskSize) {
        *self = *self - other;
    }
}

impl std::iter::Sum for DiskSize {
    fn sum<I: Iterator<Item = DiskSize>>(iter: I) -> DiskSize {
        iter.fold(DiskSize::zero(), |acc, s| acc + s)
    }
}

impl fmt::Display for DiskSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            return write!(f, "unlimited");
        }
        let (value, unit) = if self.0 >= TIB && self.0 % GIB == 0 {
            (self.0 as f64 / TIB as f64, "TiB")
        } else if self.0 >= GIB {
            (self.0 as f64 / GIB as f64, "GiB")
        } else if self.0 >= MIB {
            (self.0 as f64 / MIB as f64, "MiB")
        } else if self.0 >= KIB {
            (self.0 as f64 / KIB as f64, "KiB")
        } else {
            return write!(f, "{} B", self.0);
        };
        if (value - value.round()).abs() < 1e-9 {
            write!(f, "{} {}", value.round() as u64, unit)
        } else {
            write!(f, "{:.2} {}", value, unit)
        }
    }
}

impl Serialize for DiskSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DiskSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DiskSize::parse(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_bytes_and_units() {
        assert_eq!(DiskSize::parse("4096").unwrap(), DiskSize::b(4096));
        assert_eq!(DiskSize::parse("512 MiB").unwrap(), DiskSize::mib(512));
        assert_eq!(DiskSize::parse("10GiB").unwrap(), DiskSize::gib(10));
        assert_eq!(DiskSize::parse("1.5 GiB").unwrap(), DiskSize::mib(1536));
        assert_eq!(DiskSize::parse("unlimited").unwrap(), DiskSize::unlimited());
        assert!(DiskSize::parse("ten gigs").is_err());
    }

    #[test]
    fn rounding_to_grain() {
        let grain = DiskSize::mib(1);
        assert_eq!(DiskSize::b(1).ceil(grain), DiskSize::mib(1));
        assert_eq!(DiskSize::mib(5).ceil(grain), DiskSize::mib(5));
        assert_eq!(DiskSize::b(MIB + 1).ceil(grain), DiskSize::mib(2));
        assert_eq!(DiskSize::b(MIB + 1).floor(grain), DiskSize::mib(1));
        assert!(DiskSize::unlimited().ceil(grain).is_unlimited());
    }

    #[test]
    fn unlimited_saturates() {
        let u = DiskSize::unlimited();
        assert!((u + DiskSize::gib(1)).is_unlimited());
        assert!((u - DiskSize::gib(1)).is_unlimited());
        assert_eq!(DiskSize::gib(1) - DiskSize::gib(2), DiskSize::zero());
    }

    #[test]
    fn display_picks_sensible_unit() {
        assert_eq!(DiskSize::mib(512).to_string(), "512 MiB");
        assert_eq!(DiskSize::gib(10).to_string(), "10 GiB");
        assert_eq!(DiskSize::b(100).to_string(), "100 B");
        assert_eq!(DiskSize::unlimited().to_string(), "unlimited");
        assert_eq!(DiskSize::mib(1536).to_string(), "1.50 GiB");
    }

    #[test]
    fn percent_of_concrete_size() {
        assert_eq!(
            DiskSize::percent_of(50.0, DiskSize::gib(10)),
            DiskSize::gib(5)
        );
        assert_eq!(
            DiskSize::percent_of(25.0, DiskSize::mib(100)),
            DiskSize::mib(25)
        );
    }
}
