//! Byte sizes written as `1024`, `"512b"`, `"100kb"` or `"10mb"`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::ConfigError;

const KILOBYTE: u64 = 1024;
const MEGABYTE: u64 = 1024 * KILOBYTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DataSize(u64);

impl DataSize {
    pub const fn bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn kilobytes(kb: u64) -> Self {
        Self(kb * KILOBYTE)
    }

    pub const fn megabytes(mb: u64) -> Self {
        Self(mb * MEGABYTE)
    }

    pub fn as_bytes(&self) -> u64 {
        self.0
    }

    /// Size as `usize`, saturating on 32-bit targets.
    pub fn as_usize(&self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl FromStr for DataSize {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidDataSize(raw.to_owned());
        let trimmed = raw.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);
        if digits.is_empty() {
            return Err(invalid());
        }

        let value: u64 = digits.parse().map_err(|_| invalid())?;
        let multiplier = match unit.to_ascii_lowercase().as_str() {
            "" | "b" => 1,
            "kb" => KILOBYTE,
            "mb" => MEGABYTE,
            _ => return Err(invalid()),
        };
        value.checked_mul(multiplier).map(Self).ok_or_else(invalid)
    }
}

impl fmt::Display for DataSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "0b"),
            n if n % MEGABYTE == 0 => write!(f, "{}mb", n / MEGABYTE),
            n if n % KILOBYTE == 0 => write!(f, "{}kb", n / KILOBYTE),
            n => write!(f, "{n}b"),
        }
    }
}

impl Serialize for DataSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DataSizeVisitor;

        impl Visitor<'_> for DataSizeVisitor {
            type Value = DataSize;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a byte count or a size such as \"10mb\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<DataSize, E> {
                Ok(DataSize(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<DataSize, E> {
                u64::try_from(value)
                    .map(DataSize)
                    .map_err(|_| E::custom(format!("data size must not be negative: {value}")))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<DataSize, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DataSizeVisitor)
    }
}
