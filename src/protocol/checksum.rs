//! Packet checksums
//!
//! Both ends of a link must be configured with the same kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Checksum algorithm applied to the bytes preceding the checksum slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumKind {
    /// 8-bit wrapping sum
    #[default]
    Sum8,
    /// 8-bit XOR
    Xor8,
}

impl ChecksumKind {
    pub fn compute(self, bytes: &[u8]) -> u8 {
        match self {
            ChecksumKind::Sum8 => bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)),
            ChecksumKind::Xor8 => bytes.iter().fold(0u8, |acc, b| acc ^ b),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChecksumKind::Sum8 => "sum8",
            ChecksumKind::Xor8 => "xor8",
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum8" => Ok(ChecksumKind::Sum8),
            "xor8" => Ok(ChecksumKind::Xor8),
            other => Err(format!("unknown checksum kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum8_wraps() {
        assert_eq!(ChecksumKind::Sum8.compute(&[]), 0);
        assert_eq!(ChecksumKind::Sum8.compute(&[0xFF, 0x02]), 0x01);
    }

    #[test]
    fn test_xor8() {
        assert_eq!(ChecksumKind::Xor8.compute(&[0xF0, 0x0F, 0xFF]), 0x00);
        assert_eq!(ChecksumKind::Xor8.compute(&[0x12]), 0x12);
    }

    #[test]
    fn test_parse() {
        assert_eq!("SUM8".parse::<ChecksumKind>(), Ok(ChecksumKind::Sum8));
        assert_eq!("xor8".parse::<ChecksumKind>(), Ok(ChecksumKind::Xor8));
        assert!("crc16".parse::<ChecksumKind>().is_err());
        assert_eq!(ChecksumKind::default(), ChecksumKind::Sum8);
    }
}
