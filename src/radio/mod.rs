//! Radio module - Moves packets between an Interface and a Robot
//!
//! Provides:
//! - `PipeAddress`, the 5-byte address the transceiver filters on
//! - The `Radio` trait implemented by every link
//! - A UDP radio emulating the transceiver over a network
//! - An in-memory loopback pair for tests and demos

mod loopback;
mod udp;

pub use loopback::*;
pub use udp::*;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::protocol::{Direction, PIPE_ADDRESS_LEN};

/// Largest payload the transceiver carries in one packet
pub const MAX_PAYLOAD_LEN: usize = 32;

/// Radio errors
#[derive(Error, Debug)]
pub enum RadioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload too large: {0} bytes (max: {1})")]
    PayloadTooLarge(usize, usize),

    #[error("Radio link closed")]
    Closed,
}

pub type RadioResult<T> = Result<T, RadioError>;

/// Invalid pipe address text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid pipe address {0:?}: expected 5 hex bytes")]
pub struct PipeAddressError(pub String);

/// Transceiver-level address of one unidirectional pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipeAddress(pub [u8; PIPE_ADDRESS_LEN]);

impl PipeAddress {
    pub fn as_bytes(&self) -> &[u8; PIPE_ADDRESS_LEN] {
        &self.0
    }

    /// Default pipe for a direction
    pub fn for_direction(direction: Direction) -> Self {
        Self(direction.pipe())
    }
}

impl From<[u8; PIPE_ADDRESS_LEN]> for PipeAddress {
    fn from(bytes: [u8; PIPE_ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for PipeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for PipeAddress {
    type Err = PipeAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | ' ' | ','))
            .collect();
        let mut bytes = [0u8; PIPE_ADDRESS_LEN];
        hex::decode_to_slice(&cleaned, &mut bytes).map_err(|_| PipeAddressError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for PipeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PipeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Pipe assignment of one radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    /// Pipe this radio transmits on
    pub writing_pipe: PipeAddress,
    /// Pipe this radio listens on; anything else is filtered out
    pub reading_pipe: PipeAddress,
}

impl RadioConfig {
    /// Interface writes commands and listens for acks
    pub fn interface() -> Self {
        Self {
            writing_pipe: PipeAddress::for_direction(Direction::InterfaceToCubetto),
            reading_pipe: PipeAddress::for_direction(Direction::CubettoToInterface),
        }
    }

    /// Robot listens for commands and writes acks
    pub fn robot() -> Self {
        Self {
            writing_pipe: PipeAddress::for_direction(Direction::CubettoToInterface),
            reading_pipe: PipeAddress::for_direction(Direction::InterfaceToCubetto),
        }
    }

    pub fn with_pipes(mut self, writing_pipe: PipeAddress, reading_pipe: PipeAddress) -> Self {
        self.writing_pipe = writing_pipe;
        self.reading_pipe = reading_pipe;
        self
    }
}

/// A half-duplex packet radio with one writing and one reading pipe
#[async_trait]
pub trait Radio: Send {
    /// Pipe assignment in use
    fn config(&self) -> &RadioConfig;

    /// Transmit one payload on the writing pipe
    async fn send(&mut self, payload: &[u8]) -> RadioResult<()>;

    /// Wait for the next payload addressed to the reading pipe
    async fn recv(&mut self) -> RadioResult<Bytes>;
}

pub(crate) fn check_payload(payload: &[u8]) -> RadioResult<()> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(RadioError::PayloadTooLarge(payload.len(), MAX_PAYLOAD_LEN));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_address_text() {
        let addr: PipeAddress = "E8E8F0F0E1".parse().unwrap();
        assert_eq!(addr, PipeAddress::for_direction(Direction::InterfaceToCubetto));
        assert_eq!(addr.to_string(), "E8E8F0F0E1");

        let spaced: PipeAddress = "e8:e8:f0:f0:e2".parse().unwrap();
        assert_eq!(spaced, PipeAddress::for_direction(Direction::CubettoToInterface));

        assert!("E8E8F0F0".parse::<PipeAddress>().is_err());
        assert!("not-hex!!!".parse::<PipeAddress>().is_err());
    }

    #[test]
    fn test_radio_configs_mirror() {
        let interface = RadioConfig::interface();
        let robot = RadioConfig::robot();
        assert_eq!(interface.writing_pipe, robot.reading_pipe);
        assert_eq!(interface.reading_pipe, robot.writing_pipe);
        assert_ne!(interface.writing_pipe, interface.reading_pipe);
    }

    #[test]
    fn test_payload_limit() {
        assert!(check_payload(&[0u8; 32]).is_ok());
        assert!(matches!(
            check_payload(&[0u8; 33]),
            Err(RadioError::PayloadTooLarge(33, 32))
        ));
    }
}
