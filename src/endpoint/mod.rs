//! Endpoint module - Both ends of a playset radio link
//!
//! Provides:
//! - `Interface`, which sends a program and waits for the robot's ack,
//!   retransmitting when none arrives
//! - `Robot`, which validates incoming programs and acknowledges them

mod interface;
mod robot;

pub use interface::*;
pub use robot::*;

use std::time::Duration;
use thiserror::Error;

use crate::radio::RadioError;

/// Endpoint errors
#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("Radio error: {0}")]
    Radio(#[from] RadioError),

    #[error("No acknowledgment after {attempts} attempts")]
    NoAck { attempts: u32 },
}

pub type EndpointResult<T> = Result<T, EndpointError>;

/// Timing of the ack exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// How long to wait for an ack after each transmission
    pub ack_timeout: Duration,
    /// Retransmissions after the first attempt
    pub max_retries: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_millis(200),
            max_retries: 5,
        }
    }
}

impl LinkConfig {
    pub fn new(ack_timeout: Duration, max_retries: u32) -> Self {
        Self {
            ack_timeout,
            max_retries,
        }
    }

    /// Total transmissions allowed per program
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Packet counters kept by an endpoint
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EndpointStats {
    /// Packets transmitted, retransmissions included
    pub packets_sent: u64,
    /// Valid packets received
    pub packets_received: u64,
    /// Payloads dropped by validation
    pub packets_rejected: u64,
    /// Transmissions beyond the first for a program
    pub retransmissions: u64,
}
