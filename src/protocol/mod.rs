//! Protocol module - Defines the radio protocol shared by the Interface and the Cubetto Robot
//!
//! Two fixed-size packet layouts travel over the radio, all integers little-endian:
//! - CommandsMessage (Interface -> Robot): sender(4) + session(4) + main(12) + function(4) + checksum(1)
//! - AckMessage (Robot -> Interface): sender(4) + session(4) + counter(4)
//!
//! The sender identifier at the start of every packet tells which direction it travels.

mod checksum;
mod codec;
mod command;
mod instructions;
mod message;

pub use checksum::*;
pub use codec::*;
pub use command::*;
pub use instructions::*;
pub use message::*;

/// Playset protocol version
pub const PLAYSET_VERSION: &str = "1.0";

/// Identifier inserted into every packet sent by ANY Interface.
/// Robots drop packets that do not carry it.
pub const INTERFACE_ID: u32 = 0xDE1D_8758;

/// Identifier inserted into every packet sent by ANY Cubetto Robot.
/// Interfaces drop packets that do not carry it.
pub const CUBETTO_ROBOT_ID: u32 = 0xDE1D_8759;

/// Maximum number of instructions in the main sequence
pub const MAX_MAIN_INSTRUCTIONS: usize = 12;

/// Maximum number of instructions in the function subroutine
pub const MAX_FUNCTION_INSTRUCTIONS: usize = 4;

/// Length of a radio pipe address in bytes
pub const PIPE_ADDRESS_LEN: usize = 5;

/// Pipe the Interface writes commands to
pub const INTERFACE_TO_CUBETTO_PIPE: [u8; PIPE_ADDRESS_LEN] = [0xE8, 0xE8, 0xF0, 0xF0, 0xE1];

/// Pipe the Robot writes acknowledgments to
pub const CUBETTO_TO_INTERFACE_PIPE: [u8; PIPE_ADDRESS_LEN] = [0xE8, 0xE8, 0xF0, 0xF0, 0xE2];

const _: () = {
    assert!(INTERFACE_ID != CUBETTO_ROBOT_ID);
    assert!(INTERFACE_TO_CUBETTO_PIPE[PIPE_ADDRESS_LEN - 1] != CUBETTO_TO_INTERFACE_PIPE[PIPE_ADDRESS_LEN - 1]);
};

/// Which way a packet travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Interface -> Robot (commands)
    InterfaceToCubetto,
    /// Robot -> Interface (acknowledgments)
    CubettoToInterface,
}

impl Direction {
    /// Identifier a sender travelling in this direction must carry
    pub fn sender_id(self) -> u32 {
        match self {
            Direction::InterfaceToCubetto => INTERFACE_ID,
            Direction::CubettoToInterface => CUBETTO_ROBOT_ID,
        }
    }

    /// Resolve a sender identifier to its direction
    pub fn from_sender_id(id: u32) -> Option<Self> {
        match id {
            INTERFACE_ID => Some(Direction::InterfaceToCubetto),
            CUBETTO_ROBOT_ID => Some(Direction::CubettoToInterface),
            _ => None,
        }
    }

    /// Default pipe address for this direction
    pub fn pipe(self) -> [u8; PIPE_ADDRESS_LEN] {
        match self {
            Direction::InterfaceToCubetto => INTERFACE_TO_CUBETTO_PIPE,
            Direction::CubettoToInterface => CUBETTO_TO_INTERFACE_PIPE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_distinct_and_nonzero() {
        assert_ne!(INTERFACE_ID, CUBETTO_ROBOT_ID);
        assert_ne!(INTERFACE_ID, 0);
        assert_ne!(CUBETTO_ROBOT_ID, 0);
    }

    #[test]
    fn test_pipe_addresses() {
        assert_eq!(INTERFACE_TO_CUBETTO_PIPE.len(), 5);
        assert_eq!(CUBETTO_TO_INTERFACE_PIPE.len(), 5);
        assert_ne!(INTERFACE_TO_CUBETTO_PIPE, CUBETTO_TO_INTERFACE_PIPE);
    }

    #[test]
    fn test_direction_sender_ids() {
        for dir in [Direction::InterfaceToCubetto, Direction::CubettoToInterface] {
            assert_eq!(Direction::from_sender_id(dir.sender_id()), Some(dir));
        }
        assert_eq!(Direction::from_sender_id(0), None);
        assert_eq!(PLAYSET_VERSION, "1.0");
    }
}
