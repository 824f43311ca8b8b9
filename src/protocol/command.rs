//! Command codes executed by the robot

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while building or reading instruction lists
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid command code: {0}")]
    InvalidCommand(u8),

    #[error("Instruction list is full (capacity: {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("NONE terminates an instruction list and cannot be pushed")]
    TerminatorPushed,

    #[error("Instruction after terminator at slot {index}")]
    MisplacedTerminator { index: usize },

    #[error("Invalid program character: {0:?}")]
    InvalidProgramChar(char),
}

/// A single instruction byte
///
/// Code 3 is reserved and never produced by a conforming sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Command {
    None = 0,
    Right = 1,
    Left = 2,
    Forward = 4,
    Function = 5,
}

impl Command {
    /// All defined commands, in code order
    pub const ALL: [Command; 5] = [
        Command::None,
        Command::Right,
        Command::Left,
        Command::Forward,
        Command::Function,
    ];

    /// Wire code for this command
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a byte falls on the reserved code
    pub fn is_reserved_code(code: u8) -> bool {
        code == 3
    }

    /// Program letter used by the CLI (`F`, `L`, `R`, `X`); `None` has none
    pub fn letter(self) -> Option<char> {
        match self {
            Command::None => None,
            Command::Right => Some('R'),
            Command::Left => Some('L'),
            Command::Forward => Some('F'),
            Command::Function => Some('X'),
        }
    }

    /// Parse a program letter, case-insensitive
    pub fn from_letter(c: char) -> Result<Self, ProtocolError> {
        match c.to_ascii_uppercase() {
            'R' => Ok(Command::Right),
            'L' => Ok(Command::Left),
            'F' => Ok(Command::Forward),
            'X' => Ok(Command::Function),
            _ => Err(ProtocolError::InvalidProgramChar(c)),
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Command::None),
            1 => Ok(Command::Right),
            2 => Ok(Command::Left),
            4 => Ok(Command::Forward),
            5 => Ok(Command::Function),
            other => Err(ProtocolError::InvalidCommand(other)),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> u8 {
        command.code()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::None => "NONE",
            Command::Right => "RIGHT",
            Command::Left => "LEFT",
            Command::Forward => "FORWARD",
            Command::Function => "FUNCTION",
        };
        f.write_str(name)
    }
}
