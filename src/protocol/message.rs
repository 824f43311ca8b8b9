//! Protocol message definitions
//!
//! Defines the two packets exchanged between an Interface and a Cubetto Robot.

use serde::{Deserialize, Serialize};

use super::{
    Command, Direction, FunctionInstructions, MainInstructions, CUBETTO_ROBOT_ID, INTERFACE_ID,
};

/// Program sent from the Interface to the Robot
///
/// The checksum is not stored; it is computed when encoding and verified when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandsMessage {
    /// Always `INTERFACE_ID` for a valid packet
    pub sender_id: u32,
    /// Session the program belongs to
    pub session_id: u32,
    /// Main sequence, executed in order
    pub main_instructions: MainInstructions,
    /// Subroutine invoked by `Command::Function`
    pub function_instructions: FunctionInstructions,
}

impl CommandsMessage {
    pub fn new(
        session_id: u32,
        main_instructions: MainInstructions,
        function_instructions: FunctionInstructions,
    ) -> Self {
        Self {
            sender_id: INTERFACE_ID,
            session_id,
            main_instructions,
            function_instructions,
        }
    }

    /// Whether the main sequence calls the function subroutine
    pub fn calls_function(&self) -> bool {
        self.main_instructions.iter().any(|c| c == Command::Function)
    }

    /// Total number of instructions carried
    pub fn instruction_count(&self) -> usize {
        self.main_instructions.len() + self.function_instructions.len()
    }
}

/// Acknowledgment sent from the Robot to the Interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AckMessage {
    /// Always `CUBETTO_ROBOT_ID` for a valid packet
    pub sender_id: u32,
    /// Echo of the acknowledged session
    pub session_id: u32,
    /// Increases by one with every ack the robot sends
    pub message_counter: u32,
}

impl AckMessage {
    pub fn new(session_id: u32, message_counter: u32) -> Self {
        Self {
            sender_id: CUBETTO_ROBOT_ID,
            session_id,
            message_counter,
        }
    }
}

/// Any packet travelling over the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    Commands(CommandsMessage),
    Ack(AckMessage),
}

impl Packet {
    pub fn sender_id(&self) -> u32 {
        match self {
            Packet::Commands(msg) => msg.sender_id,
            Packet::Ack(msg) => msg.sender_id,
        }
    }

    pub fn session_id(&self) -> u32 {
        match self {
            Packet::Commands(msg) => msg.session_id,
            Packet::Ack(msg) => msg.session_id,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Packet::Commands(_) => Direction::InterfaceToCubetto,
            Packet::Ack(_) => Direction::CubettoToInterface,
        }
    }
}

impl From<CommandsMessage> for Packet {
    fn from(msg: CommandsMessage) -> Self {
        Packet::Commands(msg)
    }
}

impl From<AckMessage> for Packet {
    fn from(msg: AckMessage) -> Self {
        Packet::Ack(msg)
    }
}
