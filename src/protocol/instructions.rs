//! Bounded instruction lists
//!
//! The wire format carries fixed-size instruction arrays with no count field.
//! A list ends at its first `NONE` slot and every slot after it must also be `NONE`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::{Command, ProtocolError, MAX_FUNCTION_INSTRUCTIONS, MAX_MAIN_INSTRUCTIONS};

/// Main sequence of a program
pub type MainInstructions = Instructions<MAX_MAIN_INSTRUCTIONS>;

/// Function subroutine of a program
pub type FunctionInstructions = Instructions<MAX_FUNCTION_INSTRUCTIONS>;

/// Ordered list of at most `N` non-`NONE` commands
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instructions<const N: usize> {
    slots: [Command; N],
    len: usize,
}

impl<const N: usize> Instructions<N> {
    pub fn new() -> Self {
        Self {
            slots: [Command::None; N],
            len: 0,
        }
    }

    /// Append a command, failing once the list is full
    pub fn push(&mut self, command: Command) -> Result<(), ProtocolError> {
        if command == Command::None {
            return Err(ProtocolError::TerminatorPushed);
        }
        if self.len == N {
            return Err(ProtocolError::CapacityExceeded { capacity: N });
        }
        self.slots[self.len] = command;
        self.len += 1;
        Ok(())
    }

    /// Build from a slice, failing if it holds more than `N` commands
    pub fn try_from_slice(commands: &[Command]) -> Result<Self, ProtocolError> {
        let mut list = Self::new();
        for &command in commands {
            list.push(command)?;
        }
        Ok(list)
    }

    /// Build from a slice keeping only the first `N` commands; `NONE` entries are skipped
    pub fn from_slice_truncated(commands: &[Command]) -> Self {
        let mut list = Self::new();
        for &command in commands
            .iter()
            .filter(|c| **c != Command::None)
            .take(N)
        {
            list.slots[list.len] = command;
            list.len += 1;
        }
        list
    }

    /// Parse a program string such as `"FFLRX"`
    pub fn parse_program(program: &str) -> Result<Self, ProtocolError> {
        let mut list = Self::new();
        for c in program.chars().filter(|c| !c.is_whitespace()) {
            list.push(Command::from_letter(c)?)?;
        }
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn as_slice(&self) -> &[Command] {
        &self.slots[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = Command> + '_ {
        self.as_slice().iter().copied()
    }

    /// Fixed-size wire form, padded with `NONE`
    pub fn to_wire(&self) -> [u8; N] {
        let mut out = [Command::None.code(); N];
        for (slot, command) in out.iter_mut().zip(self.as_slice()) {
            *slot = command.code();
        }
        out
    }

    /// Read the wire form; the list ends at the first `NONE` slot
    pub fn from_wire(bytes: &[u8; N]) -> Result<Self, ProtocolError> {
        let mut list = Self::new();
        let mut terminated = false;

        for (index, &byte) in bytes.iter().enumerate() {
            let command = Command::try_from(byte)?;
            match (terminated, command) {
                (_, Command::None) => terminated = true,
                (true, _) => return Err(ProtocolError::MisplacedTerminator { index }),
                (false, command) => {
                    list.slots[list.len] = command;
                    list.len += 1;
                }
            }
        }

        Ok(list)
    }
}

impl<const N: usize> Default for Instructions<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for Instructions<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<const N: usize> fmt::Display for Instructions<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for command in self.iter() {
            if let Some(letter) = command.letter() {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

impl<const N: usize> TryFrom<&[Command]> for Instructions<N> {
    type Error = ProtocolError;

    fn try_from(commands: &[Command]) -> Result<Self, Self::Error> {
        Self::try_from_slice(commands)
    }
}

impl<const N: usize> Serialize for Instructions<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

impl<'de, const N: usize> Deserialize<'de> for Instructions<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let commands = Vec::<Command>::deserialize(deserializer)?;
        Self::try_from_slice(&commands).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut main = MainInstructions::new();
        for _ in 0..MAX_MAIN_INSTRUCTIONS {
            main.push(Command::Forward).unwrap();
        }
        assert!(main.is_full());
        assert_eq!(
            main.push(Command::Left),
            Err(ProtocolError::CapacityExceeded { capacity: 12 })
        );
        assert_eq!(main.len(), 12);

        let mut function = FunctionInstructions::new();
        for _ in 0..MAX_FUNCTION_INSTRUCTIONS {
            function.push(Command::Right).unwrap();
        }
        assert_eq!(
            function.push(Command::Right),
            Err(ProtocolError::CapacityExceeded { capacity: 4 })
        );
    }

    #[test]
    fn test_none_cannot_be_pushed() {
        let mut list = FunctionInstructions::new();
        assert_eq!(list.push(Command::None), Err(ProtocolError::TerminatorPushed));
        assert!(list.is_empty());
    }

    #[test]
    fn test_truncation_is_deterministic() {
        let commands = [
            Command::Forward,
            Command::None,
            Command::Left,
            Command::Right,
            Command::Function,
            Command::Forward,
        ];
        let list = FunctionInstructions::from_slice_truncated(&commands);
        assert_eq!(
            list.as_slice(),
            &[Command::Forward, Command::Left, Command::Right, Command::Function]
        );
        assert!(FunctionInstructions::try_from_slice(&commands).is_err());
    }

    #[test]
    fn test_wire_padding() {
        let list = FunctionInstructions::parse_program("FL").unwrap();
        assert_eq!(list.to_wire(), [4, 2, 0, 0]);
        assert_eq!(FunctionInstructions::from_wire(&[4, 2, 0, 0]).unwrap(), list);
        assert!(FunctionInstructions::from_wire(&[0, 0, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn test_wire_rejects_gaps_and_reserved() {
        assert_eq!(
            FunctionInstructions::from_wire(&[4, 0, 1, 0]),
            Err(ProtocolError::MisplacedTerminator { index: 2 })
        );
        assert_eq!(
            FunctionInstructions::from_wire(&[4, 3, 0, 0]),
            Err(ProtocolError::InvalidCommand(3))
        );
    }

    #[test]
    fn test_program_display() {
        let main = MainInstructions::parse_program("ff lr x").unwrap();
        assert_eq!(main.len(), 5);
        assert_eq!(main.to_string(), "FFLRX");
        assert_eq!(
            MainInstructions::parse_program("FQ"),
            Err(ProtocolError::InvalidProgramChar('Q'))
        );
        assert!(MainInstructions::parse_program("FFFFFFFFFFFFF").is_err());
    }

    #[test]
    fn test_serde_json() {
        let list = FunctionInstructions::parse_program("FX").unwrap();
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"["forward","function"]"#);
        let back: FunctionInstructions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);

        let too_long = r#"["left","left","left","left","left"]"#;
        assert!(serde_json::from_str::<FunctionInstructions>(too_long).is_err());
    }
}
