//! Protocol codec for encoding/decoding packets
//!
//! Packets are fixed-size and carry no length prefix, so the sender identifier
//! in the first four bytes decides which layout follows.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::{
    AckMessage, ChecksumKind, CommandsMessage, Direction, FunctionInstructions, MainInstructions,
    Packet, ProtocolError, CUBETTO_ROBOT_ID, INTERFACE_ID, MAX_FUNCTION_INSTRUCTIONS,
    MAX_MAIN_INSTRUCTIONS,
};

/// sender(4) + session(4) + main(12) + function(4) + checksum(1) = 25 bytes
pub const COMMANDS_MESSAGE_LEN: usize = 8 + MAX_MAIN_INSTRUCTIONS + MAX_FUNCTION_INSTRUCTIONS + 1;

/// sender(4) + session(4) + counter(4) = 12 bytes
pub const ACK_MESSAGE_LEN: usize = 12;

/// Offset of the checksum byte in a CommandsMessage
const CHECKSUM_OFFSET: usize = COMMANDS_MESSAGE_LEN - 1;

/// Bytes needed to identify a packet
const SENDER_ID_LEN: usize = 4;

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unknown sender id: {0:#010x}")]
    UnknownSender(u32),

    #[error("Unexpected sender id: expected {expected:#010x}, got {actual:#010x}")]
    UnexpectedSender { expected: u32, actual: u32 },

    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Wrong packet length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type CodecResult<T> = Result<T, CodecError>;

fn peek_sender_id(bytes: &[u8]) -> Option<u32> {
    let head: [u8; SENDER_ID_LEN] = bytes.get(..SENDER_ID_LEN)?.try_into().ok()?;
    Some(u32::from_le_bytes(head))
}

fn expect_len(bytes: &[u8], expected: usize) -> CodecResult<()> {
    if bytes.len() != expected {
        return Err(CodecError::WrongLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn expect_sender(actual: u32, expected: u32) -> CodecResult<()> {
    if actual != expected {
        return Err(CodecError::UnexpectedSender { expected, actual });
    }
    Ok(())
}

impl CommandsMessage {
    /// Append the 25-byte wire form to `buf`
    pub fn encode(&self, checksum: ChecksumKind, buf: &mut BytesMut) {
        let start = buf.len();
        buf.reserve(COMMANDS_MESSAGE_LEN);
        buf.put_u32_le(self.sender_id);
        buf.put_u32_le(self.session_id);
        buf.put_slice(&self.main_instructions.to_wire());
        buf.put_slice(&self.function_instructions.to_wire());
        let sum = checksum.compute(&buf[start..]);
        buf.put_u8(sum);
    }

    pub fn to_bytes(&self, checksum: ChecksumKind) -> Bytes {
        let mut buf = BytesMut::with_capacity(COMMANDS_MESSAGE_LEN);
        self.encode(checksum, &mut buf);
        buf.freeze()
    }

    /// Checksum this message carries on the wire
    pub fn checksum(&self, checksum: ChecksumKind) -> u8 {
        self.to_bytes(checksum)[CHECKSUM_OFFSET]
    }

    /// Decode and validate exactly one CommandsMessage
    pub fn decode(bytes: &[u8], checksum: ChecksumKind) -> CodecResult<Self> {
        expect_len(bytes, COMMANDS_MESSAGE_LEN)?;

        let expected = checksum.compute(&bytes[..CHECKSUM_OFFSET]);
        let actual = bytes[CHECKSUM_OFFSET];
        if expected != actual {
            return Err(CodecError::ChecksumMismatch { expected, actual });
        }

        let mut buf = bytes;
        let sender_id = buf.get_u32_le();
        expect_sender(sender_id, INTERFACE_ID)?;
        let session_id = buf.get_u32_le();

        let mut main = [0u8; MAX_MAIN_INSTRUCTIONS];
        buf.copy_to_slice(&mut main);
        let mut function = [0u8; MAX_FUNCTION_INSTRUCTIONS];
        buf.copy_to_slice(&mut function);

        Ok(Self {
            sender_id,
            session_id,
            main_instructions: MainInstructions::from_wire(&main)?,
            function_instructions: FunctionInstructions::from_wire(&function)?,
        })
    }
}

impl AckMessage {
    /// Append the 12-byte wire form to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(ACK_MESSAGE_LEN);
        buf.put_u32_le(self.sender_id);
        buf.put_u32_le(self.session_id);
        buf.put_u32_le(self.message_counter);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ACK_MESSAGE_LEN);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode and validate exactly one AckMessage
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        expect_len(bytes, ACK_MESSAGE_LEN)?;

        let mut buf = bytes;
        let sender_id = buf.get_u32_le();
        expect_sender(sender_id, CUBETTO_ROBOT_ID)?;

        Ok(Self {
            sender_id,
            session_id: buf.get_u32_le(),
            message_counter: buf.get_u32_le(),
        })
    }
}

impl Packet {
    /// Wire length of a packet sent by `sender_id`
    pub fn wire_len(sender_id: u32) -> CodecResult<usize> {
        match sender_id {
            INTERFACE_ID => Ok(COMMANDS_MESSAGE_LEN),
            CUBETTO_ROBOT_ID => Ok(ACK_MESSAGE_LEN),
            other => Err(CodecError::UnknownSender(other)),
        }
    }

    pub fn encode(&self, checksum: ChecksumKind, buf: &mut BytesMut) {
        match self {
            Packet::Commands(msg) => msg.encode(checksum, buf),
            Packet::Ack(msg) => msg.encode(buf),
        }
    }

    pub fn to_bytes(&self, checksum: ChecksumKind) -> Bytes {
        match self {
            Packet::Commands(msg) => msg.to_bytes(checksum),
            Packet::Ack(msg) => msg.to_bytes(),
        }
    }

    /// Decode exactly one packet of either kind
    pub fn decode(bytes: &[u8], checksum: ChecksumKind) -> CodecResult<Self> {
        let sender_id = peek_sender_id(bytes).ok_or(CodecError::WrongLength {
            expected: SENDER_ID_LEN,
            actual: bytes.len(),
        })?;

        match Direction::from_sender_id(sender_id) {
            Some(Direction::InterfaceToCubetto) => {
                CommandsMessage::decode(bytes, checksum).map(Packet::Commands)
            }
            Some(Direction::CubettoToInterface) => AckMessage::decode(bytes).map(Packet::Ack),
            None => Err(CodecError::UnknownSender(sender_id)),
        }
    }
}

/// Encodes packets into the wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    checksum: ChecksumKind,
}

impl Encoder {
    pub fn new(checksum: ChecksumKind) -> Self {
        Self { checksum }
    }

    /// Encode a packet into a buffer
    pub fn encode(&self, packet: &Packet, buf: &mut BytesMut) {
        packet.encode(self.checksum, buf);
    }

    pub fn to_bytes(&self, packet: &Packet) -> Bytes {
        packet.to_bytes(self.checksum)
    }
}

/// Decodes packets from the wire format
///
/// Only packets travelling in `accept` are let through, so an Interface never
/// mistakes another Interface's commands for a reply.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    checksum: ChecksumKind,
    accept: Direction,
}

impl Decoder {
    pub fn new(checksum: ChecksumKind, accept: Direction) -> Self {
        Self { checksum, accept }
    }

    pub fn accepts(&self) -> Direction {
        self.accept
    }

    /// Decode one whole radio payload
    pub fn decode_payload(&self, bytes: &[u8]) -> CodecResult<Packet> {
        if let Some(actual) = peek_sender_id(bytes) {
            expect_sender(actual, self.accept.sender_id())?;
        }
        Packet::decode(bytes, self.checksum)
    }

    /// Attempt to decode a packet from a byte stream
    /// Returns Ok(None) if more data is needed.
    ///
    /// On error the offending bytes are consumed so the caller can keep decoding:
    /// a whole packet when its sender is known, a single byte otherwise.
    pub fn decode(&self, buf: &mut BytesMut) -> CodecResult<Option<Packet>> {
        let Some(sender_id) = peek_sender_id(&buf[..]) else {
            return Ok(None);
        };

        let len = match Packet::wire_len(sender_id) {
            Ok(len) => len,
            Err(e) => {
                buf.advance(1);
                return Err(e);
            }
        };

        if buf.len() < len {
            return Ok(None);
        }

        let payload = buf.split_to(len);
        self.decode_payload(&payload).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Command;

    fn sample_commands() -> CommandsMessage {
        CommandsMessage::new(
            0x0102_0304,
            MainInstructions::parse_program("FFXLR").unwrap(),
            FunctionInstructions::parse_program("FR").unwrap(),
        )
    }

    #[test]
    fn test_commands_layout() {
        let bytes = sample_commands().to_bytes(ChecksumKind::Sum8);
        assert_eq!(bytes.len(), 25);
        assert_eq!(&bytes[0..4], &[0x58, 0x87, 0x1D, 0xDE]);
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[8..20], &[4, 4, 5, 2, 1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[20..24], &[4, 1, 0, 0]);
        assert_eq!(bytes[24], ChecksumKind::Sum8.compute(&bytes[..24]));
    }

    #[test]
    fn test_ack_layout() {
        let bytes = AckMessage::new(0xAABB_CCDD, 2).to_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..], &[
            0x59, 0x87, 0x1D, 0xDE, 0xDD, 0xCC, 0xBB, 0xAA, 0x02, 0x00, 0x00, 0x00
        ]);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for kind in [ChecksumKind::Sum8, ChecksumKind::Xor8] {
            let original = sample_commands();
            let decoded = CommandsMessage::decode(&original.to_bytes(kind), kind).unwrap();
            assert_eq!(decoded, original);
        }

        let ack = AckMessage::new(u32::MAX, 41);
        assert_eq!(AckMessage::decode(&ack.to_bytes()).unwrap(), ack);
    }

    #[test]
    fn test_roundtrip_edge_values() {
        let full_main = MainInstructions::parse_program("FLRXFLRXFLRX").unwrap();
        let full_function = FunctionInstructions::parse_program("RRLF").unwrap();
        assert!(full_main.is_full() && full_function.is_full());

        let cases = [
            CommandsMessage::new(0, MainInstructions::new(), FunctionInstructions::new()),
            CommandsMessage::new(u32::MAX, full_main, full_function),
            CommandsMessage::new(0, full_main, FunctionInstructions::new()),
            CommandsMessage::new(u32::MAX, MainInstructions::new(), full_function),
        ];
        for kind in [ChecksumKind::Sum8, ChecksumKind::Xor8] {
            for original in cases {
                let bytes = original.to_bytes(kind);
                assert_eq!(bytes.len(), COMMANDS_MESSAGE_LEN);
                assert_eq!(CommandsMessage::decode(&bytes, kind).unwrap(), original);
            }
        }

        for (session_id, counter) in [(0, 0), (u32::MAX, u32::MAX), (0, u32::MAX)] {
            let ack = AckMessage::new(session_id, counter);
            assert_eq!(AckMessage::decode(&ack.to_bytes()).unwrap(), ack);
        }
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let mut bytes = BytesMut::from(&sample_commands().to_bytes(ChecksumKind::Sum8)[..]);
        bytes[10] = Command::Left.code();
        assert!(matches!(
            CommandsMessage::decode(&bytes, ChecksumKind::Sum8),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_sender() {
        let mut msg = sample_commands();
        msg.sender_id = CUBETTO_ROBOT_ID;
        let bytes = msg.to_bytes(ChecksumKind::Sum8);
        assert_eq!(
            CommandsMessage::decode(&bytes, ChecksumKind::Sum8),
            Err(CodecError::UnexpectedSender {
                expected: INTERFACE_ID,
                actual: CUBETTO_ROBOT_ID
            })
        );

        let mut ack = AckMessage::new(1, 1);
        ack.sender_id = INTERFACE_ID;
        assert!(matches!(
            AckMessage::decode(&ack.to_bytes()),
            Err(CodecError::UnexpectedSender { .. })
        ));
    }

    #[test]
    fn test_rejects_reserved_code() {
        let mut bytes = BytesMut::from(&sample_commands().to_bytes(ChecksumKind::Sum8)[..]);
        bytes[8] = 3;
        bytes[24] = ChecksumKind::Sum8.compute(&bytes[..24]);
        assert_eq!(
            CommandsMessage::decode(&bytes, ChecksumKind::Sum8),
            Err(CodecError::Protocol(ProtocolError::InvalidCommand(3)))
        );
    }

    #[test]
    fn test_rejects_wrong_length() {
        let bytes = sample_commands().to_bytes(ChecksumKind::Sum8);
        assert_eq!(
            CommandsMessage::decode(&bytes[..24], ChecksumKind::Sum8),
            Err(CodecError::WrongLength { expected: 25, actual: 24 })
        );
    }

    #[test]
    fn test_decoder_filters_direction() {
        let robot_side = Decoder::new(ChecksumKind::Sum8, Direction::InterfaceToCubetto);
        let ack = AckMessage::new(1, 1).to_bytes();
        assert!(matches!(
            robot_side.decode_payload(&ack),
            Err(CodecError::UnexpectedSender { .. })
        ));

        let cmds = sample_commands().to_bytes(ChecksumKind::Sum8);
        assert_eq!(
            robot_side.decode_payload(&cmds).unwrap(),
            Packet::Commands(sample_commands())
        );
    }

    #[test]
    fn test_stream_decoding() {
        let encoder = Encoder::new(ChecksumKind::Xor8);
        let decoder = Decoder::new(ChecksumKind::Xor8, Direction::CubettoToInterface);
        let mut buf = BytesMut::new();

        for counter in 0..3 {
            encoder.encode(&AckMessage::new(5, counter).into(), &mut buf);
        }

        let mut partial = buf.split_to(7);
        assert_eq!(decoder.decode(&mut partial).unwrap(), None);
        partial.unsplit(buf);
        let mut buf = partial;

        for counter in 0..3 {
            let packet = decoder.decode(&mut buf).unwrap().unwrap();
            assert_eq!(packet, Packet::Ack(AckMessage::new(5, counter)));
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn test_stream_resyncs_after_garbage() {
        let decoder = Decoder::new(ChecksumKind::Sum8, Direction::CubettoToInterface);
        let mut buf = BytesMut::new();
        buf.put_u8(0xFF);
        AckMessage::new(9, 1).encode(&mut buf);

        assert!(matches!(decoder.decode(&mut buf), Err(CodecError::UnknownSender(_))));
        assert_eq!(
            decoder.decode(&mut buf).unwrap(),
            Some(Packet::Ack(AckMessage::new(9, 1)))
        );
    }
}
