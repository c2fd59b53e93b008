//! MT frame codec.
//!
//! Every frame exchanged with the network processor has the same shape:
//!
//! ```text
//! +-----+------+------+-------------------+
//! | len | cmd0 | cmd1 | payload[0..len]   |
//! +-----+------+------+-------------------+
//! ```
//!
//! `len` counts only the payload bytes. The top three bits of `cmd0` give the
//! [`FrameKind`], the low five bits the subsystem. Over SPI no frame check
//! sequence is appended.
//!
//! This module provides:
//! - [`Opcode`]: the `(cmd0, cmd1)` pair
//! - [`CommandDescriptor`]: an opcode plus a little-endian payload builder
//! - [`encode`]: descriptor to wire [`Frame`]
//! - [`decode_header`]: first three inbound bytes to [`FrameHeader`]
//! - [`PayloadReader`]: little-endian field reader for inbound payloads

use core::fmt;

use heapless::Vec;

use crate::consts::{
    MT_SUBSYSTEM_MASK, MT_TYPE_AREQ, MT_TYPE_MASK, MT_TYPE_POLL, MT_TYPE_SREQ, MT_TYPE_SRSP,
    ZNP_HEADER_LEN, ZNP_MAX_FRAME_LEN, ZNP_MAX_PAYLOAD_LEN,
};
use crate::error::{Result, ZnpError};

/// Payload storage of an outgoing command.
pub type Payload = Vec<u8, ZNP_MAX_PAYLOAD_LEN>;

/// Classification of a frame by the top three bits of `cmd0`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameKind {
    /// Host poll for a queued asynchronous frame (also the "no data" marker).
    Poll,
    /// Synchronous request, answered by exactly one [`SyncResponse`](FrameKind::SyncResponse).
    SyncRequest,
    /// Asynchronous request. Sent by the device it is an unsolicited event.
    Async,
    /// Synchronous response to a host request.
    SyncResponse,
    /// A type value the MT protocol does not define.
    Reserved(u8),
}

/// The `(cmd0, cmd1)` pair identifying an MT command.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Opcode {
    /// Frame type and subsystem.
    pub cmd0: u8,
    /// Command id within the subsystem.
    pub cmd1: u8,
}

impl Opcode {
    /// Creates an opcode from its two raw bytes.
    pub const fn new(cmd0: u8, cmd1: u8) -> Self {
        Self { cmd0, cmd1 }
    }

    /// Returns the frame type encoded in `cmd0`.
    pub const fn kind(&self) -> FrameKind {
        match self.cmd0 & MT_TYPE_MASK {
            MT_TYPE_POLL => FrameKind::Poll,
            MT_TYPE_SREQ => FrameKind::SyncRequest,
            MT_TYPE_AREQ => FrameKind::Async,
            MT_TYPE_SRSP => FrameKind::SyncResponse,
            other => FrameKind::Reserved(other),
        }
    }

    /// Returns the subsystem id encoded in `cmd0`.
    pub const fn subsystem(&self) -> u8 {
        self.cmd0 & MT_SUBSYSTEM_MASK
    }

    /// Returns the opcode of the synchronous response answering this request.
    pub const fn response(&self) -> Opcode {
        Opcode::new(self.subsystem() | MT_TYPE_SRSP, self.cmd1)
    }

    /// Returns `cmd0` and `cmd1` packed as `cmd0 << 8 | cmd1`.
    pub const fn as_u16(&self) -> u16 {
        ((self.cmd0 as u16) << 8) | self.cmd1 as u16
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.as_u16())
    }
}

/// The three header bytes of an MT frame.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct FrameHeader {
    /// Number of payload bytes following the header.
    pub len: u8,
    /// Command identifier.
    pub opcode: Opcode,
}

impl FrameHeader {
    /// `true` for the zero-length frame the device clocks out when it has nothing queued.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Reads the header from the first three bytes of an inbound stream.
///
/// The length is taken as-is; callers that copy the payload must check it
/// against their buffer capacity.
pub const fn decode_header(bytes: &[u8; ZNP_HEADER_LEN]) -> FrameHeader {
    FrameHeader {
        len: bytes[0],
        opcode: Opcode::new(bytes[1], bytes[2]),
    }
}

/// An opcode plus its ordered payload bytes, ready to be framed.
///
/// Descriptors are built by the [`commands`](crate::commands) layer and then
/// handed to [`encode`] by reference. All multi-byte values are written
/// little-endian, as the MT protocol expects.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CommandDescriptor {
    /// Command identifier.
    pub opcode: Opcode,
    payload: Payload,
}

impl CommandDescriptor {
    /// Creates a descriptor with an empty payload.
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
        }
    }

    /// Creates a descriptor from a raw payload.
    pub fn from_slice(opcode: Opcode, payload: &[u8]) -> Result<Self> {
        let mut descriptor = Self::new(opcode);
        descriptor.push_bytes(payload)?;
        Ok(descriptor)
    }

    /// The payload written so far.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Appends one byte.
    pub fn push_u8(&mut self, value: u8) -> Result<()> {
        self.push_bytes(&[value])
    }

    /// Appends a `u16`, low byte first.
    pub fn push_u16(&mut self, value: u16) -> Result<()> {
        self.push_bytes(&value.to_le_bytes())
    }

    /// Appends a `u32`, low byte first.
    pub fn push_u32(&mut self, value: u32) -> Result<()> {
        self.push_bytes(&value.to_le_bytes())
    }

    /// Appends a `u64`, low byte first.
    pub fn push_u64(&mut self, value: u64) -> Result<()> {
        self.push_bytes(&value.to_le_bytes())
    }

    /// Appends raw bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.payload
            .extend_from_slice(bytes)
            .map_err(|_| ZnpError::PayloadTooLong {
                len: self.payload.len() + bytes.len(),
                max: ZNP_MAX_PAYLOAD_LEN,
            })
    }
}

/// A complete outgoing frame: header followed by payload.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Frame {
    bytes: Vec<u8, ZNP_MAX_FRAME_LEN>,
}

impl Frame {
    /// The bytes to clock out on the bus.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The decoded header of this frame.
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            len: self.bytes[0],
            opcode: Opcode::new(self.bytes[1], self.bytes[2]),
        }
    }

    /// The payload following the header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[ZNP_HEADER_LEN..]
    }
}

/// Serializes a descriptor into a wire frame.
///
/// The length byte is computed from the payload, which the descriptor already
/// bounds to [`ZNP_MAX_PAYLOAD_LEN`], so encoding cannot fail.
pub fn encode(descriptor: &CommandDescriptor) -> Frame {
    let mut bytes = Vec::new();
    let payload = descriptor.payload();
    // Capacity is ZNP_MAX_PAYLOAD_LEN + ZNP_HEADER_LEN, both pushes fit.
    let _ = bytes.extend_from_slice(&[
        payload.len() as u8,
        descriptor.opcode.cmd0,
        descriptor.opcode.cmd1,
    ]);
    let _ = bytes.extend_from_slice(payload);
    Frame { bytes }
}

/// Little-endian field reader over a received payload.
///
/// Each read advances the cursor and returns `None` once the payload is exhausted.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Starts reading at the beginning of `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    /// Reads `len` raw bytes.
    pub fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let out = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(out)
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Option<u8> {
        self.bytes(1).map(|b| b[0])
    }

    /// Reads a little-endian `u16`.
    pub fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    /// Reads a little-endian `u32`.
    pub fn u32(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian `u64`.
    pub fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{AF_INCOMING_MSG, SYS_RESET_REQ, ZB_WRITE_CONFIGURATION};

    #[test]
    fn test_encode_prepends_payload_length() {
        let descriptor =
            CommandDescriptor::from_slice(ZB_WRITE_CONFIGURATION, &[0x83, 0x02, 0xa1, 0x00])
                .unwrap();
        let frame = encode(&descriptor);
        assert_eq!(frame.as_bytes(), &[0x04, 0x26, 0x05, 0x83, 0x02, 0xa1, 0x00]);
        assert_eq!(frame.as_bytes()[0] as usize, descriptor.payload().len());
        assert_eq!(frame.payload(), descriptor.payload());
        assert_eq!(frame.header().opcode, ZB_WRITE_CONFIGURATION);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode(&CommandDescriptor::new(Opcode::new(0x26, 0x06)));
        assert_eq!(frame.as_bytes(), &[0x00, 0x26, 0x06]);
        assert!(frame.header().is_empty());
    }

    #[test]
    fn test_encode_length_tracks_every_payload_size() {
        for len in [0usize, 1, 17, 61, ZNP_MAX_PAYLOAD_LEN] {
            let payload = [0x5a; ZNP_MAX_PAYLOAD_LEN];
            let descriptor = CommandDescriptor::from_slice(SYS_RESET_REQ, &payload[..len]).unwrap();
            let frame = encode(&descriptor);
            assert_eq!(frame.as_bytes()[0] as usize, len);
            assert_eq!(frame.as_bytes().len(), len + ZNP_HEADER_LEN);
        }
    }

    #[test]
    fn test_payload_over_capacity_is_rejected() {
        let payload = [0u8; ZNP_MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            CommandDescriptor::from_slice(SYS_RESET_REQ, &payload),
            Err(ZnpError::PayloadTooLong {
                len: ZNP_MAX_PAYLOAD_LEN + 1,
                max: ZNP_MAX_PAYLOAD_LEN,
            })
        );
    }

    #[test]
    fn test_push_writes_little_endian() {
        let mut descriptor = CommandDescriptor::new(SYS_RESET_REQ);
        descriptor.push_u16(0x00a1).unwrap();
        descriptor.push_u32(0x0000_0800).unwrap();
        assert_eq!(descriptor.payload(), &[0xa1, 0x00, 0x00, 0x08, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_header() {
        let header = decode_header(&[0x1e, 0x44, 0x81]);
        assert_eq!(header.len, 0x1e);
        assert_eq!(header.opcode, AF_INCOMING_MSG);
        assert!(decode_header(&[0, 0, 0]).is_empty());
    }

    #[test]
    fn test_opcode_classification() {
        assert_eq!(Opcode::new(0x00, 0x00).kind(), FrameKind::Poll);
        assert_eq!(ZB_WRITE_CONFIGURATION.kind(), FrameKind::SyncRequest);
        assert_eq!(AF_INCOMING_MSG.kind(), FrameKind::Async);
        assert_eq!(Opcode::new(0x66, 0x05).kind(), FrameKind::SyncResponse);
        assert_eq!(Opcode::new(0xe1, 0x00).kind(), FrameKind::Reserved(0xe0));
        assert_eq!(ZB_WRITE_CONFIGURATION.subsystem(), 0x06);
        assert_eq!(ZB_WRITE_CONFIGURATION.response(), Opcode::new(0x66, 0x05));
        assert_eq!(ZB_WRITE_CONFIGURATION.as_u16(), 0x2605);
    }

    #[test]
    fn test_payload_reader() {
        let mut reader = PayloadReader::new(&[0x02, 0x34, 0x12, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(reader.u8(), Some(0x02));
        assert_eq!(reader.u16(), Some(0x1234));
        assert_eq!(reader.u64(), Some(0x0807_0605_0403_0201));
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.u8(), None);
    }
}
