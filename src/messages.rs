//! Typed views over received frames.
//!
//! All parsers take the raw frame (header included) as stored in the receive
//! buffer. They return `None` if the opcode does not match or the frame is too
//! short for the fields they read.

use crate::consts::{AF_INCOMING_MSG, SYS_RESET_IND, ZDO_STATE_CHANGE_IND, ZNP_HEADER_LEN};
use crate::frame::{Opcode, decode_header};
use crate::layout::{Field, field};

fn opcode_of(frame: &[u8]) -> Option<Opcode> {
    let header: &[u8; ZNP_HEADER_LEN] = frame.get(..ZNP_HEADER_LEN)?.try_into().ok()?;
    Some(decode_header(header).opcode)
}

fn read_u8(opcode: Opcode, name: &str, frame: &[u8]) -> Option<u8> {
    field(opcode, name)?.u8(frame)
}

fn read_u16(opcode: Opcode, name: &str, frame: &[u8]) -> Option<u16> {
    field(opcode, name)?.u16(frame)
}

/// Header fields of an `AF_INCOMING_MSG` indication.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct IncomingMessage {
    /// Group the message was addressed to, 0 if none.
    pub group_id: u16,
    /// Cluster the message belongs to.
    pub cluster_id: u16,
    /// Short address of the originator.
    pub src_addr: u16,
    /// Endpoint of the originator.
    pub src_endpoint: u8,
    /// Local endpoint the message was delivered to.
    pub dst_endpoint: u8,
    /// Whether the message was broadcast.
    pub was_broadcast: bool,
    /// Link quality of the last hop.
    pub link_quality: u8,
    /// Whether APS security was applied.
    pub security_use: bool,
    /// MAC timestamp of reception.
    pub timestamp: u32,
    /// APS transaction sequence number.
    pub trans_seq: u8,
    /// Length of the application data.
    pub len: u8,
}

impl IncomingMessage {
    /// Parses the fixed header of an `AF_INCOMING_MSG` frame.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if opcode_of(frame)? != AF_INCOMING_MSG {
            return None;
        }
        let op = AF_INCOMING_MSG;
        Some(Self {
            group_id: read_u16(op, "GroupId", frame)?,
            cluster_id: read_u16(op, "ClusterId", frame)?,
            src_addr: read_u16(op, "SrcAddr", frame)?,
            src_endpoint: read_u8(op, "SrcEndpoint", frame)?,
            dst_endpoint: read_u8(op, "DstEndpoint", frame)?,
            was_broadcast: read_u8(op, "WasBroadcast", frame)? != 0,
            link_quality: read_u8(op, "LinkQuality", frame)?,
            security_use: read_u8(op, "SecurityUse", frame)? != 0,
            timestamp: field(op, "TimeStamp")?.u32(frame)?,
            trans_seq: read_u8(op, "TransSeqNumber", frame)?,
            len: read_u8(op, "Len", frame)?,
        })
    }

    /// Returns the application data carried by an `AF_INCOMING_MSG` frame.
    ///
    /// The data starts at offset 20; its length is the byte at offset 19.
    pub fn data(frame: &[u8]) -> Option<&[u8]> {
        let header = Self::parse(frame)?;
        field(AF_INCOMING_MSG, "Data")?.bytes(frame, header.len as usize)
    }
}

/// Link quality and last-hop address of an `AF_INCOMING_MSG` frame.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkQuality {
    /// Short address of the node that relayed the last hop.
    pub last_hop: u16,
    /// Link quality indicator of the last hop.
    pub lqi: u8,
}

impl LinkQuality {
    /// Extracts the link quality from an `AF_INCOMING_MSG` frame.
    ///
    /// The device appends the last-hop MAC source address and the radius after
    /// the application data, so the address sits at frame offset `len`.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        let message = IncomingMessage::parse(frame)?;
        let len = frame[0] as usize;
        Some(Self {
            last_hop: Field::new("MacSrcAddr", len, 2).u16(frame)?,
            lqi: message.link_quality,
        })
    }
}

/// Why the device restarted, as reported by `SYS_RESET_IND`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ResetReason {
    /// Power-up.
    PowerUp,
    /// External reset pin.
    External,
    /// Watchdog, including `SYS_RESET_REQ`.
    Watchdog,
    /// A value not defined by the MT interface.
    Other(u8),
}

impl From<u8> for ResetReason {
    fn from(code: u8) -> Self {
        match code {
            0x00 => ResetReason::PowerUp,
            0x01 => ResetReason::External,
            0x02 => ResetReason::Watchdog,
            other => ResetReason::Other(other),
        }
    }
}

/// The `SYS_RESET_IND` announcement sent once the device is ready after a reset.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ResetIndication {
    /// Reset cause.
    pub reason: ResetReason,
    /// Transport protocol revision.
    pub transport_rev: u8,
    /// Product id.
    pub product_id: u8,
    /// Firmware major release.
    pub major_rel: u8,
    /// Firmware minor release.
    pub minor_rel: u8,
    /// Hardware revision.
    pub hw_rev: u8,
}

impl ResetIndication {
    /// Parses a `SYS_RESET_IND` frame.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if opcode_of(frame)? != SYS_RESET_IND {
            return None;
        }
        let op = SYS_RESET_IND;
        Some(Self {
            reason: ResetReason::from(read_u8(op, "Reason", frame)?),
            transport_rev: read_u8(op, "TransportRev", frame)?,
            product_id: read_u8(op, "ProductId", frame)?,
            major_rel: read_u8(op, "MajorRel", frame)?,
            minor_rel: read_u8(op, "MinorRel", frame)?,
            hw_rev: read_u8(op, "HwRev", frame)?,
        })
    }
}

/// Terminal network states reported by `ZDO_STATE_CHANGE_IND` after startup.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum NetworkState {
    /// Joined as an end device.
    EndDevice,
    /// Joined as a router.
    Router,
    /// Started a network as coordinator.
    Coordinator,
    /// The end device lost its parent.
    ParentLost,
}

impl NetworkState {
    /// Maps a device state code to a terminal state.
    ///
    /// Intermediate states (discovery, joining, ...) return `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x06 => Some(NetworkState::EndDevice),
            0x07 => Some(NetworkState::Router),
            0x09 => Some(NetworkState::Coordinator),
            0x10 => Some(NetworkState::ParentLost),
            _ => None,
        }
    }

    /// Returns the raw state code of a `ZDO_STATE_CHANGE_IND` frame.
    pub fn code(frame: &[u8]) -> Option<u8> {
        if opcode_of(frame)? != ZDO_STATE_CHANGE_IND {
            return None;
        }
        read_u8(ZDO_STATE_CHANGE_IND, "State", frame)
    }

    /// Parses a `ZDO_STATE_CHANGE_IND` frame carrying a terminal state.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        Self::from_code(Self::code(frame)?)
    }
}
