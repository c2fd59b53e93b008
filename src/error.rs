//! Error types returned by the ZNP driver.
//!
//! HAL errors from the SPI bus and the handshake pins are reduced to their
//! `embedded-hal` [`ErrorKind`](embedded_hal::spi::ErrorKind) so that
//! [`ZnpError`] stays `Copy` and independent of the concrete HAL.

use embedded_hal::{digital, spi};
use thiserror::Error;

use crate::frame::Opcode;
use crate::transport::HandshakeState;

/// Errors that can occur while exchanging frames with the network processor.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ZnpError {
    /// SRDY did not reach the expected level within the handshake budget.
    #[error("handshake timed out in state {stage:?}")]
    HandshakeTimeout {
        /// The handshake step that was waiting on SRDY.
        stage: HandshakeState,
    },

    /// An inbound frame declared more payload than the receive buffer holds.
    #[error("frame declares {len} payload bytes, receive buffer holds {capacity}")]
    MalformedFrame {
        /// Declared payload length.
        len: u8,
        /// Payload capacity of the receive buffer.
        capacity: usize,
    },

    /// The synchronous response does not answer the issued request.
    #[error("expected reply {expected}, got {actual}")]
    UnexpectedReplyOpcode {
        /// Opcode of the SRSP matching the request.
        expected: Opcode,
        /// Opcode actually received.
        actual: Opcode,
    },

    /// An unsolicited frame arrived before the previous one was read.
    #[error("unsolicited frame {opcode} arrived before the previous one was read")]
    BufferOverrun {
        /// Opcode of the discarded frame.
        opcode: Opcode,
    },

    /// A command payload does not fit in an MT frame.
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLong {
        /// Requested payload length.
        len: usize,
        /// Maximum payload length.
        max: usize,
    },

    /// The network processor answered with a non-zero status byte.
    #[error("command {opcode} failed with status {status:#04x}")]
    CommandFailed {
        /// Opcode of the failing request.
        opcode: Opcode,
        /// MT status byte.
        status: u8,
    },

    /// The reply is shorter than the fields it must carry.
    #[error("reply {opcode} is too short")]
    ShortReply {
        /// Opcode of the truncated reply.
        opcode: Opcode,
    },

    /// The device did not announce itself within the callback window after a reset.
    #[error("device did not announce itself after reset")]
    ResetTimeout,

    /// A configuration setter was given an out-of-range value.
    #[error("invalid value for {parameter}")]
    InvalidParameter {
        /// Name of the rejected parameter.
        parameter: &'static str,
    },

    /// The configuration was changed after it was committed to NV memory.
    #[error("configuration is locked after commissioning")]
    ConfigLocked,

    /// A hardware reset was requested but no reset pin was supplied.
    #[error("no reset pin configured")]
    MissingResetPin,

    /// The SPI bus reported an error.
    #[error("spi bus error: {0:?}")]
    Spi(spi::ErrorKind),

    /// A handshake or reset pin reported an error.
    #[error("pin error: {0:?}")]
    Pin(digital::ErrorKind),
}

impl ZnpError {
    pub(crate) fn spi<E: spi::Error>(err: E) -> Self {
        Self::Spi(err.kind())
    }

    pub(crate) fn pin<E: digital::Error>(err: E) -> Self {
        Self::Pin(err.kind())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, ZnpError>;
