//! Receive buffer and frame classification.
//!
//! The dispatcher owns the 64-byte [`ReceiveBuffer`] for unsolicited frames.
//! The poll loop hands it every frame it collects; the dispatcher decides
//! whether to keep it and raises the read-and-clear flags the application
//! polls. Synchronous replies are read from the transport and never touch
//! this buffer, so a pending event survives the commands issued after it.

use crate::consts::{AF_INCOMING_MSG, ZNP_HEADER_LEN, ZNP_RX_BUF_LEN};
use crate::error::{Result, ZnpError};
use crate::frame::{FrameHeader, decode_header};
use crate::layout::name_of;

/// What to do with an unsolicited frame that arrives while the previous one
/// has not been read.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum OverrunPolicy {
    /// Overwrite the unread frame with the new one.
    #[default]
    DropOldest,
    /// Keep the unread frame and discard the new one.
    DropNewest,
    /// Discard the new frame and report [`ZnpError::BufferOverrun`].
    Reject,
}

/// Outcome of [`Dispatcher::accept`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Disposition {
    /// Zero-length frame; nothing stored.
    Empty,
    /// The frame now occupies the receive buffer.
    Stored,
    /// The frame was discarded by [`OverrunPolicy::DropNewest`].
    Dropped,
}

/// The last frame received from the device.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ReceiveBuffer {
    bytes: [u8; ZNP_RX_BUF_LEN],
    len: usize,
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self {
            bytes: [0; ZNP_RX_BUF_LEN],
            len: 0,
        }
    }
}

impl ReceiveBuffer {
    /// The stored frame, header included. Empty if nothing is stored.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Header of the stored frame.
    pub fn header(&self) -> Option<FrameHeader> {
        let header: &[u8; ZNP_HEADER_LEN] = self.as_slice().get(..ZNP_HEADER_LEN)?.try_into().ok()?;
        Some(decode_header(header))
    }

    /// Payload of the stored frame.
    pub fn payload(&self) -> &[u8] {
        self.as_slice().get(ZNP_HEADER_LEN..).unwrap_or(&[])
    }

    /// Forgets the stored frame.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn store(&mut self, frame: &[u8]) {
        let len = frame.len().min(ZNP_RX_BUF_LEN);
        self.bytes[..len].copy_from_slice(&frame[..len]);
        self.len = len;
    }
}

/// Stores received frames and tracks what the application has not seen yet.
#[derive(Debug, Default)]
pub struct Dispatcher {
    buffer: ReceiveBuffer,
    new_data: bool,
    incoming_message: bool,
    unread_event: bool,
    /// Behavior when an unsolicited frame would overwrite an unread one.
    pub policy: OverrunPolicy,
    /// Number of unsolicited frames lost to overruns.
    pub overruns: u16,
}

impl Dispatcher {
    /// Creates an empty dispatcher with the given overrun policy.
    pub fn new(policy: OverrunPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Stores an unsolicited `frame` collected by the poll loop.
    ///
    /// `frame` is the raw frame as read from the bus, header included. An
    /// unsolicited frame arriving while the previous one is unread is an
    /// overrun and follows [`Dispatcher::policy`]. Synchronous replies never
    /// pass through here; they stay in the transport.
    pub fn accept(&mut self, frame: &[u8]) -> Result<Disposition> {
        let header = match frame.get(..ZNP_HEADER_LEN) {
            Some(bytes) => {
                let mut raw = [0u8; ZNP_HEADER_LEN];
                raw.copy_from_slice(bytes);
                decode_header(&raw)
            }
            None => return Ok(Disposition::Empty),
        };
        if header.is_empty() {
            return Ok(Disposition::Empty);
        }

        if self.unread_event {
            self.overruns = self.overruns.wrapping_add(1);
            match self.policy {
                OverrunPolicy::DropOldest => {
                    warn!("overrun: {} replaces an unread frame", name_of(header.opcode));
                }
                OverrunPolicy::DropNewest => {
                    warn!("overrun: dropping {}", name_of(header.opcode));
                    return Ok(Disposition::Dropped);
                }
                OverrunPolicy::Reject => {
                    warn!("overrun: rejecting {}", name_of(header.opcode));
                    return Err(ZnpError::BufferOverrun {
                        opcode: header.opcode,
                    });
                }
            }
        }

        debug!("received {} ({} bytes)", name_of(header.opcode), header.len);
        self.buffer.store(frame);
        self.new_data = true;
        self.incoming_message = header.opcode == AF_INCOMING_MSG;
        self.unread_event = true;
        Ok(Disposition::Stored)
    }

    /// `true` once per stored frame.
    pub fn new_data(&mut self) -> bool {
        let flag = self.new_data;
        self.new_data = false;
        self.unread_event = false;
        flag
    }

    /// `true` once per stored `AF_INCOMING_MSG`.
    pub fn incoming_message(&mut self) -> bool {
        let flag = self.incoming_message;
        self.incoming_message = false;
        self.unread_event = false;
        flag
    }

    /// Peeks at the new-data flag without clearing it.
    pub fn has_new_data(&self) -> bool {
        self.new_data
    }

    /// The receive buffer.
    pub fn buffer(&self) -> &ReceiveBuffer {
        &self.buffer
    }

    /// Empties the receive buffer and clears every flag.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.new_data = false;
        self.incoming_message = false;
        self.unread_event = false;
    }
}
