//! MRDY/SRDY handshake over an SPI bus.
//!
//! The network processor is an SPI slave that cannot stall the clock, so it
//! paces the host through the SRDY line instead. MRDY doubles as chip select.
//!
//! ```text
//!            host                                  device
//!  MRDY  ‾‾‾‾\_____________________________________/‾‾‾‾‾
//!  SRDY  ‾‾‾‾‾‾‾‾\____________/‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//!                 | request  |  | reply header + payload |
//! ```
//!
//! Every exchange ends with the bus flushed and MRDY released, whether it
//! succeeded or not.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

use crate::config::Timing;
use crate::consts::{ZNP_HEADER_LEN, ZNP_MAX_RX_PAYLOAD_LEN, ZNP_POLL_FRAME, ZNP_RX_BUF_LEN};
use crate::error::{Result, ZnpError};
use crate::frame::{Frame, FrameHeader, FrameKind, decode_header};
use crate::layout::name_of;
use crate::timer::Timeout;

/// Step of an exchange, reported by [`ZnpError::HandshakeTimeout`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum HandshakeState {
    /// MRDY released, no exchange in progress.
    #[default]
    Idle,
    /// MRDY is being asserted.
    AssertRequest,
    /// Waiting for SRDY to go low.
    AwaitPeerReady,
    /// Bytes are being clocked.
    Transfer,
    /// Waiting for SRDY to go high.
    AwaitPeerBusyCleared,
    /// Flushing the bus and releasing MRDY.
    Complete,
}

/// SPI transport to the network processor.
///
/// Owns the bus, both handshake lines and the delay used to pace SRDY
/// sampling. The last received frame is kept until the next exchange.
#[derive(Debug)]
pub struct SpiTransport<SPI, MRDY, SRDY, D> {
    /// SPI bus, MSB first, mode 0.
    pub spi: SPI,
    /// Master ready, active low. Acts as chip select.
    pub mrdy: MRDY,
    /// Slave ready, active low.
    pub srdy: SRDY,
    /// Delay provider for SRDY polling and the driver's long waits.
    pub delay: D,
    /// Current handshake step.
    pub state: HandshakeState,
    /// Budget for each SRDY wait. `None` waits forever.
    pub handshake_timeout_us: Option<u32>,
    /// Delay between two SRDY samples.
    pub poll_interval_us: u32,
    rx: [u8; ZNP_RX_BUF_LEN],
    rx_len: usize,
    /// Number of completed exchanges, successful or not.
    pub exchanges: u32,
    /// Number of SRDY waits that ran out of budget.
    pub timeouts: u16,
}

impl<SPI, MRDY, SRDY, D> SpiTransport<SPI, MRDY, SRDY, D>
where
    SPI: SpiBus<u8>,
    MRDY: OutputPin,
    SRDY: InputPin,
    D: DelayNs,
{
    /// Creates the transport and idles MRDY high.
    pub fn new(spi: SPI, mut mrdy: MRDY, srdy: SRDY, delay: D, timing: &Timing) -> Self {
        let _ = mrdy.set_high();
        Self {
            spi,
            mrdy,
            srdy,
            delay,
            state: HandshakeState::Idle,
            handshake_timeout_us: timing.handshake_timeout_us,
            poll_interval_us: timing.poll_interval_us,
            rx: [0; ZNP_RX_BUF_LEN],
            rx_len: 0,
            exchanges: 0,
            timeouts: 0,
        }
    }

    /// `true` while the device holds SRDY low to signal a queued frame.
    pub fn peer_has_data(&mut self) -> Result<bool> {
        self.srdy.is_low().map_err(ZnpError::pin)
    }

    /// One non-blocking SRDY sample: `Ok` once SRDY is at the requested level.
    pub fn poll_srdy(&mut self, low: bool) -> nb::Result<(), ZnpError> {
        let is_low = self
            .srdy
            .is_low()
            .map_err(|e| nb::Error::Other(ZnpError::pin(e)))?;
        if is_low == low {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn wait_srdy(&mut self, low: bool) -> Result<()> {
        let mut timeout = Timeout::from_us(self.handshake_timeout_us);
        loop {
            match self.poll_srdy(low) {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => {}
            }
            if timeout.expired() {
                self.timeouts = self.timeouts.wrapping_add(1);
                warn!("SRDY handshake timed out in {:?}", self.state);
                return Err(ZnpError::HandshakeTimeout { stage: self.state });
            }
            timeout.wait(&mut self.delay, self.poll_interval_us);
        }
    }

    /// Sends `frame` and, for a synchronous request, reads the reply.
    ///
    /// # Returns
    /// - `Some(header)` of the reply for an SREQ; the reply is available
    ///   through [`last_frame`](Self::last_frame).
    /// - `None` for frames that are not answered, such as `SYS_RESET_REQ`.
    pub fn transceive(&mut self, frame: &Frame) -> Result<Option<FrameHeader>> {
        let opcode = frame.header().opcode;
        trace!("exchange {} ({})", name_of(opcode), opcode);
        let read_reply = opcode.kind() == FrameKind::SyncRequest;
        let result = self.request(frame.as_bytes(), read_reply);
        self.release(result)
    }

    /// Collects one queued frame from the device.
    ///
    /// Only call this while SRDY is low. The returned header may be empty if
    /// the device had nothing left to send.
    pub fn receive(&mut self) -> Result<FrameHeader> {
        let result = self.poll_request();
        self.release(result)
    }

    /// The frame read by the last exchange, header included.
    pub fn last_frame(&self) -> &[u8] {
        &self.rx[..self.rx_len]
    }

    fn request(&mut self, bytes: &[u8], read_reply: bool) -> Result<Option<FrameHeader>> {
        self.state = HandshakeState::AssertRequest;
        self.rx_len = 0;
        self.mrdy.set_low().map_err(ZnpError::pin)?;
        self.state = HandshakeState::AwaitPeerReady;
        self.wait_srdy(true)?;
        self.state = HandshakeState::Transfer;
        self.spi.write(bytes).map_err(ZnpError::spi)?;
        self.state = HandshakeState::AwaitPeerBusyCleared;
        self.wait_srdy(false)?;
        if !read_reply {
            return Ok(None);
        }
        self.state = HandshakeState::Transfer;
        self.read_frame().map(Some)
    }

    fn poll_request(&mut self) -> Result<FrameHeader> {
        self.state = HandshakeState::AssertRequest;
        self.rx_len = 0;
        self.mrdy.set_low().map_err(ZnpError::pin)?;
        self.state = HandshakeState::Transfer;
        self.spi.write(&ZNP_POLL_FRAME).map_err(ZnpError::spi)?;
        self.state = HandshakeState::AwaitPeerBusyCleared;
        self.wait_srdy(false)?;
        self.state = HandshakeState::Transfer;
        self.read_frame()
    }

    fn read_frame(&mut self) -> Result<FrameHeader> {
        let mut header = [0u8; ZNP_HEADER_LEN];
        self.spi.read(&mut header).map_err(ZnpError::spi)?;
        let decoded = decode_header(&header);
        let len = decoded.len as usize;
        if len > ZNP_MAX_RX_PAYLOAD_LEN {
            warn!("dropping {} ({} bytes) larger than the receive buffer", decoded.opcode, len);
            self.drain(len)?;
            return Err(ZnpError::MalformedFrame {
                len: decoded.len,
                capacity: ZNP_MAX_RX_PAYLOAD_LEN,
            });
        }
        self.rx[..ZNP_HEADER_LEN].copy_from_slice(&header);
        let end = ZNP_HEADER_LEN + len;
        if len > 0 {
            self.spi
                .read(&mut self.rx[ZNP_HEADER_LEN..end])
                .map_err(ZnpError::spi)?;
        }
        self.rx_len = end;
        Ok(decoded)
    }

    /// Clocks out `len` bytes nobody has room for.
    fn drain(&mut self, mut len: usize) -> Result<()> {
        let mut sink = [0u8; ZNP_RX_BUF_LEN];
        while len > 0 {
            let chunk = len.min(sink.len());
            self.spi.read(&mut sink[..chunk]).map_err(ZnpError::spi)?;
            len -= chunk;
        }
        Ok(())
    }

    fn release<T>(&mut self, result: Result<T>) -> Result<T> {
        self.state = HandshakeState::Complete;
        let flushed = self.spi.flush().map_err(ZnpError::spi);
        let released = self.mrdy.set_high().map_err(ZnpError::pin);
        self.state = HandshakeState::Idle;
        self.exchanges = self.exchanges.wrapping_add(1);
        let value = result?;
        flushed?;
        released?;
        Ok(value)
    }
}
