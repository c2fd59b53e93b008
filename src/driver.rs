//! Host driver for a CC2530 Zigbee network processor.
//!
//! This module provides the [`ZnpDriver`] struct, the session object tying
//! together the SPI [`transport`](crate::transport), the receive
//! [`dispatch`](crate::dispatch)er, the [`DeviceConfig`] and the optional
//! reset pin.
//!
//! ## Features
//!
//! - Synchronous requests that drain queued unsolicited frames first
//! - A poll loop collecting `AREQ` frames while SRDY is low
//! - Read-and-clear flags for new data and incoming application messages
//! - Power-up, hardware and software reset with reset announcement parsing
//! - NV commissioning in a fixed order that stops at the first failure
//!
//! ## Example
//!
//! ```ignore
//! use cc2530_znp::driver::ZnpDriver;
//!
//! let mut znp = ZnpDriver::new(spi, mrdy, srdy, Some(reset), delay);
//! znp.power_up()?;
//! znp.commission()?;
//! znp.startup_from_app()?;
//! znp.af_register(1)?;
//!
//! loop {
//!     znp.poll()?;
//!     if znp.incoming_message() {
//!         let mut buf = [0u8; 32];
//!         let len = znp.copy_payload(&mut buf);
//!         // handle &buf[..len]
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! The driver is strictly sequential: every method takes `&mut self` and
//! finishes its exchange before returning, so the single receive buffer is
//! never read while it is being written. For interrupt-driven polling see
//! [`crate::shared`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

use crate::commands::{
    AddrMode, AfRegister, Command, DeviceInfoParam, GpioOp, PeerAddress, SysGpio, SysResetReq,
    SysSetTxPower, ZbGetDeviceInfo, ZdoEndDeviceBindReq, ZdoMgmtLeaveReq, ZdoMgmtPermitJoinReq,
    ZdoNodeDescReq, ZdoStartupFromApp,
};
use crate::config::{CommissionStep, DeviceConfig, NvParameter, Timing};
use crate::consts::{SYS_GPIO, SYS_SET_TX_POWER, ZB_GET_DEVICE_INFO};
use crate::dispatch::{Dispatcher, OverrunPolicy};
use crate::error::{Result, ZnpError};
use crate::frame::{CommandDescriptor, FrameHeader, Opcode, encode};
use crate::layout::{STATUS, field, name_of};
use crate::messages::{IncomingMessage, LinkQuality, NetworkState, ResetIndication};
use crate::timer::Timeout;
use crate::transport::SpiTransport;

/// Bring-up state of the network processor, as seen by the host.
///
/// `PoweredOff → Resetting → AwaitingFirstFrame → Ready`. Every reset goes
/// through the same sequence.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum DeviceState {
    /// Not powered up yet.
    #[default]
    PoweredOff,
    /// Reset issued, waiting for the device to boot.
    Resetting,
    /// Listening for the reset announcement.
    AwaitingFirstFrame,
    /// The device accepts requests.
    Ready,
}

/// Outcome of one background poll.
enum Collected {
    Idle,
    Frame,
    Skipped,
}

/// A CC2530 ZNP connected over SPI.
///
/// ## Type Parameters
///
/// - `SPI`: [`SpiBus<u8>`] configured for 2 MHz, MSB first, mode 0
/// - `MRDY`: [`OutputPin`] driving the master-ready / chip-select line
/// - `SRDY`: [`InputPin`] reading the slave-ready line
/// - `RST`: [`OutputPin`] on the reset line, optional at run time
/// - `D`: [`DelayNs`] provider used for every wait
#[derive(Debug)]
pub struct ZnpDriver<SPI, MRDY, SRDY, RST, D> {
    /// Bring-up state.
    pub state: DeviceState,
    /// Handshake transport.
    pub transport: SpiTransport<SPI, MRDY, SRDY, D>,
    /// Reset pin, active low.
    pub reset: Option<RST>,
    /// Receive buffer and flags.
    pub dispatcher: Dispatcher,
    /// Host-side timing.
    pub timing: Timing,
    /// Queued frames skipped by internal waits because they could not be
    /// stored or were oversized.
    pub discarded: u16,
    config: DeviceConfig,
    commissioned: bool,
}

impl<SPI, MRDY, SRDY, RST, D> ZnpDriver<SPI, MRDY, SRDY, RST, D>
where
    SPI: SpiBus<u8>,
    MRDY: OutputPin,
    SRDY: InputPin,
    RST: OutputPin,
    D: DelayNs,
{
    /// Creates a driver with default [`Timing`] and [`DeviceConfig`].
    ///
    /// MRDY is driven high (idle). The reset pin is left untouched until
    /// [`power_up`](Self::power_up) or [`hard_reset`](Self::hard_reset).
    pub fn new(spi: SPI, mrdy: MRDY, srdy: SRDY, reset: Option<RST>, delay: D) -> Self {
        let timing = Timing::default();
        Self {
            state: DeviceState::PoweredOff,
            transport: SpiTransport::new(spi, mrdy, srdy, delay, &timing),
            reset,
            dispatcher: Dispatcher::default(),
            timing,
            discarded: 0,
            config: DeviceConfig::default(),
            commissioned: false,
        }
    }

    /// Replaces the timing, including the transport handshake budget.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.transport.handshake_timeout_us = timing.handshake_timeout_us;
        self.transport.poll_interval_us = timing.poll_interval_us;
        self.timing = timing;
        self
    }

    /// Replaces the device configuration.
    pub fn with_config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the receive overrun policy.
    pub fn with_overrun_policy(mut self, policy: OverrunPolicy) -> Self {
        self.dispatcher.policy = policy;
        self
    }

    /// The device configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Mutable access to the configuration.
    ///
    /// Fails with [`ZnpError::ConfigLocked`] once [`commission`](Self::commission)
    /// has written it to the device.
    pub fn config_mut(&mut self) -> Result<&mut DeviceConfig> {
        if self.commissioned {
            return Err(ZnpError::ConfigLocked);
        }
        Ok(&mut self.config)
    }


    /// Sends a command descriptor.
    ///
    /// Pending unsolicited frames are drained first. A queued frame that
    /// cannot be stored is counted in [`discarded`](Self::discarded) and does
    /// not fail the request. For a synchronous request the reply is checked
    /// against the expected response opcode and stays readable through
    /// [`reply`](Self::reply); it never displaces a buffered event.
    ///
    /// # Returns
    /// - The reply header for synchronous requests, `None` otherwise.
    pub fn request(&mut self, descriptor: &CommandDescriptor) -> Result<Option<FrameHeader>> {
        let _ = self.drain()?;
        debug!(
            "request {} ({}) {} bytes",
            name_of(descriptor.opcode),
            descriptor.opcode,
            descriptor.payload().len()
        );
        let Some(header) = self.transport.transceive(&encode(descriptor))? else {
            return Ok(None);
        };
        let expected = descriptor.opcode.response();
        if header.opcode != expected {
            return Err(ZnpError::UnexpectedReplyOpcode {
                expected,
                actual: header.opcode,
            });
        }
        Ok(Some(header))
    }

    /// The last frame read from the bus, header included.
    ///
    /// After a synchronous request this is its reply.
    pub fn reply(&self) -> &[u8] {
        self.transport.last_frame()
    }

    /// Sends a command and checks the status byte of its reply.
    pub fn call<C: Command>(&mut self, command: &C) -> Result<()> {
        let descriptor = command.descriptor()?;
        if self.request(&descriptor)?.is_some() && C::HAS_STATUS {
            let status = STATUS
                .u8(self.transport.last_frame())
                .ok_or(ZnpError::ShortReply {
                    opcode: descriptor.opcode.response(),
                })?;
            if status != 0 {
                warn!("{} failed with status {}", name_of(descriptor.opcode), status);
                return Err(ZnpError::CommandFailed {
                    opcode: descriptor.opcode,
                    status,
                });
            }
        }
        Ok(())
    }

    fn reply_u8(&self, opcode: Opcode, name: &str) -> Result<u8> {
        let reply = opcode.response();
        field(reply, name)
            .and_then(|f| f.u8(self.transport.last_frame()))
            .ok_or(ZnpError::ShortReply { opcode: reply })
    }

    /// Collects one unsolicited frame if the device has one queued.
    ///
    /// # Returns
    /// - `None` if SRDY is high or the device clocked out an empty frame.
    pub fn poll_once(&mut self) -> Result<Option<FrameHeader>> {
        let Some(header) = self.receive_queued()? else {
            return Ok(None);
        };
        let _ = self.dispatcher.accept(self.transport.last_frame())?;
        Ok(Some(header))
    }

    /// Collects unsolicited frames until SRDY is high or an empty frame arrives.
    ///
    /// # Returns
    /// - The number of non-empty frames received.
    pub fn poll(&mut self) -> Result<usize> {
        let mut drained = 0;
        while self.poll_once()?.is_some() {
            drained += 1;
        }
        Ok(drained)
    }

    fn receive_queued(&mut self) -> Result<Option<FrameHeader>> {
        if !self.transport.peer_has_data()? {
            return Ok(None);
        }
        let header = self.transport.receive()?;
        Ok(Some(header).filter(|header| !header.is_empty()))
    }

    /// Collects one queued frame on behalf of an internal wait.
    ///
    /// Overruns refused by the dispatcher and oversized frames are logged and
    /// counted instead of failing the caller. Bus errors still propagate.
    fn poll_background(&mut self) -> Result<Collected> {
        match self.receive_queued() {
            Ok(None) => return Ok(Collected::Idle),
            Ok(Some(_)) => {}
            Err(err @ ZnpError::MalformedFrame { .. }) => {
                self.discard(err);
                return Ok(Collected::Skipped);
            }
            Err(err) => return Err(err),
        }
        if let Err(err) = self.dispatcher.accept(self.transport.last_frame()) {
            self.discard(err);
        }
        Ok(Collected::Frame)
    }

    /// Drains every queued frame before the bus is used for a request.
    fn drain(&mut self) -> Result<usize> {
        let mut drained = 0;
        while !matches!(self.poll_background()?, Collected::Idle) {
            drained += 1;
        }
        Ok(drained)
    }

    fn discard(&mut self, err: ZnpError) {
        self.discarded = self.discarded.wrapping_add(1);
        warn!("skipped queued frame: {}", err);
    }

    /// Takes the new-data flag if the last frame is the one in the receive buffer.
    fn consume_last_frame(&mut self) {
        if self.received() == self.transport.last_frame() {
            let _ = self.dispatcher.new_data();
        }
    }

    /// `true` once for every frame stored since the last call.
    pub fn new_data(&mut self) -> bool {
        self.dispatcher.new_data()
    }

    /// `true` once for every `AF_INCOMING_MSG` stored since the last call.
    pub fn incoming_message(&mut self) -> bool {
        self.dispatcher.incoming_message()
    }

    /// The frame in the receive buffer, header included.
    pub fn received(&self) -> &[u8] {
        self.dispatcher.buffer().as_slice()
    }

    /// Empties the receive buffer and clears the flags.
    pub fn clear(&mut self) {
        self.dispatcher.clear();
    }

    /// Application data of the `AF_INCOMING_MSG` in the receive buffer.
    pub fn incoming_payload(&self) -> Option<&[u8]> {
        IncomingMessage::data(self.received())
    }

    /// Copies the application data of the buffered `AF_INCOMING_MSG` into `out`.
    ///
    /// # Returns
    /// - The number of bytes copied, 0 if the buffer holds no message.
    pub fn copy_payload(&self, out: &mut [u8]) -> usize {
        let data = self.incoming_payload().unwrap_or(&[]);
        let len = data.len().min(out.len());
        out[..len].copy_from_slice(&data[..len]);
        len
    }

    /// Last-hop address and LQI of the buffered `AF_INCOMING_MSG`.
    pub fn link_quality(&self) -> Option<LinkQuality> {
        LinkQuality::parse(self.received())
    }

    /// Header fields of the buffered `AF_INCOMING_MSG`.
    pub fn incoming_message_info(&self) -> Option<IncomingMessage> {
        IncomingMessage::parse(self.received())
    }


    fn device_info(&mut self, param: DeviceInfoParam) -> Result<u64> {
        self.call(&ZbGetDeviceInfo { param })?;
        let reply = ZB_GET_DEVICE_INFO.response();
        field(reply, "Value")
            .and_then(|f| f.u64(self.transport.last_frame()))
            .ok_or(ZnpError::ShortReply { opcode: reply })
    }

    /// Reads the 16-bit network address of the local device.
    pub fn short_address(&mut self) -> Result<u16> {
        Ok(self.device_info(DeviceInfoParam::ShortAddress)? as u16)
    }

    /// Reads the 64-bit IEEE address of the local device.
    pub fn ieee_address(&mut self) -> Result<u64> {
        self.device_info(DeviceInfoParam::IeeeAddress)
    }


    /// Opens (`true`) or closes (`false`) the local network for joining.
    pub fn permit_join(&mut self, permit: bool) -> Result<()> {
        info!("permit join: {}", permit);
        self.call(&ZdoMgmtPermitJoinReq::local(permit))
    }

    /// Asks `dst_addr` to remove the device `device_addr` from the network.
    pub fn leave(&mut self, dst_addr: u16, device_addr: u64) -> Result<()> {
        self.call(&ZdoMgmtLeaveReq {
            dst_addr,
            device_addr,
            flags: 0x00,
        })
    }

    /// Sends an end device bind request for `endpoint` to the coordinator.
    ///
    /// Both devices must send the request within the coordinator's binding
    /// window. Afterwards [`af_data_request_ext`](Self::af_data_request_ext)
    /// with [`AddrMode::NotPresent`] reaches the bound peer.
    pub fn end_device_bind(&mut self, endpoint: u8) -> Result<()> {
        let local = PeerAddress {
            short: self.short_address()?,
            extended: self.ieee_address()?,
        };
        self.call(&ZdoEndDeviceBindReq::new(local, endpoint))
    }

    /// Requests the node descriptor of `nwk_addr_of_interest` from `dst_addr`.
    ///
    /// The descriptor arrives later as an unsolicited frame.
    pub fn node_descriptor(&mut self, dst_addr: u16, nwk_addr_of_interest: u16) -> Result<()> {
        self.call(&ZdoNodeDescReq {
            dst_addr,
            nwk_addr_of_interest,
        })
    }

    /// Registers an application endpoint with the default profile and cluster.
    pub fn af_register(&mut self, endpoint: u8) -> Result<()> {
        self.call(&AfRegister::new(endpoint))
    }

    /// Sends `data` to the short address `dst_addr` using the configured AF defaults.
    ///
    /// # Returns
    /// - The number of data bytes sent.
    pub fn af_data_request(&mut self, dst_addr: u16, data: &[u8]) -> Result<usize> {
        let request = self.config.data_request(dst_addr, data);
        self.call(&request)?;
        Ok(data.len())
    }

    /// Sends `data` with an explicit address mode using the configured AF defaults.
    ///
    /// # Returns
    /// - The number of data bytes sent.
    pub fn af_data_request_ext(
        &mut self,
        addr_mode: AddrMode,
        dst_addr: u64,
        data: &[u8],
    ) -> Result<usize> {
        let request = self.config.data_request_ext(addr_mode, dst_addr, data);
        self.call(&request)?;
        Ok(data.len())
    }


    /// Runs a GPIO operation on the pins selected by `mask`.
    ///
    /// # Returns
    /// - The value byte of the reply; the pin levels for [`GpioOp::Read`].
    pub fn gpio(&mut self, op: GpioOp, mask: u8) -> Result<u8> {
        self.call(&SysGpio { op, mask })?;
        self.reply_u8(SYS_GPIO, "Value")
    }

    /// Reads the GPIO pins selected by `mask`.
    pub fn gpio_read(&mut self, mask: u8) -> Result<u8> {
        self.gpio(GpioOp::Read, mask)
    }

    /// Sets the radio output power.
    ///
    /// # Returns
    /// - The power actually applied by the device, in dBm.
    pub fn set_tx_power(&mut self, dbm: u8) -> Result<u8> {
        self.call(&SysSetTxPower { dbm })?;
        self.reply_u8(SYS_SET_TX_POWER, "TxPower")
    }

    /// Writes one NV parameter.
    pub fn write_parameter(&mut self, parameter: &NvParameter) -> Result<()> {
        debug!("write {:?}", parameter.item);
        self.call(&parameter.command())
    }


    /// Releases the reset line, idles MRDY and waits for the device to boot.
    ///
    /// A missing reset announcement is logged, not treated as an error.
    pub fn power_up(&mut self) -> Result<Option<ResetIndication>> {
        self.state = DeviceState::Resetting;
        if let Some(reset) = self.reset.as_mut() {
            reset.set_high().map_err(ZnpError::pin)?;
        }
        self.transport.mrdy.set_high().map_err(ZnpError::pin)?;
        self.transport.delay.delay_ms(self.timing.reset_delay_ms);
        let indication = self.await_reset_indication()?;
        if indication.is_none() {
            warn!("no reset indication after power up");
        }
        Ok(indication)
    }

    /// Pulses the reset line low and waits for the device to boot.
    pub fn hard_reset(&mut self) -> Result<Option<ResetIndication>> {
        let reset = self.reset.as_mut().ok_or(ZnpError::MissingResetPin)?;
        info!("hardware reset");
        self.state = DeviceState::Resetting;
        reset.set_low().map_err(ZnpError::pin)?;
        self.transport.delay.delay_ms(self.timing.reset_pulse_ms);
        reset.set_high().map_err(ZnpError::pin)?;
        self.transport.delay.delay_ms(self.timing.reset_delay_ms);
        self.await_reset_indication()
    }

    /// Sends `SYS_RESET_REQ` and waits for the device to boot.
    pub fn sys_reset(&mut self) -> Result<Option<ResetIndication>> {
        info!("software reset");
        self.call(&SysResetReq)?;
        self.state = DeviceState::Resetting;
        self.transport.delay.delay_ms(self.timing.reset_delay_ms);
        self.await_reset_indication()
    }

    /// Polls for `SYS_RESET_IND` during the callback window.
    fn await_reset_indication(&mut self) -> Result<Option<ResetIndication>> {
        self.state = DeviceState::AwaitingFirstFrame;
        let mut window = Timeout::from_ms(self.timing.callback_window_ms);
        let indication = loop {
            if matches!(self.poll_background()?, Collected::Frame) {
                if let Some(indication) = ResetIndication::parse(self.transport.last_frame()) {
                    self.consume_last_frame();
                    info!(
                        "device up: {:?}, firmware {}.{}",
                        indication.reason, indication.major_rel, indication.minor_rel
                    );
                    break Some(indication);
                }
            }
            if window.expired() {
                break None;
            }
            window.wait(&mut self.transport.delay, self.timing.poll_interval_us);
        };
        self.state = DeviceState::Ready;
        Ok(indication)
    }

    /// Writes the configuration to NV memory.
    ///
    /// Runs [`DeviceConfig::commission_plan`] step by step and stops at the
    /// first failure; nothing after the failing step is written. On success
    /// the configuration is locked.
    ///
    /// # Notes
    /// - Clears the network state stored on the device. Run it once, before
    ///   the device first joins or forms a network.
    pub fn commission(&mut self) -> Result<()> {
        let plan = self.config.commission_plan()?;
        info!("commissioning in {} steps", plan.len());
        for step in &plan {
            match step {
                CommissionStep::Write(parameter) => self.write_parameter(parameter)?,
                CommissionStep::SetTxPower(dbm) => {
                    let _ = self.set_tx_power(*dbm)?;
                }
                CommissionStep::Reset => {
                    let _ = self.sys_reset()?.ok_or(ZnpError::ResetTimeout)?;
                }
            }
        }
        self.commissioned = true;
        Ok(())
    }

    /// Starts the device in the network and waits for a terminal state.
    ///
    /// # Returns
    /// - The terminal [`NetworkState`], or `None` if none was reported within
    ///   [`Timing::startup_timeout_ms`].
    pub fn startup_from_app(&mut self) -> Result<Option<NetworkState>> {
        self.call(&ZdoStartupFromApp::default())?;
        let mut window = Timeout::from_ms(self.timing.startup_timeout_ms);
        loop {
            if matches!(self.poll_background()?, Collected::Frame) {
                if let Some(code) = NetworkState::code(self.transport.last_frame()) {
                    self.consume_last_frame();
                    debug!("device state {}", code);
                    if let Some(state) = NetworkState::from_code(code) {
                        info!("network state {:?}", state);
                        return Ok(Some(state));
                    }
                }
            }
            if window.expired() {
                warn!("no terminal network state after startup");
                return Ok(None);
            }
            window.wait(&mut self.transport.delay, self.timing.poll_interval_us);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ZbWriteConfiguration;
    use crate::consts::ZB_WRITE_CONFIGURATION;
    use crate::messages::ResetReason;
    use crate::messages::tests::INCOMING_MSG;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    type TestDriver = ZnpDriver<SpiMock<u8>, PinMock, PinMock, PinMock, NoopDelay>;

    const RESET_IND: [u8; 9] = [0x06, 0x41, 0x80, 0x02, 0x02, 0x00, 0x02, 0x06, 0x03];
    const WRITE_OK: [u8; 4] = [0x01, 0x66, 0x05, 0x00];

    /// Expected bus activity, built in exchange order.
    struct Script {
        spi: Vec<SpiTransaction<u8>>,
        mrdy: Vec<PinTransaction>,
        srdy: Vec<PinTransaction>,
        reset: Vec<PinTransaction>,
    }

    impl Script {
        fn new() -> Self {
            Self {
                spi: Vec::new(),
                mrdy: vec![PinTransaction::set(PinState::High)],
                srdy: Vec::new(),
                reset: Vec::new(),
            }
        }

        fn read_frame(&mut self, frame: &[u8]) {
            self.spi.push(SpiTransaction::read_vec(frame[..3].to_vec()));
            if frame.len() > 3 {
                self.spi.push(SpiTransaction::read_vec(frame[3..].to_vec()));
            }
        }

        /// SRDY high: nothing queued.
        fn idle(&mut self) -> &mut Self {
            self.srdy.push(PinTransaction::get(PinState::High));
            self
        }

        /// A request preceded by an empty drain. `reply` is empty for AREQs.
        fn request(&mut self, request: &[u8], reply: &[u8]) -> &mut Self {
            let _ = self.idle();
            self.srdy.push(PinTransaction::get(PinState::Low));
            self.srdy.push(PinTransaction::get(PinState::High));
            self.mrdy.push(PinTransaction::set(PinState::Low));
            self.mrdy.push(PinTransaction::set(PinState::High));
            self.spi.push(SpiTransaction::write_vec(request.to_vec()));
            if !reply.is_empty() {
                self.read_frame(reply);
            }
            self.spi.push(SpiTransaction::flush());
            self
        }

        /// One queued frame collected by a poll.
        fn unsolicited(&mut self, frame: &[u8]) -> &mut Self {
            self.srdy.push(PinTransaction::get(PinState::Low));
            self.srdy.push(PinTransaction::get(PinState::High));
            self.mrdy.push(PinTransaction::set(PinState::Low));
            self.mrdy.push(PinTransaction::set(PinState::High));
            self.spi.push(SpiTransaction::write_vec(vec![0x00, 0x00, 0x00]));
            self.read_frame(frame);
            self.spi.push(SpiTransaction::flush());
            self
        }

        fn sys_reset(&mut self) -> &mut Self {
            self.request(&[0x01, 0x41, 0x00, 0x00], &[])
                .unsolicited(&RESET_IND)
        }

        fn build(&self, with_reset: bool) -> TestDriver {
            let timing = Timing {
                handshake_timeout_us: Some(0),
                reset_delay_ms: 0,
                reset_pulse_ms: 0,
                callback_window_ms: 0,
                startup_timeout_ms: 1,
                ..Timing::default()
            };
            let reset = if with_reset {
                Some(PinMock::new(&self.reset))
            } else {
                None
            };
            ZnpDriver::new(
                SpiMock::new(&self.spi),
                PinMock::new(&self.mrdy),
                PinMock::new(&self.srdy),
                reset,
                NoopDelay::new(),
            )
            .with_timing(timing)
        }
    }

    fn done(mut driver: TestDriver) {
        driver.transport.spi.done();
        driver.transport.mrdy.done();
        driver.transport.srdy.done();
        if let Some(reset) = driver.reset.as_mut() {
            reset.done();
        }
    }

    fn frame_of<C: Command>(command: &C) -> Vec<u8> {
        encode(&command.descriptor().unwrap()).as_bytes().to_vec()
    }

    #[test]
    fn test_call_checks_status() {
        let write = ZbWriteConfiguration {
            id: 0x83,
            value: &[0xa1, 0x00],
        };
        let mut driver = Script::new()
            .request(&frame_of(&write), &WRITE_OK)
            .request(&frame_of(&write), &[0x01, 0x66, 0x05, 0x01])
            .build(false);

        assert_eq!(driver.call(&write), Ok(()));
        assert_eq!(
            driver.call(&write),
            Err(ZnpError::CommandFailed {
                opcode: ZB_WRITE_CONFIGURATION,
                status: 0x01
            })
        );
        done(driver);
    }

    #[test]
    fn test_unexpected_reply_opcode() {
        let mut driver = Script::new()
            .request(&frame_of(&ZdoMgmtPermitJoinReq::local(true)), &[0x01, 0x61, 0x0e, 0x00])
            .build(false);

        assert_eq!(
            driver.permit_join(true),
            Err(ZnpError::UnexpectedReplyOpcode {
                expected: Opcode::new(0x65, 0x36),
                actual: Opcode::new(0x61, 0x0e),
            })
        );
        done(driver);
    }

    #[test]
    fn test_poll_drains_until_srdy_high() {
        let state = [0x01, 0x45, 0xc0, 0x08];
        let mut driver = Script::new()
            .unsolicited(&state)
            .unsolicited(&state)
            .unsolicited(&INCOMING_MSG)
            .idle()
            .build(false);

        assert_eq!(driver.poll(), Ok(3));
        assert_eq!(driver.dispatcher.overruns, 2);
        assert!(driver.incoming_message());
        done(driver);
    }

    #[test]
    fn test_empty_poll_frame_ends_loop() {
        let mut driver = Script::new().unsolicited(&[0x00, 0x00, 0x00]).build(false);

        assert_eq!(driver.poll(), Ok(0));
        assert!(!driver.new_data());
        assert!(!driver.incoming_message());
        done(driver);
    }

    #[test]
    fn test_message_drained_by_request_stays_readable() {
        let mut driver = Script::new()
            .unsolicited(&INCOMING_MSG)
            .request(&frame_of(&AfRegister::new(1)), &[0x01, 0x64, 0x00, 0x00])
            .build(false)
            .with_overrun_policy(OverrunPolicy::DropNewest);

        assert_eq!(driver.af_register(1), Ok(()));
        assert_eq!(driver.transport.exchanges, 2);
        assert_eq!(driver.reply(), &[0x01, 0x64, 0x00, 0x00]);
        assert_eq!(driver.dispatcher.overruns, 0);
        assert!(driver.incoming_message());
        assert_eq!(driver.incoming_payload(), Some(&[0xde, 0xad][..]));
        done(driver);
    }

    #[test]
    fn test_refused_frame_does_not_fail_request() {
        let mut driver = Script::new()
            .unsolicited(&INCOMING_MSG)
            .idle()
            .unsolicited(&[0x01, 0x45, 0xc0, 0x08])
            .request(&frame_of(&AfRegister::new(1)), &[0x01, 0x64, 0x00, 0x00])
            .build(false)
            .with_overrun_policy(OverrunPolicy::Reject);

        assert_eq!(driver.poll(), Ok(1));
        assert_eq!(driver.af_register(1), Ok(()));
        assert_eq!(driver.transport.exchanges, 3);
        assert_eq!(driver.dispatcher.overruns, 1);
        assert_eq!(driver.discarded, 1);
        assert!(driver.incoming_message());
        done(driver);
    }

    #[test]
    fn test_incoming_message_accessors() {
        let mut driver = Script::new().unsolicited(&INCOMING_MSG).idle().build(false);

        assert_eq!(driver.poll(), Ok(1));
        assert!(driver.incoming_message());
        assert_eq!(driver.incoming_payload(), Some(&[0xde, 0xad][..]));
        let mut buf = [0u8; 1];
        assert_eq!(driver.copy_payload(&mut buf), 1);
        assert_eq!(buf, [0xde]);
        assert_eq!(driver.link_quality().unwrap().last_hop, 0x5678);
        assert_eq!(driver.incoming_message_info().unwrap().src_addr, 0x1234);

        driver.clear();
        assert_eq!(driver.incoming_payload(), None);
        assert_eq!(driver.copy_payload(&mut buf), 0);
        done(driver);
    }

    #[test]
    fn test_device_addresses() {
        let mut driver = Script::new()
            .request(
                &[0x01, 0x26, 0x06, 0x02],
                &[0x09, 0x66, 0x06, 0x02, 0x34, 0x12, 0, 0, 0, 0, 0, 0],
            )
            .request(
                &[0x01, 0x26, 0x06, 0x01],
                &[0x09, 0x66, 0x06, 0x01, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01],
            )
            .request(&[0x01, 0x26, 0x06, 0x02], &[0x02, 0x66, 0x06, 0x02, 0x34])
            .build(false);

        assert_eq!(driver.short_address(), Ok(0x1234));
        assert_eq!(driver.ieee_address(), Ok(0x0102_0304_0506_0708));
        assert_eq!(
            driver.short_address(),
            Err(ZnpError::ShortReply {
                opcode: Opcode::new(0x66, 0x06)
            })
        );
        done(driver);
    }

    #[test]
    fn test_af_data_request() {
        let mut driver = Script::new()
            .request(
                &[
                    0x0d, 0x24, 0x01, 0x34, 0x12, 0x01, 0x01, 0xb0, 0xfe, 0x01, 0x00, 0x04, 0x03,
                    0xaa, 0xbb, 0xcc,
                ],
                &[0x01, 0x64, 0x01, 0x00],
            )
            .build(false);

        assert_eq!(driver.af_data_request(0x1234, &[0xaa, 0xbb, 0xcc]), Ok(3));
        done(driver);
    }

    #[test]
    fn test_gpio_and_tx_power_return_reply_value() {
        let mut driver = Script::new()
            .request(&[0x02, 0x21, 0x0e, 0x05, 0x0f], &[0x01, 0x61, 0x0e, 0x05])
            .request(&[0x01, 0x21, 0x14, 0x13], &[0x01, 0x61, 0x14, 0x04])
            .build(false);

        assert_eq!(driver.gpio_read(0x0f), Ok(0x05));
        assert_eq!(driver.set_tx_power(19), Ok(4));
        done(driver);
    }

    #[test]
    fn test_power_up_reads_reset_indication() {
        let mut script = Script::new();
        script.reset.push(PinTransaction::set(PinState::High));
        script.mrdy.push(PinTransaction::set(PinState::High));
        let mut driver = script.unsolicited(&RESET_IND).build(true);

        assert_eq!(driver.state, DeviceState::PoweredOff);
        let indication = driver.power_up().unwrap().unwrap();
        assert_eq!(indication.reason, ResetReason::Watchdog);
        assert_eq!(driver.state, DeviceState::Ready);
        assert!(!driver.new_data());
        done(driver);
    }

    #[test]
    fn test_power_up_tolerates_silence() {
        let mut script = Script::new();
        script.mrdy.push(PinTransaction::set(PinState::High));
        let mut driver = script.idle().build(false);

        assert_eq!(driver.power_up(), Ok(None));
        assert_eq!(driver.state, DeviceState::Ready);
        done(driver);
    }

    #[test]
    fn test_hard_reset_pulses_pin() {
        let mut script = Script::new();
        script.reset.push(PinTransaction::set(PinState::Low));
        script.reset.push(PinTransaction::set(PinState::High));
        let mut driver = script.unsolicited(&RESET_IND).build(true);

        assert!(driver.hard_reset().unwrap().is_some());
        done(driver);
    }

    #[test]
    fn test_hard_reset_without_pin() {
        let mut driver = Script::new().build(false);
        assert_eq!(driver.hard_reset(), Err(ZnpError::MissingResetPin));
        done(driver);
    }

    #[test]
    fn test_commission_writes_plan_in_order() {
        let plan = DeviceConfig::default().commission_plan().unwrap();
        let mut script = Script::new();
        let _ = script
            .request(&[0x03, 0x26, 0x05, 0x03, 0x01, 0x03], &WRITE_OK)
            .sys_reset()
            .request(&[0x03, 0x26, 0x05, 0x03, 0x01, 0x00], &WRITE_OK)
            .request(&[0x03, 0x26, 0x05, 0x87, 0x01, 0x00], &WRITE_OK)
            .request(&[0x04, 0x26, 0x05, 0x83, 0x02, 0xa1, 0x00], &WRITE_OK)
            .request(
                &[0x06, 0x26, 0x05, 0x84, 0x04, 0x00, 0x08, 0x00, 0x00],
                &WRITE_OK,
            );
        for step in &plan[6..plan.len() - 2] {
            match step {
                CommissionStep::Write(parameter) => {
                    let _ = script.request(&frame_of(&parameter.command()), &WRITE_OK);
                }
                other => panic!("unexpected step {:?}", other),
            }
        }
        let mut driver = script
            .request(&[0x01, 0x21, 0x14, 0x04], &[0x01, 0x61, 0x14, 0x04])
            .sys_reset()
            .build(false);

        assert!(driver.config_mut().is_ok());
        assert_eq!(driver.commission(), Ok(()));
        assert_eq!(driver.config_mut().map(|_| ()), Err(ZnpError::ConfigLocked));
        assert_eq!(driver.config().pan_id(), 0x00a1);
        done(driver);
    }

    #[test]
    fn test_commission_stops_at_first_failure() {
        let clear = [0x03, 0x26, 0x05, 0x03, 0x01, 0x03];
        let mut driver = Script::new()
            .request(&clear, &[0x01, 0x66, 0x05, 0x02])
            .build(false);

        assert_eq!(
            driver.commission(),
            Err(ZnpError::CommandFailed {
                opcode: ZB_WRITE_CONFIGURATION,
                status: 0x02
            })
        );
        assert!(driver.config_mut().is_ok());
        done(driver);
    }

    #[test]
    fn test_commission_requires_reset_announcement() {
        let clear = [0x03, 0x26, 0x05, 0x03, 0x01, 0x03];
        let mut driver = Script::new()
            .request(&clear, &WRITE_OK)
            .request(&[0x01, 0x41, 0x00, 0x00], &[])
            .idle()
            .build(false);

        assert_eq!(driver.commission(), Err(ZnpError::ResetTimeout));
        done(driver);
    }

    #[test]
    fn test_startup_stops_at_coordinator_state() {
        let mut driver = Script::new()
            .request(&[0x02, 0x25, 0x40, 0x00, 0x00], &[0x01, 0x65, 0x40, 0x01])
            .unsolicited(&[0x01, 0x45, 0xc0, 0x08])
            .unsolicited(&[0x01, 0x45, 0xc0, 0x09])
            .build(false);

        assert_eq!(
            driver.startup_from_app(),
            Ok(Some(NetworkState::Coordinator))
        );
        assert_eq!(driver.dispatcher.overruns, 0);
        done(driver);
    }

    #[test]
    fn test_startup_times_out_without_terminal_state() {
        let mut driver = Script::new()
            .request(&[0x02, 0x25, 0x40, 0x00, 0x00], &[0x01, 0x65, 0x40, 0x00])
            .unsolicited(&[0x01, 0x45, 0xc0, 0x08])
            .build(false);
        driver.timing.startup_timeout_ms = 0;

        assert_eq!(driver.startup_from_app(), Ok(None));
        assert!(!driver.new_data());
        done(driver);
    }
}
