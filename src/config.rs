//! Run-time configuration of the driver and the network processor.
//!
//! Two kinds of settings live here:
//!
//! - [`Timing`]: host-side delays and handshake budgets.
//! - [`DeviceConfig`]: the NV parameters written to the device during
//!   commissioning, plus the defaults used for `AF_DATA_REQUEST(_EXT)`.
//!
//! [`DeviceConfig::commission_plan`] turns the configuration into the ordered
//! list of [`CommissionStep`]s that
//! [`ZnpDriver::commission`](crate::driver::ZnpDriver::commission) executes.

use heapless::Vec;

use crate::commands::{AddrMode, AfDataRequest, AfDataRequestExt, ZbWriteConfiguration};
use crate::consts::{
    CHANNEL_MASK_ALL, DEFAULT_CLUSTER_ID, PRECFG_KEY_LEN, STARTUP_OPTION_CLEAR,
    STARTUP_OPTION_KEEP, ZCD_NV_CHANLIST, ZCD_NV_LOGICAL_TYPE, ZCD_NV_PANID,
    ZCD_NV_POLL_FAILURE_RETRIES, ZCD_NV_POLL_RATE, ZCD_NV_PRECFGKEY, ZCD_NV_PRECFGKEYS_ENABLE,
    ZCD_NV_QUEUED_POLL_RATE, ZCD_NV_REJOIN_POLL_RATE, ZCD_NV_RESPONSE_POLL_RATE,
    ZCD_NV_STARTUP_OPTION, ZCD_NV_ZDO_DIRECT_CB,
};
use crate::error::{Result, ZnpError};

/// Number of steps in a commissioning plan.
pub const COMMISSION_STEPS: usize = 16;

/// Host-side timing of the driver.
///
/// All waits are counted through the [`DelayNs`](embedded_hal::delay::DelayNs)
/// implementation handed to the driver, so the values are approximate lower
/// bounds of wall-clock time.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Timing {
    /// Budget for each SRDY wait of a handshake. `None` waits forever.
    pub handshake_timeout_us: Option<u32>,
    /// Delay between two SRDY samples.
    pub poll_interval_us: u32,
    /// Start-up time of the device after a reset.
    pub reset_delay_ms: u32,
    /// Length of the low pulse on the reset pin.
    pub reset_pulse_ms: u32,
    /// Window in which the device must announce itself after `reset_delay_ms`.
    pub callback_window_ms: u32,
    /// Time allowed for `ZDO_STARTUP_FROM_APP` to reach a terminal state.
    pub startup_timeout_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            handshake_timeout_us: Some(1_000_000),
            poll_interval_us: 10,
            reset_delay_ms: 4_000,
            reset_pulse_ms: 100,
            callback_window_ms: 500,
            startup_timeout_ms: 60_000,
        }
    }
}

/// Radio channel selection.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Channel {
    /// One channel between 11 and 26.
    Single(u8),
    /// Every channel from 11 to 26.
    All,
}

impl Channel {
    /// The `ZCD_NV_CHANLIST` bit mask.
    pub fn mask(&self) -> u32 {
        match self {
            Channel::Single(n) => 1u32.checked_shl(u32::from(*n)).unwrap_or(0),
            Channel::All => CHANNEL_MASK_ALL,
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            Channel::Single(n) => (11..=26).contains(n),
            Channel::All => true,
        }
    }
}

/// Zigbee role of the device.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum LogicalType {
    /// Forms and manages the network.
    Coordinator = 0x00,
    /// Routes traffic for other nodes.
    Router = 0x01,
    /// Leaf node.
    EndDevice = 0x02,
}

/// NV items written during commissioning.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum NvItem {
    /// `ZCD_NV_STARTUP_OPTION`
    StartupOption,
    /// `ZCD_NV_LOGICAL_TYPE`
    LogicalType,
    /// `ZCD_NV_PANID`
    PanId,
    /// `ZCD_NV_CHANLIST`
    ChanList,
    /// `ZCD_NV_POLL_RATE`
    PollRate,
    /// `ZCD_NV_QUEUED_POLL_RATE`
    QueuedPollRate,
    /// `ZCD_NV_RESPONSE_POLL_RATE`
    ResponsePollRate,
    /// `ZCD_NV_REJOIN_POLL_RATE`
    RejoinPollRate,
    /// `ZCD_NV_POLL_FAILURE_RETRIES`
    PollFailureRetries,
    /// `ZCD_NV_ZDO_DIRECT_CB`
    ZdoDirectCb,
    /// `ZCD_NV_PRECFGKEYS_ENABLE`
    PrecfgKeysEnable,
    /// `ZCD_NV_PRECFGKEY`
    PrecfgKey,
}

impl NvItem {
    /// MT configuration id.
    pub const fn id(&self) -> u8 {
        match self {
            NvItem::StartupOption => ZCD_NV_STARTUP_OPTION,
            NvItem::LogicalType => ZCD_NV_LOGICAL_TYPE,
            NvItem::PanId => ZCD_NV_PANID,
            NvItem::ChanList => ZCD_NV_CHANLIST,
            NvItem::PollRate => ZCD_NV_POLL_RATE,
            NvItem::QueuedPollRate => ZCD_NV_QUEUED_POLL_RATE,
            NvItem::ResponsePollRate => ZCD_NV_RESPONSE_POLL_RATE,
            NvItem::RejoinPollRate => ZCD_NV_REJOIN_POLL_RATE,
            NvItem::PollFailureRetries => ZCD_NV_POLL_FAILURE_RETRIES,
            NvItem::ZdoDirectCb => ZCD_NV_ZDO_DIRECT_CB,
            NvItem::PrecfgKeysEnable => ZCD_NV_PRECFGKEYS_ENABLE,
            NvItem::PrecfgKey => ZCD_NV_PRECFGKEY,
        }
    }

    /// Width of the item value in bytes.
    pub const fn width(&self) -> usize {
        match self {
            NvItem::PanId
            | NvItem::PollRate
            | NvItem::QueuedPollRate
            | NvItem::ResponsePollRate
            | NvItem::RejoinPollRate => 2,
            NvItem::ChanList => 4,
            NvItem::PrecfgKey => PRECFG_KEY_LEN,
            _ => 1,
        }
    }
}

/// One NV item and its little-endian value.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct NvParameter {
    /// The item to write.
    pub item: NvItem,
    value: Vec<u8, PRECFG_KEY_LEN>,
}

impl NvParameter {
    /// Creates a parameter from raw little-endian bytes.
    ///
    /// Fails if `value` does not match [`NvItem::width`].
    pub fn new(item: NvItem, value: &[u8]) -> Result<Self> {
        if value.len() != item.width() {
            return Err(ZnpError::InvalidParameter {
                parameter: "nv item width",
            });
        }
        let value = Vec::from_slice(value).map_err(|_| ZnpError::InvalidParameter {
            parameter: "nv item width",
        })?;
        Ok(Self { item, value })
    }

    fn from_u8(item: NvItem, value: u8) -> Result<Self> {
        Self::new(item, &[value])
    }

    fn from_u16(item: NvItem, value: u16) -> Result<Self> {
        Self::new(item, &value.to_le_bytes())
    }

    /// The encoded value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The `ZB_WRITE_CONFIGURATION` command writing this parameter.
    pub fn command(&self) -> ZbWriteConfiguration<'_> {
        ZbWriteConfiguration {
            id: self.item.id(),
            value: &self.value,
        }
    }
}

/// One step of the commissioning sequence.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CommissionStep {
    /// Write an NV item.
    Write(NvParameter),
    /// Set the radio power in dBm.
    SetTxPower(u8),
    /// Soft reset and wait for the reset announcement.
    Reset,
}

/// Defaults for outgoing `AF_DATA_REQUEST` and `AF_DATA_REQUEST_EXT` frames.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct AfConfig {
    /// Destination endpoint.
    pub dst_endpoint: u8,
    /// Source endpoint.
    pub src_endpoint: u8,
    /// Cluster id.
    pub cluster_id: u16,
    /// Transaction id.
    pub trans_id: u8,
    /// Transmit options.
    pub options: u8,
    /// Maximum hop count.
    pub radius: u8,
    /// Destination PAN of extended requests. `None` uses the configured PAN.
    pub dst_pan_id: Option<u16>,
}

impl Default for AfConfig {
    fn default() -> Self {
        Self {
            dst_endpoint: 0x01,
            src_endpoint: 0x01,
            cluster_id: DEFAULT_CLUSTER_ID,
            trans_id: 0x01,
            options: 0x00,
            radius: 0x04,
            dst_pan_id: None,
        }
    }
}

/// NV parameters and AF defaults of the device.
///
/// Fields are private so every value goes through a validating setter.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DeviceConfig {
    logical_type: LogicalType,
    pan_id: u16,
    channel: Channel,
    poll_rate: u16,
    queued_poll_rate: u16,
    response_poll_rate: u16,
    rejoin_poll_rate: u16,
    poll_failure_retries: u8,
    zdo_direct_cb: bool,
    precfg_keys_enable: bool,
    precfg_key: [u8; PRECFG_KEY_LEN],
    tx_power: u8,
    af: AfConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            logical_type: LogicalType::Coordinator,
            pan_id: 0x00a1,
            channel: Channel::Single(11),
            poll_rate: 2000,
            queued_poll_rate: 100,
            response_poll_rate: 100,
            rejoin_poll_rate: 440,
            poll_failure_retries: 0xff,
            zdo_direct_cb: true,
            precfg_keys_enable: true,
            precfg_key: [0x04; PRECFG_KEY_LEN],
            tx_power: 4,
            af: AfConfig::default(),
        }
    }
}

fn check_poll_rate(parameter: &'static str, ms: u16) -> Result<u16> {
    if (1..=65_000).contains(&ms) {
        Ok(ms)
    } else {
        Err(ZnpError::InvalidParameter { parameter })
    }
}

impl DeviceConfig {
    /// Sets the Zigbee role.
    pub fn set_logical_type(&mut self, logical_type: LogicalType) -> &mut Self {
        self.logical_type = logical_type;
        self
    }

    /// Sets the PAN id. Valid ids are `0x0000..=0x3fff`, or `0xffff` to join any PAN.
    pub fn set_pan_id(&mut self, pan_id: u16) -> Result<&mut Self> {
        if pan_id > 0x3fff && pan_id != 0xffff {
            return Err(ZnpError::InvalidParameter { parameter: "pan id" });
        }
        self.pan_id = pan_id;
        Ok(self)
    }

    /// Sets the radio channel.
    pub fn set_channel(&mut self, channel: Channel) -> Result<&mut Self> {
        if !channel.is_valid() {
            return Err(ZnpError::InvalidParameter {
                parameter: "channel",
            });
        }
        self.channel = channel;
        Ok(self)
    }

    /// Sets the parent poll period of sleepy end devices (1 to 65000 ms).
    pub fn set_poll_rate(&mut self, ms: u16) -> Result<&mut Self> {
        self.poll_rate = check_poll_rate("poll rate", ms)?;
        Ok(self)
    }

    /// Sets the poll period used while the parent still has queued data (1 to 65000 ms).
    pub fn set_queued_poll_rate(&mut self, ms: u16) -> Result<&mut Self> {
        self.queued_poll_rate = check_poll_rate("queued poll rate", ms)?;
        Ok(self)
    }

    /// Sets the poll period used to collect acknowledgements (1 to 65000 ms).
    pub fn set_response_poll_rate(&mut self, ms: u16) -> Result<&mut Self> {
        self.response_poll_rate = check_poll_rate("response poll rate", ms)?;
        Ok(self)
    }

    /// Sets the poll period used during trust center rejoin (1 to 65000 ms).
    pub fn set_rejoin_poll_rate(&mut self, ms: u16) -> Result<&mut Self> {
        self.rejoin_poll_rate = check_poll_rate("rejoin poll rate", ms)?;
        Ok(self)
    }

    /// Sets how many failed parent polls an end device tolerates before rejoining.
    pub fn set_poll_failure_retries(&mut self, retries: u8) -> &mut Self {
        self.poll_failure_retries = retries;
        self
    }

    /// Enables ZDO callbacks to the host.
    pub fn set_zdo_direct_cb(&mut self, enable: bool) -> &mut Self {
        self.zdo_direct_cb = enable;
        self
    }

    /// Enables the pre-configured network key.
    pub fn set_precfg_keys_enable(&mut self, enable: bool) -> &mut Self {
        self.precfg_keys_enable = enable;
        self
    }

    /// Sets the pre-configured network key.
    pub fn set_precfg_key(&mut self, key: [u8; PRECFG_KEY_LEN]) -> &mut Self {
        self.precfg_key = key;
        self
    }

    /// Sets the radio output power in dBm.
    pub fn set_tx_power(&mut self, dbm: u8) -> &mut Self {
        self.tx_power = dbm;
        self
    }

    /// Sets the defaults used for AF data requests.
    pub fn set_af(&mut self, af: AfConfig) -> &mut Self {
        self.af = af;
        self
    }

    /// The Zigbee role.
    pub fn logical_type(&self) -> LogicalType {
        self.logical_type
    }

    /// The PAN id.
    pub fn pan_id(&self) -> u16 {
        self.pan_id
    }

    /// The radio channel.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The radio output power in dBm.
    pub fn tx_power(&self) -> u8 {
        self.tx_power
    }

    /// The AF data request defaults.
    pub fn af(&self) -> &AfConfig {
        &self.af
    }

    /// An `AF_DATA_REQUEST` to `dst_addr` using the configured defaults.
    pub fn data_request<'a>(&self, dst_addr: u16, data: &'a [u8]) -> AfDataRequest<'a> {
        AfDataRequest {
            dst_addr,
            dst_endpoint: self.af.dst_endpoint,
            src_endpoint: self.af.src_endpoint,
            cluster_id: self.af.cluster_id,
            trans_id: self.af.trans_id,
            options: self.af.options,
            radius: self.af.radius,
            data,
        }
    }

    /// An `AF_DATA_REQUEST_EXT` using the configured defaults.
    pub fn data_request_ext<'a>(
        &self,
        addr_mode: AddrMode,
        dst_addr: u64,
        data: &'a [u8],
    ) -> AfDataRequestExt<'a> {
        AfDataRequestExt {
            addr_mode,
            dst_addr,
            dst_endpoint: self.af.dst_endpoint,
            dst_pan_id: self.af.dst_pan_id.unwrap_or(self.pan_id),
            src_endpoint: self.af.src_endpoint,
            cluster_id: self.af.cluster_id,
            trans_id: self.af.trans_id,
            options: self.af.options,
            radius: self.af.radius,
            data,
        }
    }

    /// The NV parameters of this configuration, in commissioning order.
    pub fn nv_parameters(&self) -> Result<Vec<NvParameter, 11>> {
        let mut out = Vec::new();
        let params = [
            NvParameter::from_u8(NvItem::LogicalType, self.logical_type as u8)?,
            NvParameter::from_u16(NvItem::PanId, self.pan_id)?,
            NvParameter::new(NvItem::ChanList, &self.channel.mask().to_le_bytes())?,
            NvParameter::from_u16(NvItem::PollRate, self.poll_rate)?,
            NvParameter::from_u16(NvItem::QueuedPollRate, self.queued_poll_rate)?,
            NvParameter::from_u16(NvItem::ResponsePollRate, self.response_poll_rate)?,
            NvParameter::from_u16(NvItem::RejoinPollRate, self.rejoin_poll_rate)?,
            NvParameter::from_u8(NvItem::PollFailureRetries, self.poll_failure_retries)?,
            NvParameter::from_u8(NvItem::ZdoDirectCb, u8::from(self.zdo_direct_cb))?,
            NvParameter::from_u8(NvItem::PrecfgKeysEnable, u8::from(self.precfg_keys_enable))?,
            NvParameter::new(NvItem::PrecfgKey, &self.precfg_key)?,
        ];
        for param in params {
            out.push(param).map_err(|_| ZnpError::InvalidParameter {
                parameter: "nv parameter list",
            })?;
        }
        Ok(out)
    }

    /// The ordered commissioning sequence.
    ///
    /// Clears the NV network state, resets, writes every parameter with the
    /// startup option set to keep, sets the TX power and resets again so the
    /// new values take effect.
    pub fn commission_plan(&self) -> Result<Vec<CommissionStep, COMMISSION_STEPS>> {
        let overflow = |_| ZnpError::InvalidParameter {
            parameter: "commission plan",
        };
        let mut plan = Vec::new();
        plan.push(CommissionStep::Write(NvParameter::from_u8(
            NvItem::StartupOption,
            STARTUP_OPTION_CLEAR,
        )?))
        .map_err(overflow)?;
        plan.push(CommissionStep::Reset).map_err(overflow)?;
        plan.push(CommissionStep::Write(NvParameter::from_u8(
            NvItem::StartupOption,
            STARTUP_OPTION_KEEP,
        )?))
        .map_err(overflow)?;
        for param in self.nv_parameters()? {
            plan.push(CommissionStep::Write(param)).map_err(overflow)?;
        }
        plan.push(CommissionStep::SetTxPower(self.tx_power)).map_err(overflow)?;
        plan.push(CommissionStep::Reset).map_err(overflow)?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::frame::encode;

    fn write_frame(param: &NvParameter) -> Vec<u8, 32> {
        let frame = encode(&param.command().descriptor().unwrap());
        Vec::from_slice(frame.as_bytes()).unwrap()
    }

    #[test]
    fn test_default_pan_and_channel_frames() {
        let params = DeviceConfig::default().nv_parameters().unwrap();
        assert_eq!(
            write_frame(&params[1]).as_slice(),
            &[0x04, 0x26, 0x05, 0x83, 0x02, 0xa1, 0x00]
        );
        assert_eq!(
            write_frame(&params[2]).as_slice(),
            &[0x06, 0x26, 0x05, 0x84, 0x04, 0x00, 0x08, 0x00, 0x00]
        );
        assert_eq!(
            write_frame(&params[3]).as_slice(),
            &[0x04, 0x26, 0x05, 0x35, 0x02, 0xd0, 0x07]
        );
    }

    #[test]
    fn test_setters_write_pan_and_channel_frames() {
        let mut config = DeviceConfig::default();
        let _ = config.set_pan_id(0x1234).unwrap();
        let _ = config.set_channel(Channel::Single(20)).unwrap();
        let _ = config.set_pan_id(0x00a1).unwrap();
        let _ = config.set_channel(Channel::Single(11)).unwrap();

        let params = config.nv_parameters().unwrap();
        assert_eq!(params[1].item, NvItem::PanId);
        assert_eq!(
            write_frame(&params[1]).as_slice(),
            &[0x04, 0x26, 0x05, 0x83, 0x02, 0xa1, 0x00]
        );
        assert_eq!(params[2].item, NvItem::ChanList);
        assert_eq!(
            write_frame(&params[2]).as_slice(),
            &[0x06, 0x26, 0x05, 0x84, 0x04, 0x00, 0x08, 0x00, 0x00]
        );
    }

    #[test]
    fn test_commission_plan_order() {
        let plan = DeviceConfig::default().commission_plan().unwrap();
        assert_eq!(plan.len(), COMMISSION_STEPS);

        let resets: Vec<usize, 4> = plan
            .iter()
            .enumerate()
            .filter(|(_, step)| **step == CommissionStep::Reset)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(resets.as_slice(), &[1, COMMISSION_STEPS - 1]);

        let items: Vec<NvItem, 16> = plan
            .iter()
            .filter_map(|step| match step {
                CommissionStep::Write(param) => Some(param.item),
                _ => None,
            })
            .collect();
        assert_eq!(
            items.as_slice(),
            &[
                NvItem::StartupOption,
                NvItem::StartupOption,
                NvItem::LogicalType,
                NvItem::PanId,
                NvItem::ChanList,
                NvItem::PollRate,
                NvItem::QueuedPollRate,
                NvItem::ResponsePollRate,
                NvItem::RejoinPollRate,
                NvItem::PollFailureRetries,
                NvItem::ZdoDirectCb,
                NvItem::PrecfgKeysEnable,
                NvItem::PrecfgKey,
            ]
        );
        match &plan[0] {
            CommissionStep::Write(param) => assert_eq!(param.value(), &[STARTUP_OPTION_CLEAR]),
            other => panic!("unexpected first step {:?}", other),
        }
        assert_eq!(plan[COMMISSION_STEPS - 2], CommissionStep::SetTxPower(4));
    }

    #[test]
    fn test_setters_validate() {
        let mut config = DeviceConfig::default();
        assert!(config.set_pan_id(0x3fff).is_ok());
        assert!(config.set_pan_id(0xffff).is_ok());
        assert_eq!(
            config.set_pan_id(0x4000).map(|_| ()),
            Err(ZnpError::InvalidParameter { parameter: "pan id" })
        );
        assert_eq!(config.pan_id(), 0xffff);

        assert!(config.set_channel(Channel::Single(26)).is_ok());
        assert!(config.set_channel(Channel::Single(10)).is_err());
        assert!(config.set_channel(Channel::Single(27)).is_err());
        assert_eq!(config.channel(), Channel::Single(26));

        assert!(config.set_poll_rate(0).is_err());
        assert!(config.set_poll_rate(65_001).is_err());
        assert!(config.set_rejoin_poll_rate(65_000).is_ok());
    }

    #[test]
    fn test_channel_masks() {
        assert_eq!(Channel::Single(11).mask(), 0x0000_0800);
        assert_eq!(Channel::Single(26).mask(), 0x0400_0000);
        assert_eq!(Channel::All.mask(), 0x07ff_f800);
    }

    #[test]
    fn test_nv_parameter_width_is_checked() {
        assert!(NvParameter::new(NvItem::PanId, &[0x01]).is_err());
        assert!(NvParameter::new(NvItem::PrecfgKey, &[0x04; PRECFG_KEY_LEN]).is_ok());
    }

    #[test]
    fn test_ext_request_uses_configured_pan() {
        let mut config = DeviceConfig::default();
        let _ = config.set_pan_id(0x1234).unwrap();
        let request = config.data_request_ext(AddrMode::NotPresent, 0, &[1]);
        assert_eq!(request.dst_pan_id, 0x1234);

        let _ = config.set_af(AfConfig {
            dst_pan_id: Some(0x00a1),
            ..AfConfig::default()
        });
        let request = config.data_request_ext(AddrMode::NotPresent, 0, &[1]);
        assert_eq!(request.dst_pan_id, 0x00a1);
        assert_eq!(config.data_request(0x0001, &[1]).radius, 4);
    }
}
