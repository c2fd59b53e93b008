//! Constants used across the ZNP SPI protocol implementation.
//!
//! This module defines the protocol-wide constants used for buffer sizing,
//! frame header layout, command identifiers and non-volatile (NV) item ids.
//!
//! The values follow the Z-Stack Monitor and Test (MT) API as exposed by the
//! CC2530 network processor firmware.
//!
//! ## Key Concepts
//!
//! - **Frame header**: every MT frame starts with `[len, cmd0, cmd1]`.
//! - **Frame type**: the top three bits of `cmd0` (POLL, SREQ, AREQ, SRSP).
//! - **Subsystem**: the low five bits of `cmd0` (SYS, AF, ZDO, SAPI, ...).
//! - **Receive buffer**: a single 64-byte buffer holds the last inbound frame.
//! - **NV items**: configuration ids written through `ZB_WRITE_CONFIGURATION`.

use crate::frame::Opcode;

/// Length (in bytes) of the fixed MT frame header: length, `cmd0`, `cmd1`.
pub const ZNP_HEADER_LEN: usize = 3;

/// Capacity (in bytes) of the receive buffer, header included.
pub const ZNP_RX_BUF_LEN: usize = 64;

/// Largest payload that fits in the receive buffer after the header.
pub const ZNP_MAX_RX_PAYLOAD_LEN: usize = ZNP_RX_BUF_LEN - ZNP_HEADER_LEN;

/// Maximum payload (in bytes) of an outgoing MT frame.
pub const ZNP_MAX_PAYLOAD_LEN: usize = 250;

/// Maximum size (in bytes) of a full outgoing frame, header included.
pub const ZNP_MAX_FRAME_LEN: usize = ZNP_MAX_PAYLOAD_LEN + ZNP_HEADER_LEN;

/// The frame clocked out to collect a queued AREQ: length 0, `cmd0` 0, `cmd1` 0.
pub const ZNP_POLL_FRAME: [u8; ZNP_HEADER_LEN] = [0x00, 0x00, 0x00];

/// SPI clock expected by the network processor.
pub const ZNP_SPI_FREQUENCY_HZ: u32 = 2_000_000;

/// SPI mode expected by the network processor (CPOL = 0, CPHA = 0, MSB first).
pub const ZNP_SPI_MODE: embedded_hal::spi::Mode = embedded_hal::spi::MODE_0;

/// Mask selecting the frame type bits of `cmd0`.
pub const MT_TYPE_MASK: u8 = 0xe0;
/// Mask selecting the subsystem bits of `cmd0`.
pub const MT_SUBSYSTEM_MASK: u8 = 0x1f;

/// Frame type: POLL, sent by the host to collect a queued AREQ.
pub const MT_TYPE_POLL: u8 = 0x00;
/// Frame type: synchronous request.
pub const MT_TYPE_SREQ: u8 = 0x20;
/// Frame type: asynchronous request (unsolicited when sent by the device).
pub const MT_TYPE_AREQ: u8 = 0x40;
/// Frame type: synchronous response.
pub const MT_TYPE_SRSP: u8 = 0x60;

/// Subsystem: system interface.
pub const MT_SUBSYSTEM_SYS: u8 = 0x01;
/// Subsystem: application framework.
pub const MT_SUBSYSTEM_AF: u8 = 0x04;
/// Subsystem: Zigbee device objects.
pub const MT_SUBSYSTEM_ZDO: u8 = 0x05;
/// Subsystem: simple API.
pub const MT_SUBSYSTEM_SAPI: u8 = 0x06;

/// `SYS_RESET_REQ` (AREQ).
pub const SYS_RESET_REQ: Opcode = Opcode::new(0x41, 0x00);
/// `SYS_RESET_IND` (AREQ from the device once it has restarted).
pub const SYS_RESET_IND: Opcode = Opcode::new(0x41, 0x80);
/// `SYS_GPIO` (SREQ).
pub const SYS_GPIO: Opcode = Opcode::new(0x21, 0x0e);
/// `SYS_SET_TX_POWER` (SREQ).
pub const SYS_SET_TX_POWER: Opcode = Opcode::new(0x21, 0x14);
/// `AF_REGISTER` (SREQ).
pub const AF_REGISTER: Opcode = Opcode::new(0x24, 0x00);
/// `AF_DATA_REQUEST` (SREQ).
pub const AF_DATA_REQUEST: Opcode = Opcode::new(0x24, 0x01);
/// `AF_DATA_REQUEST_EXT` (SREQ).
pub const AF_DATA_REQUEST_EXT: Opcode = Opcode::new(0x24, 0x02);
/// `AF_INCOMING_MSG` (AREQ carrying application data).
pub const AF_INCOMING_MSG: Opcode = Opcode::new(0x44, 0x81);
/// `ZDO_NODE_DESC_REQ` (SREQ).
pub const ZDO_NODE_DESC_REQ: Opcode = Opcode::new(0x25, 0x02);
/// `ZDO_END_DEVICE_BIND_REQ` (SREQ).
pub const ZDO_END_DEVICE_BIND_REQ: Opcode = Opcode::new(0x25, 0x20);
/// `ZDO_MGMT_LEAVE_REQ` (SREQ).
pub const ZDO_MGMT_LEAVE_REQ: Opcode = Opcode::new(0x25, 0x34);
/// `ZDO_MGMT_PERMIT_JOIN_REQ` (SREQ).
pub const ZDO_MGMT_PERMIT_JOIN_REQ: Opcode = Opcode::new(0x25, 0x36);
/// `ZDO_STARTUP_FROM_APP` (SREQ).
pub const ZDO_STARTUP_FROM_APP: Opcode = Opcode::new(0x25, 0x40);
/// `ZDO_STATE_CHANGE_IND` (AREQ).
pub const ZDO_STATE_CHANGE_IND: Opcode = Opcode::new(0x45, 0xc0);
/// `ZB_WRITE_CONFIGURATION` (SREQ).
pub const ZB_WRITE_CONFIGURATION: Opcode = Opcode::new(0x26, 0x05);
/// `ZB_GET_DEVICE_INFO` (SREQ).
pub const ZB_GET_DEVICE_INFO: Opcode = Opcode::new(0x26, 0x06);

/// NV id: `ZCD_NV_STARTUP_OPTION`.
pub const ZCD_NV_STARTUP_OPTION: u8 = 0x03;
/// NV id: `ZCD_NV_QUEUED_POLL_RATE`.
pub const ZCD_NV_QUEUED_POLL_RATE: u8 = 0x25;
/// NV id: `ZCD_NV_RESPONSE_POLL_RATE`.
pub const ZCD_NV_RESPONSE_POLL_RATE: u8 = 0x26;
/// NV id: `ZCD_NV_REJOIN_POLL_RATE`.
pub const ZCD_NV_REJOIN_POLL_RATE: u8 = 0x27;
/// NV id: `ZCD_NV_POLL_FAILURE_RETRIES`.
pub const ZCD_NV_POLL_FAILURE_RETRIES: u8 = 0x29;
/// NV id: `ZCD_NV_POLL_RATE`.
pub const ZCD_NV_POLL_RATE: u8 = 0x35;
/// NV id: `ZCD_NV_PRECFGKEY`.
pub const ZCD_NV_PRECFGKEY: u8 = 0x62;
/// NV id: `ZCD_NV_PRECFGKEYS_ENABLE`.
pub const ZCD_NV_PRECFGKEYS_ENABLE: u8 = 0x63;
/// NV id: `ZCD_NV_PANID`.
pub const ZCD_NV_PANID: u8 = 0x83;
/// NV id: `ZCD_NV_CHANLIST`.
pub const ZCD_NV_CHANLIST: u8 = 0x84;
/// NV id: `ZCD_NV_LOGICAL_TYPE`.
pub const ZCD_NV_LOGICAL_TYPE: u8 = 0x87;
/// NV id: `ZCD_NV_ZDO_DIRECT_CB`.
pub const ZCD_NV_ZDO_DIRECT_CB: u8 = 0x8f;

/// `ZCD_NV_STARTUP_OPTION` value: keep the network state stored in NV.
pub const STARTUP_OPTION_KEEP: u8 = 0x00;
/// `ZCD_NV_STARTUP_OPTION` value: clear the network state and configuration.
pub const STARTUP_OPTION_CLEAR: u8 = 0x03;

/// Channel mask selecting every 2.4 GHz channel (11 to 26).
pub const CHANNEL_MASK_ALL: u32 = 0x07ff_f800;

/// Profile id used for endpoint registration and binding.
pub const DEFAULT_PROFILE_ID: u16 = 0x0504;

/// Cluster id used for endpoint registration, binding and data requests.
pub const DEFAULT_CLUSTER_ID: u16 = 0xfeb0;

/// Length of a pre-configured network key.
pub const PRECFG_KEY_LEN: usize = 16;
