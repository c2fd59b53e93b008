//! Builders for the MT commands the driver issues.
//!
//! Each command is a small struct implementing [`Command`]. Building a
//! command only serializes its fields into a [`CommandDescriptor`]; the
//! [`ZnpDriver`](crate::driver::ZnpDriver) is responsible for sending it.
//!
//! Payload fields are written in the order given by the
//! [`layout`](crate::layout) table, multi-byte values little-endian.

use crate::consts::{
    AF_DATA_REQUEST, AF_DATA_REQUEST_EXT, AF_REGISTER, DEFAULT_CLUSTER_ID, DEFAULT_PROFILE_ID,
    SYS_GPIO, SYS_RESET_REQ, SYS_SET_TX_POWER, ZB_GET_DEVICE_INFO, ZB_WRITE_CONFIGURATION,
    ZDO_END_DEVICE_BIND_REQ, ZDO_MGMT_LEAVE_REQ, ZDO_MGMT_PERMIT_JOIN_REQ, ZDO_NODE_DESC_REQ,
    ZDO_STARTUP_FROM_APP,
};
use crate::error::{Result, ZnpError};
use crate::frame::{CommandDescriptor, Opcode};

/// Cluster list used by [`AfRegister::new`] and [`ZdoEndDeviceBindReq::new`].
pub const DEFAULT_CLUSTERS: &[u16] = &[DEFAULT_CLUSTER_ID];

/// An MT command that can be serialized into a [`CommandDescriptor`].
pub trait Command {
    /// Opcode of the request.
    const OPCODE: Opcode;

    /// Whether the synchronous response leads with an MT status byte.
    ///
    /// Responses such as `ZB_GET_DEVICE_INFO` carry data instead and are not
    /// status-checked.
    const HAS_STATUS: bool = true;

    /// Appends the command fields to `descriptor`.
    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()>;

    /// Builds the descriptor for this command.
    fn descriptor(&self) -> Result<CommandDescriptor> {
        let mut descriptor = CommandDescriptor::new(Self::OPCODE);
        self.write_payload(&mut descriptor)?;
        Ok(descriptor)
    }
}

/// Short and extended address of a node.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PeerAddress {
    /// 16-bit network address.
    pub short: u16,
    /// 64-bit IEEE address.
    pub extended: u64,
}

/// Destination address mode of `AF_DATA_REQUEST_EXT`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum AddrMode {
    /// Look the destination up in the binding table.
    NotPresent = 0x00,
    /// Group address.
    Group = 0x01,
    /// 16-bit short address.
    Addr16 = 0x02,
    /// 64-bit IEEE address.
    Addr64 = 0x03,
    /// Broadcast.
    Broadcast = 0x0f,
}

/// `SYS_RESET_REQ`: watchdog reset of the network processor.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub struct SysResetReq;

impl Command for SysResetReq {
    const OPCODE: Opcode = SYS_RESET_REQ;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u8(0x00)
    }
}

/// `SYS_SET_TX_POWER`: sets the radio output power in dBm.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct SysSetTxPower {
    /// Requested power in dBm.
    pub dbm: u8,
}

impl Command for SysSetTxPower {
    const OPCODE: Opcode = SYS_SET_TX_POWER;
    const HAS_STATUS: bool = false;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u8(self.dbm)
    }
}

/// GPIO operation carried by `SYS_GPIO`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum GpioOp {
    /// A set bit makes the pin an output.
    SetDirection = 0,
    /// A set bit puts the input in tri-state, otherwise pull-up/pull-down.
    SetInputMode = 1,
    /// A set bit drives the pin high.
    Set = 2,
    /// A set bit drives the pin low.
    Clear = 3,
    /// A set bit toggles the pin.
    Toggle = 4,
    /// Reads the pins.
    Read = 5,
}

/// `SYS_GPIO`: configures or accesses the four GPIO pins of the module.
///
/// The low four bits of `mask` select P0.0, P0.1, P0.6 and P1.0.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct SysGpio {
    /// Operation to perform.
    pub op: GpioOp,
    /// Pin mask.
    pub mask: u8,
}

impl Command for SysGpio {
    const OPCODE: Opcode = SYS_GPIO;
    const HAS_STATUS: bool = false;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u8(self.op as u8)?;
        descriptor.push_u8(self.mask & 0x0f)
    }
}

/// `ZB_WRITE_CONFIGURATION`: writes one NV item.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ZbWriteConfiguration<'a> {
    /// NV item id.
    pub id: u8,
    /// Little-endian item value.
    pub value: &'a [u8],
}

impl Command for ZbWriteConfiguration<'_> {
    const OPCODE: Opcode = ZB_WRITE_CONFIGURATION;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        let len = u8::try_from(self.value.len()).map_err(|_| ZnpError::PayloadTooLong {
            len: self.value.len(),
            max: u8::MAX as usize,
        })?;
        descriptor.push_u8(self.id)?;
        descriptor.push_u8(len)?;
        descriptor.push_bytes(self.value)
    }
}

/// Parameter selector of `ZB_GET_DEVICE_INFO`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceInfoParam {
    /// 64-bit IEEE address.
    IeeeAddress = 1,
    /// 16-bit short address.
    ShortAddress = 2,
}

/// `ZB_GET_DEVICE_INFO`: reads a property of the local device.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ZbGetDeviceInfo {
    /// Property to read.
    pub param: DeviceInfoParam,
}

impl Command for ZbGetDeviceInfo {
    const OPCODE: Opcode = ZB_GET_DEVICE_INFO;
    const HAS_STATUS: bool = false;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u8(self.param as u8)
    }
}

/// `ZDO_STARTUP_FROM_APP`: starts the device in the network.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub struct ZdoStartupFromApp {
    /// Delay before starting, in milliseconds.
    pub start_delay: u16,
}

impl Command for ZdoStartupFromApp {
    const OPCODE: Opcode = ZDO_STARTUP_FROM_APP;
    // The reply reports restored (0), new (1) or not started (2) network state.
    const HAS_STATUS: bool = false;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u16(self.start_delay)
    }
}

/// `ZDO_MGMT_PERMIT_JOIN_REQ`: opens or closes the network for joining.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ZdoMgmtPermitJoinReq {
    /// Node the request is sent to.
    pub dst_addr: u16,
    /// Seconds to permit joining; `0xff` keeps it open, `0` closes it.
    pub duration: u8,
    /// Trust center significance.
    pub tc_significance: u8,
}

impl ZdoMgmtPermitJoinReq {
    /// Permits or forbids joining on the local coordinator indefinitely.
    pub const fn local(permit: bool) -> Self {
        Self {
            dst_addr: 0x0000,
            duration: if permit { 0xff } else { 0x00 },
            tc_significance: 0x00,
        }
    }
}

impl Command for ZdoMgmtPermitJoinReq {
    const OPCODE: Opcode = ZDO_MGMT_PERMIT_JOIN_REQ;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u16(self.dst_addr)?;
        descriptor.push_u8(self.duration)?;
        descriptor.push_u8(self.tc_significance)
    }
}

/// `ZDO_MGMT_LEAVE_REQ`: asks a device to leave the network.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ZdoMgmtLeaveReq {
    /// Node the request is sent to.
    pub dst_addr: u16,
    /// IEEE address of the leaving device.
    pub device_addr: u64,
    /// Bit 0: rejoin, bit 1: remove children.
    pub flags: u8,
}

impl Command for ZdoMgmtLeaveReq {
    const OPCODE: Opcode = ZDO_MGMT_LEAVE_REQ;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u16(self.dst_addr)?;
        descriptor.push_u64(self.device_addr)?;
        descriptor.push_u8(self.flags)
    }
}

fn push_clusters(descriptor: &mut CommandDescriptor, clusters: &[u16]) -> Result<()> {
    let count = u8::try_from(clusters.len()).map_err(|_| ZnpError::InvalidParameter {
        parameter: "cluster list",
    })?;
    descriptor.push_u8(count)?;
    for cluster in clusters {
        descriptor.push_u16(*cluster)?;
    }
    Ok(())
}

/// `ZDO_END_DEVICE_BIND_REQ`: binds two devices that send the request
/// within the binding window of the coordinator.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ZdoEndDeviceBindReq<'a> {
    /// Node the request is sent to, normally the coordinator.
    pub dst_addr: u16,
    /// Addresses of the local device.
    pub local: PeerAddress,
    /// Endpoint to bind.
    pub endpoint: u8,
    /// Application profile.
    pub profile_id: u16,
    /// Input clusters.
    pub in_clusters: &'a [u16],
    /// Output clusters.
    pub out_clusters: &'a [u16],
}

impl ZdoEndDeviceBindReq<'static> {
    /// A bind request to the coordinator using the default profile and cluster.
    pub const fn new(local: PeerAddress, endpoint: u8) -> Self {
        Self {
            dst_addr: 0x0000,
            local,
            endpoint,
            profile_id: DEFAULT_PROFILE_ID,
            in_clusters: DEFAULT_CLUSTERS,
            out_clusters: DEFAULT_CLUSTERS,
        }
    }
}

impl Command for ZdoEndDeviceBindReq<'_> {
    const OPCODE: Opcode = ZDO_END_DEVICE_BIND_REQ;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u16(self.dst_addr)?;
        descriptor.push_u16(self.local.short)?;
        descriptor.push_u64(self.local.extended)?;
        descriptor.push_u8(self.endpoint)?;
        descriptor.push_u16(self.profile_id)?;
        push_clusters(descriptor, self.in_clusters)?;
        push_clusters(descriptor, self.out_clusters)
    }
}

/// `ZDO_NODE_DESC_REQ`: requests the node descriptor of a device.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ZdoNodeDescReq {
    /// Node the request is sent to.
    pub dst_addr: u16,
    /// Node whose descriptor is requested.
    pub nwk_addr_of_interest: u16,
}

impl Command for ZdoNodeDescReq {
    const OPCODE: Opcode = ZDO_NODE_DESC_REQ;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u16(self.dst_addr)?;
        descriptor.push_u16(self.nwk_addr_of_interest)
    }
}

/// `AF_REGISTER`: registers an application endpoint.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct AfRegister<'a> {
    /// Endpoint number.
    pub endpoint: u8,
    /// Application profile.
    pub profile_id: u16,
    /// Application device id.
    pub device_id: u16,
    /// Application device version.
    pub device_version: u8,
    /// Latency requirement, 0 for none.
    pub latency: u8,
    /// Input clusters.
    pub in_clusters: &'a [u16],
    /// Output clusters.
    pub out_clusters: &'a [u16],
}

impl AfRegister<'static> {
    /// Registers `endpoint` with the default profile and cluster.
    pub const fn new(endpoint: u8) -> Self {
        Self {
            endpoint,
            profile_id: DEFAULT_PROFILE_ID,
            device_id: 0x0000,
            device_version: 0x01,
            latency: 0x00,
            in_clusters: DEFAULT_CLUSTERS,
            out_clusters: DEFAULT_CLUSTERS,
        }
    }
}

impl Command for AfRegister<'_> {
    const OPCODE: Opcode = AF_REGISTER;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        descriptor.push_u8(self.endpoint)?;
        descriptor.push_u16(self.profile_id)?;
        descriptor.push_u16(self.device_id)?;
        descriptor.push_u8(self.device_version)?;
        descriptor.push_u8(self.latency)?;
        push_clusters(descriptor, self.in_clusters)?;
        push_clusters(descriptor, self.out_clusters)
    }
}

/// `AF_DATA_REQUEST`: sends application data to a short address.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct AfDataRequest<'a> {
    /// Destination short address.
    pub dst_addr: u16,
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
    /// Application data.
    pub data: &'a [u8],
}

impl Command for AfDataRequest<'_> {
    const OPCODE: Opcode = AF_DATA_REQUEST;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        let len = u8::try_from(self.data.len()).map_err(|_| ZnpError::PayloadTooLong {
            len: self.data.len(),
            max: u8::MAX as usize,
        })?;
        descriptor.push_u16(self.dst_addr)?;
        descriptor.push_u8(self.dst_endpoint)?;
        descriptor.push_u8(self.src_endpoint)?;
        descriptor.push_u16(self.cluster_id)?;
        descriptor.push_u8(self.trans_id)?;
        descriptor.push_u8(self.options)?;
        descriptor.push_u8(self.radius)?;
        descriptor.push_u8(len)?;
        descriptor.push_bytes(self.data)
    }
}

/// `AF_DATA_REQUEST_EXT`: sends application data using an extended address
/// mode, including binding table lookup.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct AfDataRequestExt<'a> {
    /// How `dst_addr` is interpreted.
    pub addr_mode: AddrMode,
    /// Destination address; short addresses use the low 16 bits.
    pub dst_addr: u64,
    /// Destination endpoint.
    pub dst_endpoint: u8,
    /// Destination PAN id.
    pub dst_pan_id: u16,
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
    /// Application data.
    pub data: &'a [u8],
}

impl Command for AfDataRequestExt<'_> {
    const OPCODE: Opcode = AF_DATA_REQUEST_EXT;

    fn write_payload(&self, descriptor: &mut CommandDescriptor) -> Result<()> {
        let len = u16::try_from(self.data.len()).map_err(|_| ZnpError::PayloadTooLong {
            len: self.data.len(),
            max: u16::MAX as usize,
        })?;
        descriptor.push_u8(self.addr_mode as u8)?;
        descriptor.push_u64(self.dst_addr)?;
        descriptor.push_u8(self.dst_endpoint)?;
        descriptor.push_u16(self.dst_pan_id)?;
        descriptor.push_u8(self.src_endpoint)?;
        descriptor.push_u16(self.cluster_id)?;
        descriptor.push_u8(self.trans_id)?;
        descriptor.push_u8(self.options)?;
        descriptor.push_u8(self.radius)?;
        descriptor.push_u16(len)?;
        descriptor.push_bytes(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::ZNP_MAX_PAYLOAD_LEN;
    use crate::frame::{Frame, encode};
    use crate::layout::{field, lookup};

    fn fixed_len(opcode: Opcode) -> usize {
        lookup(opcode).unwrap().fixed_len()
    }

    fn frame_of<C: Command>(command: &C) -> Frame {
        encode(&command.descriptor().unwrap())
    }

    fn read_u8(frame: &Frame, name: &str) -> u8 {
        field(frame.header().opcode, name).unwrap().u8(frame.as_bytes()).unwrap()
    }

    fn read_u16(frame: &Frame, name: &str) -> u16 {
        field(frame.header().opcode, name).unwrap().u16(frame.as_bytes()).unwrap()
    }

    fn read_u64(frame: &Frame, name: &str) -> u64 {
        field(frame.header().opcode, name).unwrap().u64(frame.as_bytes()).unwrap()
    }

    fn read_tail<'a>(frame: &'a Frame, name: &str, len: usize) -> &'a [u8] {
        field(frame.header().opcode, name).unwrap().bytes(frame.as_bytes(), len).unwrap()
    }

    #[test]
    fn test_fixed_payloads_match_layouts() {
        let local = PeerAddress {
            short: 0x1234,
            extended: 0x0011_2233_4455_6677,
        };
        let cases = [
            SysResetReq.descriptor().unwrap(),
            SysSetTxPower { dbm: 4 }.descriptor().unwrap(),
            SysGpio {
                op: GpioOp::Read,
                mask: 0x0f,
            }
            .descriptor()
            .unwrap(),
            ZbGetDeviceInfo {
                param: DeviceInfoParam::ShortAddress,
            }
            .descriptor()
            .unwrap(),
            ZdoStartupFromApp::default().descriptor().unwrap(),
            ZdoMgmtPermitJoinReq::local(true).descriptor().unwrap(),
            ZdoMgmtLeaveReq {
                dst_addr: 0,
                device_addr: local.extended,
                flags: 0,
            }
            .descriptor()
            .unwrap(),
            ZdoEndDeviceBindReq::new(local, 1).descriptor().unwrap(),
            ZdoNodeDescReq {
                dst_addr: 0,
                nwk_addr_of_interest: 0x1234,
            }
            .descriptor()
            .unwrap(),
            AfRegister::new(1).descriptor().unwrap(),
        ];
        for descriptor in &cases {
            assert_eq!(
                descriptor.payload().len(),
                fixed_len(descriptor.opcode),
                "{}",
                descriptor.opcode
            );
        }
    }

    #[test]
    fn test_write_configuration_frame() {
        let descriptor = ZbWriteConfiguration {
            id: 0x83,
            value: &[0xa1, 0x00],
        }
        .descriptor()
        .unwrap();
        assert_eq!(
            encode(&descriptor).as_bytes(),
            &[0x04, 0x26, 0x05, 0x83, 0x02, 0xa1, 0x00]
        );
    }

    #[test]
    fn test_permit_join_frames() {
        let open = encode(&ZdoMgmtPermitJoinReq::local(true).descriptor().unwrap());
        assert_eq!(open.as_bytes(), &[0x04, 0x25, 0x36, 0x00, 0x00, 0xff, 0x00]);
        let closed = encode(&ZdoMgmtPermitJoinReq::local(false).descriptor().unwrap());
        assert_eq!(closed.as_bytes(), &[0x04, 0x25, 0x36, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_af_register_frame() {
        let frame = encode(&AfRegister::new(1).descriptor().unwrap());
        assert_eq!(
            frame.as_bytes(),
            &[
                0x0d, 0x24, 0x00, 0x01, 0x04, 0x05, 0x00, 0x00, 0x01, 0x00, 0x01, 0xb0, 0xfe, 0x01,
                0xb0, 0xfe
            ]
        );
    }

    #[test]
    fn test_data_request_length_fields() {
        let request = AfDataRequest {
            dst_addr: 0x1234,
            dst_endpoint: 1,
            src_endpoint: 1,
            cluster_id: DEFAULT_CLUSTER_ID,
            trans_id: 1,
            options: 0,
            radius: 4,
            data: &[0xaa, 0xbb, 0xcc],
        };
        let descriptor = request.descriptor().unwrap();
        assert_eq!(descriptor.payload().len(), fixed_len(AF_DATA_REQUEST) + 3);
        assert_eq!(&descriptor.payload()[..2], &[0x34, 0x12]);
        assert_eq!(descriptor.payload()[9], 3);

        let ext = AfDataRequestExt {
            addr_mode: AddrMode::NotPresent,
            dst_addr: 0,
            dst_endpoint: 1,
            dst_pan_id: 0x00a1,
            src_endpoint: 1,
            cluster_id: DEFAULT_CLUSTER_ID,
            trans_id: 1,
            options: 0,
            radius: 4,
            data: &[0xaa, 0xbb, 0xcc],
        };
        let descriptor = ext.descriptor().unwrap();
        assert_eq!(descriptor.payload().len(), fixed_len(AF_DATA_REQUEST_EXT) + 3);
        assert_eq!(&descriptor.payload()[18..20], &[0x03, 0x00]);
    }

    #[test]
    fn test_oversized_data_is_rejected() {
        let data = [0u8; ZNP_MAX_PAYLOAD_LEN];
        let request = AfDataRequestExt {
            addr_mode: AddrMode::Addr16,
            dst_addr: 0x1234,
            dst_endpoint: 1,
            dst_pan_id: 0x00a1,
            src_endpoint: 1,
            cluster_id: DEFAULT_CLUSTER_ID,
            trans_id: 1,
            options: 0,
            radius: 4,
            data: &data,
        };
        assert!(matches!(
            request.descriptor(),
            Err(ZnpError::PayloadTooLong { .. })
        ));
    }

    #[test]
    fn test_gpio_mask_is_limited_to_four_pins() {
        let descriptor = SysGpio {
            op: GpioOp::Set,
            mask: 0xff,
        }
        .descriptor()
        .unwrap();
        assert_eq!(descriptor.payload(), &[0x02, 0x0f]);
    }

    #[test]
    fn test_builders_follow_layout_offsets() {
        let frame = frame_of(&AfDataRequest {
            dst_addr: 0x1a2b,
            dst_endpoint: 0x0a,
            src_endpoint: 0x0b,
            cluster_id: 0x3c4d,
            trans_id: 0x0c,
            options: 0x0d,
            radius: 0x0e,
            data: &[0xaa, 0xbb],
        });
        assert_eq!(read_u16(&frame, "DstAddr"), 0x1a2b);
        assert_eq!(read_u8(&frame, "DestEndpoint"), 0x0a);
        assert_eq!(read_u8(&frame, "SrcEndpoint"), 0x0b);
        assert_eq!(read_u16(&frame, "ClusterID"), 0x3c4d);
        assert_eq!(read_u8(&frame, "TransID"), 0x0c);
        assert_eq!(read_u8(&frame, "Options"), 0x0d);
        assert_eq!(read_u8(&frame, "Radius"), 0x0e);
        assert_eq!(read_u8(&frame, "Len"), 2);
        assert_eq!(read_tail(&frame, "Data", 2), &[0xaa, 0xbb]);

        let frame = frame_of(&AfDataRequestExt {
            addr_mode: AddrMode::Addr64,
            dst_addr: 0x0102_0304_0506_0708,
            dst_endpoint: 0x0a,
            dst_pan_id: 0x5e6f,
            src_endpoint: 0x0b,
            cluster_id: 0x3c4d,
            trans_id: 0x0c,
            options: 0x0d,
            radius: 0x0e,
            data: &[0xaa, 0xbb],
        });
        assert_eq!(read_u8(&frame, "DstAddrMode"), 0x03);
        assert_eq!(read_u64(&frame, "DstAddr"), 0x0102_0304_0506_0708);
        assert_eq!(read_u8(&frame, "DestEndpoint"), 0x0a);
        assert_eq!(read_u16(&frame, "DstPanID"), 0x5e6f);
        assert_eq!(read_u8(&frame, "SrcEndpoint"), 0x0b);
        assert_eq!(read_u16(&frame, "ClusterId"), 0x3c4d);
        assert_eq!(read_u8(&frame, "TransID"), 0x0c);
        assert_eq!(read_u8(&frame, "Options"), 0x0d);
        assert_eq!(read_u8(&frame, "Radius"), 0x0e);
        assert_eq!(read_u16(&frame, "Len"), 2);
        assert_eq!(read_tail(&frame, "Data", 2), &[0xaa, 0xbb]);

        let frame = frame_of(&AfRegister::new(9));
        assert_eq!(read_u8(&frame, "EndPoint"), 9);
        assert_eq!(read_u16(&frame, "AppProfId"), DEFAULT_PROFILE_ID);
        assert_eq!(read_u16(&frame, "AppDeviceId"), 0);
        assert_eq!(read_u8(&frame, "AppDevVer"), 1);
        assert_eq!(read_u8(&frame, "AppNumInClusters"), 1);
        assert_eq!(read_u16(&frame, "AppInClusterList"), DEFAULT_CLUSTER_ID);
        assert_eq!(read_u8(&frame, "AppNumOutClusters"), 1);
        assert_eq!(read_u16(&frame, "AppOutClusterList"), DEFAULT_CLUSTER_ID);

        let local = PeerAddress {
            short: 0x1234,
            extended: 0x0011_2233_4455_6677,
        };
        let frame = frame_of(&ZdoEndDeviceBindReq::new(local, 7));
        assert_eq!(read_u16(&frame, "DstAddr"), 0x0000);
        assert_eq!(read_u16(&frame, "LocalCoordinator"), 0x1234);
        assert_eq!(read_u64(&frame, "CoordinatorIEEE"), 0x0011_2233_4455_6677);
        assert_eq!(read_u8(&frame, "EndPoint"), 7);
        assert_eq!(read_u16(&frame, "ProfileID"), DEFAULT_PROFILE_ID);
        assert_eq!(read_u8(&frame, "NumInClusters"), 1);
        assert_eq!(read_u16(&frame, "InClusterList"), DEFAULT_CLUSTER_ID);
        assert_eq!(read_u8(&frame, "NumOutClusters"), 1);
        assert_eq!(read_u16(&frame, "OutClusterList"), DEFAULT_CLUSTER_ID);

        let frame = frame_of(&ZdoMgmtLeaveReq {
            dst_addr: 0x1a2b,
            device_addr: 0x0102_0304_0506_0708,
            flags: 0x40,
        });
        assert_eq!(read_u16(&frame, "DstAddr"), 0x1a2b);
        assert_eq!(read_u64(&frame, "DeviceAddr"), 0x0102_0304_0506_0708);
        assert_eq!(read_u8(&frame, "RemoveChildrenRejoin"), 0x40);

        let frame = frame_of(&ZdoNodeDescReq {
            dst_addr: 0x1a2b,
            nwk_addr_of_interest: 0x3c4d,
        });
        assert_eq!(read_u16(&frame, "DstAddr"), 0x1a2b);
        assert_eq!(read_u16(&frame, "NWKAddrOfInterest"), 0x3c4d);

        let frame = frame_of(&ZdoMgmtPermitJoinReq {
            dst_addr: 0x1a2b,
            duration: 0x3c,
            tc_significance: 0x01,
        });
        assert_eq!(read_u16(&frame, "DstAddr"), 0x1a2b);
        assert_eq!(read_u8(&frame, "Duration"), 0x3c);
        assert_eq!(read_u8(&frame, "TCSignificance"), 0x01);

        let frame = frame_of(&ZbWriteConfiguration {
            id: 0x84,
            value: &[0x00, 0x08, 0x00, 0x00],
        });
        assert_eq!(read_u8(&frame, "ConfigId"), 0x84);
        assert_eq!(read_u8(&frame, "Len"), 4);
        assert_eq!(read_tail(&frame, "Value", 4), &[0x00, 0x08, 0x00, 0x00]);

        let frame = frame_of(&SysGpio {
            op: GpioOp::Toggle,
            mask: 0x05,
        });
        assert_eq!(read_u8(&frame, "Operation"), GpioOp::Toggle as u8);
        assert_eq!(read_u8(&frame, "Value"), 0x05);
    }
}
