//! Payload layout table for the MT commands this driver speaks.
//!
//! Each [`Layout`] maps an [`Opcode`] to the ordered list of fields carried in
//! its payload. Offsets are frame-relative, so the first payload field sits at
//! offset 3 directly after `[len, cmd0, cmd1]`. This lets the same offsets be
//! used on the raw receive buffer.
//!
//! Fields whose size depends on a preceding length field use a width of
//! [`TAIL`].

use crate::consts::{
    AF_DATA_REQUEST, AF_DATA_REQUEST_EXT, AF_INCOMING_MSG, AF_REGISTER, SYS_GPIO, SYS_RESET_IND,
    SYS_RESET_REQ, SYS_SET_TX_POWER, ZB_GET_DEVICE_INFO, ZB_WRITE_CONFIGURATION,
    ZDO_END_DEVICE_BIND_REQ, ZDO_MGMT_LEAVE_REQ, ZDO_MGMT_PERMIT_JOIN_REQ, ZDO_NODE_DESC_REQ,
    ZDO_STARTUP_FROM_APP, ZDO_STATE_CHANGE_IND, ZNP_HEADER_LEN,
};
use crate::frame::{Opcode, PayloadReader};

/// Width marking a variable-length field that runs to the end of its length prefix.
pub const TAIL: usize = 0;

/// One named field of a payload layout.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Field {
    /// Field name as used in the MT interface documentation.
    pub name: &'static str,
    /// Frame-relative byte offset.
    pub offset: usize,
    /// Width in bytes, or [`TAIL`].
    pub width: usize,
}

impl Field {
    /// Declares a field.
    pub const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
        }
    }

    /// Returns the field bytes within `frame`, or `None` if the frame is too short.
    ///
    /// A [`TAIL`] field spans `tail_len` bytes.
    pub fn bytes<'a>(&self, frame: &'a [u8], tail_len: usize) -> Option<&'a [u8]> {
        let width = if self.width == TAIL {
            tail_len
        } else {
            self.width
        };
        frame.get(self.offset..self.offset.checked_add(width)?)
    }

    /// Reads a one-byte field.
    pub fn u8(&self, frame: &[u8]) -> Option<u8> {
        PayloadReader::new(self.bytes(frame, 0)?).u8()
    }

    /// Reads a little-endian two-byte field.
    pub fn u16(&self, frame: &[u8]) -> Option<u16> {
        PayloadReader::new(self.bytes(frame, 0)?).u16()
    }

    /// Reads a little-endian four-byte field.
    pub fn u32(&self, frame: &[u8]) -> Option<u32> {
        PayloadReader::new(self.bytes(frame, 0)?).u32()
    }

    /// Reads a little-endian eight-byte field.
    pub fn u64(&self, frame: &[u8]) -> Option<u64> {
        PayloadReader::new(self.bytes(frame, 0)?).u64()
    }
}

/// The payload layout of one MT command.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Layout {
    /// Command name.
    pub name: &'static str,
    /// Command identifier.
    pub opcode: Opcode,
    /// Fields in wire order.
    pub fields: &'static [Field],
}

impl Layout {
    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Payload size of the fixed part of the layout, excluding any [`TAIL`] field.
    pub fn fixed_len(&self) -> usize {
        self.fields.iter().map(|f| f.width).sum()
    }
}

/// Status byte leading most synchronous responses.
pub const STATUS: Field = Field::new("Status", ZNP_HEADER_LEN, 1);

const fn f(name: &'static str, offset: usize, width: usize) -> Field {
    Field::new(name, offset, width)
}

/// Every command layout known to the driver.
pub static LAYOUTS: &[Layout] = &[
    Layout {
        name: "SYS_RESET_REQ",
        opcode: SYS_RESET_REQ,
        fields: &[f("Type", 3, 1)],
    },
    Layout {
        name: "SYS_RESET_IND",
        opcode: SYS_RESET_IND,
        fields: &[
            f("Reason", 3, 1),
            f("TransportRev", 4, 1),
            f("ProductId", 5, 1),
            f("MajorRel", 6, 1),
            f("MinorRel", 7, 1),
            f("HwRev", 8, 1),
        ],
    },
    Layout {
        name: "SYS_GPIO",
        opcode: SYS_GPIO,
        fields: &[f("Operation", 3, 1), f("Value", 4, 1)],
    },
    Layout {
        name: "SYS_GPIO_SRSP",
        opcode: SYS_GPIO.response(),
        fields: &[f("Value", 3, 1)],
    },
    Layout {
        name: "SYS_SET_TX_POWER",
        opcode: SYS_SET_TX_POWER,
        fields: &[f("TxPower", 3, 1)],
    },
    Layout {
        name: "SYS_SET_TX_POWER_SRSP",
        opcode: SYS_SET_TX_POWER.response(),
        fields: &[f("TxPower", 3, 1)],
    },
    Layout {
        name: "ZB_WRITE_CONFIGURATION",
        opcode: ZB_WRITE_CONFIGURATION,
        fields: &[f("ConfigId", 3, 1), f("Len", 4, 1), f("Value", 5, TAIL)],
    },
    Layout {
        name: "ZB_GET_DEVICE_INFO",
        opcode: ZB_GET_DEVICE_INFO,
        fields: &[f("Param", 3, 1)],
    },
    Layout {
        name: "ZB_GET_DEVICE_INFO_SRSP",
        opcode: ZB_GET_DEVICE_INFO.response(),
        fields: &[f("Param", 3, 1), f("Value", 4, 8)],
    },
    Layout {
        name: "ZDO_STARTUP_FROM_APP",
        opcode: ZDO_STARTUP_FROM_APP,
        fields: &[f("StartDelay", 3, 2)],
    },
    Layout {
        name: "ZDO_MGMT_PERMIT_JOIN_REQ",
        opcode: ZDO_MGMT_PERMIT_JOIN_REQ,
        fields: &[
            f("DstAddr", 3, 2),
            f("Duration", 5, 1),
            f("TCSignificance", 6, 1),
        ],
    },
    Layout {
        name: "ZDO_MGMT_LEAVE_REQ",
        opcode: ZDO_MGMT_LEAVE_REQ,
        fields: &[
            f("DstAddr", 3, 2),
            f("DeviceAddr", 5, 8),
            f("RemoveChildrenRejoin", 13, 1),
        ],
    },
    Layout {
        name: "ZDO_END_DEVICE_BIND_REQ",
        opcode: ZDO_END_DEVICE_BIND_REQ,
        fields: &[
            f("DstAddr", 3, 2),
            f("LocalCoordinator", 5, 2),
            f("CoordinatorIEEE", 7, 8),
            f("EndPoint", 15, 1),
            f("ProfileID", 16, 2),
            f("NumInClusters", 18, 1),
            f("InClusterList", 19, 2),
            f("NumOutClusters", 21, 1),
            f("OutClusterList", 22, 2),
        ],
    },
    Layout {
        name: "ZDO_NODE_DESC_REQ",
        opcode: ZDO_NODE_DESC_REQ,
        fields: &[f("DstAddr", 3, 2), f("NWKAddrOfInterest", 5, 2)],
    },
    Layout {
        name: "ZDO_STATE_CHANGE_IND",
        opcode: ZDO_STATE_CHANGE_IND,
        fields: &[f("State", 3, 1)],
    },
    Layout {
        name: "AF_REGISTER",
        opcode: AF_REGISTER,
        fields: &[
            f("EndPoint", 3, 1),
            f("AppProfId", 4, 2),
            f("AppDeviceId", 6, 2),
            f("AppDevVer", 8, 1),
            f("LatencyReq", 9, 1),
            f("AppNumInClusters", 10, 1),
            f("AppInClusterList", 11, 2),
            f("AppNumOutClusters", 13, 1),
            f("AppOutClusterList", 14, 2),
        ],
    },
    Layout {
        name: "AF_DATA_REQUEST",
        opcode: AF_DATA_REQUEST,
        fields: &[
            f("DstAddr", 3, 2),
            f("DestEndpoint", 5, 1),
            f("SrcEndpoint", 6, 1),
            f("ClusterID", 7, 2),
            f("TransID", 9, 1),
            f("Options", 10, 1),
            f("Radius", 11, 1),
            f("Len", 12, 1),
            f("Data", 13, TAIL),
        ],
    },
    Layout {
        name: "AF_DATA_REQUEST_EXT",
        opcode: AF_DATA_REQUEST_EXT,
        fields: &[
            f("DstAddrMode", 3, 1),
            f("DstAddr", 4, 8),
            f("DestEndpoint", 12, 1),
            f("DstPanID", 13, 2),
            f("SrcEndpoint", 15, 1),
            f("ClusterId", 16, 2),
            f("TransID", 18, 1),
            f("Options", 19, 1),
            f("Radius", 20, 1),
            f("Len", 21, 2),
            f("Data", 23, TAIL),
        ],
    },
    Layout {
        name: "AF_INCOMING_MSG",
        opcode: AF_INCOMING_MSG,
        fields: &[
            f("GroupId", 3, 2),
            f("ClusterId", 5, 2),
            f("SrcAddr", 7, 2),
            f("SrcEndpoint", 9, 1),
            f("DstEndpoint", 10, 1),
            f("WasBroadcast", 11, 1),
            f("LinkQuality", 12, 1),
            f("SecurityUse", 13, 1),
            f("TimeStamp", 14, 4),
            f("TransSeqNumber", 18, 1),
            f("Len", 19, 1),
            f("Data", 20, TAIL),
        ],
    },
];

/// Finds the layout declared for `opcode`.
pub fn lookup(opcode: Opcode) -> Option<&'static Layout> {
    LAYOUTS.iter().find(|l| l.opcode == opcode)
}

/// Human readable name for `opcode`, used in log output.
pub fn name_of(opcode: Opcode) -> &'static str {
    lookup(opcode).map_or("UNKNOWN", |l| l.name)
}

/// Looks up a field of a known layout.
///
/// Only used with the static layouts above, where the field is known to exist.
pub(crate) fn field(opcode: Opcode, name: &str) -> Option<&'static Field> {
    lookup(opcode)?.field(name)
}
