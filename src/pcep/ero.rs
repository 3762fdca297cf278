//! SR-ERO / SR-RRO sub-objects (RFC 8664 4.3)
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |L|   Type=36   |     Length    |  NT   |     Flags     |F|S|C|M|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         SID (optional)                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! //                   NAI (variable, optional)                  //
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use std::fmt;
use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::header::{ObjectClass, ObjectHeader};
use super::{ensure_len, PcepError};
use crate::utils::{bool_to_bit, read_bits, uint_to_bool};

pub const SR_SUBOBJECT_TYPE: u8 = 36;
const MAX_MPLS_LABEL: u32 = 0xf_ffff;

/// NAI type carried in the NT field
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Absent,
    Ipv4Node,
    Ipv6Node,
    Ipv4Adjacency,
    Ipv6Adjacency,
    UnnumberedAdjacency,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Result<Self, PcepError> {
        use NodeType::*;
        match value {
            0 => Ok(Absent),
            1 => Ok(Ipv4Node),
            2 => Ok(Ipv6Node),
            3 => Ok(Ipv4Adjacency),
            4 => Ok(Ipv6Adjacency),
            5 => Ok(UnnumberedAdjacency),
            other => Err(PcepError::BadSubobject(format!("unknown NT {}", other))),
        }
    }

    pub fn as_u8(self) -> u8 {
        use NodeType::*;
        match self {
            Absent => 0,
            Ipv4Node => 1,
            Ipv6Node => 2,
            Ipv4Adjacency => 3,
            Ipv6Adjacency => 4,
            UnnumberedAdjacency => 5,
        }
    }
}

/// Node or adjacency identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nai {
    Absent,
    Ipv4Node(Ipv4Addr),
    Ipv4Adjacency { local: Ipv4Addr, remote: Ipv4Addr },
}

impl Nai {
    fn node_type(&self) -> NodeType {
        match self {
            Nai::Absent => NodeType::Absent,
            Nai::Ipv4Node(_) => NodeType::Ipv4Node,
            Nai::Ipv4Adjacency { .. } => NodeType::Ipv4Adjacency,
        }
    }

    fn decode(node_type: NodeType, data: &[u8]) -> Result<Self, PcepError> {
        match node_type {
            NodeType::Absent => Ok(Nai::Absent),
            NodeType::Ipv4Node => {
                ensure_len(data, 4)?;
                Ok(Nai::Ipv4Node(Ipv4Addr::new(data[0], data[1], data[2], data[3])))
            }
            NodeType::Ipv4Adjacency => {
                ensure_len(data, 8)?;
                Ok(Nai::Ipv4Adjacency {
                    local: Ipv4Addr::new(data[0], data[1], data[2], data[3]),
                    remote: Ipv4Addr::new(data[4], data[5], data[6], data[7]),
                })
            }
            other => Err(PcepError::Unimplemented(format!("NAI type {:?}", other))),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            Nai::Absent => (),
            Nai::Ipv4Node(addr) => buf.put_slice(&addr.octets()),
            Nai::Ipv4Adjacency { local, remote } => {
                buf.put_slice(&local.octets());
                buf.put_slice(&remote.octets());
            }
        }
    }
}

impl fmt::Display for Nai {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Nai::Absent => write!(f, "-"),
            Nai::Ipv4Node(addr) => write!(f, "{}", addr),
            Nai::Ipv4Adjacency { local, remote } => write!(f, "{}->{}", local, remote),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrEroSubobject {
    pub loose: bool,
    pub node_type: NodeType,
    /// SID is an MPLS label (20 bits, shifted into the top of the SID field)
    pub m_flag: bool,
    /// SID is a full label stack entry (TC, S, TTL are set by the PCE)
    pub c_flag: bool,
    pub no_sid: bool,
    pub no_nai: bool,
    pub sid: u32,
    pub nai: Nai,
}

impl SrEroSubobject {
    /// Node segment with an IPv4 node NAI and an MPLS label SID
    pub fn ipv4_node(sid: u32, node: Ipv4Addr) -> Self {
        Self {
            loose: false,
            node_type: NodeType::Ipv4Node,
            m_flag: true,
            c_flag: false,
            no_sid: false,
            no_nai: false,
            sid,
            nai: Nai::Ipv4Node(node),
        }
    }

    /// Adjacency segment with local/remote interface addresses and an MPLS label SID
    pub fn ipv4_adjacency(sid: u32, local: Ipv4Addr, remote: Ipv4Addr) -> Self {
        Self {
            loose: false,
            node_type: NodeType::Ipv4Adjacency,
            m_flag: true,
            c_flag: false,
            no_sid: false,
            no_nai: false,
            sid,
            nai: Nai::Ipv4Adjacency { local, remote },
        }
    }

    pub fn validate(&self) -> Result<(), PcepError> {
        if self.no_nai && self.node_type != NodeType::Absent {
            return Err(PcepError::BadSubobject(
                "F flag is set but NT is not zero".to_string(),
            ));
        }
        if !self.no_nai && self.node_type == NodeType::Absent {
            return Err(PcepError::BadSubobject(
                "F flag is not set but NT is zero".to_string(),
            ));
        }
        if self.no_sid && (self.m_flag || self.c_flag) {
            return Err(PcepError::BadSubobject(
                "S flag is set, M and C flags must be zero".to_string(),
            ));
        }
        if self.no_sid && self.no_nai {
            return Err(PcepError::BadSubobject(
                "S and F flags must not both be set".to_string(),
            ));
        }
        if !self.m_flag && self.c_flag {
            return Err(PcepError::BadSubobject(
                "C flag requires the M flag".to_string(),
            ));
        }
        match self.node_type {
            NodeType::Ipv6Node | NodeType::Ipv6Adjacency | NodeType::UnnumberedAdjacency => {
                return Err(PcepError::Unimplemented(format!(
                    "NAI type {:?}",
                    self.node_type
                )));
            }
            _ => (),
        }
        if self.nai.node_type() != self.node_type {
            return Err(PcepError::BadSubobject(format!(
                "NT {:?} does not match NAI {}",
                self.node_type, self.nai
            )));
        }
        if self.m_flag && !self.no_sid && self.sid > MAX_MPLS_LABEL {
            return Err(PcepError::InvalidField(format!(
                "SID {} is not a valid MPLS label",
                self.sid
            )));
        }
        Ok(())
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), PcepError> {
        self.validate()?;
        let mut body = BytesMut::with_capacity(16);
        if !self.no_sid {
            let sid = if self.m_flag { self.sid << 12 } else { self.sid };
            body.put_u32(sid);
        }
        self.nai.encode(&mut body);
        let flags = bool_to_bit(self.no_nai, 3)
            | bool_to_bit(self.no_sid, 2)
            | bool_to_bit(self.c_flag, 1)
            | bool_to_bit(self.m_flag, 0);
        buf.put_u8(SR_SUBOBJECT_TYPE | bool_to_bit(self.loose, 7));
        buf.put_u8((4 + body.len()) as u8);
        buf.put_u8(self.node_type.as_u8() << 4);
        buf.put_u8(flags);
        buf.put_slice(&body);
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<Self, PcepError> {
        ensure_len(data, 4)?;
        let node_type = NodeType::from_u8(data[2] >> 4)?;
        let flags = data[3];
        let mut subobject = Self {
            loose: uint_to_bool(read_bits(data[0], 7))?,
            node_type,
            m_flag: uint_to_bool(read_bits(flags, 0))?,
            c_flag: uint_to_bool(read_bits(flags, 1))?,
            no_sid: uint_to_bool(read_bits(flags, 2))?,
            no_nai: uint_to_bool(read_bits(flags, 3))?,
            sid: 0,
            nai: Nai::Absent,
        };
        let mut offset = 4;
        if !subobject.no_sid {
            ensure_len(data, 8)?;
            let sid = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
            subobject.sid = if subobject.m_flag { sid >> 12 } else { sid };
            offset = 8;
        }
        if !subobject.no_nai {
            subobject.nai = Nai::decode(node_type, &data[offset..])?;
        }
        Ok(subobject)
    }
}

/// Walk a run of SR sub-objects, each one advances by its own length field
pub fn decode_subobjects(body: &[u8]) -> Result<Vec<SrEroSubobject>, PcepError> {
    let mut subobjects = Vec::new();
    let mut offset = 0usize;
    while body.len() - offset >= 4 {
        let kind = body[offset] & 0x7f;
        if kind != SR_SUBOBJECT_TYPE {
            return Err(PcepError::BadSubobject(format!(
                "sub-object type {} is not SR",
                kind
            )));
        }
        let length = usize::from(body[offset + 1]);
        if length < 4 || offset + length > body.len() {
            return Err(PcepError::BadSubobject(format!(
                "sub-object length {} is out of bounds",
                length
            )));
        }
        subobjects.push(SrEroSubobject::decode(&body[offset..offset + length])?);
        offset += length;
    }
    Ok(subobjects)
}

/// ERO object from a list of SR sub-objects. Nothing is written if any sub-object is invalid
pub fn encode_ero(subobjects: &[SrEroSubobject], buf: &mut BytesMut) -> Result<(), PcepError> {
    let mut body = BytesMut::with_capacity(subobjects.len() * 16);
    for subobject in subobjects {
        subobject.encode(&mut body)?;
    }
    let mut header = ObjectHeader::new(ObjectClass::Ero, 1, body.len());
    header.processing = true;
    header.encode(buf);
    buf.put_slice(&body);
    Ok(())
}
