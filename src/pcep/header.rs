use std::fmt;

use bytes::{BufMut, BytesMut};

use super::{ensure_len, PcepError};
use crate::utils::{pad_to_block, read_bits};

pub const PCEP_VERSION: u8 = 1;
pub const COMMON_HEADER_LEN: usize = 4;
pub const OBJECT_HEADER_LEN: usize = 4;
const TLV_HEADER_LEN: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    Open,
    Keepalive,
    PcReq,
    PcRep,
    Notify,
    Error,
    Close,
    PcRpt,
    PcUpd,
    PcInitiate,
    Unrecognized(u8),
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        use MessageType::*;
        match value {
            1 => Open,
            2 => Keepalive,
            3 => PcReq,
            4 => PcRep,
            5 => Notify,
            6 => Error,
            7 => Close,
            10 => PcRpt,
            11 => PcUpd,
            12 => PcInitiate,
            other => Unrecognized(other),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        use MessageType::*;
        match kind {
            Open => 1,
            Keepalive => 2,
            PcReq => 3,
            PcRep => 4,
            Notify => 5,
            Error => 6,
            Close => 7,
            PcRpt => 10,
            PcUpd => 11,
            PcInitiate => 12,
            Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use MessageType::*;
        let word = match self {
            Open => "OPEN",
            Keepalive => "KEEPALIVE",
            PcReq => "PCREQ",
            PcRep => "PCREP",
            Notify => "NOTIFY",
            Error => "ERROR",
            Close => "CLOSE",
            PcRpt => "PCRPT",
            PcUpd => "PCUPD",
            PcInitiate => "PCINITIATE",
            Unrecognized(other) => return write!(f, "UNRECOGNIZED({})", other),
        };
        write!(f, "{}", word)
    }
}

/// 4 byte header present on every message
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommonHeader {
    pub version: u8,
    pub flags: u8,
    pub message_type: MessageType,
    /// Total message length, including this header
    pub length: u16,
}

impl CommonHeader {
    pub fn new(message_type: MessageType, length: u16) -> Self {
        Self {
            version: PCEP_VERSION,
            flags: 0,
            message_type,
            length,
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, PcepError> {
        ensure_len(data, COMMON_HEADER_LEN)?;
        let version = data[0] >> 5;
        if version != PCEP_VERSION {
            return Err(PcepError::BadVersion(version));
        }
        Ok(Self {
            version,
            flags: data[0] & 0x1f,
            message_type: MessageType::from(data[1]),
            length: u16::from_be_bytes([data[2], data[3]]),
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.version << 5) | (self.flags & 0x1f));
        buf.put_u8(self.message_type.into());
        buf.put_u16(self.length);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Open,
    Endpoints,
    Bandwidth,
    Metric,
    Ero,
    Rro,
    Lspa,
    Error,
    Close,
    Lsp,
    Srp,
    Unrecognized(u8),
}

impl From<u8> for ObjectClass {
    fn from(value: u8) -> Self {
        use ObjectClass::*;
        match value {
            1 => Open,
            4 => Endpoints,
            5 => Bandwidth,
            6 => Metric,
            7 => Ero,
            8 => Rro,
            9 => Lspa,
            13 => Error,
            15 => Close,
            32 => Lsp,
            33 => Srp,
            other => Unrecognized(other),
        }
    }
}

impl From<ObjectClass> for u8 {
    fn from(class: ObjectClass) -> Self {
        use ObjectClass::*;
        match class {
            Open => 1,
            Endpoints => 4,
            Bandwidth => 5,
            Metric => 6,
            Ero => 7,
            Rro => 8,
            Lspa => 9,
            Error => 13,
            Close => 15,
            Lsp => 32,
            Srp => 33,
            Unrecognized(other) => other,
        }
    }
}

/// 4 byte header in front of every object
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    pub class: ObjectClass,
    pub object_type: u8,
    pub reserved: u8,
    pub processing: bool,
    pub ignore: bool,
    /// Object length, including this header
    pub length: u16,
}

impl ObjectHeader {
    pub fn new(class: ObjectClass, object_type: u8, body_len: usize) -> Self {
        Self {
            class,
            object_type,
            reserved: 0,
            processing: false,
            ignore: false,
            length: (OBJECT_HEADER_LEN + body_len) as u16,
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, PcepError> {
        ensure_len(data, OBJECT_HEADER_LEN)?;
        Ok(Self {
            class: ObjectClass::from(data[0]),
            object_type: data[1] >> 4,
            reserved: (data[1] >> 2) & 0b11,
            processing: read_bits(data[1], 1) == 1,
            ignore: read_bits(data[1], 0) == 1,
            length: u16::from_be_bytes([data[2], data[3]]),
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = (self.object_type << 4) | ((self.reserved & 0b11) << 2);
        if self.processing {
            flags |= 0b10;
        }
        if self.ignore {
            flags |= 0b01;
        }
        buf.put_u8(self.class.into());
        buf.put_u8(flags);
        buf.put_u16(self.length);
    }

    /// Object body that follows this header, checked against the declared length
    pub fn body<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], PcepError> {
        let length = usize::from(self.length);
        if length < OBJECT_HEADER_LEN {
            return Err(PcepError::InvalidField(format!(
                "object length {} is shorter than its header",
                length
            )));
        }
        ensure_len(data, length)?;
        Ok(&data[OBJECT_HEADER_LEN..length])
    }
}

/// Type/Length/Value triple found at the tail of several objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tlv_type: u16,
    pub value: &'a [u8],
}

/// Walk a TLV list, each value is padded to a 4 byte boundary on the wire
pub fn decode_tlvs(data: &[u8]) -> Result<Vec<Tlv<'_>>, PcepError> {
    let mut tlvs = Vec::new();
    let mut offset = 0usize;
    while data.len() - offset >= TLV_HEADER_LEN {
        let tlv_type = u16::from_be_bytes([data[offset], data[offset + 1]]);
        let length = usize::from(u16::from_be_bytes([data[offset + 2], data[offset + 3]]));
        let start = offset + TLV_HEADER_LEN;
        ensure_len(data, start + length)?;
        tlvs.push(Tlv {
            tlv_type,
            value: &data[start..start + length],
        });
        let padded = (length + 3) & !3;
        offset = std::cmp::min(data.len(), start + padded);
    }
    Ok(tlvs)
}

pub fn encode_tlv(buf: &mut BytesMut, tlv_type: u16, value: &[u8]) {
    buf.put_u16(tlv_type);
    buf.put_u16(value.len() as u16);
    buf.put_slice(&pad_to_block(value.to_vec(), 4));
}
