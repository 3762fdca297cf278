use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::ero::{decode_subobjects, SrEroSubobject};
use super::header::{ObjectClass, ObjectHeader};
use super::lsp::LspObject;
use super::lspa::LspaObject;
use super::open::OpenObject;
use super::pcerr::ErrorObject;
use super::srp::SrpObject;
use super::{ensure_len, PcepError};
use crate::utils::read_bits;

/// END-POINTS object, IPv4 flavor (RFC 5440 7.6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointsObject {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl EndpointsObject {
    pub fn decode(header: &ObjectHeader, body: &[u8]) -> Result<Self, PcepError> {
        if header.object_type != 1 {
            return Err(PcepError::Unimplemented(format!(
                "END-POINTS object type {}",
                header.object_type
            )));
        }
        ensure_len(body, 8)?;
        Ok(Self {
            source: Ipv4Addr::new(body[0], body[1], body[2], body[3]),
            destination: Ipv4Addr::new(body[4], body[5], body[6], body[7]),
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        ObjectHeader::new(ObjectClass::Endpoints, 1, 8).encode(buf);
        buf.put_slice(&self.source.octets());
        buf.put_slice(&self.destination.octets());
    }
}

/// BANDWIDTH object (RFC 5440 7.7), bytes per second as an IEEE float
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthObject {
    pub bandwidth: f32,
}

impl BandwidthObject {
    pub fn decode(body: &[u8]) -> Result<Self, PcepError> {
        ensure_len(body, 4)?;
        Ok(Self {
            bandwidth: f32::from_be_bytes([body[0], body[1], body[2], body[3]]),
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        ObjectHeader::new(ObjectClass::Bandwidth, 1, 4).encode(buf);
        buf.put_f32(self.bandwidth);
    }
}

/// METRIC object (RFC 5440 7.8)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricObject {
    pub bound: bool,
    pub computed: bool,
    /// 1 = IGP, 2 = TE, 3 = hop count
    pub metric_type: u8,
    pub value: f32,
}

impl MetricObject {
    pub fn decode(body: &[u8]) -> Result<Self, PcepError> {
        ensure_len(body, 8)?;
        Ok(Self {
            bound: read_bits(body[2], 0) == 1,
            computed: read_bits(body[2], 1) == 1,
            metric_type: body[3],
            value: f32::from_be_bytes([body[4], body[5], body[6], body[7]]),
        })
    }
}

/// CLOSE object (RFC 5440 7.17)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseObject {
    pub flags: u8,
    pub reason: u8,
}

impl CloseObject {
    /// No explanation provided
    pub const REASON_NONE: u8 = 1;
    /// DeadTimer expired
    pub const REASON_DEAD_TIMER: u8 = 2;

    pub fn new(reason: u8) -> Self {
        Self { flags: 0, reason }
    }

    pub fn decode(body: &[u8]) -> Result<Self, PcepError> {
        ensure_len(body, 4)?;
        Ok(Self {
            flags: body[2],
            reason: body[3],
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        ObjectHeader::new(ObjectClass::Close, 1, 4).encode(buf);
        buf.put_u16(0);
        buf.put_u8(self.flags);
        buf.put_u8(self.reason);
    }
}

/// Any object found in a message body
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Open(OpenObject),
    Endpoints(EndpointsObject),
    Bandwidth(BandwidthObject),
    Metric(MetricObject),
    Ero(Vec<SrEroSubobject>),
    Rro(Vec<SrEroSubobject>),
    Lspa(LspaObject),
    Error(ErrorObject),
    Close(CloseObject),
    Lsp(LspObject),
    Srp(SrpObject),
    Unrecognized(ObjectHeader, Vec<u8>),
}

impl Object {
    pub fn decode(header: &ObjectHeader, body: &[u8]) -> Result<Self, PcepError> {
        let object = match header.class {
            ObjectClass::Open => Object::Open(OpenObject::decode(body)?),
            ObjectClass::Endpoints => Object::Endpoints(EndpointsObject::decode(header, body)?),
            ObjectClass::Bandwidth => Object::Bandwidth(BandwidthObject::decode(body)?),
            ObjectClass::Metric => Object::Metric(MetricObject::decode(body)?),
            ObjectClass::Ero => Object::Ero(decode_subobjects(body)?),
            ObjectClass::Rro => Object::Rro(decode_subobjects(body)?),
            ObjectClass::Lspa => Object::Lspa(LspaObject::decode(body)?),
            ObjectClass::Error => Object::Error(ErrorObject::decode(body)?),
            ObjectClass::Close => Object::Close(CloseObject::decode(body)?),
            ObjectClass::Lsp => Object::Lsp(LspObject::decode(body)?),
            ObjectClass::Srp => Object::Srp(SrpObject::decode(body)?),
            ObjectClass::Unrecognized(_) => Object::Unrecognized(*header, body.to_vec()),
        };
        Ok(object)
    }
}

/// Walk every object in a message body, advancing by each declared object length
pub fn decode_objects(data: &[u8]) -> Result<Vec<(ObjectHeader, Object)>, PcepError> {
    let mut objects = Vec::new();
    let mut offset = 0usize;
    while offset < data.len() {
        let remaining = &data[offset..];
        let header = ObjectHeader::decode(remaining)?;
        let body = header.body(remaining)?;
        objects.push((header, Object::decode(&header, body)?));
        offset += usize::from(header.length);
    }
    Ok(objects)
}
