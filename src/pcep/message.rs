use std::fmt;

use bytes::{BufMut, BytesMut};

use super::ero::{encode_ero, SrEroSubobject};
use super::header::{CommonHeader, MessageType, ObjectHeader, COMMON_HEADER_LEN};
use super::lsp::LspObject;
use super::lspa::LspaObject;
use super::objects::{decode_objects, BandwidthObject, CloseObject, EndpointsObject, Object};
use super::open::OpenObject;
use super::srp::SrpObject;
use super::PcepError;

/// PCInitiate contents (RFC 8281 5.1), objects are emitted in field order
#[derive(Debug, Clone, PartialEq)]
pub struct InitiateRequest {
    pub srp: SrpObject,
    pub lsp: LspObject,
    pub endpoints: Option<EndpointsObject>,
    pub ero: Option<Vec<SrEroSubobject>>,
    pub lspa: Option<LspaObject>,
    /// Kept when decoding, the controller does not send one
    pub bandwidth: Option<BandwidthObject>,
}

impl InitiateRequest {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), PcepError> {
        self.srp.encode(buf);
        self.lsp.encode(buf)?;
        if let Some(endpoints) = &self.endpoints {
            endpoints.encode(buf);
        }
        if let Some(ero) = &self.ero {
            encode_ero(ero, buf)?;
        }
        if let Some(lspa) = &self.lspa {
            lspa.encode(buf)?;
        }
        if let Some(bandwidth) = &self.bandwidth {
            bandwidth.encode(buf);
        }
        Ok(())
    }

    fn from_objects(objects: Vec<(ObjectHeader, Object)>) -> Result<Self, PcepError> {
        let mut srp = None;
        let mut lsp = None;
        let mut request = Self {
            srp: SrpObject::default(),
            lsp: LspObject::default(),
            endpoints: None,
            ero: None,
            lspa: None,
            bandwidth: None,
        };
        for (_, object) in objects {
            match object {
                Object::Srp(o) => srp = Some(o),
                Object::Lsp(o) => lsp = Some(o),
                Object::Endpoints(o) => request.endpoints = Some(o),
                Object::Ero(o) => request.ero = Some(o),
                Object::Lspa(o) => request.lspa = Some(o),
                Object::Bandwidth(o) => request.bandwidth = Some(o),
                _ => (),
            }
        }
        match (srp, lsp) {
            (Some(srp), Some(lsp)) => {
                request.srp = srp;
                request.lsp = lsp;
                Ok(request)
            }
            _ => Err(PcepError::InvalidField(
                "PCInitiate requires SRP and LSP objects".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Open(OpenObject),
    Keepalive,
    Error(Vec<(ObjectHeader, Object)>),
    Close(CloseObject),
    Report(Vec<(ObjectHeader, Object)>),
    Initiate(InitiateRequest),
    /// Framed fine but not a message this controller acts on
    Unrecognized(MessageType, Vec<u8>),
    /// Framed fine but the body could not be decoded
    Malformed(MessageType, PcepError),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Open(_) => MessageType::Open,
            Message::Keepalive => MessageType::Keepalive,
            Message::Error(_) => MessageType::Error,
            Message::Close(_) => MessageType::Close,
            Message::Report(_) => MessageType::PcRpt,
            Message::Initiate(_) => MessageType::PcInitiate,
            Message::Unrecognized(kind, _) => *kind,
            Message::Malformed(kind, _) => *kind,
        }
    }

    /// Decode a message body (common header already stripped)
    pub fn decode(header: &CommonHeader, body: &[u8]) -> Result<Self, PcepError> {
        let message = match header.message_type {
            MessageType::Open => {
                let open = decode_objects(body)?
                    .into_iter()
                    .find_map(|(_, object)| match object {
                        Object::Open(open) => Some(open),
                        _ => None,
                    })
                    .ok_or_else(|| {
                        PcepError::InvalidField("OPEN message without OPEN object".to_string())
                    })?;
                Message::Open(open)
            }
            MessageType::Keepalive => Message::Keepalive,
            MessageType::Error => Message::Error(decode_objects(body)?),
            MessageType::Close => {
                let close = decode_objects(body)?
                    .into_iter()
                    .find_map(|(_, object)| match object {
                        Object::Close(close) => Some(close),
                        _ => None,
                    })
                    .ok_or_else(|| {
                        PcepError::InvalidField("CLOSE message without CLOSE object".to_string())
                    })?;
                Message::Close(close)
            }
            MessageType::PcRpt => Message::Report(decode_objects(body)?),
            MessageType::PcInitiate => {
                Message::Initiate(InitiateRequest::from_objects(decode_objects(body)?)?)
            }
            other => Message::Unrecognized(other, body.to_vec()),
        };
        Ok(message)
    }

    /// Encode the whole message into `buf`. On error nothing is appended
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), PcepError> {
        let mut body = BytesMut::with_capacity(64);
        match self {
            Message::Open(open) => open.encode(&mut body),
            Message::Keepalive => (),
            Message::Close(close) => close.encode(&mut body),
            Message::Initiate(request) => request.encode(&mut body)?,
            Message::Error(objects) => {
                for (_, object) in objects {
                    match object {
                        Object::Error(error) => error.encode(&mut body),
                        other => {
                            return Err(PcepError::Unimplemented(format!(
                                "encoding {:?} in an ERROR message",
                                other
                            )))
                        }
                    }
                }
            }
            Message::Unrecognized(_, raw) => body.put_slice(raw),
            Message::Report(_) | Message::Malformed(..) => {
                return Err(PcepError::Unimplemented(format!(
                    "encoding {} messages",
                    self.message_type()
                )));
            }
        }
        let length = COMMON_HEADER_LEN + body.len();
        if length > usize::from(u16::MAX) {
            return Err(PcepError::InvalidField(format!(
                "message length {} overflows the header",
                length
            )));
        }
        CommonHeader::new(self.message_type(), length as u16).encode(buf);
        buf.put_slice(&body);
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::Malformed(kind, err) => write!(f, "{} (malformed: {})", kind, err),
            other => write!(f, "{}", other.message_type()),
        }
    }
}
