//! PCEP wire codec (RFC 5440, RFC 8231/8281 stateful extensions, RFC 8664 segment routing)
//!
//! Every PCEP message starts with a 4 byte common header and carries a
//! sequence of length-prefixed objects. Object decoders take the body
//! slice with the object header already stripped.

mod codec;
mod ero;
mod header;
mod lsp;
mod lspa;
mod message;
mod objects;
mod open;
mod pcerr;
mod srp;

use std::error;
use std::fmt;
use std::io;

pub use codec::{MessageCodec, MessageProtocol};
pub use ero::{decode_subobjects, encode_ero, Nai, NodeType, SrEroSubobject, SR_SUBOBJECT_TYPE};
pub use header::{
    decode_tlvs, encode_tlv, CommonHeader, MessageType, ObjectClass, ObjectHeader, Tlv,
    COMMON_HEADER_LEN, OBJECT_HEADER_LEN, PCEP_VERSION,
};
pub use lsp::{Ipv4LspIdentifiers, Ipv6LspIdentifiers, LspObject, LspOper};
pub use lspa::LspaObject;
pub use message::{InitiateRequest, Message};
pub use objects::{
    decode_objects, BandwidthObject, CloseObject, EndpointsObject, MetricObject, Object,
};
pub use open::{OpenObject, SrCapability, StatefulCapability};
pub use pcerr::{describe_error, ErrorObject};
pub use srp::{next_srp_id, SrpObject, PATH_SETUP_TYPE_SR};

/// Well known PCEP listening port
pub const PCEP_PORT: u16 = 4189;

#[derive(Debug, Clone, PartialEq)]
pub enum PcepError {
    /// Not enough bytes to decode. [needed, got]
    ShortBuffer(usize, usize),
    /// Common header carried an unsupported version
    BadVersion(u8),
    /// Object handed to the wrong decoder. [expected, received]
    UnexpectedClass(u8, u8),
    /// Sub-object type or length is inconsistent
    BadSubobject(String),
    /// A field holds a value outside of its domain
    InvalidField(String),
    /// Wire format exists but is not supported here
    Unimplemented(String),
    /// Underlying transport failure
    Io(String),
}

impl fmt::Display for PcepError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("PCEP Error: ")?;
        use PcepError::*;
        match self {
            ShortBuffer(needed, got) => {
                write!(f, "Short buffer (needed={}, got={})", needed, got)
            }
            BadVersion(v) => write!(f, "Unsupported version {}", v),
            UnexpectedClass(e, r) => {
                write!(f, "Unexpected object class (expected={}, received={})", e, r)
            }
            BadSubobject(r) => write!(f, "Bad sub-object [{}]", r),
            InvalidField(r) => write!(f, "Invalid field [{}]", r),
            Unimplemented(r) => write!(f, "Unimplemented [{}]", r),
            Io(r) => write!(f, "Transport error [{}]", r),
        }
    }
}

impl From<io::Error> for PcepError {
    fn from(error: io::Error) -> Self {
        PcepError::Io(error.to_string())
    }
}

impl error::Error for PcepError {}

/// Bail out with `ShortBuffer` unless `data` holds at least `needed` bytes
pub(crate) fn ensure_len(data: &[u8], needed: usize) -> Result<(), PcepError> {
    if data.len() < needed {
        return Err(PcepError::ShortBuffer(needed, data.len()));
    }
    Ok(())
}
