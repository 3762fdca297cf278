use bytes::{BufMut, BytesMut};

use super::header::{ObjectClass, ObjectHeader};
use super::{ensure_len, PcepError};

/// PCEP-ERROR object (RFC 5440 7.15)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorObject {
    pub reserved: u8,
    pub flags: u8,
    pub error_type: u8,
    pub error_value: u8,
    /// Empty when the (type, value) pair is unknown
    pub description: &'static str,
}

impl ErrorObject {
    pub fn new(error_type: u8, error_value: u8) -> Self {
        Self {
            reserved: 0,
            flags: 0,
            error_type,
            error_value,
            description: describe_error(error_type, error_value),
        }
    }

    pub fn decode(body: &[u8]) -> Result<Self, PcepError> {
        ensure_len(body, 4)?;
        Ok(Self {
            reserved: body[0],
            flags: body[1],
            error_type: body[2],
            error_value: body[3],
            description: describe_error(body[2], body[3]),
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        ObjectHeader::new(ObjectClass::Error, 1, 4).encode(buf);
        buf.put_u8(self.reserved);
        buf.put_u8(self.flags);
        buf.put_u8(self.error_type);
        buf.put_u8(self.error_value);
    }
}

/// Error-Type / Error-value descriptions from the PCEP IANA registry
pub fn describe_error(error_type: u8, error_value: u8) -> &'static str {
    match (error_type, error_value) {
        (1, 0) => "PCEP session establishment failure: undefined",
        (1, 1) => "PCEP session establishment failure: reception of an invalid Open message or a non Open message",
        (1, 2) => "PCEP session establishment failure: no Open message received before the expiration of the OpenWait timer",
        (1, 3) => "PCEP session establishment failure: unacceptable and non-negotiable session characteristics",
        (1, 4) => "PCEP session establishment failure: unacceptable but negotiable session characteristics",
        (1, 5) => "PCEP session establishment failure: reception of a second Open message with still unacceptable session characteristics",
        (1, 6) => "PCEP session establishment failure: reception of a PCErr message proposing unacceptable session characteristics",
        (1, 7) => "PCEP session establishment failure: no Keepalive or PCErr message received before the expiration of the KeepWait timer",
        (2, 0) => "Capability not supported",
        (3, 1) => "Unknown Object: unrecognized object class",
        (3, 2) => "Unknown Object: unrecognized object type",
        (4, 1) => "Not supported object: not supported object class",
        (4, 2) => "Not supported object: not supported object type",
        (5, 1) => "Policy violation: C bit of the METRIC object set (request rejected)",
        (5, 2) => "Policy violation: O bit of the RP object set (request rejected)",
        (6, 1) => "Mandatory Object missing: RP object missing",
        (6, 2) => "Mandatory Object missing: RRO object missing for a reoptimization request when bandwidth is not equal to 0",
        (6, 3) => "Mandatory Object missing: END-POINTS object missing",
        (6, 8) => "Mandatory Object missing: LSP object missing",
        (6, 9) => "Mandatory Object missing: ERO object missing",
        (6, 10) => "Mandatory Object missing: SRP object missing",
        (6, 11) | (11, 0) => "Mandatory Object missing: LSP-IDENTIFIERS TLV missing",
        (7, 0) => "Synchronized path computation request missing",
        (8, 0) => "Unknown request reference",
        (9, 0) => "Attempt to establish a second PCEP session",
        (10, 1) => "Reception of an invalid object: P flag not set although it must be set",
        (10, 2) => "Reception of an invalid object: bad label value",
        (10, 3) => "Reception of an invalid object: unsupported number of SR-ERO subobjects",
        (10, 4) => "Reception of an invalid object: bad label format",
        (10, 5) => "Reception of an invalid object: ERO mixes SR-ERO subobjects with other subobject types",
        (10, 6) => "Reception of an invalid object: both SID and NAI are absent in SR-ERO subobject",
        (10, 7) => "Reception of an invalid object: both SID and NAI are absent in SR-RRO subobject",
        (10, 8) => "Reception of an invalid object: SYMBOLIC-PATH-NAME TLV missing",
        (10, 9) => "Reception of an invalid object: MSD exceeds the default for the PCEP session",
        (10, 10) => "Reception of an invalid object: RRO mixes SR-RRO subobjects with other subobject types",
        (10, 11) => "Reception of an invalid object: malformed object",
        (19, 1) => "Invalid Operation: LSP Update Request for a non-delegated LSP",
        (19, 2) => "Invalid Operation: LSP Update Request if the stateful PCE capability was not advertised",
        (19, 3) => "Invalid Operation: LSP Update Request for an LSP identified by an unknown PLSP-ID",
        (19, 5) => "Invalid Operation: LSP State Report if stateful PCE capability was not advertised",
        (19, 6) => "Invalid Operation: PCE-initiated LSP limit reached",
        (19, 7) => "Invalid Operation: delegation for PCE-initiated LSP cannot be revoked",
        (19, 8) => "Invalid Operation: non-zero PLSP-ID in LSP Initiate Request",
        (19, 9) => "Invalid Operation: LSP is not PCE initiated",
        (19, 10) => "Invalid Operation: PCE-initiated operation-frequency limit reached",
        (20, 1) => "LSP State synchronization error: PCE cannot process an otherwise valid LSP State Report",
        (20, 5) => "LSP State synchronization error: PCC cannot complete the State Synchronization",
        (21, 0) => "Invalid traffic engineering path setup type: unassigned",
        (21, 1) => "Invalid traffic engineering path setup type: unsupported path setup type",
        (21, 2) => "Invalid traffic engineering path setup type: mismatched path setup type",
        (23, 1) => "Bad parameter value: SYMBOLIC-PATH-NAME in use",
        (23, 2) => "Bad parameter value: speaker identity included for an LSP that is not PCE initiated",
        (24, 1) => "LSP instantiation error: unacceptable instantiation parameters",
        (24, 2) => "LSP instantiation error: internal error",
        (24, 3) => "LSP instantiation error: signaling error",
        _ => "",
    }
}
