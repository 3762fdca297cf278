use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::header::{decode_tlvs, encode_tlv, ObjectClass, ObjectHeader};
use super::{ensure_len, PcepError, PCEP_VERSION};
use crate::utils::{bool_to_bit, read_bits, uint_to_bool};

pub const STATEFUL_CAPABILITY_TLV: u16 = 16;
pub const SR_CAPABILITY_TLV: u16 = 26;

/// STATEFUL-PCE-CAPABILITY TLV (RFC 8231, RFC 8281, RFC 8232)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatefulCapability {
    pub update: bool,
    pub include_db_version: bool,
    pub lsp_instantiation: bool,
    pub triggered_resync: bool,
    pub delta_lsp_sync: bool,
    pub triggered_initial_sync: bool,
}

impl StatefulCapability {
    pub fn decode(value: &[u8]) -> Result<Self, PcepError> {
        ensure_len(value, 4)?;
        let flags = value[3];
        Ok(Self {
            update: uint_to_bool(read_bits(flags, 0))?,
            include_db_version: uint_to_bool(read_bits(flags, 1))?,
            lsp_instantiation: uint_to_bool(read_bits(flags, 2))?,
            triggered_resync: uint_to_bool(read_bits(flags, 3))?,
            delta_lsp_sync: uint_to_bool(read_bits(flags, 4))?,
            triggered_initial_sync: uint_to_bool(read_bits(flags, 5))?,
        })
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        let flags = bool_to_bit(self.update, 0)
            | bool_to_bit(self.include_db_version, 1)
            | bool_to_bit(self.lsp_instantiation, 2)
            | bool_to_bit(self.triggered_resync, 3)
            | bool_to_bit(self.delta_lsp_sync, 4)
            | bool_to_bit(self.triggered_initial_sync, 5);
        [0, 0, 0, flags]
    }
}

/// SR-PCE-CAPABILITY TLV (RFC 8664)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrCapability {
    pub nai_to_sid: bool,
    pub no_msd_limit: bool,
    /// Maximum SID depth
    pub msd: u8,
}

impl SrCapability {
    pub fn decode(value: &[u8]) -> Result<Self, PcepError> {
        ensure_len(value, 4)?;
        Ok(Self {
            nai_to_sid: uint_to_bool(read_bits(value[2], 1))?,
            no_msd_limit: uint_to_bool(read_bits(value[2], 0))?,
            msd: value[3],
        })
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        let flags = bool_to_bit(self.nai_to_sid, 1) | bool_to_bit(self.no_msd_limit, 0);
        [0, 0, flags, self.msd]
    }
}

/// OPEN object, exchanged once by each side to start a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenObject {
    pub version: u8,
    pub flags: u8,
    pub keepalive: u8,
    pub dead_timer: u8,
    pub session_id: u8,
    pub stateful: Option<StatefulCapability>,
    pub segment_routing: Option<SrCapability>,
}

impl OpenObject {
    /// The OPEN this controller sends: stateful with LSP instantiation, SR with MSD 5
    pub fn local(keepalive: u8, dead_timer: u8, session_id: u8) -> Self {
        Self {
            version: PCEP_VERSION,
            flags: 0,
            keepalive,
            dead_timer,
            session_id,
            stateful: Some(StatefulCapability {
                update: true,
                lsp_instantiation: true,
                ..Default::default()
            }),
            segment_routing: Some(SrCapability {
                msd: 5,
                ..Default::default()
            }),
        }
    }

    pub fn decode(body: &[u8]) -> Result<Self, PcepError> {
        ensure_len(body, 4)?;
        let mut open = Self {
            version: body[0] >> 5,
            flags: body[0] & 0x1f,
            keepalive: body[1],
            dead_timer: body[2],
            session_id: body[3],
            stateful: None,
            segment_routing: None,
        };
        for tlv in decode_tlvs(&body[4..])? {
            match tlv.tlv_type {
                STATEFUL_CAPABILITY_TLV => {
                    open.stateful = Some(StatefulCapability::decode(tlv.value)?)
                }
                SR_CAPABILITY_TLV => open.segment_routing = Some(SrCapability::decode(tlv.value)?),
                _ => (),
            }
        }
        Ok(open)
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut body = BytesMut::with_capacity(20);
        body.put_u8((self.version << 5) | (self.flags & 0x1f));
        body.put_u8(self.keepalive);
        body.put_u8(self.dead_timer);
        body.put_u8(self.session_id);
        if let Some(stateful) = &self.stateful {
            encode_tlv(&mut body, STATEFUL_CAPABILITY_TLV, &stateful.to_bytes());
        }
        if let Some(sr) = &self.segment_routing {
            encode_tlv(&mut body, SR_CAPABILITY_TLV, &sr.to_bytes());
        }
        ObjectHeader::new(ObjectClass::Open, 1, body.len()).encode(buf);
        buf.put_slice(&body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_open_bytes() {
        let mut buf = BytesMut::new();
        OpenObject::local(30, 120, 7).encode(&mut buf);
        assert_eq!(
            &buf[..],
            &[
                1, 16, 0, 24, // Object header
                32, 30, 120, 7, // Version, keepalive, deadtimer, SID
                0, 16, 0, 4, 0, 0, 0, 5, // Stateful capability
                0, 26, 0, 4, 0, 0, 0, 5, // SR capability
            ]
        );
    }

    #[test]
    fn test_decode_open() {
        let body = [
            32, 30, 120, 1, // Version, keepalive, deadtimer, SID
            0, 16, 0, 4, 0, 0, 0, 0b0010_0101, // Stateful capability
            0, 99, 0, 2, 1, 1, 0, 0, // Unknown TLV
            0, 26, 0, 4, 0, 0, 0b11, 10, // SR capability
        ];
        let open = OpenObject::decode(&body).unwrap();
        assert_eq!(open.version, 1);
        assert_eq!(open.keepalive, 30);
        assert_eq!(open.dead_timer, 120);
        assert_eq!(open.session_id, 1);

        let stateful = open.stateful.unwrap();
        assert!(stateful.update);
        assert!(!stateful.include_db_version);
        assert!(stateful.lsp_instantiation);
        assert!(stateful.triggered_initial_sync);

        let sr = open.segment_routing.unwrap();
        assert!(sr.nai_to_sid);
        assert!(sr.no_msd_limit);
        assert_eq!(sr.msd, 10);
    }

    #[test]
    fn test_decode_open_without_tlvs() {
        let open = OpenObject::decode(&[32, 30, 120, 1]).unwrap();
        assert!(open.stateful.is_none());
        assert!(open.segment_routing.is_none());
        assert!(OpenObject::decode(&[32, 30]).is_err());
    }
}
