use bytes::{BufMut, BytesMut};

use super::header::{decode_tlvs, encode_tlv, ObjectClass, ObjectHeader};
use super::{ensure_len, PcepError};
use crate::utils::{bool_to_bit, read_bits};

pub const PATH_SETUP_TYPE_TLV: u16 = 28;
/// Path setup type for segment routing (RFC 8664)
pub const PATH_SETUP_TYPE_SR: u8 = 1;

/// SRP object (RFC 8231 7.2), correlates our requests with the router's reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrpObject {
    pub remove: bool,
    pub srp_id: u32,
    pub path_setup_type: Option<u8>,
}

impl SrpObject {
    pub fn new(srp_id: u32, remove: bool) -> Self {
        Self {
            remove,
            srp_id,
            path_setup_type: Some(PATH_SETUP_TYPE_SR),
        }
    }

    pub fn decode(body: &[u8]) -> Result<Self, PcepError> {
        ensure_len(body, 8)?;
        let mut srp = Self {
            remove: read_bits(body[3], 0) == 1,
            srp_id: u32::from_be_bytes([body[4], body[5], body[6], body[7]]),
            path_setup_type: None,
        };
        for tlv in decode_tlvs(&body[8..])? {
            if tlv.tlv_type == PATH_SETUP_TYPE_TLV {
                ensure_len(tlv.value, 4)?;
                srp.path_setup_type = Some(tlv.value[3]);
            }
        }
        Ok(srp)
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut body = BytesMut::with_capacity(16);
        body.put_u32(u32::from(bool_to_bit(self.remove, 0)));
        body.put_u32(self.srp_id);
        if let Some(pst) = self.path_setup_type {
            encode_tlv(&mut body, PATH_SETUP_TYPE_TLV, &[0, 0, 0, pst]);
        }
        ObjectHeader::new(ObjectClass::Srp, 1, body.len()).encode(buf);
        buf.put_slice(&body);
    }
}

/// Advance an SRP-ID counter. 0 is reserved so wrapping skips it
pub fn next_srp_id(current: u32) -> u32 {
    match current.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_srp_id() {
        assert_eq!(next_srp_id(0), 1);
        assert_eq!(next_srp_id(41), 42);
        assert_eq!(next_srp_id(u32::MAX), 1);
    }

    #[test]
    fn test_encode_srp() {
        let mut buf = BytesMut::new();
        SrpObject::new(7, false).encode(&mut buf);
        assert_eq!(
            &buf[..],
            &[33, 0x10, 0, 20, 0, 0, 0, 0, 0, 0, 0, 7, 0, 28, 0, 4, 0, 0, 0, 1]
        );
        let decoded = SrpObject::decode(&buf[4..]).unwrap();
        assert_eq!(decoded.srp_id, 7);
        assert!(!decoded.remove);
        assert_eq!(decoded.path_setup_type, Some(PATH_SETUP_TYPE_SR));
    }

    #[test]
    fn test_remove_flag() {
        let mut buf = BytesMut::new();
        SrpObject::new(9, true).encode(&mut buf);
        assert_eq!(buf[7], 1);
        assert!(SrpObject::decode(&buf[4..]).unwrap().remove);
        assert!(SrpObject::decode(&[0, 0, 0, 1]).is_err());
    }
}
