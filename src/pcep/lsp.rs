use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::header::{decode_tlvs, encode_tlv, ObjectClass, ObjectHeader};
use super::{ensure_len, PcepError};
use crate::utils::{bool_to_bit, read_bits};

pub const SYMBOLIC_PATH_NAME_TLV: u16 = 17;
pub const IPV4_LSP_IDENTIFIERS_TLV: u16 = 18;
pub const IPV6_LSP_IDENTIFIERS_TLV: u16 = 19;

/// Operational state reported by the router
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LspOper {
    Down,
    Up,
    Active,
    GoingDown,
    GoingUp,
    Reserved(u8),
}

impl From<u8> for LspOper {
    fn from(value: u8) -> Self {
        use LspOper::*;
        match value {
            0 => Down,
            1 => Up,
            2 => Active,
            3 => GoingDown,
            4 => GoingUp,
            other => Reserved(other),
        }
    }
}

impl From<LspOper> for u8 {
    fn from(oper: LspOper) -> Self {
        use LspOper::*;
        match oper {
            Down => 0,
            Up => 1,
            Active => 2,
            GoingDown => 3,
            GoingUp => 4,
            Reserved(other) => other,
        }
    }
}

impl Default for LspOper {
    fn default() -> Self {
        LspOper::Down
    }
}

impl fmt::Display for LspOper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use LspOper::*;
        let word = match self {
            Down => "Down",
            Up => "Up",
            Active => "Active",
            GoingDown => "GoingDown",
            GoingUp => "GoingUp",
            Reserved(other) => return write!(f, "Reserved({})", other),
        };
        write!(f, "{}", word)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4LspIdentifiers {
    pub sender: Ipv4Addr,
    pub lsp_id: u16,
    pub tunnel_id: u16,
    pub extended_tunnel_id: Ipv4Addr,
    pub endpoint: Ipv4Addr,
}

impl Ipv4LspIdentifiers {
    fn decode(value: &[u8]) -> Result<Self, PcepError> {
        ensure_len(value, 16)?;
        Ok(Self {
            sender: Ipv4Addr::new(value[0], value[1], value[2], value[3]),
            lsp_id: u16::from_be_bytes([value[4], value[5]]),
            tunnel_id: u16::from_be_bytes([value[6], value[7]]),
            extended_tunnel_id: Ipv4Addr::new(value[8], value[9], value[10], value[11]),
            endpoint: Ipv4Addr::new(value[12], value[13], value[14], value[15]),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6LspIdentifiers {
    pub sender: Ipv6Addr,
    pub lsp_id: u16,
    pub tunnel_id: u16,
    pub extended_tunnel_id: Ipv6Addr,
    pub endpoint: Ipv6Addr,
}

impl Ipv6LspIdentifiers {
    fn decode(value: &[u8]) -> Result<Self, PcepError> {
        ensure_len(value, 52)?;
        let addr = |start: usize| {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&value[start..start + 16]);
            Ipv6Addr::from(octets)
        };
        Ok(Self {
            sender: addr(0),
            lsp_id: u16::from_be_bytes([value[16], value[17]]),
            tunnel_id: u16::from_be_bytes([value[18], value[19]]),
            extended_tunnel_id: addr(20),
            endpoint: addr(36),
        })
    }
}

/// LSP object (RFC 8231 7.3)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LspObject {
    /// 20 bit, router assigned
    pub plsp_id: u32,
    pub oper: LspOper,
    pub admin: bool,
    pub remove: bool,
    pub sync: bool,
    pub delegate: bool,
    pub name: Option<String>,
    pub ipv4_identifiers: Option<Ipv4LspIdentifiers>,
    pub ipv6_identifiers: Option<Ipv6LspIdentifiers>,
}

impl LspObject {
    pub fn decode(body: &[u8]) -> Result<Self, PcepError> {
        ensure_len(body, 4)?;
        let word = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        let flags = body[3];
        let mut lsp = Self {
            plsp_id: word >> 12,
            oper: LspOper::from((flags >> 4) & 0b111),
            admin: read_bits(flags, 3) == 1,
            remove: read_bits(flags, 2) == 1,
            sync: read_bits(flags, 1) == 1,
            delegate: read_bits(flags, 0) == 1,
            ..Default::default()
        };
        for tlv in decode_tlvs(&body[4..])? {
            match tlv.tlv_type {
                SYMBOLIC_PATH_NAME_TLV => {
                    lsp.name = Some(String::from_utf8_lossy(tlv.value).into_owned());
                }
                IPV4_LSP_IDENTIFIERS_TLV => {
                    lsp.ipv4_identifiers = Some(Ipv4LspIdentifiers::decode(tlv.value)?);
                }
                IPV6_LSP_IDENTIFIERS_TLV => {
                    lsp.ipv6_identifiers = Some(Ipv6LspIdentifiers::decode(tlv.value)?);
                }
                // Forward compatible, skip what we don't know
                _ => (),
            }
        }
        Ok(lsp)
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), PcepError> {
        if self.plsp_id > 0xf_ffff {
            return Err(PcepError::InvalidField(format!(
                "PLSP-ID {} does not fit in 20 bits",
                self.plsp_id
            )));
        }
        let flags = ((u8::from(self.oper) & 0b111) << 4)
            | bool_to_bit(self.admin, 3)
            | bool_to_bit(self.remove, 2)
            | bool_to_bit(self.sync, 1)
            | bool_to_bit(self.delegate, 0);
        let mut body = BytesMut::with_capacity(32);
        body.put_u32((self.plsp_id << 12) | u32::from(flags));
        if let Some(name) = &self.name {
            encode_tlv(&mut body, SYMBOLIC_PATH_NAME_TLV, name.as_bytes());
        }
        ObjectHeader::new(ObjectClass::Lsp, 1, body.len()).encode(buf);
        buf.put_slice(&body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_lsp() {
        let body = [
            0x00, 0x01, 0x50, 0x29, // PLSP-ID 21, Active, Admin, Delegate
            0, 17, 0, 5, b'L', b'S', b'P', b'-', b'1', 0, 0, 0, // Symbolic name
            0, 42, 0, 3, 9, 9, 9, 0, // Unknown TLV
            0, 18, 0, 16, 10, 0, 0, 1, 0, 2, 0, 3, 10, 0, 0, 1, 10, 0, 0, 9, // IPv4 identifiers
        ];
        let lsp = LspObject::decode(&body).unwrap();
        assert_eq!(lsp.plsp_id, 21);
        assert_eq!(lsp.oper, LspOper::Active);
        assert!(lsp.admin);
        assert!(!lsp.remove);
        assert!(!lsp.sync);
        assert!(lsp.delegate);
        assert_eq!(lsp.name.as_deref(), Some("LSP-1"));
        let ids = lsp.ipv4_identifiers.unwrap();
        assert_eq!(ids.sender, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(ids.lsp_id, 2);
        assert_eq!(ids.tunnel_id, 3);
        assert_eq!(ids.endpoint, Ipv4Addr::new(10, 0, 0, 9));
    }

    #[test]
    fn test_encode_lsp() {
        let lsp = LspObject {
            plsp_id: 0,
            admin: true,
            delegate: true,
            name: Some("LSP-A".to_string()),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        lsp.encode(&mut buf).unwrap();
        assert_eq!(&buf[..4], &[32, 0x10, 0, 20]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 0b1001]);
        assert_eq!(&buf[8..12], &[0, 17, 0, 5]);

        let decoded = LspObject::decode(&buf[4..]).unwrap();
        assert_eq!(decoded, lsp);
    }

    #[test]
    fn test_plsp_id_range() {
        let lsp = LspObject {
            plsp_id: 0x10_0000,
            ..Default::default()
        };
        assert!(lsp.encode(&mut BytesMut::new()).is_err());
    }
}
