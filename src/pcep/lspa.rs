use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::header::{ObjectClass, ObjectHeader};
use super::{ensure_len, PcepError};
use crate::utils::{bool_to_bit, read_bits};

/// LSPA object (RFC 5440 7.11)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspaObject {
    pub exclude_any: u32,
    pub include_any: u32,
    pub include_all: u32,
    pub setup_priority: u8,
    pub holding_priority: u8,
    pub local_protection: bool,
}

impl LspaObject {
    pub fn new(setup_priority: u8, holding_priority: u8, local_protection: bool) -> Self {
        Self {
            setup_priority,
            holding_priority,
            local_protection,
            ..Default::default()
        }
    }

    pub fn decode(body: &[u8]) -> Result<Self, PcepError> {
        ensure_len(body, 16)?;
        let word = |start: usize| {
            u32::from_be_bytes([body[start], body[start + 1], body[start + 2], body[start + 3]])
        };
        Ok(Self {
            exclude_any: word(0),
            include_any: word(4),
            include_all: word(8),
            setup_priority: body[12],
            holding_priority: body[13],
            local_protection: read_bits(body[14], 0) == 1,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), PcepError> {
        if self.setup_priority > 7 || self.holding_priority > 7 {
            return Err(PcepError::InvalidField(format!(
                "priorities must be 0-7 (setup={}, hold={})",
                self.setup_priority, self.holding_priority
            )));
        }
        ObjectHeader::new(ObjectClass::Lspa, 1, 16).encode(buf);
        buf.put_u32(self.exclude_any);
        buf.put_u32(self.include_any);
        buf.put_u32(self.include_all);
        buf.put_u8(self.setup_priority);
        buf.put_u8(self.holding_priority);
        buf.put_u8(bool_to_bit(self.local_protection, 0));
        buf.put_u8(0);
        Ok(())
    }
}
