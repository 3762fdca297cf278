mod display;
pub use display::*;

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use crate::pcep::PcepError;

/// Extract a single bit from a byte, position 0 is the least significant bit
pub fn read_bits(byte: u8, position: u8) -> u8 {
    (byte >> position) & 1
}

/// Strict boolean decode, only 0 and 1 are valid
pub fn uint_to_bool(value: u8) -> Result<bool, PcepError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(PcepError::InvalidField(format!(
            "{} is not a valid boolean value",
            value
        ))),
    }
}

pub fn bool_to_bit(value: bool, position: u8) -> u8 {
    if value {
        1 << position
    } else {
        0
    }
}

/// Convert a dotted quad (E.g. "10.0.0.1") into its network order u32
pub fn ipv4_to_u32(addr: &str) -> Result<u32, PcepError> {
    let ip: Ipv4Addr = addr
        .parse()
        .map_err(|_| PcepError::InvalidField(format!("'{}' is not an IPv4 address", addr)))?;
    Ok(u32::from(ip))
}

pub fn u32_to_ipv4(addr: u32) -> Ipv4Addr {
    Ipv4Addr::from(addr)
}

/// Zero pad to the next multiple of `block` bytes
pub fn pad_to_block(mut bytes: Vec<u8>, block: usize) -> Vec<u8> {
    let remainder = bytes.len() % block;
    if remainder != 0 {
        bytes.resize(bytes.len() + (block - remainder), 0);
    }
    bytes
}

/// Learned prefixes carry their length ("10.0.0.1/32"), endpoints don't
pub fn strip_prefix_len(prefix: &str) -> Result<Ipv4Addr, PcepError> {
    let network: Ipv4Network = prefix
        .parse()
        .map_err(|_| PcepError::InvalidField(format!("'{}' is not an IPv4 prefix", prefix)))?;
    Ok(network.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits() {
        assert_eq!(read_bits(0b0000_0101, 0), 1);
        assert_eq!(read_bits(0b0000_0101, 1), 0);
        assert_eq!(read_bits(0b0000_0101, 2), 1);
        assert_eq!(read_bits(0b1000_0000, 7), 1);
        assert_eq!(read_bits(0x40, 6), 1);
    }

    #[test]
    fn test_uint_to_bool() {
        assert!(!uint_to_bool(0).unwrap());
        assert!(uint_to_bool(1).unwrap());
        assert!(uint_to_bool(2).is_err());
        assert!(uint_to_bool(255).is_err());
    }

    #[test]
    fn test_ipv4_transforms() {
        assert_eq!(ipv4_to_u32("10.0.0.1").unwrap(), 0x0a00_0001);
        assert_eq!(u32_to_ipv4(0x0a00_0001), Ipv4Addr::new(10, 0, 0, 1));
        assert!(ipv4_to_u32("10.0.0").is_err());
        assert!(ipv4_to_u32("3001::1").is_err());
    }

    #[test]
    fn test_pad_to_block() {
        assert_eq!(pad_to_block(vec![1, 2, 3], 4), vec![1, 2, 3, 0]);
        assert_eq!(pad_to_block(vec![1, 2, 3, 4], 4).len(), 4);
        assert_eq!(pad_to_block(vec![1, 2, 3, 4, 5], 4).len(), 8);
        assert!(pad_to_block(vec![], 4).is_empty());
    }

    #[test]
    fn test_strip_prefix_len() {
        assert_eq!(
            strip_prefix_len("10.0.0.1/32").unwrap(),
            Ipv4Addr::new(10, 0, 0, 1)
        );
        assert!(strip_prefix_len("not-a-prefix").is_err());
    }
}
