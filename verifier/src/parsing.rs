//! Parsers for command line values.

use ethereum_types::{H160, H256};

fn decode_hex_digits(s: &str, max_len: usize) -> Result<Vec<u8>, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() || digits.len() > max_len * 2 {
        return Err(format!("expected 1 to {} hex digits, got {:?}", max_len * 2, s));
    }

    let padded = format!("{:0>width$}", digits, width = max_len * 2);
    hex::decode(padded).map_err(|e| format!("{s:?}: {e}"))
}

/// A 20 byte address, `0x` optional.
pub fn parse_address(s: &str) -> Result<H160, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != 40 {
        return Err(format!("expected 40 hex digits, got {:?}", s));
    }

    decode_hex_digits(s, 20).map(|b| H160::from_slice(&b))
}

/// A storage slot. Short forms such as `0x1` are left-padded to 32 bytes.
pub fn parse_slot(s: &str) -> Result<H256, String> {
    decode_hex_digits(s, 32).map(|b| H256::from_slice(&b))
}

#[cfg(test)]
mod tests {
    use ethereum_types::{H160, H256};
    use hex_literal::hex;

    use super::{parse_address, parse_slot};

    #[test]
    fn slots() {
        assert_eq!(parse_slot("0x0"), Ok(H256::zero()));
        assert_eq!(parse_slot("1"), Ok(H256::from_low_u64_be(1)));
        assert_eq!(
            parse_slot("0xabc"),
            Ok(H256::from_low_u64_be(0xabc))
        );
        assert!(parse_slot("0x").is_err());
        assert!(parse_slot("0xzz").is_err());
        assert!(parse_slot(&format!("0x{}", "0".repeat(65))).is_err());
    }

    #[test]
    fn addresses() {
        assert_eq!(
            parse_address("0x77045e71a7a2c50903d88e564cd72fab11e82051"),
            Ok(H160(hex!("77045e71a7a2c50903d88e564cd72fab11e82051")))
        );
        assert_eq!(
            parse_address("0000000000000000000000000000000001000006"),
            Ok(H160::from_low_u64_be(0x0100_0006))
        );
        assert!(parse_address("0x1").is_err());
    }
}
