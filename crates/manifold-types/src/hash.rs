use crate::error::ParseError;
use crate::{Address, H256};
use sha3::{Digest, Keccak256};

/// Keccak-256 of `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    H256::from_slice(&hasher.finalize())
}

fn decode_fixed(input: &str, expected: usize) -> Result<Vec<u8>, ParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    if bytes.len() != expected {
        return Err(ParseError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Parse a `0x`-prefixed (or bare) 40-digit hex address.
pub fn parse_address(input: &str) -> Result<Address, ParseError> {
    decode_fixed(input, 20).map(|bytes| Address::from_slice(&bytes))
}

/// Parse a `0x`-prefixed (or bare) 64-digit hex digest.
pub fn parse_h256(input: &str) -> Result<H256, ParseError> {
    decode_fixed(input, 32).map(|bytes| H256::from_slice(&bytes))
}
