use crate::error::ParseError;
use crate::hash::keccak256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of a dispatch key in bytes.
pub const SELECTOR_LEN: usize = 4;

/// The dispatch key: first four bytes of the Keccak-256 of a function signature.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Selector(pub [u8; SELECTOR_LEN]);

impl Selector {
    pub const fn new(bytes: [u8; SELECTOR_LEN]) -> Self {
        Selector(bytes)
    }

    /// Derive the selector of a canonical signature such as `transfer(address,uint256)`.
    pub fn from_signature(signature: &str) -> Self {
        let digest = keccak256(signature.as_bytes());
        let mut bytes = [0u8; SELECTOR_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..SELECTOR_LEN]);
        Selector(bytes)
    }

    /// Leading selector of ABI-encoded call data, if the data is long enough.
    pub fn from_calldata(calldata: &[u8]) -> Option<Self> {
        let head = calldata.get(..SELECTOR_LEN)?;
        let mut bytes = [0u8; SELECTOR_LEN];
        bytes.copy_from_slice(head);
        Some(Selector(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SELECTOR_LEN] {
        &self.0
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl From<u32> for Selector {
    fn from(value: u32) -> Self {
        Selector(value.to_be_bytes())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self)
    }
}

impl FromStr for Selector {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        if bytes.len() != SELECTOR_LEN {
            return Err(ParseError::InvalidLength {
                expected: SELECTOR_LEN,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; SELECTOR_LEN];
        out.copy_from_slice(&bytes);
        Ok(Selector(out))
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
