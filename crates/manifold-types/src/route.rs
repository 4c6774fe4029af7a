use crate::selector::Selector;
use crate::{Address, H256};
use serde::{Deserialize, Serialize};

/// One routing table entry: selector → facet address + expected code hash.
///
/// Routes are immutable once embedded in a committed root; a different
/// facet or code hash for the same selector requires a new root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub selector: Selector,

    /// Facet whose code executes for `selector`
    pub facet: Address,

    /// Keccak-256 of the facet's runtime code at commit time
    #[serde(rename = "codehash")]
    pub code_hash: H256,
}

impl Route {
    pub fn new(selector: Selector, facet: Address, code_hash: H256) -> Self {
        Route {
            selector,
            facet,
            code_hash,
        }
    }

    /// Packed encoding `selector(4) || facet(20) || code_hash(32)`.
    pub fn packed(&self) -> [u8; 56] {
        let mut out = [0u8; 56];
        out[..4].copy_from_slice(self.selector.as_bytes());
        out[4..24].copy_from_slice(self.facet.as_bytes());
        out[24..].copy_from_slice(self.code_hash.as_bytes());
        out
    }
}
