// CONTENT ADDRESSER
// Deterministic deployment addresses derived from bytecode content
//
// SAFETY INVARIANTS:
// 1. Same bytecode + same deployer + same namespace → same address on every chain
// 2. The address depends only on content; no nonce or sender state is involved
// 3. Prediction is pure: no I/O, no state, no randomness

use manifold_types::{keccak256, Address, H256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest runtime bytecode the protocol will deploy (EIP-170 ceiling).
pub const MAX_CODE_SIZE: usize = 24_576;

/// Length of the creation stub prepended to runtime code.
pub const INIT_CODE_PREFIX_LEN: usize = 10;

/// `PUSH2 len; DUP1; PUSH1 0x0a; RETURNDATASIZE; CODECOPY; RETURNDATASIZE; RETURN`
const CREATION_STUB: [u8; INIT_CODE_PREFIX_LEN] =
    [0x61, 0x00, 0x00, 0x80, 0x60, 0x0a, 0x3d, 0x39, 0x3d, 0xf3];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("bytecode of {size} bytes cannot be wrapped in a creation stub (max {max})")]
    InitCodeTooLarge { size: usize, max: usize },
}

/// Canonical code identity: Keccak-256 of the runtime bytes.
pub fn code_hash(code: &[u8]) -> H256 {
    keccak256(code)
}

/// Wrap runtime bytecode in the creation stub that returns it verbatim.
pub fn init_code(runtime: &[u8]) -> Result<Vec<u8>, AddressError> {
    let len = u16::try_from(runtime.len()).map_err(|_| AddressError::InitCodeTooLarge {
        size: runtime.len(),
        max: u16::MAX as usize,
    })?;

    let mut code = Vec::with_capacity(INIT_CODE_PREFIX_LEN + runtime.len());
    code.extend_from_slice(&CREATION_STUB);
    code[1..3].copy_from_slice(&len.to_be_bytes());
    code.extend_from_slice(runtime);
    Ok(code)
}

/// `keccak256(0xff || deployer || salt || init_code_hash)[12..]`
pub fn create2_address(deployer: &Address, salt: &H256, init_code_hash: &H256) -> Address {
    let mut preimage = [0u8; 85];
    preimage[0] = 0xff;
    preimage[1..21].copy_from_slice(deployer.as_bytes());
    preimage[21..53].copy_from_slice(salt.as_bytes());
    preimage[53..].copy_from_slice(init_code_hash.as_bytes());
    Address::from_slice(&keccak256(preimage).as_bytes()[12..])
}

/// Everything derived from a bytecode payload before it is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// Address the factory will deploy to
    pub address: Address,

    /// Keccak-256 of the runtime bytecode (equals the deployed code hash)
    pub content_hash: H256,

    /// Salt after folding the namespace with the content hash
    pub salt: H256,

    /// Keccak-256 of the wrapped init code
    pub init_code_hash: H256,
}

/// Address predictor bound to one deployer identity and one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAddresser {
    deployer: Address,
    namespace: H256,
}

impl ContentAddresser {
    pub fn new(deployer: Address, namespace: H256) -> Self {
        Self { deployer, namespace }
    }

    /// Namespace derived from a human-readable label, e.g. `"manifold.chunks.v1"`.
    pub fn with_label(deployer: Address, label: &str) -> Self {
        Self::new(deployer, keccak256(label.as_bytes()))
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn namespace(&self) -> H256 {
        self.namespace
    }

    /// Second hashing stage: fold the namespace with the content hash.
    pub fn salt_for(&self, content_hash: &H256) -> H256 {
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(self.namespace.as_bytes());
        preimage[32..].copy_from_slice(content_hash.as_bytes());
        keccak256(preimage)
    }

    pub fn predict(&self, bytecode: &[u8]) -> Result<Prediction, AddressError> {
        let content_hash = code_hash(bytecode);
        let salt = self.salt_for(&content_hash);
        let init_code_hash = keccak256(init_code(bytecode)?);
        let address = create2_address(&self.deployer, &salt, &init_code_hash);

        Ok(Prediction {
            address,
            content_hash,
            salt,
            init_code_hash,
        })
    }
}
