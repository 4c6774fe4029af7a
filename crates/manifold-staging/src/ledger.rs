/// STAGING LEDGER
///
/// Gates and records one-time deployment of bytecode chunks behind a fee.
///
/// SAFETY GUARANTEES:
/// - At most one deployment per content hash, ever
/// - Re-staging identical content returns the existing chunk and charges nothing
/// - The fee moves only together with a successful deployment (all-or-nothing)
/// - Deployed address must equal the predicted address or the call is undone

use manifold_crypto::{init_code, AddressError, ContentAddresser, Prediction, MAX_CODE_SIZE};
use manifold_types::{Address, Capability, CapabilityCheck, ErrorKind, H256};
use manifold_vm::{atomically, Chain, VmError};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ==================== ERROR TYPES ====================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("bytecode is empty")]
    EmptyBytecode,

    #[error("bytecode of {size} bytes exceeds maximum deployable size {max}")]
    SizeExceeded { size: usize, max: usize },

    #[error("fee paid {paid} is below the current fee {required}")]
    InsufficientFee { paid: u128, required: u128 },

    #[error("payer {payer:?} holds {balance}, cannot cover fee {required}")]
    InsufficientFunds {
        payer: Address,
        balance: u128,
        required: u128,
    },

    #[error("deployed address {deployed:?} differs from predicted {predicted:?}")]
    AddressMismatch { predicted: Address, deployed: Address },

    #[error("caller {caller:?} lacks {capability} capability")]
    Unauthorized {
        caller: Address,
        capability: Capability,
    },

    #[error("invalid fee configuration: {0}")]
    InvalidFeeConfig(String),

    #[error("deployment failed: {0}")]
    Deployment(#[from] VmError),
}

impl StagingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StagingError::EmptyBytecode | StagingError::InvalidFeeConfig(_) => {
                ErrorKind::InvalidInput
            }
            StagingError::SizeExceeded { .. }
            | StagingError::InsufficientFee { .. }
            | StagingError::InsufficientFunds { .. } => ErrorKind::ResourceLimit,
            StagingError::AddressMismatch { .. } => ErrorKind::IntegrityViolation,
            StagingError::Unauthorized { .. } => ErrorKind::Unauthorized,
            StagingError::Deployment(inner) => inner.kind(),
        }
    }

    /// Only a broken address derivation can produce this; callers must not retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StagingError::AddressMismatch { .. })
    }
}

pub type StagingResult<T> = Result<T, StagingError>;

// ==================== CORE TYPES ====================

/// Fee parameters, written only through the ADMIN capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    pub amount: u128,
    pub enabled: bool,
    pub recipient: Address,
}

impl FeeConfig {
    pub fn disabled() -> Self {
        FeeConfig {
            amount: 0,
            enabled: false,
            recipient: Address::zero(),
        }
    }

    /// Amount a new deployment must pay right now.
    pub fn required(&self) -> u128 {
        if self.enabled {
            self.amount
        } else {
            0
        }
    }

    pub fn validate(&self) -> StagingResult<()> {
        if self.enabled && self.recipient.is_zero() {
            return Err(StagingError::InvalidFeeConfig(
                "enabled fee needs a non-zero recipient".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// A staged, content-addressed unit of deployed bytecode. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content_hash: H256,
    pub predicted_address: Address,
    pub deployed_address: Address,
    pub size_bytes: usize,

    /// Account that paid for (or first recorded) the chunk
    pub staged_by: Address,
}

/// Outcome of one `stage` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReceipt {
    pub chunk: Chunk,

    /// `false` when the chunk already existed and nothing was deployed
    pub deployed: bool,

    pub fee_charged: u128,

    /// What the call changed; `None` for a no-op re-stage
    pub event: Option<StagingEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StagingEvent {
    ChunkStaged {
        content_hash: H256,
        address: Address,
        size_bytes: usize,
        fee_charged: u128,
    },

    /// Code was already present at the predicted address; recorded without redeploying
    ChunkAdopted { content_hash: H256, address: Address },

    FeeUpdated {
        previous: FeeConfig,
        current: FeeConfig,
        updated_by: Address,
    },
}

// ==================== LEDGER ====================

#[derive(Debug, Clone)]
pub struct StagingLedger {
    addresser: ContentAddresser,
    max_code_size: usize,
    fee: FeeConfig,
    chunks: HashMap<H256, Chunk>,
}

impl StagingLedger {
    pub fn new(addresser: ContentAddresser) -> Self {
        Self {
            addresser,
            max_code_size: MAX_CODE_SIZE,
            fee: FeeConfig::disabled(),
            chunks: HashMap::new(),
        }
    }

    /// Lower the size ceiling; values above the protocol maximum are clamped.
    pub fn with_max_code_size(mut self, max_code_size: usize) -> Self {
        self.max_code_size = max_code_size.min(MAX_CODE_SIZE);
        self
    }

    pub fn with_fee(mut self, fee: FeeConfig) -> StagingResult<Self> {
        fee.validate()?;
        self.fee = fee;
        Ok(self)
    }

    pub fn addresser(&self) -> &ContentAddresser {
        &self.addresser
    }

    pub fn fee(&self) -> FeeConfig {
        self.fee
    }

    pub fn max_code_size(&self) -> usize {
        self.max_code_size
    }

    pub fn get_chunk(&self, content_hash: &H256) -> Option<&Chunk> {
        self.chunks.get(content_hash)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn check_bytecode(&self, bytecode: &[u8]) -> StagingResult<()> {
        if bytecode.is_empty() {
            return Err(StagingError::EmptyBytecode);
        }
        if bytecode.len() > self.max_code_size {
            return Err(StagingError::SizeExceeded {
                size: bytecode.len(),
                max: self.max_code_size,
            });
        }
        Ok(())
    }

    /// Address and content hash `bytecode` would be staged under.
    pub fn predict(&self, bytecode: &[u8]) -> StagingResult<Prediction> {
        self.check_bytecode(bytecode)?;
        self.addresser
            .predict(bytecode)
            .map_err(|AddressError::InitCodeTooLarge { size, .. }| StagingError::SizeExceeded {
                size,
                max: self.max_code_size,
            })
    }

    /// Deploy `bytecode` once, at its predicted address, charging the current fee.
    ///
    /// Content already staged or already live is returned without charge,
    /// whatever `fee_paid` says.
    pub fn stage<C: Chain>(
        &mut self,
        chain: &mut C,
        payer: &Address,
        bytecode: &[u8],
        fee_paid: u128,
    ) -> StagingResult<StageReceipt> {
        let prediction = self.predict(bytecode)?;

        if let Some(existing) = self.chunks.get(&prediction.content_hash) {
            info!(
                "Chunk {:?} already staged at {:?}; nothing deployed, no fee charged",
                existing.content_hash, existing.deployed_address
            );
            return Ok(StageReceipt {
                chunk: existing.clone(),
                deployed: false,
                fee_charged: 0,
                event: None,
            });
        }

        let chunk = Chunk {
            content_hash: prediction.content_hash,
            predicted_address: prediction.address,
            deployed_address: prediction.address,
            size_bytes: bytecode.len(),
            staged_by: *payer,
        };

        // Code from an earlier run of the same factory is already live at the address
        if chain.code_hash(&prediction.address) == Some(prediction.content_hash) {
            self.chunks.insert(chunk.content_hash, chunk.clone());
            let event = StagingEvent::ChunkAdopted {
                content_hash: chunk.content_hash,
                address: chunk.deployed_address,
            };
            info!(
                "Chunk {:?} found live at {:?}; recorded without redeploying",
                chunk.content_hash, chunk.deployed_address
            );
            return Ok(StageReceipt {
                chunk,
                deployed: false,
                fee_charged: 0,
                event: Some(event),
            });
        }

        // Only a real deployment is fee-gated
        let required = self.fee.required();
        if fee_paid < required {
            warn!("Staging rejected: fee {} below required {}", fee_paid, required);
            return Err(StagingError::InsufficientFee {
                paid: fee_paid,
                required,
            });
        }

        let init = init_code(bytecode).map_err(|_| StagingError::SizeExceeded {
            size: bytecode.len(),
            max: self.max_code_size,
        })?;
        let deployer = self.addresser.deployer();
        let fee = self.fee;

        let deployed = atomically(chain, |chain| -> StagingResult<Address> {
            let deployed = chain.create2(&deployer, &prediction.salt, &init)?;
            if deployed != prediction.address {
                error!(
                    "FATAL: deployed {:?} but predicted {:?} for content {:?}",
                    deployed, prediction.address, prediction.content_hash
                );
                return Err(StagingError::AddressMismatch {
                    predicted: prediction.address,
                    deployed,
                });
            }

            if required > 0 {
                chain
                    .transfer(payer, &fee.recipient, required)
                    .map_err(|err| match err {
                        VmError::InsufficientBalance { balance, .. } => {
                            StagingError::InsufficientFunds {
                                payer: *payer,
                                balance,
                                required,
                            }
                        }
                        other => StagingError::Deployment(other),
                    })?;
            }
            Ok(deployed)
        })?;

        self.chunks.insert(chunk.content_hash, chunk.clone());
        let event = StagingEvent::ChunkStaged {
            content_hash: chunk.content_hash,
            address: deployed,
            size_bytes: chunk.size_bytes,
            fee_charged: required,
        };

        info!(
            "Staged chunk {:?} ({} bytes) at {:?}, fee {}",
            chunk.content_hash, chunk.size_bytes, deployed, required
        );

        Ok(StageReceipt {
            chunk,
            deployed: true,
            fee_charged: required,
            event: Some(event),
        })
    }

    /// Replace the fee parameters. Requires ADMIN.
    pub fn set_fee<A: CapabilityCheck>(
        &mut self,
        access: &A,
        caller: &Address,
        amount: u128,
        enabled: bool,
        recipient: Address,
    ) -> StagingResult<StagingEvent> {
        if !access.has_capability(caller, Capability::Admin) {
            warn!("Fee update by {:?} rejected: missing ADMIN", caller);
            return Err(StagingError::Unauthorized {
                caller: *caller,
                capability: Capability::Admin,
            });
        }

        let current = FeeConfig {
            amount,
            enabled,
            recipient,
        };
        current.validate()?;

        let event = StagingEvent::FeeUpdated {
            previous: self.fee,
            current,
            updated_by: *caller,
        };
        self.fee = current;

        info!(
            "Staging fee set to {} (enabled: {}) payable to {:?}",
            amount, enabled, recipient
        );
        Ok(event)
    }
}
