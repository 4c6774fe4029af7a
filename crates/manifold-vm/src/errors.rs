use manifold_types::{Address, ErrorKind, H256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("account {account:?} holds {balance}, needs {required}")]
    InsufficientBalance {
        account: Address,
        balance: u128,
        required: u128,
    },

    #[error("deployment target {0:?} already holds code")]
    AccountCollision(Address),

    #[error("init code is not a recognised creation stub")]
    MalformedInitCode,

    #[error("runtime code of {size} bytes exceeds host limit of {max}")]
    CodeTooLarge { size: usize, max: usize },

    #[error("no code at {0:?}")]
    NoCode(Address),

    #[error("code at {address:?} (hash {code_hash:?}) has no executable program bound")]
    UnknownProgram { address: Address, code_hash: H256 },
}

impl VmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VmError::InsufficientBalance { .. } | VmError::CodeTooLarge { .. } => {
                ErrorKind::ResourceLimit
            }
            VmError::AccountCollision(_) => ErrorKind::StateConflict,
            VmError::MalformedInitCode => ErrorKind::InvalidInput,
            VmError::NoCode(_) | VmError::UnknownProgram { .. } => ErrorKind::IntegrityViolation,
        }
    }
}
