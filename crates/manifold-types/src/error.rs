use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse failure classes shared by every protocol operation.
///
/// Each crate keeps its own error enum with precise diagnostic data;
/// `kind()` on those enums maps every variant onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed selector, root, proof shape or bytecode.
    InvalidInput,

    /// Capability check failed.
    Unauthorized,

    /// Operation not allowed in the current governance state.
    StateConflict,

    /// Proof, code hash or deployment address does not match its commitment.
    IntegrityViolation,

    /// Size ceiling or fee requirement not met.
    ResourceLimit,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::StateConflict => "STATE_CONFLICT",
            ErrorKind::IntegrityViolation => "INTEGRITY_VIOLATION",
            ErrorKind::ResourceLimit => "RESOURCE_LIMIT",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
