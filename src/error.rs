use crate::config::ConfigError;
use crate::manifest::ManifestError;
use manifold_crypto::TreeError;
use manifold_governance::GovernanceError;
use manifold_router::DispatchError;
use manifold_staging::StagingError;
use manifold_types::ErrorKind;
use manifold_vm::VmError;
use thiserror::Error;

/// Every failure the facade can surface, each tagged with one [`ErrorKind`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("route tree: {0}")]
    Tree(#[from] TreeError),

    #[error("staging: {0}")]
    Staging(#[from] StagingError),

    #[error("governance: {0}")]
    Governance(#[from] GovernanceError),

    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("host: {0}")]
    Host(#[from] VmError),

    #[error("logging already initialised: {0}")]
    Logging(String),
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Config(err) => err.kind(),
            ProtocolError::Manifest(err) => err.kind(),
            ProtocolError::Tree(err) => err.kind(),
            ProtocolError::Staging(err) => err.kind(),
            ProtocolError::Governance(err) => err.kind(),
            ProtocolError::Dispatch(err) => err.kind(),
            ProtocolError::Host(err) => err.kind(),
            ProtocolError::Logging(_) => ErrorKind::StateConflict,
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
