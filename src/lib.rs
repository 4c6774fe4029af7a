//! # Manifold
//!
//! Manifest-driven call routing. Facet bytecode is staged at
//! content-addressed locations, operators commit a Merkle root over the
//! selector → facet routing table, the root becomes active only after an
//! observation delay, and every call is forwarded on the strength of a
//! per-call proof against the active root.
//!
//! This crate is the facade over the workspace: it wires the staging
//! ledger, epoch governor and dispatch router onto one host behind the
//! single-actor [`Protocol`], and adds manifest documents, configuration
//! and logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod protocol;

pub use config::{FeeSettings, ProtocolConfig};
pub use error::{ProtocolError, ProtocolResult};
pub use manifest::{Manifest, ManifestError, ManifestHeader, MANIFEST_VERSION};
pub use protocol::{Protocol, ProtocolEvent, SharedProtocol};

pub use manifold_crypto::{ContentAddresser, RouteManifestTree, RouteProof};
pub use manifold_governance::{EpochGovernor, EpochState, GovernanceEvent};
pub use manifold_router::DispatchRouter;
pub use manifold_staging::{Chunk, FeeConfig, StageReceipt, StagingEvent, StagingLedger};
pub use manifold_types::{
    keccak256, Address, Capability, CapabilityCheck, ErrorKind, Route, Selector,
    StaticCapabilities, Timestamp, H256,
};
pub use manifold_vm::{CallContext, CallOutcome, Chain, FacetProgram, InMemoryChain};
