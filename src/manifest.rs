/// Route Manifest Documents
///
/// The JSON file operators build, review and hand to governance. The core's
/// only contract with it: rebuilding the tree from `routes` must reproduce
/// `root` bit-for-bit.
///
/// SAFETY GUARANTEES:
/// - `root` and `merkleRoot` are both checked against the rebuilt tree
/// - `manifest_hash` is keccak256 over the bincode encoding, so it is stable
///   across JSON formatting differences
/// - Each header names the hash of its predecessor, forming an audit chain

use chrono::{DateTime, Utc};
use manifold_crypto::{RouteManifestTree, RouteProof, TreeError};
use manifold_types::{keccak256, Address, ErrorKind, Route, H256};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub const MANIFEST_VERSION: &str = "1.0.0";

// ==================== ERROR TYPES ====================

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encoding: {0}")]
    Encoding(#[from] bincode::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("{field} is {embedded:?} but routes rebuild to {rebuilt:?}")]
    RootMismatch {
        field: &'static str,
        embedded: H256,
        rebuilt: H256,
    },

    #[error("previousHash is {found:?}, predecessor hashes to {expected:?}")]
    BrokenChain { expected: H256, found: Option<H256> },

    #[error("chain id {found} does not follow predecessor's {expected}")]
    ChainIdChanged { expected: u64, found: u64 },
}

impl ManifestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManifestError::Tree(err) => err.kind(),
            ManifestError::RootMismatch { .. } | ManifestError::BrokenChain { .. } => {
                ErrorKind::IntegrityViolation
            }
            _ => ErrorKind::InvalidInput,
        }
    }
}

// ==================== DOCUMENT ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestHeader {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub deployer: Address,
    pub chain_id: u64,

    /// `manifest_hash` of the manifest this one replaces; `None` for the first
    pub previous_hash: Option<H256>,
}

impl ManifestHeader {
    pub fn new(deployer: Address, chain_id: u64, previous_hash: Option<H256>) -> Self {
        ManifestHeader {
            version: MANIFEST_VERSION.to_string(),
            timestamp: Utc::now(),
            deployer,
            chain_id,
            previous_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub header: ManifestHeader,
    pub routes: Vec<Route>,
    pub root: H256,
    pub merkle_root: H256,
}

impl Manifest {
    /// Build the tree over `routes` and embed its root.
    pub fn build(header: ManifestHeader, routes: Vec<Route>) -> Result<Self, ManifestError> {
        let tree = RouteManifestTree::build(&routes)?;
        let root = tree.root();
        info!(routes = routes.len(), root = ?root, "manifest built");
        Ok(Manifest {
            header,
            routes,
            root,
            merkle_root: root,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let manifest: Manifest = serde_json::from_str(&raw)?;
        debug!(path = %path.as_ref().display(), routes = manifest.routes.len(), "manifest loaded");
        Ok(manifest)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "manifest saved");
        Ok(())
    }

    pub fn tree(&self) -> Result<RouteManifestTree, ManifestError> {
        Ok(RouteManifestTree::build(&self.routes)?)
    }

    /// Rebuild the tree and require both embedded roots to match it.
    pub fn verify_root(&self) -> Result<RouteManifestTree, ManifestError> {
        let tree = self.tree()?;
        let rebuilt = tree.root();
        for (field, embedded) in [("root", self.root), ("merkleRoot", self.merkle_root)] {
            if embedded != rebuilt {
                return Err(ManifestError::RootMismatch {
                    field,
                    embedded,
                    rebuilt,
                });
            }
        }
        Ok(tree)
    }

    pub fn manifest_hash(&self) -> Result<H256, ManifestError> {
        Ok(keccak256(bincode::serialize(self)?))
    }

    /// Check that this manifest chains onto `previous`.
    pub fn verify_previous(&self, previous: &Manifest) -> Result<(), ManifestError> {
        let expected = previous.manifest_hash()?;
        if self.header.previous_hash != Some(expected) {
            return Err(ManifestError::BrokenChain {
                expected,
                found: self.header.previous_hash,
            });
        }
        if self.header.chain_id != previous.header.chain_id {
            return Err(ManifestError::ChainIdChanged {
                expected: previous.header.chain_id,
                found: self.header.chain_id,
            });
        }
        Ok(())
    }

    /// One proof per route, in manifest order, after verifying the root.
    pub fn proofs(&self) -> Result<Vec<RouteProof>, ManifestError> {
        Ok(self.verify_root()?.proofs())
    }
}
