/// Route Manifest Tree
///
/// Merkle tree over routing entries. The operator builds it offline; the
/// dispatcher only ever sees the root plus one proof per call.
///
/// SAFETY GUARANTEES:
/// - Leaf = keccak256(selector || facet || code_hash), 56-byte packed preimage
/// - Inner node = keccak256(min(a, b) || max(a, b)), so proofs carry no direction bits
/// - An unpaired node is promoted unchanged to the next level
/// - A single-leaf tree has root == leaf and an empty proof
/// - Construction and verification share `hash_pair`; there is no second copy of the rule

use manifold_types::{keccak256, ErrorKind, Route, Selector, H256};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Longest proof accepted; a tree over the full 2^32 selector space is 32 levels deep.
pub const MAX_PROOF_DEPTH: usize = 32;

// ==================== ERROR TYPES ====================

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TreeError {
    #[error("route set is empty")]
    EmptyRouteSet,

    #[error("selector {0} appears more than once in the route set")]
    DuplicateSelector(Selector),

    #[error("leaf index {index} out of range for {leaf_count} leaves")]
    LeafIndexOutOfRange { index: usize, leaf_count: usize },

    #[error("selector {0} is not routed by this manifest")]
    SelectorNotFound(Selector),

    #[error("proof has {depth} siblings, maximum is {max}")]
    ProofTooDeep { depth: usize, max: usize },
}

impl TreeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

pub type TreeResult<T> = Result<T, TreeError>;

// ==================== HASHING RULES ====================

/// Leaf digest of one route.
pub fn leaf_hash(route: &Route) -> H256 {
    keccak256(route.packed())
}

/// Parent digest of two children, smaller digest first.
pub fn hash_pair(a: &H256, b: &H256) -> H256 {
    let (first, second) = if a.as_bytes() <= b.as_bytes() {
        (a, b)
    } else {
        (b, a)
    };
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(first.as_bytes());
    preimage[32..].copy_from_slice(second.as_bytes());
    keccak256(preimage)
}

/// Recompute the path from `leaf` through `proof` and compare with `root`.
pub fn verify(leaf: &H256, proof: &[H256], root: &H256) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |current, sibling| hash_pair(&current, sibling));
    computed == *root
}

// ==================== CORE TYPES ====================

/// Root commitment handed to the epoch governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRoot {
    pub root: H256,
    pub epoch: u64,
    pub leaf_count: usize,
}

/// A route together with the sibling path that proves it against a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteProof {
    pub route: Route,

    /// Sibling digests from the leaf level upward
    pub siblings: Vec<H256>,
}

impl RouteProof {
    pub fn new(route: Route, siblings: Vec<H256>) -> Self {
        Self { route, siblings }
    }

    pub fn leaf(&self) -> H256 {
        leaf_hash(&self.route)
    }

    /// Reject proofs that no well-formed tree could have produced.
    pub fn check_shape(&self) -> TreeResult<()> {
        if self.siblings.len() > MAX_PROOF_DEPTH {
            return Err(TreeError::ProofTooDeep {
                depth: self.siblings.len(),
                max: MAX_PROOF_DEPTH,
            });
        }
        Ok(())
    }

    pub fn verify(&self, root: &H256) -> bool {
        self.check_shape().is_ok() && verify(&self.leaf(), &self.siblings, root)
    }
}

/// Complete tree: every level is retained so proofs are cheap to extract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteManifestTree {
    routes: Vec<Route>,

    /// levels[0] = leaves, last level = [root]
    levels: Vec<Vec<H256>>,
}

impl RouteManifestTree {
    /// Build the tree bottom-up from routes in manifest order.
    pub fn build(routes: &[Route]) -> TreeResult<Self> {
        if routes.is_empty() {
            return Err(TreeError::EmptyRouteSet);
        }

        let mut seen = HashSet::with_capacity(routes.len());
        for route in routes {
            if !seen.insert(route.selector) {
                return Err(TreeError::DuplicateSelector(route.selector));
            }
        }

        let leaves: Vec<H256> = routes.iter().map(leaf_hash).collect();
        let mut levels = vec![leaves];

        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<H256> = level
                .chunks(2)
                .map(|pair| match pair.get(1) {
                    Some(right) => hash_pair(&pair[0], right),
                    None => pair[0],
                })
                .collect();
            levels.push(next);
        }

        log::debug!(
            "built route manifest tree: {} leaves, {} levels",
            routes.len(),
            levels.len()
        );

        Ok(Self {
            routes: routes.to_vec(),
            levels,
        })
    }

    pub fn root(&self) -> H256 {
        // build() guarantees at least one level with exactly one top node
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_default()
    }

    pub fn leaf_count(&self) -> usize {
        self.routes.len()
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn leaves(&self) -> &[H256] {
        &self.levels[0]
    }

    pub fn commitment(&self, epoch: u64) -> ManifestRoot {
        ManifestRoot {
            root: self.root(),
            epoch,
            leaf_count: self.leaf_count(),
        }
    }

    /// Sibling path for the leaf at `index`.
    pub fn proof(&self, index: usize) -> TreeResult<Vec<H256>> {
        if index >= self.leaf_count() {
            return Err(TreeError::LeafIndexOutOfRange {
                index,
                leaf_count: self.leaf_count(),
            });
        }

        let mut path = Vec::with_capacity(self.depth());
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = position ^ 1;
            if let Some(hash) = level.get(sibling) {
                path.push(*hash);
            }
            position /= 2;
        }
        Ok(path)
    }

    pub fn proof_for_selector(&self, selector: Selector) -> TreeResult<RouteProof> {
        let index = self
            .routes
            .iter()
            .position(|route| route.selector == selector)
            .ok_or(TreeError::SelectorNotFound(selector))?;
        Ok(RouteProof::new(self.routes[index], self.proof(index)?))
    }

    /// One proof per route, in manifest order.
    pub fn proofs(&self) -> Vec<RouteProof> {
        self.routes
            .iter()
            .enumerate()
            .filter_map(|(index, route)| {
                self.proof(index).ok().map(|path| RouteProof::new(*route, path))
            })
            .collect()
    }
}
