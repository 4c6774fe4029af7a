// DISPATCH ROUTER
// Selector → facet forwarding gated by the active route manifest root
//
// SAFETY INVARIANTS:
// 1. Nothing is forwarded while paused or before any root has been activated
// 2. A route is trusted only if its proof verifies against the *active* root
// 3. The facet's live code hash must equal the committed one at call time
// 4. Facet code runs against the dispatcher's storage with the original caller visible
// 5. A failed dispatch leaves host state exactly as it was

use manifold_crypto::RouteProof;
use manifold_governance::EpochState;
use manifold_types::{Address, ErrorKind, Route, Selector, H256};
use manifold_vm::{atomically, CallOutcome, Chain, VmError};
use thiserror::Error;
use tracing::{debug, info, warn};

// ==================== ERROR TYPES ====================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatch is paused")]
    Paused,

    #[error("no route manifest root has been activated")]
    NoActiveRoot,

    #[error("proof routes selector {proven}, call is for {requested}")]
    SelectorMismatch { requested: Selector, proven: Selector },

    #[error("call data starts with {found:?}, call is for {requested}")]
    CalldataSelectorMismatch {
        requested: Selector,

        /// `None` when the call data is shorter than a selector
        found: Option<Selector>,
    },

    #[error("malformed proof: {0}")]
    MalformedProof(#[from] manifold_crypto::TreeError),

    #[error("route for {selector} does not verify against active root {root:?}")]
    InvalidProof { selector: Selector, root: H256 },

    #[error("facet {facet:?} code hash is {actual:?}, route pins {expected:?}")]
    CodeHashMismatch {
        facet: Address,
        expected: H256,

        /// Zero when the facet address holds no code
        actual: H256,
    },

    #[error("facet {facet:?} reverted with 0x{}", hex::encode(.data))]
    FacetReverted { facet: Address, data: Vec<u8> },

    #[error("host error: {0}")]
    Host(#[from] VmError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Paused | DispatchError::NoActiveRoot => ErrorKind::StateConflict,
            DispatchError::SelectorMismatch { .. }
            | DispatchError::CalldataSelectorMismatch { .. }
            | DispatchError::MalformedProof(_)
            | DispatchError::FacetReverted { .. } => ErrorKind::InvalidInput,
            DispatchError::InvalidProof { .. } | DispatchError::CodeHashMismatch { .. } => {
                ErrorKind::IntegrityViolation
            }
            DispatchError::Host(err) => err.kind(),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

// ==================== ROUTER ====================

/// The dispatcher. `address` is the storage context facets execute in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRouter {
    address: Address,
}

impl DispatchRouter {
    pub fn new(address: Address) -> Self {
        DispatchRouter { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Run every pre-forwarding check and return the verified route.
    ///
    /// Read-only: neither `state` nor the host is touched.
    pub fn resolve<C: Chain>(
        &self,
        state: &EpochState,
        chain: &C,
        selector: Selector,
        proof: &RouteProof,
    ) -> DispatchResult<Route> {
        if state.paused {
            return Err(DispatchError::Paused);
        }
        if !state.has_active_root() {
            return Err(DispatchError::NoActiveRoot);
        }

        let route = proof.route;
        if route.selector != selector {
            return Err(DispatchError::SelectorMismatch {
                requested: selector,
                proven: route.selector,
            });
        }

        proof.check_shape()?;
        if !proof.verify(&state.active_root) {
            warn!(
                selector = %selector,
                epoch = state.active_epoch,
                "route proof rejected against active root"
            );
            return Err(DispatchError::InvalidProof {
                selector,
                root: state.active_root,
            });
        }

        let actual = chain.code_hash(&route.facet).unwrap_or_default();
        if actual != route.code_hash {
            warn!(
                facet = ?route.facet,
                expected = ?route.code_hash,
                actual = ?actual,
                "facet code drifted since commit"
            );
            return Err(DispatchError::CodeHashMismatch {
                facet: route.facet,
                expected: route.code_hash,
                actual,
            });
        }

        Ok(route)
    }

    /// Forward `calldata` to the facet proven for `selector`.
    ///
    /// `calldata` must begin with `selector`; the facet picks its function
    /// from those bytes. Returns the facet's return data verbatim; a facet revert surfaces as
    /// `FacetReverted` carrying the revert data verbatim.
    pub fn dispatch<C: Chain>(
        &self,
        state: &EpochState,
        chain: &mut C,
        caller: &Address,
        selector: Selector,
        calldata: &[u8],
        proof: &RouteProof,
    ) -> DispatchResult<Vec<u8>> {
        let route = self.resolve(state, chain, selector, proof)?;

        let found = Selector::from_calldata(calldata);
        if found != Some(selector) {
            warn!(selector = %selector, found = ?found, "call data does not carry the proven selector");
            return Err(DispatchError::CalldataSelectorMismatch {
                requested: selector,
                found,
            });
        }

        debug!(
            selector = %selector,
            facet = ?route.facet,
            caller = ?caller,
            "forwarding call"
        );

        let dispatcher = self.address;
        let outcome = atomically(chain, |chain| -> DispatchResult<Vec<u8>> {
            match chain.delegate_call(&dispatcher, &route.facet, caller, calldata)? {
                CallOutcome::Return(data) => Ok(data),
                CallOutcome::Revert(data) => Err(DispatchError::FacetReverted {
                    facet: route.facet,
                    data,
                }),
            }
        });

        match &outcome {
            Ok(data) => info!(
                selector = %selector,
                epoch = state.active_epoch,
                return_len = data.len(),
                "dispatch complete"
            ),
            Err(err) => warn!(selector = %selector, error = %err, "dispatch failed"),
        }
        outcome
    }
}
