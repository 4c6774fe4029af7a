// EPOCH GOVERNOR
// Commit → delay → activate state machine over the active route manifest root
//
// SAFETY INVARIANTS:
// 1. A committed root never becomes active before its activation delay has elapsed
// 2. Epochs strictly increase: pending > active, and a new commit must outrank any pending one
// 3. Freeze is terminal: once frozen, commit and activate fail forever
// 4. Pause only gates dispatch; governance keeps working while paused
// 5. Every operation is all-or-nothing: a failed call leaves EpochState untouched
// 6. Authorization is delegated to the injected capability predicate

use crate::epoch_state::{EpochState, PendingRoot};
use log::{info, warn};
use manifold_types::{Address, Capability, CapabilityCheck, ErrorKind, Timestamp, H256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    #[error("governance is frozen")]
    Frozen,

    #[error("epoch {epoch} is not above active epoch {active_epoch} / pending epoch {pending_epoch:?}")]
    EpochNotMonotonic {
        epoch: u64,
        active_epoch: u64,
        pending_epoch: Option<u64>,
    },

    #[error("no pending root")]
    NoPendingRoot,

    #[error("activation delay not elapsed: now {now}, activatable at {activatable_at}")]
    DelayNotElapsed { now: Timestamp, activatable_at: Timestamp },

    #[error("a root for epoch {0} is pending")]
    PendingRootExists(u64),

    #[error("already paused")]
    AlreadyPaused,

    #[error("not paused")]
    NotPaused,

    #[error("root must not be zero")]
    NullRoot,

    #[error("caller {caller:?} lacks {capability} capability")]
    Unauthorized {
        caller: Address,
        capability: Capability,
    },
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::NullRoot => ErrorKind::InvalidInput,
            GovernanceError::Unauthorized { .. } => ErrorKind::Unauthorized,
            _ => ErrorKind::StateConflict,
        }
    }
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;

/// Auditable record of every successful governance transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceEvent {
    RootCommitted {
        root: H256,
        epoch: u64,
        committed_at: Timestamp,
        activatable_at: Timestamp,

        /// Lower-epoch pending root replaced by this commit
        superseded: Option<PendingRoot>,
    },

    RootActivated {
        root: H256,
        epoch: u64,
        previous_root: H256,
        previous_epoch: u64,
        activated_at: Timestamp,
    },

    PendingCancelled { root: H256, epoch: u64 },

    DelayUpdated { previous: u64, current: u64 },

    Frozen {
        active_root: H256,
        active_epoch: u64,

        /// Pending root dropped by the freeze
        discarded: Option<PendingRoot>,
    },

    Paused { by: Address },

    Unpaused { by: Address },
}

/// Stateless rule engine: `EpochState` is passed in explicitly on every call.
#[derive(Debug, Clone)]
pub struct EpochGovernor<A> {
    access: A,
}

impl<A: CapabilityCheck> EpochGovernor<A> {
    pub fn new(access: A) -> Self {
        EpochGovernor { access }
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    fn require(&self, caller: &Address, capability: Capability) -> GovernanceResult<()> {
        if self.access.has_capability(caller, capability) {
            Ok(())
        } else {
            warn!("Governance call by {:?} rejected: missing {}", caller, capability);
            Err(GovernanceError::Unauthorized {
                caller: *caller,
                capability,
            })
        }
    }

    /// Stage `root` as the pending root for `epoch`, starting its delay window now.
    pub fn commit(
        &self,
        state: &mut EpochState,
        caller: &Address,
        root: H256,
        epoch: u64,
        now: Timestamp,
    ) -> GovernanceResult<GovernanceEvent> {
        if state.frozen {
            return Err(GovernanceError::Frozen);
        }
        self.require(caller, Capability::Commit)?;

        if root.is_zero() {
            return Err(GovernanceError::NullRoot);
        }

        let pending_epoch = state.pending_epoch();
        if epoch <= state.active_epoch || pending_epoch.map_or(false, |p| p >= epoch) {
            return Err(GovernanceError::EpochNotMonotonic {
                epoch,
                active_epoch: state.active_epoch,
                pending_epoch,
            });
        }

        let superseded = state.pending.replace(PendingRoot {
            root,
            epoch,
            since: now,
        });
        let activatable_at = now.saturating_add(state.activation_delay);

        info!(
            "Root {:?} committed for epoch {} at {}, activatable at {}",
            root, epoch, now, activatable_at
        );
        if let Some(old) = superseded {
            info!("Pending root {:?} (epoch {}) superseded", old.root, old.epoch);
        }

        Ok(GovernanceEvent::RootCommitted {
            root,
            epoch,
            committed_at: now,
            activatable_at,
            superseded,
        })
    }

    /// Promote the pending root to active once its delay has elapsed.
    pub fn activate_committed_root(
        &self,
        state: &mut EpochState,
        caller: &Address,
        now: Timestamp,
    ) -> GovernanceResult<GovernanceEvent> {
        if state.frozen {
            return Err(GovernanceError::Frozen);
        }
        self.require(caller, Capability::Activate)?;

        let pending = state.pending.ok_or(GovernanceError::NoPendingRoot)?;
        let activatable_at = pending.since.saturating_add(state.activation_delay);
        if now < activatable_at {
            return Err(GovernanceError::DelayNotElapsed { now, activatable_at });
        }

        let event = GovernanceEvent::RootActivated {
            root: pending.root,
            epoch: pending.epoch,
            previous_root: state.active_root,
            previous_epoch: state.active_epoch,
            activated_at: now,
        };

        state.active_root = pending.root;
        state.active_epoch = pending.epoch;
        state.pending = None;

        info!("Root {:?} active for epoch {}", pending.root, pending.epoch);
        Ok(event)
    }

    /// Drop the pending root without activating it. Requires ADMIN.
    pub fn cancel_pending(
        &self,
        state: &mut EpochState,
        caller: &Address,
    ) -> GovernanceResult<GovernanceEvent> {
        if state.frozen {
            return Err(GovernanceError::Frozen);
        }
        self.require(caller, Capability::Admin)?;

        let pending = state.pending.take().ok_or(GovernanceError::NoPendingRoot)?;
        warn!("Pending root {:?} (epoch {}) cancelled", pending.root, pending.epoch);
        Ok(GovernanceEvent::PendingCancelled {
            root: pending.root,
            epoch: pending.epoch,
        })
    }

    /// Change the delay for future commits; refused while a root is pending.
    pub fn set_activation_delay(
        &self,
        state: &mut EpochState,
        caller: &Address,
        delay: u64,
    ) -> GovernanceResult<GovernanceEvent> {
        if state.frozen {
            return Err(GovernanceError::Frozen);
        }
        self.require(caller, Capability::Admin)?;

        if let Some(epoch) = state.pending_epoch() {
            return Err(GovernanceError::PendingRootExists(epoch));
        }

        let previous = std::mem::replace(&mut state.activation_delay, delay);
        info!("Activation delay changed from {}s to {}s", previous, delay);
        Ok(GovernanceEvent::DelayUpdated {
            previous,
            current: delay,
        })
    }

    /// One-way: the active route table can never change afterwards.
    pub fn freeze(&self, state: &mut EpochState, caller: &Address) -> GovernanceResult<GovernanceEvent> {
        if state.frozen {
            return Err(GovernanceError::Frozen);
        }
        self.require(caller, Capability::Admin)?;

        state.frozen = true;
        let discarded = state.pending.take();

        warn!(
            "Governance FROZEN at epoch {} with root {:?}",
            state.active_epoch, state.active_root
        );
        Ok(GovernanceEvent::Frozen {
            active_root: state.active_root,
            active_epoch: state.active_epoch,
            discarded,
        })
    }

    pub fn pause(&self, state: &mut EpochState, caller: &Address) -> GovernanceResult<GovernanceEvent> {
        self.require(caller, Capability::Admin)?;
        if state.paused {
            return Err(GovernanceError::AlreadyPaused);
        }
        state.paused = true;
        warn!("Dispatch paused by {:?}", caller);
        Ok(GovernanceEvent::Paused { by: *caller })
    }

    pub fn unpause(&self, state: &mut EpochState, caller: &Address) -> GovernanceResult<GovernanceEvent> {
        self.require(caller, Capability::Admin)?;
        if !state.paused {
            return Err(GovernanceError::NotPaused);
        }
        state.paused = false;
        info!("Dispatch resumed by {:?}", caller);
        Ok(GovernanceEvent::Unpaused { by: *caller })
    }
}
