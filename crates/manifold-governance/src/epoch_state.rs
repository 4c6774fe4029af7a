use manifold_types::{Timestamp, H256};
use serde::{Deserialize, Serialize};

/// A committed root waiting out its activation delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRoot {
    pub root: H256,
    pub epoch: u64,

    /// Host time of the commit
    pub since: Timestamp,
}

/// The governance record. Owned exclusively by the epoch governor; the
/// dispatch router reads `active_root`, `frozen` and `paused` only.
///
/// Invariants:
/// - a pending root always has `epoch > active_epoch`
/// - `frozen` never returns to `false`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochState {
    pub active_root: H256,
    pub active_epoch: u64,
    pub pending: Option<PendingRoot>,

    /// Seconds a pending root must wait before activation
    pub activation_delay: u64,

    pub frozen: bool,
    pub paused: bool,
}

impl EpochState {
    /// Genesis state: null active root, nothing resolvable.
    pub fn new(activation_delay: u64) -> Self {
        EpochState {
            active_root: H256::zero(),
            active_epoch: 0,
            pending: None,
            activation_delay,
            frozen: false,
            paused: false,
        }
    }

    pub fn has_active_root(&self) -> bool {
        !self.active_root.is_zero()
    }

    pub fn pending_root(&self) -> Option<H256> {
        self.pending.map(|p| p.root)
    }

    pub fn pending_epoch(&self) -> Option<u64> {
        self.pending.map(|p| p.epoch)
    }

    pub fn pending_since(&self) -> Option<u64> {
        self.pending.map(|p| p.since)
    }

    /// Earliest host time at which the pending root may be activated.
    pub fn activatable_at(&self) -> Option<u64> {
        self.pending
            .map(|p| p.since.saturating_add(self.activation_delay))
    }
}
