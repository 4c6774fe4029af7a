// Epoch governance over the active route manifest root
pub mod epoch_governor;
pub mod epoch_state;

pub use epoch_state::{EpochState, PendingRoot};

pub use epoch_governor::{
    EpochGovernor, GovernanceError, GovernanceEvent, GovernanceResult,
};
