/// MANIFOLD STAGING LEDGER
///
/// Stages facet bytecode at content-addressed, precomputed addresses so a
/// route manifest can name a facet before its code exists on a chain.
///
/// - Deployment is deduplicated by content hash
/// - Fees are charged atomically with the deployment, never without it
/// - A deployed address that differs from the prediction aborts the call

pub mod ledger;

pub use ledger::{
    Chunk, FeeConfig, StageReceipt, StagingError, StagingEvent, StagingLedger, StagingResult,
};
