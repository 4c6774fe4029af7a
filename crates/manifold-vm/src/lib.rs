pub mod chain;
pub mod context;
pub mod errors;
pub mod in_memory;

pub use chain::{atomically, Chain};
pub use context::{CallContext, CallOutcome, FacetProgram, Storage};
pub use errors::VmError;
pub use in_memory::{Account, InMemoryChain};
