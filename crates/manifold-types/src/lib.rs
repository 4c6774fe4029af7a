//! Shared primitives for the Manifold routing protocol.
//!
//! Every other crate in the workspace speaks in these types: 20-byte
//! addresses, 32-byte digests, 4-byte selectors, routes and the
//! capability predicate consumed by governance and staging.

pub mod capability;
pub mod error;
pub mod hash;
pub mod route;
pub mod selector;

pub use primitive_types::{H160, H256};

/// A 20-byte account address.
pub type Address = H160;

/// Seconds since the Unix epoch, as observed by the host.
pub type Timestamp = u64;

pub use capability::{Capability, CapabilityCheck, StaticCapabilities};
pub use error::{ErrorKind, ParseError};
pub use hash::{keccak256, parse_address, parse_h256};
pub use route::Route;
pub use selector::Selector;
