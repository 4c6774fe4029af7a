//! Manifold dispatch router.
//!
//! Every forwarded call carries its own route proof. The router checks it
//! against the active epoch root, pins the facet's live code hash and then
//! runs the facet in the dispatcher's storage context.

pub mod dispatch_router;

pub use dispatch_router::{DispatchError, DispatchResult, DispatchRouter};
