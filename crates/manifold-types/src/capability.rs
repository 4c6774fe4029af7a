use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Privileges the protocol core asks about. Role storage lives elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Submit a new manifest root
    Commit,

    /// Promote the pending root once its delay has elapsed
    Activate,

    /// Freeze, pause/unpause, fee configuration
    Admin,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Commit => "COMMIT",
            Capability::Activate => "ACTIVATE",
            Capability::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External access-control boundary: "does `caller` hold `capability`?"
///
/// `false` is always treated as an authorization failure.
pub trait CapabilityCheck {
    fn has_capability(&self, caller: &Address, capability: Capability) -> bool;
}

impl<F> CapabilityCheck for F
where
    F: Fn(&Address, Capability) -> bool,
{
    fn has_capability(&self, caller: &Address, capability: Capability) -> bool {
        self(caller, capability)
    }
}

/// A fixed capability table, for tooling and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCapabilities {
    grants: HashMap<Address, HashSet<Capability>>,
}

impl StaticCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant every capability to `operator`.
    pub fn with_operator(operator: Address) -> Self {
        let mut table = Self::new();
        table.grant(operator, Capability::Commit);
        table.grant(operator, Capability::Activate);
        table.grant(operator, Capability::Admin);
        table
    }

    pub fn grant(&mut self, holder: Address, capability: Capability) {
        self.grants.entry(holder).or_default().insert(capability);
    }

    pub fn revoke(&mut self, holder: &Address, capability: Capability) -> bool {
        self.grants
            .get_mut(holder)
            .map(|caps| caps.remove(&capability))
            .unwrap_or(false)
    }
}

impl CapabilityCheck for StaticCapabilities {
    fn has_capability(&self, caller: &Address, capability: Capability) -> bool {
        self.grants
            .get(caller)
            .map(|caps| caps.contains(&capability))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_capabilities() {
        let alice = Address::from_low_u64_be(1);
        let bob = Address::from_low_u64_be(2);
        let mut table = StaticCapabilities::new();
        table.grant(alice, Capability::Commit);

        assert!(table.has_capability(&alice, Capability::Commit));
        assert!(!table.has_capability(&alice, Capability::Activate));
        assert!(!table.has_capability(&bob, Capability::Commit));

        assert!(table.revoke(&alice, Capability::Commit));
        assert!(!table.has_capability(&alice, Capability::Commit));
        assert!(!table.revoke(&bob, Capability::Admin));
    }

    #[test]
    fn test_closure_predicate() {
        let only_admin = |_: &Address, cap: Capability| cap == Capability::Admin;
        assert!(only_admin.has_capability(&Address::zero(), Capability::Admin));
        assert!(!only_admin.has_capability(&Address::zero(), Capability::Commit));
    }
}
