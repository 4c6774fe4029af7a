use manifold_types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Word-addressed persistent storage of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    slots: BTreeMap<H256, H256>,
}

impl Storage {
    pub fn load(&self, slot: &H256) -> H256 {
        self.slots.get(slot).copied().unwrap_or_default()
    }

    /// Zero values are not kept, matching an untouched slot.
    pub fn store(&mut self, slot: H256, value: H256) {
        if value.is_zero() {
            self.slots.remove(&slot);
        } else {
            self.slots.insert(slot, value);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Result of executing facet code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Normal return with output data
    Return(Vec<u8>),

    /// Revert with revert data; storage writes of the call are discarded
    Revert(Vec<u8>),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Return(_))
    }

    pub fn data(&self) -> &[u8] {
        match self {
            CallOutcome::Return(data) | CallOutcome::Revert(data) => data,
        }
    }
}

/// Execution frame handed to facet code.
///
/// Under delegated execution `address` is the dispatcher whose storage is
/// mutated, `code_address` is the facet whose code runs, and `caller` is the
/// external account that called the dispatcher.
pub struct CallContext<'a> {
    caller: Address,
    address: Address,
    code_address: Address,
    calldata: &'a [u8],
    storage: &'a mut Storage,
}

impl<'a> CallContext<'a> {
    pub fn new(
        caller: Address,
        address: Address,
        code_address: Address,
        calldata: &'a [u8],
        storage: &'a mut Storage,
    ) -> Self {
        Self {
            caller,
            address,
            code_address,
            calldata,
            storage,
        }
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn code_address(&self) -> Address {
        self.code_address
    }

    pub fn calldata(&self) -> &[u8] {
        self.calldata
    }

    /// Call data after the 4-byte selector.
    pub fn args(&self) -> &[u8] {
        self.calldata.get(4..).unwrap_or_default()
    }

    pub fn sload(&self, slot: &H256) -> H256 {
        self.storage.load(slot)
    }

    pub fn sstore(&mut self, slot: H256, value: H256) {
        self.storage.store(slot, value);
    }
}

/// Executable behaviour bound to a code hash on the host.
pub trait FacetProgram: Send + Sync {
    fn execute(&self, ctx: &mut CallContext<'_>) -> CallOutcome;
}

impl<F> FacetProgram for F
where
    F: Fn(&mut CallContext<'_>) -> CallOutcome + Send + Sync,
{
    fn execute(&self, ctx: &mut CallContext<'_>) -> CallOutcome {
        self(ctx)
    }
}
