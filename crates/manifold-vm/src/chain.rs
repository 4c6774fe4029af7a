use crate::context::CallOutcome;
use crate::errors::VmError;
use manifold_types::{Address, H256};

/// Host operations the protocol core needs from the execution environment.
pub trait Chain {
    /// Opaque copy of mutable host state, used to undo a failed call.
    type Snapshot;

    /// Hash of the runtime code at `address`, `None` when there is no code.
    fn code_hash(&self, address: &Address) -> Option<H256>;

    fn code(&self, address: &Address) -> Option<&[u8]>;

    fn balance(&self, address: &Address) -> u128;

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), VmError>;

    /// Deploy `init_code` from `deployer` at the salted, content-derived address.
    fn create2(&mut self, deployer: &Address, salt: &H256, init_code: &[u8])
        -> Result<Address, VmError>;

    /// Run the code of `code_address` against the storage of `context`,
    /// with `caller` observable as the caller.
    fn delegate_call(
        &mut self,
        context: &Address,
        code_address: &Address,
        caller: &Address,
        calldata: &[u8],
    ) -> Result<CallOutcome, VmError>;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: Self::Snapshot);
}

/// Run `f` against `chain`, rolling every host mutation back if it fails.
pub fn atomically<C, T, E, F>(chain: &mut C, f: F) -> Result<T, E>
where
    C: Chain,
    F: FnOnce(&mut C) -> Result<T, E>,
{
    let snapshot = chain.snapshot();
    match f(chain) {
        Ok(value) => Ok(value),
        Err(err) => {
            chain.restore(snapshot);
            Err(err)
        }
    }
}
