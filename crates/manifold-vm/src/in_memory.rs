// IN-MEMORY HOST
// Single-actor chain state used by the protocol core, tooling and tests
//
// SAFETY INVARIANTS:
// 1. CREATE2 addresses follow keccak256(0xff || deployer || salt || keccak256(init))[12..]
// 2. A deployment target that already holds code is never overwritten by create2
// 3. A reverted delegated call leaves the context account's storage untouched
// 4. restore(snapshot) returns accounts and counters to the exact snapshotted state

use crate::chain::Chain;
use crate::context::{CallContext, CallOutcome, FacetProgram, Storage};
use crate::errors::VmError;
use manifold_crypto::{code_hash, create2_address, INIT_CODE_PREFIX_LEN, MAX_CODE_SIZE};
use manifold_types::{keccak256, Address, H256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Opcode sequence of the creation stub, with the two length bytes masked out.
const STUB_OPCODES: [(usize, u8); 8] = [
    (0, 0x61),
    (3, 0x80),
    (4, 0x60),
    (5, 0x0a),
    (6, 0x3d),
    (7, 0x39),
    (8, 0x3d),
    (9, 0xf3),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: u128,
    pub code: Vec<u8>,
    pub code_hash: Option<H256>,
    pub storage: Storage,
}

impl Account {
    pub fn has_code(&self) -> bool {
        self.code_hash.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct HostSnapshot {
    accounts: HashMap<Address, Account>,
    deployments: u64,
}

/// Account state plus the code-hash → program bindings that make code executable.
#[derive(Clone)]
pub struct InMemoryChain {
    chain_id: u64,
    max_code_size: usize,
    accounts: HashMap<Address, Account>,
    programs: HashMap<H256, Arc<dyn FacetProgram>>,
    deployments: u64,
}

impl std::fmt::Debug for InMemoryChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChain")
            .field("chain_id", &self.chain_id)
            .field("accounts", &self.accounts.len())
            .field("programs", &self.programs.len())
            .field("deployments", &self.deployments)
            .finish()
    }
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new(1)
    }
}

impl InMemoryChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            max_code_size: MAX_CODE_SIZE,
            accounts: HashMap::new(),
            programs: HashMap::new(),
            deployments: 0,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Number of successful create2 deployments so far.
    pub fn deployments(&self) -> u64 {
        self.deployments
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn storage(&self, address: &Address) -> Option<&Storage> {
        self.accounts.get(address).map(|account| &account.storage)
    }

    pub fn fund(&mut self, address: Address, amount: u128) {
        let account = self.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Make `code` executable: calls into any account holding it run `program`.
    pub fn register_program(&mut self, code: &[u8], program: Arc<dyn FacetProgram>) -> H256 {
        let hash = code_hash(code);
        self.programs.insert(hash, program);
        hash
    }

    /// Install or replace runtime code directly, bypassing create2.
    ///
    /// Models genesis allocations and metamorphic redeployment at a reused address.
    pub fn set_code(&mut self, address: Address, code: Vec<u8>) {
        let account = self.accounts.entry(address).or_default();
        account.code_hash = Some(code_hash(&code));
        account.code = code;
        debug!(address = ?address, code_hash = ?account.code_hash, "code installed");
    }

    /// Remove runtime code, as a self-destruct would.
    pub fn clear_code(&mut self, address: &Address) {
        if let Some(account) = self.accounts.get_mut(address) {
            account.code.clear();
            account.code_hash = None;
        }
    }

    fn runtime_from_init_code<'c>(&self, init_code: &'c [u8]) -> Result<&'c [u8], VmError> {
        if init_code.len() < INIT_CODE_PREFIX_LEN
            || STUB_OPCODES.iter().any(|(at, op)| init_code[*at] != *op)
        {
            return Err(VmError::MalformedInitCode);
        }
        let declared = u16::from_be_bytes([init_code[1], init_code[2]]) as usize;
        let runtime = &init_code[INIT_CODE_PREFIX_LEN..];
        if runtime.len() != declared {
            return Err(VmError::MalformedInitCode);
        }
        if runtime.len() > self.max_code_size {
            return Err(VmError::CodeTooLarge {
                size: runtime.len(),
                max: self.max_code_size,
            });
        }
        Ok(runtime)
    }
}

impl Chain for InMemoryChain {
    type Snapshot = HostSnapshot;

    fn code_hash(&self, address: &Address) -> Option<H256> {
        self.accounts.get(address).and_then(|account| account.code_hash)
    }

    fn code(&self, address: &Address) -> Option<&[u8]> {
        self.accounts
            .get(address)
            .filter(|account| account.has_code())
            .map(|account| account.code.as_slice())
    }

    fn balance(&self, address: &Address) -> u128 {
        self.accounts.get(address).map(|a| a.balance).unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), VmError> {
        let balance = self.balance(from);
        if balance < amount {
            return Err(VmError::InsufficientBalance {
                account: *from,
                balance,
                required: amount,
            });
        }
        if amount == 0 || from == to {
            return Ok(());
        }
        self.accounts.entry(*from).or_default().balance = balance - amount;
        let recipient = self.accounts.entry(*to).or_default();
        recipient.balance = recipient.balance.saturating_add(amount);
        trace!(from = ?from, to = ?to, amount, "transfer");
        Ok(())
    }

    fn create2(
        &mut self,
        deployer: &Address,
        salt: &H256,
        init_code: &[u8],
    ) -> Result<Address, VmError> {
        let runtime = self.runtime_from_init_code(init_code)?.to_vec();
        let address = create2_address(deployer, salt, &keccak256(init_code));

        if self.accounts.get(&address).map(Account::has_code).unwrap_or(false) {
            return Err(VmError::AccountCollision(address));
        }

        let account = self.accounts.entry(address).or_default();
        account.code_hash = Some(code_hash(&runtime));
        account.code = runtime;
        self.deployments += 1;

        debug!(
            deployer = ?deployer,
            address = ?address,
            size = init_code.len() - INIT_CODE_PREFIX_LEN,
            "create2 deployment"
        );
        Ok(address)
    }

    fn delegate_call(
        &mut self,
        context: &Address,
        code_address: &Address,
        caller: &Address,
        calldata: &[u8],
    ) -> Result<CallOutcome, VmError> {
        let code_hash = self
            .code_hash(code_address)
            .ok_or(VmError::NoCode(*code_address))?;
        let program = self
            .programs
            .get(&code_hash)
            .cloned()
            .ok_or(VmError::UnknownProgram {
                address: *code_address,
                code_hash,
            })?;

        let account = self.accounts.entry(*context).or_default();
        let original = account.storage.clone();
        let mut storage = std::mem::take(&mut account.storage);

        let outcome = {
            let mut ctx = CallContext::new(*caller, *context, *code_address, calldata, &mut storage);
            program.execute(&mut ctx)
        };

        let account = self.accounts.entry(*context).or_default();
        account.storage = match outcome {
            CallOutcome::Return(_) => storage,
            CallOutcome::Revert(_) => original,
        };

        trace!(
            context = ?context,
            facet = ?code_address,
            success = outcome.is_success(),
            "delegate call"
        );
        Ok(outcome)
    }

    fn snapshot(&self) -> Self::Snapshot {
        HostSnapshot {
            accounts: self.accounts.clone(),
            deployments: self.deployments,
        }
    }

    fn restore(&mut self, snapshot: Self::Snapshot) {
        self.accounts = snapshot.accounts;
        self.deployments = snapshot.deployments;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::atomically;
    use manifold_crypto::init_code;
    use tracing_test::traced_test;

    fn echo_caller() -> Arc<dyn FacetProgram> {
        Arc::new(|ctx: &mut CallContext<'_>| {
            ctx.sstore(H256::from_low_u64_be(1), H256::from(ctx.caller()));
            CallOutcome::Return(ctx.caller().as_bytes().to_vec())
        })
    }

    #[test]
    #[traced_test]
    fn test_create2_deploys_runtime_code() {
        let mut chain = InMemoryChain::new(31337);
        let deployer = Address::from_low_u64_be(0xde);
        let salt = H256::repeat_byte(7);
        let runtime = b"runtime".to_vec();
        let init = init_code(&runtime).unwrap();

        let address = chain.create2(&deployer, &salt, &init).unwrap();
        assert_eq!(address, create2_address(&deployer, &salt, &keccak256(&init)));
        assert_eq!(chain.code(&address), Some(runtime.as_slice()));
        assert_eq!(chain.code_hash(&address), Some(code_hash(&runtime)));
        assert_eq!(chain.deployments(), 1);
        assert!(logs_contain("create2 deployment"));

        assert_eq!(
            chain.create2(&deployer, &salt, &init),
            Err(VmError::AccountCollision(address))
        );
    }

    #[test]
    fn test_create2_rejects_bad_init_code() {
        let mut chain = InMemoryChain::default();
        let err = chain
            .create2(&Address::zero(), &H256::zero(), b"not a stub at all")
            .unwrap_err();
        assert_eq!(err, VmError::MalformedInitCode);

        let mut truncated = init_code(b"abcdef").unwrap();
        truncated.pop();
        assert_eq!(
            chain.create2(&Address::zero(), &H256::zero(), &truncated),
            Err(VmError::MalformedInitCode)
        );
    }

    #[test]
    fn test_transfer_checks_balance() {
        let mut chain = InMemoryChain::default();
        let a = Address::from_low_u64_be(1);
        let b = Address::from_low_u64_be(2);
        chain.fund(a, 100);

        chain.transfer(&a, &b, 40).unwrap();
        assert_eq!(chain.balance(&a), 60);
        assert_eq!(chain.balance(&b), 40);

        let err = chain.transfer(&a, &b, 61).unwrap_err();
        assert!(matches!(err, VmError::InsufficientBalance { balance: 60, required: 61, .. }));
    }

    #[test]
    fn test_delegate_call_preserves_caller_and_uses_context_storage() {
        let mut chain = InMemoryChain::default();
        let facet = Address::from_low_u64_be(0xfa);
        let dispatcher = Address::from_low_u64_be(0xd1);
        let user = Address::from_low_u64_be(0x05);

        chain.register_program(b"echo", echo_caller());
        chain.set_code(facet, b"echo".to_vec());

        let outcome = chain.delegate_call(&dispatcher, &facet, &user, &[0, 0, 0, 1]).unwrap();
        assert_eq!(outcome, CallOutcome::Return(user.as_bytes().to_vec()));

        let slot = H256::from_low_u64_be(1);
        assert_eq!(chain.storage(&dispatcher).unwrap().load(&slot), H256::from(user));
        assert!(chain.storage(&facet).unwrap().is_empty());
    }

    #[test]
    fn test_revert_discards_storage_writes() {
        let mut chain = InMemoryChain::default();
        let facet = Address::from_low_u64_be(0xfa);
        let dispatcher = Address::from_low_u64_be(0xd1);
        chain.register_program(
            b"reverter",
            Arc::new(|ctx: &mut CallContext<'_>| {
                ctx.sstore(H256::from_low_u64_be(1), H256::from_low_u64_be(1));
                CallOutcome::Revert(b"nope".to_vec())
            }),
        );
        chain.set_code(facet, b"reverter".to_vec());

        let outcome = chain
            .delegate_call(&dispatcher, &facet, &Address::zero(), &[])
            .unwrap();
        assert_eq!(outcome, CallOutcome::Revert(b"nope".to_vec()));
        assert!(chain.storage(&dispatcher).unwrap().is_empty());
    }

    #[test]
    fn test_delegate_call_without_program() {
        let mut chain = InMemoryChain::default();
        let facet = Address::from_low_u64_be(0xfa);
        assert_eq!(
            chain.delegate_call(&Address::zero(), &facet, &Address::zero(), &[]),
            Err(VmError::NoCode(facet))
        );

        chain.set_code(facet, b"unbound".to_vec());
        assert!(matches!(
            chain.delegate_call(&Address::zero(), &facet, &Address::zero(), &[]),
            Err(VmError::UnknownProgram { .. })
        ));
    }

    #[test]
    fn test_atomically_restores_on_error() {
        let mut chain = InMemoryChain::default();
        let a = Address::from_low_u64_be(1);
        chain.fund(a, 10);

        let result: Result<(), VmError> = atomically(&mut chain, |c| {
            c.transfer(&a, &Address::from_low_u64_be(2), 5)?;
            c.transfer(&a, &Address::from_low_u64_be(2), 50)
        });
        assert!(result.is_err());
        assert_eq!(chain.balance(&a), 10);
        assert_eq!(chain.balance(&Address::from_low_u64_be(2)), 0);
    }

    #[test]
    fn test_metamorphic_code_changes_hash() {
        let mut chain = InMemoryChain::default();
        let facet = Address::from_low_u64_be(0xfa);
        chain.set_code(facet, b"v1".to_vec());
        let before = chain.code_hash(&facet);
        chain.clear_code(&facet);
        assert_eq!(chain.code_hash(&facet), None);
        chain.set_code(facet, b"v2".to_vec());
        assert_ne!(chain.code_hash(&facet), before);
    }
}
