// MANIFOLD PROTOCOL HOST
// Staging ledger, epoch governor and dispatch router wired onto one chain
//
// SAFETY INVARIANTS:
// 1. Epoch state is mutated only through the governor
// 2. Every call completes or fails as a unit; failed calls append no event
// 3. Concurrent callers are serialised through `SharedProtocol`, one call at a time

use crate::config::ProtocolConfig;
use crate::error::ProtocolResult;
use crate::manifest::Manifest;
use manifold_crypto::{Prediction, RouteProof};
use manifold_governance::{EpochGovernor, EpochState, GovernanceEvent};
use manifold_router::DispatchRouter;
use manifold_staging::{StageReceipt, StagingEvent, StagingLedger};
use manifold_types::{Address, CapabilityCheck, Route, Selector, Timestamp, H256};
use manifold_vm::Chain;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    Staging(StagingEvent),
    Governance(GovernanceEvent),
}

/// Single-actor host. Share it across threads through [`SharedProtocol`].
pub type SharedProtocol<C, A> = Arc<Mutex<Protocol<C, A>>>;

pub struct Protocol<C, A> {
    chain: C,
    ledger: StagingLedger,
    state: EpochState,
    governor: EpochGovernor<A>,
    router: DispatchRouter,
    events: Vec<ProtocolEvent>,
}

impl<C: Chain, A: CapabilityCheck> Protocol<C, A> {
    pub fn new(config: &ProtocolConfig, chain: C, access: A) -> ProtocolResult<Self> {
        config.validate()?;

        let ledger = StagingLedger::new(config.addresser())
            .with_max_code_size(config.max_code_size)
            .with_fee(config.fee_config())?;

        info!(
            chain_id = config.chain_id,
            dispatcher = ?config.dispatcher,
            deployer = ?config.deployer,
            activation_delay = config.activation_delay_secs,
            "protocol initialised"
        );

        Ok(Protocol {
            chain,
            ledger,
            state: EpochState::new(config.activation_delay_secs),
            governor: EpochGovernor::new(access),
            router: DispatchRouter::new(config.dispatcher),
            events: Vec::new(),
        })
    }

    pub fn into_shared(self) -> SharedProtocol<C, A> {
        Arc::new(Mutex::new(self))
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Direct host access, for funding accounts and installing programs.
    pub fn chain_mut(&mut self) -> &mut C {
        &mut self.chain
    }

    pub fn state(&self) -> &EpochState {
        &self.state
    }

    pub fn ledger(&self) -> &StagingLedger {
        &self.ledger
    }

    pub fn router(&self) -> &DispatchRouter {
        &self.router
    }

    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    // ---------------- staging ----------------

    pub fn predict(&self, bytecode: &[u8]) -> ProtocolResult<Prediction> {
        Ok(self.ledger.predict(bytecode)?)
    }

    pub fn stage(
        &mut self,
        payer: &Address,
        bytecode: &[u8],
        fee_paid: u128,
    ) -> ProtocolResult<StageReceipt> {
        let receipt = self.ledger.stage(&mut self.chain, payer, bytecode, fee_paid)?;
        if let Some(event) = &receipt.event {
            self.events.push(ProtocolEvent::Staging(event.clone()));
        }
        Ok(receipt)
    }

    pub fn set_fee(
        &mut self,
        caller: &Address,
        amount: u128,
        enabled: bool,
        recipient: Address,
    ) -> ProtocolResult<()> {
        let event = self
            .ledger
            .set_fee(self.governor.access(), caller, amount, enabled, recipient)?;
        self.events.push(ProtocolEvent::Staging(event));
        Ok(())
    }

    // ---------------- governance ----------------

    pub fn commit(
        &mut self,
        caller: &Address,
        root: H256,
        epoch: u64,
        now: Timestamp,
    ) -> ProtocolResult<GovernanceEvent> {
        let event = self.governor.commit(&mut self.state, caller, root, epoch, now)?;
        Ok(self.record(event))
    }

    /// Commit a manifest's root after checking the document rebuilds to it.
    pub fn commit_manifest(
        &mut self,
        caller: &Address,
        manifest: &Manifest,
        epoch: u64,
        now: Timestamp,
    ) -> ProtocolResult<GovernanceEvent> {
        let tree = manifest.verify_root()?;
        self.commit(caller, tree.root(), epoch, now)
    }

    pub fn activate(&mut self, caller: &Address, now: Timestamp) -> ProtocolResult<GovernanceEvent> {
        let event = self
            .governor
            .activate_committed_root(&mut self.state, caller, now)?;
        Ok(self.record(event))
    }

    pub fn cancel_pending(&mut self, caller: &Address) -> ProtocolResult<GovernanceEvent> {
        let event = self.governor.cancel_pending(&mut self.state, caller)?;
        Ok(self.record(event))
    }

    pub fn set_activation_delay(
        &mut self,
        caller: &Address,
        delay: u64,
    ) -> ProtocolResult<GovernanceEvent> {
        let event = self
            .governor
            .set_activation_delay(&mut self.state, caller, delay)?;
        Ok(self.record(event))
    }

    pub fn freeze(&mut self, caller: &Address) -> ProtocolResult<GovernanceEvent> {
        let event = self.governor.freeze(&mut self.state, caller)?;
        Ok(self.record(event))
    }

    pub fn pause(&mut self, caller: &Address) -> ProtocolResult<GovernanceEvent> {
        let event = self.governor.pause(&mut self.state, caller)?;
        Ok(self.record(event))
    }

    pub fn unpause(&mut self, caller: &Address) -> ProtocolResult<GovernanceEvent> {
        let event = self.governor.unpause(&mut self.state, caller)?;
        Ok(self.record(event))
    }

    fn record(&mut self, event: GovernanceEvent) -> GovernanceEvent {
        self.events.push(ProtocolEvent::Governance(event.clone()));
        event
    }

    // ---------------- dispatch ----------------

    pub fn resolve(&self, selector: Selector, proof: &RouteProof) -> ProtocolResult<Route> {
        Ok(self.router.resolve(&self.state, &self.chain, selector, proof)?)
    }

    pub fn dispatch(
        &mut self,
        caller: &Address,
        selector: Selector,
        calldata: &[u8],
        proof: &RouteProof,
    ) -> ProtocolResult<Vec<u8>> {
        Ok(self
            .router
            .dispatch(&self.state, &mut self.chain, caller, selector, calldata, proof)?)
    }
}
