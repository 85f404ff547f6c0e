mod lifecycle;
mod persistence;

use std::sync::Arc;

use shieldpool_privacy::{Address, AssetReference, Note, NoteValue, Salt, SecretKey};

use crate::ledger::{LedgerAdapter, MockLedger};
use crate::{
    LedgerService, LedgerSync, MockProofService, Orchestrator, ProofService, ProverService,
    ShieldContext, ShieldedState,
};

pub(crate) const ROOT_HISTORY: usize = 16;

pub(crate) fn alice() -> SecretKey {
    SecretKey::from_bytes([0x11; 32])
}

pub(crate) fn bob() -> SecretKey {
    SecretKey::from_bytes([0x22; 32])
}

pub(crate) fn eve() -> SecretKey {
    SecretKey::from_bytes([0x33; 32])
}

pub(crate) fn asset() -> AssetReference {
    AssetReference::from_address(&Address::from_bytes([0x5b; 20]))
}

pub(crate) fn account(id: u8) -> Address {
    Address::from_bytes([id; 20])
}

pub(crate) fn salt(id: u8) -> Salt {
    Salt::from_bytes([id; 32])
}

/// Mock prover + ledger + sync wired into one orchestrator
pub(crate) struct Harness {
    pub ledger: Arc<MockLedger>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_state(ShieldedState::new(ROOT_HISTORY))
    }

    pub fn with_state(state: ShieldedState) -> Self {
        let circuits: Arc<dyn ProofService> = Arc::new(MockProofService::new());
        let ledger = Arc::new(MockLedger::new(asset(), circuits.clone(), ROOT_HISTORY));
        Self::with_ledger(ledger, circuits, state)
    }

    pub fn with_ledger(
        ledger: Arc<MockLedger>,
        circuits: Arc<dyn ProofService>,
        state: ShieldedState,
    ) -> Self {
        let adapter: Arc<dyn LedgerAdapter> = ledger.clone();
        Self::with_adapter(ledger, adapter, circuits, state)
    }

    /// Orchestrator talking to `adapter`, which fronts `ledger`
    pub fn with_adapter(
        ledger: Arc<MockLedger>,
        adapter: Arc<dyn LedgerAdapter>,
        circuits: Arc<dyn ProofService>,
        state: ShieldedState,
    ) -> Self {
        let prover = ProverService::start(circuits, 2, 8).unwrap();
        let orchestrator = Orchestrator::new(
            prover,
            LedgerService::new(adapter),
            Arc::new(LedgerSync::new(state)),
        );
        Self {
            ledger,
            orchestrator,
        }
    }

    /// Context signing as public account `id`, funded with `balance`
    pub fn funded(&self, id: u8, balance: u128) -> ShieldContext {
        let ctx = ShieldContext::new(asset(), account(id));
        self.ledger
            .mint_public(&ctx.account, NoteValue::new(balance))
            .unwrap();
        ctx
    }

    pub async fn mint(
        &self,
        ctx: &ShieldContext,
        value: u128,
        owner: &SecretKey,
        salt_id: u8,
    ) -> Note {
        self.orchestrator
            .mint(ctx, NoteValue::new(value), owner.public_key(), salt(salt_id))
            .await
            .unwrap()
    }
}
