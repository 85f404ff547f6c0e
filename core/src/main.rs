//! Runs the Alice / Bob / Eve note lifecycle against the in-process prover
//! and ledger.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use shieldpool_config::ShieldpoolConfig;
use shieldpool_core::ledger::MockLedger;
use shieldpool_core::{
    InputNote, LedgerService, LedgerSync, MockProofService, Orchestrator, OutputNote,
    ProofService, ProverService, RocksDbStore, ShieldContext, ShieldedState,
};
use shieldpool_privacy::{Address, NoteValue, Salt, SecretKey};

/// Public account for a demo key
fn account_of(secret_key: &SecretKey) -> Address {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&secret_key.public_key().0[..20]);
    Address::from_bytes(bytes)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let config = ShieldpoolConfig::global();

    let ctx = ShieldContext::from_config(config).context("invalid shield configuration")?;
    info!("Shield asset {} (signer {})", ctx.asset, ctx.account);

    let state = if config.storage.persist {
        let db = RocksDbStore::open(&config.storage.path)?;
        ShieldedState::load(db, config.ledger.root_history)?
    } else {
        ShieldedState::new(config.ledger.root_history)
    };
    if state.snapshot().leaf_count > 0 {
        // The in-process ledger always starts empty.
        anyhow::bail!(
            "{} already holds shielded state; point SP_DB_PATH at an empty directory",
            config.storage.path
        );
    }

    let circuits: Arc<dyn ProofService> = Arc::new(MockProofService::new());
    let ledger = Arc::new(MockLedger::new(ctx.asset, circuits.clone(), config.ledger.root_history));
    let prover = ProverService::start(circuits, config.prover.workers, config.prover.queue_depth)?;
    let orchestrator = Orchestrator::new(
        prover,
        LedgerService::new(ledger.clone()),
        Arc::new(LedgerSync::new(state)),
    );

    let alice = SecretKey::from_bytes([0x11; 32]);
    let bob = SecretKey::from_bytes([0x22; 32]);
    let eve = SecretKey::from_bytes([0x33; 32]);
    let alice_ctx = ctx;
    let bob_ctx = ctx.with_account(account_of(&bob));

    ledger.mint_public(&alice_ctx.account, NoteValue::new(0x100))?;
    ledger.mint_public(&bob_ctx.account, NoteValue::new(0x100))?;
    let token = ledger.token_info()?;
    info!("{} ({}) supply: {}", token.name, token.symbol, token.total_supply.as_u128());

    // Alice shields C and D
    let c = orchestrator
        .mint(&alice_ctx, NoteValue::new(0x20), alice.public_key(), Salt::generate())
        .await?;
    let d = orchestrator
        .mint(&alice_ctx, NoteValue::new(0x30), alice.public_key(), Salt::generate())
        .await?;
    info!(
        "C={} at {:?}, D={} at {:?}",
        c.commitment().short(),
        c.leaf_index,
        d.commitment().short(),
        d.leaf_index
    );

    // Alice -> Bob: E for Bob, F as change
    let alice_to_bob = orchestrator
        .transfer(
            &alice_ctx,
            [InputNote::from(&c), InputNote::from(&d)],
            [OutputNote::new(NoteValue::new(0x40)), OutputNote::new(NoteValue::new(0x10))],
            bob.public_key(),
            &alice,
        )
        .await?;
    let e = alice_to_bob.recipient_note().clone();
    let f = alice_to_bob.change_note().clone();
    info!(
        "E={} at {:?}, F={} at {:?}",
        e.commitment().short(),
        e.leaf_index,
        f.commitment().short(),
        f.leaf_index
    );

    // Bob shields G
    let g = orchestrator
        .mint(&bob_ctx, NoteValue::new(0x30), bob.public_key(), Salt::generate())
        .await?;
    info!("G={} at {:?}", g.commitment().short(), g.leaf_index);

    // Bob -> Eve: H for Eve, I as change
    let bob_to_eve = orchestrator
        .transfer(
            &bob_ctx,
            [InputNote::from(&e), InputNote::from(&g)],
            [OutputNote::new(NoteValue::new(0x20)), OutputNote::new(NoteValue::new(0x50))],
            eve.public_key(),
            &bob,
        )
        .await?;
    let h = bob_to_eve.recipient_note();
    let i = bob_to_eve.change_note();
    info!(
        "H={} at {:?}, I={} at {:?}",
        h.commitment().short(),
        h.leaf_index,
        i.commitment().short(),
        i.leaf_index
    );

    // Alice unshields F back to her public account
    let before = orchestrator.ledger().balance_of(alice_ctx.account).await?;
    let burned = orchestrator
        .burn(&alice_ctx, InputNote::from(&f), &alice, alice_ctx.account)
        .await?;
    let after = orchestrator.ledger().balance_of(alice_ctx.account).await?;
    info!(
        "Burned {} to {}: balance {} -> {}",
        burned.value.as_u128(),
        burned.recipient,
        before.as_u128(),
        after.as_u128()
    );

    let report = orchestrator
        .check_correctness(
            &alice_ctx,
            f.value,
            f.owner,
            f.salt,
            f.commitment(),
            f.leaf_index.unwrap_or_default(),
        )
        .await?;
    info!("F correctness: {:?}", report);

    let snapshot = orchestrator.snapshot().await;
    info!(
        "Final state: {} leaves, {} nullifiers, root {}",
        snapshot.leaf_count,
        snapshot.nullifier_count,
        hex::encode(snapshot.root)
    );
    for record in orchestrator.history() {
        info!("  #{} {} {:?} seq={:?}", record.id, record.kind, record.state, record.sequence);
    }

    Ok(())
}
