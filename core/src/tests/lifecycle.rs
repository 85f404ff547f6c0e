use shieldpool_privacy::{NoteValue, compute_nullifier};

use super::*;
use crate::{InputNote, OperationKind, OperationState, OutputNote, ShieldError};

#[tokio::test]
async fn alice_bob_eve_lifecycle() {
    let h = Harness::new();
    let alice_ctx = h.funded(1, 0x100);
    let bob_ctx = h.funded(2, 0x100);
    let (alice, bob, eve) = (alice(), bob(), eve());

    // Alice mints C and D
    let c = h.mint(&alice_ctx, 0x20, &alice, 1).await;
    let d = h.mint(&alice_ctx, 0x30, &alice, 2).await;
    assert_eq!(c.leaf_index, Some(0));
    assert_eq!(d.leaf_index, Some(1));

    // Alice -> Bob: E (0x40) to Bob, F (0x10) change
    let ab = h
        .orchestrator
        .transfer(
            &alice_ctx,
            [InputNote::from(&c), InputNote::from(&d)],
            [
                OutputNote::with_salt(NoteValue::new(0x40), salt(3)),
                OutputNote::with_salt(NoteValue::new(0x10), salt(4)),
            ],
            bob.public_key(),
            &alice,
        )
        .await
        .unwrap();
    let (e, f) = (ab.recipient_note().clone(), ab.change_note().clone());
    assert_eq!(e.leaf_index, Some(2));
    assert_eq!(f.leaf_index, Some(3));
    assert_eq!(e.owner, bob.public_key());
    assert_eq!(f.owner, alice.public_key());
    assert_eq!(ab.nullifiers, [c.nullifier(&alice), d.nullifier(&alice)]);

    // Bob mints G
    let g = h.mint(&bob_ctx, 0x30, &bob, 5).await;
    assert_eq!(g.leaf_index, Some(4));

    // Bob -> Eve: H (0x20) to Eve, I (0x50) change
    let be = h
        .orchestrator
        .transfer(
            &bob_ctx,
            [InputNote::from(&e), InputNote::from(&g)],
            [
                OutputNote::with_salt(NoteValue::new(0x20), salt(6)),
                OutputNote::with_salt(NoteValue::new(0x50), salt(7)),
            ],
            eve.public_key(),
            &bob,
        )
        .await
        .unwrap();
    assert_eq!(be.recipient_note().leaf_index, Some(5));
    assert_eq!(be.change_note().leaf_index, Some(6));
    assert_eq!(be.recipient_note().owner, eve.public_key());

    // Alice burns F to a fresh public account
    let recipient = account(9);
    let burned = h
        .orchestrator
        .burn(&alice_ctx, InputNote::from(&f), &alice, recipient)
        .await
        .unwrap();
    assert_eq!(burned.nullifier, compute_nullifier(&alice, &f.salt));
    assert_eq!(
        h.orchestrator.ledger().balance_of(recipient).await.unwrap(),
        NoteValue::new(16)
    );

    let snapshot = h.orchestrator.snapshot().await;
    assert_eq!(snapshot.leaf_count, 7);
    assert_eq!(snapshot.nullifier_count, 5);
    assert_eq!(snapshot.root, h.ledger.root().unwrap());

    let state = h.orchestrator.sync().state();
    let state = state.read().await;
    for (note, key) in [(&c, &alice), (&d, &alice), (&e, &bob), (&g, &bob), (&f, &alice)] {
        assert!(!state.is_spendable(&note.commitment(), &note.nullifier(key)));
    }
    assert!(state.is_spendable(&be.change_note().commitment(), &be.change_note().nullifier(&bob)));
}

#[tokio::test]
async fn public_balances_track_shielded_value() {
    let h = Harness::new();
    let ctx = h.funded(1, 0x100);
    let pool = h.ledger.shield_address();
    let alice = alice();

    let c = h.mint(&ctx, 0x20, &alice, 1).await;
    let _d = h.mint(&ctx, 0x30, &alice, 2).await;
    assert_eq!(
        h.orchestrator.ledger().balance_of(ctx.account).await.unwrap(),
        NoteValue::new(0xb0)
    );
    assert_eq!(h.orchestrator.ledger().balance_of(pool).await.unwrap(), NoteValue::new(0x50));

    h.orchestrator
        .burn(&ctx, InputNote::from(&c), &alice, ctx.account)
        .await
        .unwrap();
    assert_eq!(
        h.orchestrator.ledger().balance_of(ctx.account).await.unwrap(),
        NoteValue::new(0xd0)
    );
    assert_eq!(h.orchestrator.ledger().balance_of(pool).await.unwrap(), NoteValue::new(0x30));
    assert_eq!(h.ledger.token_info().unwrap().total_supply, NoteValue::new(0x100));
}

#[tokio::test]
async fn transfer_must_conserve_value() {
    let h = Harness::new();
    let ctx = h.funded(1, 0x100);
    let alice = alice();
    let c = h.mint(&ctx, 0x20, &alice, 1).await;
    let d = h.mint(&ctx, 0x30, &alice, 2).await;
    let before = h.orchestrator.snapshot().await;

    let err = h
        .orchestrator
        .transfer(
            &ctx,
            [InputNote::from(&c), InputNote::from(&d)],
            [
                OutputNote::with_salt(NoteValue::new(0x40), salt(3)),
                OutputNote::with_salt(NoteValue::new(0x11), salt(4)),
            ],
            bob().public_key(),
            &alice,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ShieldError::InvalidWitness { op: OperationKind::Transfer, .. }));
    assert!(!err.is_retryable());
    assert_eq!(h.orchestrator.snapshot().await, before);
}

#[tokio::test]
async fn spending_someone_elses_note_is_invalid() {
    let h = Harness::new();
    let ctx = h.funded(1, 0x100);
    let c = h.mint(&ctx, 0x20, &alice(), 1).await;

    let err = h
        .orchestrator
        .burn(&ctx, InputNote::from(&c), &eve(), account(9))
        .await
        .unwrap_err();
    assert!(matches!(err, ShieldError::InvalidWitness { op: OperationKind::Burn, .. }));
}

#[tokio::test]
async fn history_records_every_operation() {
    let h = Harness::new();
    let ctx = h.funded(1, 0x20);
    let alice = alice();

    let c = h.mint(&ctx, 0x20, &alice, 1).await;
    // Public balance is now empty
    let _ = h
        .orchestrator
        .mint(&ctx, NoteValue::new(1), alice.public_key(), salt(2))
        .await
        .unwrap_err();
    h.orchestrator
        .burn(&ctx, InputNote::from(&c), &alice, ctx.account)
        .await
        .unwrap();

    let history = h.orchestrator.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].state, OperationState::Confirmed);
    assert_eq!(history[0].sequence, Some(0));
    assert_eq!(history[1].kind, OperationKind::Mint);
    assert_eq!(history[1].state, OperationState::Rejected);
    assert!(history[1].error.is_some());
    assert_eq!(history[2].kind, OperationKind::Burn);
    assert_eq!(history[2].sequence, Some(1));
}

#[tokio::test]
async fn check_correctness_reports_each_source() {
    let h = Harness::new();
    let ctx = h.funded(1, 0x100);
    let alice = alice();
    let c = h.mint(&ctx, 0x20, &alice, 1).await;
    let index = c.leaf_index.unwrap();

    let report = h
        .orchestrator
        .check_correctness(&ctx, c.value, c.owner, c.salt, c.commitment(), index)
        .await
        .unwrap();
    assert!(report.is_correct());

    // Wrong value: hash differs, but the claimed commitment is still there
    let report = h
        .orchestrator
        .check_correctness(&ctx, NoteValue::new(0x21), c.owner, c.salt, c.commitment(), index)
        .await
        .unwrap();
    assert!(!report.commitment_matches);
    assert!(report.on_chain && report.stored_locally);

    // Wrong index
    let report = h
        .orchestrator
        .check_correctness(&ctx, c.value, c.owner, c.salt, c.commitment(), index + 1)
        .await
        .unwrap();
    assert!(report.commitment_matches);
    assert!(!report.on_chain && !report.stored_locally);
}

#[tokio::test]
async fn history_keeps_only_the_most_recent_operations() {
    let Harness {
        ledger,
        orchestrator,
    } = Harness::new();
    let h = Harness {
        ledger,
        orchestrator: orchestrator.with_history_limit(2),
    };
    let ctx = h.funded(1, 0x100);
    for salt_id in 1..=3 {
        h.mint(&ctx, 0x10, &alice(), salt_id).await;
    }

    let history = h.orchestrator.history();
    assert_eq!(history.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(history[1].sequence, Some(2));
}
