use tempfile::TempDir;

use super::*;
use crate::{InputNote, OutputNote, RocksDbStore};

#[tokio::test]
async fn reload_restores_root_and_registries() {
    let dir = TempDir::new().unwrap();
    let alice = alice();

    let (snapshot, spent, kept) = {
        let db = RocksDbStore::open(dir.path()).unwrap();
        let h = Harness::with_state(ShieldedState::load(db, ROOT_HISTORY).unwrap());
        let ctx = h.funded(1, 0x100);

        let c = h.mint(&ctx, 0x20, &alice, 1).await;
        let d = h.mint(&ctx, 0x30, &alice, 2).await;
        let result = h
            .orchestrator
            .transfer(
                &ctx,
                [InputNote::from(&c), InputNote::from(&d)],
                [
                    OutputNote::with_salt(NoteValue::new(0x40), salt(3)),
                    OutputNote::with_salt(NoteValue::new(0x10), salt(4)),
                ],
                bob().public_key(),
                &alice,
            )
            .await
            .unwrap();

        (
            h.orchestrator.snapshot().await,
            result.nullifiers,
            result.outputs,
        )
    };

    let db = RocksDbStore::open(dir.path()).unwrap();
    let state = ShieldedState::load(db, ROOT_HISTORY).unwrap();
    let reloaded = state.snapshot();

    assert!(state.is_persistent());
    assert_eq!(reloaded.root, snapshot.root);
    assert_eq!(reloaded.leaf_count, 4);
    assert_eq!(reloaded.nullifier_count, snapshot.nullifier_count);
    assert_eq!(reloaded.next_sequence, snapshot.next_sequence);

    for nullifier in &spent {
        assert!(state.nullifiers().contains(nullifier));
    }
    for note in &kept {
        let index = note.leaf_index.unwrap();
        assert_eq!(state.commitments().get_index(&note.commitment()).unwrap(), index);
        let path = state.commitments().path(index).unwrap();
        assert!(path.verify(&note.commitment(), &reloaded.root));
    }
}
