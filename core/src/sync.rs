//! Ledger Sync
//!
//! Single authority that moves [`ShieldedState`] forward. Receipts may be
//! observed in any order (concurrent operations confirm independently); they
//! are buffered and applied strictly by ledger sequence.
//!
//! ```text
//!   observe(seq=2) ──▶ pending {2}          state.next = 1
//!   observe(seq=1) ──▶ pending {1, 2} ──▶ apply 1, apply 2 ──▶ state.next = 3
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};
use tokio::sync::{Mutex, RwLock};

use crate::ledger::{LedgerReceipt, LedgerService};
use crate::state::{AppliedReceipt, ShieldedState, StateSnapshot, StoreError};

pub struct LedgerSync {
    state: Arc<RwLock<ShieldedState>>,
    /// Receipts seen ahead of `state.next_sequence()`
    pending: Mutex<BTreeMap<u64, LedgerReceipt>>,
}

impl LedgerSync {
    pub fn new(state: ShieldedState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Shared read handle to the registries
    pub fn state(&self) -> Arc<RwLock<ShieldedState>> {
        self.state.clone()
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.state.read().await.snapshot()
    }

    /// Number of receipts waiting for an earlier sequence
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Feed one receipt; returns every receipt this call managed to apply
    pub async fn observe(&self, receipt: LedgerReceipt) -> Result<Vec<AppliedReceipt>, StoreError> {
        let mut pending = self.pending.lock().await;
        let mut state = self.state.write().await;

        if receipt.sequence < state.next_sequence() {
            debug!("receipt seq={} already applied", receipt.sequence);
            return Ok(Vec::new());
        }
        pending.insert(receipt.sequence, receipt);

        let mut applied = Vec::new();
        while let Some(next) = pending.remove(&state.next_sequence()) {
            match state.apply_receipt(&next) {
                Ok(done) => applied.push(done),
                Err(e) => {
                    warn!("receipt seq={} not applied: {}", next.sequence, e);
                    pending.insert(next.sequence, next);
                    return Err(e);
                }
            }
        }

        if !pending.is_empty() {
            debug!(
                "{} receipt(s) buffered, waiting for seq={}",
                pending.len(),
                state.next_sequence()
            );
        }
        Ok(applied)
    }

    /// Pull every receipt the local state has not seen yet from the ledger
    pub async fn catch_up(&self, ledger: &LedgerService) -> Result<usize> {
        let from = self.state.read().await.next_sequence();
        let receipts = ledger
            .receipts_since(from)
            .await
            .context("failed to fetch ledger receipts")?;

        let mut applied = 0;
        for receipt in receipts {
            applied += self
                .observe(receipt)
                .await
                .context("failed to apply ledger receipt")?
                .len();
        }
        if applied > 0 {
            debug!("caught up {} receipt(s) from seq={}", applied, from);
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerEvent, OperationKind};
    use shieldpool_privacy::Commitment;

    fn mint_receipt(sequence: u64, leaf_index: u64) -> LedgerReceipt {
        LedgerReceipt {
            sequence,
            tx_hash: [sequence as u8; 32],
            kind: OperationKind::Mint,
            events: vec![LedgerEvent::LeafAppended {
                leaf_index,
                commitment: Commitment([leaf_index as u8 + 1; 32]),
            }],
        }
    }

    #[tokio::test]
    async fn test_out_of_order_receipts_resequenced() {
        let sync = LedgerSync::new(ShieldedState::new(10));

        assert!(sync.observe(mint_receipt(2, 2)).await.unwrap().is_empty());
        assert!(sync.observe(mint_receipt(1, 1)).await.unwrap().is_empty());
        assert_eq!(sync.pending_len().await, 2);

        let applied = sync.observe(mint_receipt(0, 0)).await.unwrap();
        assert_eq!(applied.iter().map(|a| a.sequence).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(sync.pending_len().await, 0);

        let state = sync.state();
        let state = state.read().await;
        for i in 0..3u64 {
            assert_eq!(state.commitments().get(i), Some(Commitment([i as u8 + 1; 32])));
        }
    }

    #[tokio::test]
    async fn test_duplicate_receipt_ignored() {
        let sync = LedgerSync::new(ShieldedState::new(10));
        sync.observe(mint_receipt(0, 0)).await.unwrap();
        assert!(sync.observe(mint_receipt(0, 0)).await.unwrap().is_empty());
        assert_eq!(sync.snapshot().await.leaf_count, 1);
    }

    #[tokio::test]
    async fn test_bad_receipt_stays_buffered() {
        let sync = LedgerSync::new(ShieldedState::new(10));
        let err = sync.observe(mint_receipt(0, 5)).await.unwrap_err();
        assert!(matches!(err, StoreError::LeafMismatch { .. }));
        assert_eq!(sync.pending_len().await, 1);
        assert_eq!(sync.snapshot().await.version, 0);
    }
}
