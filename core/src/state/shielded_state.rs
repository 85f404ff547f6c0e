//! Shielded State Management
//!
//! Owns the local CommitmentStore and NullifierRegistry and moves them
//! forward one ledger receipt at a time:
//! - receipts apply in exact sequence order, no gaps
//! - every event in a receipt is checked before anything is written
//! - with persistence on, the RocksDB batch commits before memory changes
//!
//! Callers read through [`StateSnapshot`] or the `&` accessors and never
//! mutate the registries directly.

use anyhow::{Result, bail};
use log::{debug, info};
use std::collections::HashSet;

use shieldpool_privacy::{Commitment, Nullifier};

use super::commitment_store::CommitmentStore;
use super::db::{DbBatch, RocksDbStore};
use super::nullifier_registry::{NullifierRegistry, RecordOutcome};
use super::StoreError;
use crate::ledger::{LedgerEvent, LedgerReceipt};

/// Read-only view of the registries at one version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Bumped once per applied receipt
    pub version: u64,
    pub next_sequence: u64,
    pub root: [u8; 32],
    pub leaf_count: u64,
    pub nullifier_count: usize,
}

/// What one receipt changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedReceipt {
    pub sequence: u64,
    pub leaves: Vec<(u64, Commitment)>,
    pub nullifiers: Vec<Nullifier>,
}

/// Shielded pool state
pub struct ShieldedState {
    commitments: CommitmentStore,
    nullifiers: NullifierRegistry,
    next_sequence: u64,
    version: u64,
    db: Option<RocksDbStore>,
}

impl ShieldedState {
    /// Create a new empty in-memory state
    pub fn new(root_history: usize) -> Self {
        Self {
            commitments: CommitmentStore::new(root_history),
            nullifiers: NullifierRegistry::new(),
            next_sequence: 0,
            version: 0,
            db: None,
        }
    }

    /// Load shielded state from database and keep writing through to it
    pub fn load(db: RocksDbStore, root_history: usize) -> Result<Self> {
        let mut state = Self::new(root_history);

        for (leaf_index, commitment) in db.get_all_commitments()? {
            if leaf_index != state.commitments.len() {
                bail!(
                    "persisted commitments have a gap: found leaf {} where {} was expected",
                    leaf_index,
                    state.commitments.len()
                );
            }
            state.commitments.append(commitment);
        }

        for nullifier in db.get_all_nullifiers()? {
            state.nullifiers.record_if_absent(nullifier);
        }

        state.next_sequence = db.next_sequence()?;
        state.db = Some(db);

        info!(
            "Loaded shielded state: {} commitments, {} nullifiers, next receipt {}",
            state.commitments.len(),
            state.nullifiers.len(),
            state.next_sequence
        );

        Ok(state)
    }

    /// Apply the next ledger receipt, all or nothing
    pub fn apply_receipt(&mut self, receipt: &LedgerReceipt) -> Result<AppliedReceipt, StoreError> {
        if receipt.sequence != self.next_sequence {
            return Err(StoreError::SequenceGap {
                expected: self.next_sequence,
                got: receipt.sequence,
            });
        }

        let mut next_leaf = self.commitments.len();
        let mut leaves = Vec::new();
        let mut nullifiers = Vec::new();
        let mut seen = HashSet::new();

        for event in &receipt.events {
            match event {
                LedgerEvent::LeafAppended {
                    leaf_index,
                    commitment,
                } => {
                    if *leaf_index != next_leaf {
                        return Err(StoreError::LeafMismatch {
                            expected: next_leaf,
                            got: *leaf_index,
                        });
                    }
                    leaves.push((*leaf_index, *commitment));
                    next_leaf += 1;
                }
                LedgerEvent::Nullified { nullifier } => {
                    if self.nullifiers.contains(nullifier) || !seen.insert(*nullifier) {
                        return Err(StoreError::AlreadySpent(*nullifier));
                    }
                    nullifiers.push(*nullifier);
                }
                LedgerEvent::PublicTransfer { .. } => {}
            }
        }

        if let Some(db) = &self.db {
            db.apply_batch(DbBatch {
                commitments: leaves.clone(),
                nullifiers: nullifiers.clone(),
                next_sequence: self.next_sequence + 1,
            })
            .map_err(|e| StoreError::Storage(format!("{e:#}")))?;
        }

        for (_, commitment) in &leaves {
            self.commitments.append(*commitment);
        }
        for nullifier in &nullifiers {
            let outcome = self.nullifiers.record_if_absent(*nullifier);
            debug_assert_eq!(outcome, RecordOutcome::Accepted);
        }
        self.next_sequence += 1;
        self.version += 1;

        debug!(
            "applied receipt seq={} (+{} leaves, +{} nullifiers)",
            receipt.sequence,
            leaves.len(),
            nullifiers.len()
        );

        Ok(AppliedReceipt {
            sequence: receipt.sequence,
            leaves,
            nullifiers,
        })
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            version: self.version,
            next_sequence: self.next_sequence,
            root: self.commitments.root(),
            leaf_count: self.commitments.len(),
            nullifier_count: self.nullifiers.len(),
        }
    }

    pub fn commitments(&self) -> &CommitmentStore {
        &self.commitments
    }

    pub fn nullifiers(&self) -> &NullifierRegistry {
        &self.nullifiers
    }

    /// Sequence of the next receipt this state will accept
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Accepted and not yet nullified
    pub fn is_spendable(&self, commitment: &Commitment, nullifier: &Nullifier) -> bool {
        self.commitments.contains(commitment) && !self.nullifiers.contains(nullifier)
    }

    pub fn is_persistent(&self) -> bool {
        self.db.is_some()
    }
}
