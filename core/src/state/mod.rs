//! Local mirror of the shield contract's storage.

pub mod commitment_store;
pub mod db;
pub mod nullifier_registry;
pub mod shielded_state;

use shieldpool_privacy::{Commitment, Nullifier};
use thiserror::Error;

pub use commitment_store::CommitmentStore;
pub use db::{DbBatch, RocksDbStore};
pub use nullifier_registry::{NullifierRegistry, RecordOutcome};
pub use shielded_state::{AppliedReceipt, ShieldedState, StateSnapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("commitment {} not found", .0.short())]
    NotFound(Commitment),

    #[error("receipt {got} out of order, expected sequence {expected}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("ledger appended leaf {got} but the next local index is {expected}")]
    LeafMismatch { expected: u64, got: u64 },

    #[error("nullifier {} already spent", .0.short())]
    AlreadySpent(Nullifier),

    #[error("storage failure: {0}")]
    Storage(String),
}
