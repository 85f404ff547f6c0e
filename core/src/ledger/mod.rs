//! Ledger Adapter
//!
//! Seam to the public ledger that hosts the shield contract.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Submission Flow                            │
//! │                                                                 │
//! │  ┌────────────┐    ┌────────────┐    ┌────────────────────────┐ │
//! │  │   Proof +  │───▶│   submit   │───▶│  Confirmed(receipt)    │ │
//! │  │   Inputs   │    │            │    │  Rejected(reason)      │ │
//! │  └────────────┘    └────────────┘    └────────────────────────┘ │
//! │                                                 │               │
//! │                                                 ▼               │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │  Receipt: global sequence + ordered events                │  │
//! │  │  • LeafAppended  (one per output, in output order)        │  │
//! │  │  • Nullified     (one per consumed note)                  │  │
//! │  │  • PublicTransfer (tokens into / out of the pool)         │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod mock;

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shieldpool_privacy::{Address, Commitment, NoteValue, Nullifier};

use crate::witness::{CircuitId, Proof, PublicInputs};

pub use mock::{MockLedger, TokenInfo};

// ============================================================================
// Ledger Types
// ============================================================================

/// The three shield-contract operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Mint,
    Transfer,
    Burn,
}

impl OperationKind {
    pub fn circuit(&self) -> CircuitId {
        match self {
            OperationKind::Mint => CircuitId::Mint,
            OperationKind::Transfer => CircuitId::Transfer,
            OperationKind::Burn => CircuitId::Burn,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Mint => f.write_str("mint"),
            OperationKind::Transfer => f.write_str("transfer"),
            OperationKind::Burn => f.write_str("burn"),
        }
    }
}

/// A proof and its public inputs, ready to send to the shield contract
#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: OperationKind,
    /// Public account that signs the transaction (pays for mints)
    pub sender: Address,
    pub proof: Proof,
    pub public_inputs: PublicInputs,
}

/// Something the shield contract did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    LeafAppended {
        leaf_index: u64,
        commitment: Commitment,
    },
    Nullified {
        nullifier: Nullifier,
    },
    PublicTransfer {
        from: Address,
        to: Address,
        amount: NoteValue,
    },
}

/// Record of one confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Position in the ledger's total order, starting at 0
    pub sequence: u64,
    pub tx_hash: [u8; 32],
    pub kind: OperationKind,
    pub events: Vec<LedgerEvent>,
}

impl LedgerReceipt {
    /// Appended leaves, in output order
    pub fn appended(&self) -> impl Iterator<Item = (u64, Commitment)> + '_ {
        self.events.iter().filter_map(|e| match e {
            LedgerEvent::LeafAppended {
                leaf_index,
                commitment,
            } => Some((*leaf_index, *commitment)),
            _ => None,
        })
    }

    /// Nullifiers recorded by this transaction
    pub fn nullified(&self) -> impl Iterator<Item = Nullifier> + '_ {
        self.events.iter().filter_map(|e| match e {
            LedgerEvent::Nullified { nullifier } => Some(*nullifier),
            _ => None,
        })
    }

    pub fn leaf_indices(&self) -> Vec<u64> {
        self.appended().map(|(index, _)| index).collect()
    }

    pub fn short_hash(&self) -> String {
        hex::encode(&self.tx_hash[..4])
    }
}

/// Why the ledger refused a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    InsufficientBalance { needed: NoteValue, available: NoteValue },
    AssetMismatch,
    InvalidProof,
    UnknownRoot,
    NullifierSpent(Nullifier),
    Other(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InsufficientBalance { needed, available } => write!(
                f,
                "insufficient public balance: need {}, have {}",
                needed.as_u128(),
                available.as_u128()
            ),
            RejectReason::AssetMismatch => f.write_str("asset is not handled by this shield"),
            RejectReason::InvalidProof => f.write_str("proof verification failed"),
            RejectReason::UnknownRoot => f.write_str("root is not current or recent"),
            RejectReason::NullifierSpent(n) => write!(f, "nullifier {} already spent", n.short()),
            RejectReason::Other(reason) => f.write_str(reason),
        }
    }
}

/// Result of a submission that reached the ledger
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Confirmed(LedgerReceipt),
    Rejected(RejectReason),
}

// ============================================================================
// Ledger Adapter Trait
// ============================================================================

/// Public ledger hosting the shield contract.
///
/// `Err` means the ledger could not be reached; a refusal by the contract is
/// `Ok(SubmitOutcome::Rejected)`.
pub trait LedgerAdapter: Send + Sync {
    /// Submit a transaction and block until it is confirmed or rejected
    fn submit(&self, submission: &Submission) -> Result<SubmitOutcome>;

    /// Every receipt with `sequence >= from`, in sequence order
    fn receipts_since(&self, from: u64) -> Result<Vec<LedgerReceipt>>;

    /// Commitment stored on-chain at `leaf_index`
    fn commitment_at(&self, leaf_index: u64) -> Result<Option<Commitment>>;

    fn is_nullified(&self, nullifier: &Nullifier) -> Result<bool>;

    /// Public token balance of `account`
    fn balance_of(&self, account: &Address) -> Result<NoteValue>;
}

// ============================================================================
// Async Ledger Service
// ============================================================================

/// Async wrapper for ledger calls
///
/// Each call runs on the blocking pool so a slow ledger never stalls the
/// runtime.
#[derive(Clone)]
pub struct LedgerService {
    adapter: Arc<dyn LedgerAdapter>,
}

impl LedgerService {
    pub fn new(adapter: Arc<dyn LedgerAdapter>) -> Self {
        Self { adapter }
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn LedgerAdapter) -> Result<T> + Send + 'static,
    {
        let adapter = self.adapter.clone();
        tokio::task::spawn_blocking(move || f(adapter.as_ref()))
            .await
            .context("ledger task panicked")?
    }

    /// Submit a transaction and wait for the outcome
    pub async fn submit(&self, submission: Submission) -> Result<SubmitOutcome> {
        self.call(move |ledger| ledger.submit(&submission)).await
    }

    pub async fn receipts_since(&self, from: u64) -> Result<Vec<LedgerReceipt>> {
        self.call(move |ledger| ledger.receipts_since(from)).await
    }

    pub async fn commitment_at(&self, leaf_index: u64) -> Result<Option<Commitment>> {
        self.call(move |ledger| ledger.commitment_at(leaf_index)).await
    }

    pub async fn is_nullified(&self, nullifier: Nullifier) -> Result<bool> {
        self.call(move |ledger| ledger.is_nullified(&nullifier)).await
    }

    pub async fn balance_of(&self, account: Address) -> Result<NoteValue> {
        self.call(move |ledger| ledger.balance_of(&account)).await
    }
}
