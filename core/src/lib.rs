//! Shieldpool Core
//!
//! Drives shielded notes through mint, transfer and burn against an external
//! prover and ledger, and keeps the local commitment list and nullifier set in
//! ledger order.
//!
//! ```text
//!  caller ──▶ Orchestrator ──witness──▶ ProverService ──▶ ProofService
//!                  │                                          │
//!                  │◀──────────── (proof, public inputs) ─────┘
//!                  │
//!                  ├──submission──▶ LedgerService ──▶ LedgerAdapter
//!                  │                                      │
//!                  │◀──────────────── receipt ────────────┘
//!                  ▼
//!             LedgerSync ──(strict sequence order)──▶ ShieldedState
//!                                                     ├─ CommitmentStore
//!                                                     └─ NullifierRegistry
//! ```

pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod proof;
pub mod state;
pub mod sync;
pub mod witness;

pub use error::ShieldError;
pub use ledger::{
    LedgerAdapter, LedgerEvent, LedgerReceipt, LedgerService, OperationKind, RejectReason,
    SubmitOutcome, Submission,
};
pub use orchestrator::{
    BurnResult, CorrectnessReport, InputNote, Orchestrator, OperationRecord, OperationState,
    OutputNote, ShieldContext, TransferResult,
};
pub use proof::{MockProofService, ProofError, ProofService, ProverService};
pub use state::{
    CommitmentStore, NullifierRegistry, RecordOutcome, RocksDbStore, ShieldedState,
    StateSnapshot, StoreError,
};
pub use sync::LedgerSync;
pub use witness::{CircuitId, Proof, PublicInputs, Witness};

#[cfg(test)]
mod tests;
