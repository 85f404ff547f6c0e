//! Errors surfaced to callers of the orchestrator.
//!
//! Every failure before ledger confirmation leaves the registries untouched,
//! so each variant only has to say which operation failed and which
//! precondition broke.

use shieldpool_privacy::{Commitment, Nullifier, PublicKey};
use thiserror::Error;

use crate::ledger::{OperationKind, RejectReason};
use crate::proof::ProofError;
use crate::state::StoreError;

#[derive(Debug, Error)]
pub enum ShieldError {
    /// Conservation, ownership or membership fails before submission
    #[error("{op}: invalid witness: {reason}")]
    InvalidWitness { op: OperationKind, reason: String },

    #[error("{op}: note already spent (nullifier {})", .nullifier.short())]
    AlreadySpent {
        op: OperationKind,
        nullifier: Nullifier,
    },

    /// Caller's leaf index disagrees with the commitment store
    #[error(
        "{op}: stale leaf index for {}: claimed {claimed}, store has {actual}",
        .commitment.short()
    )]
    StaleIndex {
        op: OperationKind,
        commitment: Commitment,
        claimed: u64,
        actual: u64,
    },

    #[error("{op}: ledger rejected transaction: {reason}")]
    LedgerRejected { op: OperationKind, reason: String },

    #[error("{op}: proof service failure: {source}")]
    ProofServiceFailure {
        op: OperationKind,
        #[source]
        source: ProofError,
    },

    #[error("{op}: salt already used for owner {owner}")]
    SaltReuse { op: OperationKind, owner: PublicKey },

    /// Commitment never accepted, or not yet seen by sync
    #[error("{op}: commitment {} not found", .commitment.short())]
    NotFound {
        op: OperationKind,
        commitment: Commitment,
    },

    #[error("{op}: local state: {reason}")]
    Storage { op: OperationKind, reason: String },
}

impl ShieldError {
    pub fn op(&self) -> OperationKind {
        match self {
            ShieldError::InvalidWitness { op, .. }
            | ShieldError::AlreadySpent { op, .. }
            | ShieldError::StaleIndex { op, .. }
            | ShieldError::LedgerRejected { op, .. }
            | ShieldError::ProofServiceFailure { op, .. }
            | ShieldError::SaltReuse { op, .. }
            | ShieldError::NotFound { op, .. }
            | ShieldError::Storage { op, .. } => *op,
        }
    }

    /// Whether rebuilding with refreshed indices or fresh salts can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ShieldError::StaleIndex { .. }
            | ShieldError::LedgerRejected { .. }
            | ShieldError::ProofServiceFailure { .. }
            | ShieldError::SaltReuse { .. }
            | ShieldError::NotFound { .. } => true,
            ShieldError::InvalidWitness { .. }
            | ShieldError::AlreadySpent { .. }
            | ShieldError::Storage { .. } => false,
        }
    }

    pub(crate) fn invalid(op: OperationKind, reason: impl Into<String>) -> Self {
        ShieldError::InvalidWitness {
            op,
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(op: OperationKind, err: anyhow::Error) -> Self {
        ShieldError::Storage {
            op,
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn from_store(op: OperationKind, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(commitment) => ShieldError::NotFound { op, commitment },
            StoreError::AlreadySpent(nullifier) => ShieldError::AlreadySpent { op, nullifier },
            other => ShieldError::Storage {
                op,
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn from_rejection(op: OperationKind, reason: RejectReason) -> Self {
        match reason {
            RejectReason::NullifierSpent(nullifier) => ShieldError::AlreadySpent { op, nullifier },
            other => ShieldError::LedgerRejected {
                op,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_operation() {
        let err = ShieldError::StaleIndex {
            op: OperationKind::Transfer,
            commitment: Commitment([0xab; 32]),
            claimed: 4,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("transfer:"));
        assert!(msg.contains("claimed 4"));
        assert_eq!(err.op(), OperationKind::Transfer);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_spent_nullifier_rejection_maps_to_already_spent() {
        let err = ShieldError::from_rejection(
            OperationKind::Burn,
            RejectReason::NullifierSpent(Nullifier([1u8; 32])),
        );
        assert!(matches!(err, ShieldError::AlreadySpent { .. }));
        assert!(!err.is_retryable());

        let err = ShieldError::from_rejection(OperationKind::Mint, RejectReason::InvalidProof);
        assert!(matches!(err, ShieldError::LedgerRejected { .. }));
    }
}
