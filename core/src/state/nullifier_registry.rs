//! Nullifier Registry
//!
//! Grow-only set of spent nullifiers. `record_if_absent` is the only gate
//! against double-spends: the check and the insert are one `HashSet::insert`
//! under `&mut self`, so callers sharing a registry must hold a write lock.

use std::collections::HashSet;

use shieldpool_privacy::Nullifier;

/// Outcome of trying to spend a nullifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Accepted,
    AlreadySpent,
}

#[derive(Debug, Clone, Default)]
pub struct NullifierRegistry {
    spent: HashSet<Nullifier>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `nullifier` as spent unless it already is
    pub fn record_if_absent(&mut self, nullifier: Nullifier) -> RecordOutcome {
        if self.spent.insert(nullifier) {
            RecordOutcome::Accepted
        } else {
            RecordOutcome::AlreadySpent
        }
    }

    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.spent.contains(nullifier)
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nullifier> {
        self.spent.iter()
    }
}
