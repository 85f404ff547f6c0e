//! Per-operation state machine.
//!
//! ```text
//! ┌──────────────┐    ┌────────────┐    ┌────────────┐    ┌───────────┐
//! │ Constructing │───▶│ Witnessing │───▶│ Submitting │───▶│ Confirmed │
//! └──────┬───────┘    └─────┬──────┘    └─────┬──────┘    └───────────┘
//!        │                  │                 │
//!        └──────────────────┴─────────────────┴──────────▶ Rejected
//! ```

use log::debug;

use crate::ledger::OperationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Constructing,
    Witnessing,
    Submitting,
    Confirmed,
    Rejected,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Confirmed | OperationState::Rejected)
    }

    pub fn can_transition_to(&self, next: OperationState) -> bool {
        use OperationState::*;
        matches!(
            (self, next),
            (Constructing, Witnessing)
                | (Witnessing, Submitting)
                | (Submitting, Confirmed)
                | (Constructing | Witnessing | Submitting, Rejected)
        )
    }
}

/// Finished operation, as kept in the orchestrator's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub id: u64,
    pub kind: OperationKind,
    pub state: OperationState,
    /// Ledger sequence of the confirming receipt
    pub sequence: Option<u64>,
    pub error: Option<String>,
}

/// An operation in flight
#[derive(Debug)]
pub(crate) struct Operation {
    id: u64,
    kind: OperationKind,
    state: OperationState,
    sequence: Option<u64>,
}

impl Operation {
    pub(crate) fn begin(id: u64, kind: OperationKind) -> Self {
        debug!("{} #{}: Constructing", kind, id);
        Self {
            id,
            kind,
            state: OperationState::Constructing,
            sequence: None,
        }
    }

    pub(crate) fn kind(&self) -> OperationKind {
        self.kind
    }

    pub(crate) fn advance(&mut self, next: OperationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("{} #{}: {:?} -> {:?}", self.kind, self.id, self.state, next);
        self.state = next;
    }

    pub(crate) fn confirm(&mut self, sequence: u64) {
        self.sequence = Some(sequence);
        self.advance(OperationState::Confirmed);
    }

    pub(crate) fn into_record(mut self, error: Option<String>) -> OperationRecord {
        if error.is_some() && !self.state.is_terminal() {
            self.advance(OperationState::Rejected);
        }
        OperationRecord {
            id: self.id,
            kind: self.kind,
            state: self.state,
            sequence: self.sequence,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut op = Operation::begin(1, OperationKind::Mint);
        op.advance(OperationState::Witnessing);
        op.advance(OperationState::Submitting);
        op.confirm(7);

        let record = op.into_record(None);
        assert_eq!(record.state, OperationState::Confirmed);
        assert_eq!(record.sequence, Some(7));
    }

    #[test]
    fn test_failure_ends_rejected() {
        let mut op = Operation::begin(2, OperationKind::Burn);
        op.advance(OperationState::Witnessing);

        let record = op.into_record(Some("boom".into()));
        assert_eq!(record.state, OperationState::Rejected);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_transition_table() {
        use OperationState::*;
        assert!(Constructing.can_transition_to(Rejected));
        assert!(!Constructing.can_transition_to(Submitting));
        assert!(!Witnessing.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Constructing));
    }

    #[test]
    #[should_panic(expected = "illegal transition")]
    #[cfg(debug_assertions)]
    fn test_skipping_a_state_panics_in_debug() {
        let mut op = Operation::begin(3, OperationKind::Transfer);
        op.advance(OperationState::Confirmed);
    }
}
