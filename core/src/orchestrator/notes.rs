use shieldpool_privacy::{
    Address, AssetReference, Commitment, Note, NoteValue, Nullifier, Salt, SecretKey,
    compute_commitment,
};

/// A note the caller wants to spend.
///
/// `leaf_index` is only a claim; the orchestrator resolves the real index
/// from the commitment store and rejects a mismatch as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputNote {
    pub value: NoteValue,
    pub salt: Salt,
    pub commitment: Commitment,
    pub leaf_index: Option<u64>,
}

impl InputNote {
    pub fn new(
        value: NoteValue,
        salt: Salt,
        commitment: Commitment,
        leaf_index: Option<u64>,
    ) -> Self {
        Self {
            value,
            salt,
            commitment,
            leaf_index,
        }
    }

    /// Commitment this input should have when owned by `secret_key`
    pub(crate) fn expected_commitment(
        &self,
        asset: &AssetReference,
        secret_key: &SecretKey,
    ) -> Commitment {
        compute_commitment(asset, self.value, &secret_key.public_key(), &self.salt)
    }
}

impl From<&Note> for InputNote {
    fn from(note: &Note) -> Self {
        Self {
            value: note.value,
            salt: note.salt,
            commitment: note.commitment(),
            leaf_index: note.leaf_index,
        }
    }
}

/// Value and salt of a note to create. The owner is decided by the
/// operation: output 0 of a transfer goes to the recipient, output 1 is change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputNote {
    pub value: NoteValue,
    pub salt: Salt,
}

impl OutputNote {
    /// Output with a fresh OS-random salt
    pub fn new(value: NoteValue) -> Self {
        Self::with_salt(value, Salt::generate())
    }

    pub fn with_salt(value: NoteValue, salt: Salt) -> Self {
        Self { value, salt }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// `[recipient note, change note]`, both with leaf indices set
    pub outputs: [Note; 2],
    pub nullifiers: [Nullifier; 2],
    pub sequence: u64,
}

impl TransferResult {
    pub fn recipient_note(&self) -> &Note {
        &self.outputs[0]
    }

    pub fn change_note(&self) -> &Note {
        &self.outputs[1]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnResult {
    pub nullifier: Nullifier,
    pub value: NoteValue,
    pub recipient: Address,
    pub sequence: u64,
}

/// Where a claimed note actually lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectnessReport {
    /// Recomputed commitment equals the claimed one
    pub commitment_matches: bool,
    /// Ledger holds the commitment at the claimed index
    pub on_chain: bool,
    /// Local commitment store holds it at the claimed index
    pub stored_locally: bool,
}

impl CorrectnessReport {
    pub fn is_correct(&self) -> bool {
        self.commitment_matches && self.on_chain && self.stored_locally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_from_note() {
        let sk = SecretKey::from_bytes([0x11; 32]);
        let asset = AssetReference([7u8; 32]);
        let salt = Salt::from_bytes([1u8; 32]);
        let note =
            Note::with_salt(asset, NoteValue::new(5), sk.public_key(), salt).with_leaf_index(3);

        let input = InputNote::from(&note);
        assert_eq!(input.leaf_index, Some(3));
        assert_eq!(input.expected_commitment(&asset, &sk), note.commitment());

        let other = SecretKey::from_bytes([0x22; 32]);
        assert_ne!(input.expected_commitment(&asset, &other), note.commitment());
    }

    #[test]
    fn test_output_salts_fresh() {
        let a = OutputNote::new(NoteValue::new(1));
        let b = OutputNote::new(NoteValue::new(1));
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn test_report_requires_all_checks() {
        let report = CorrectnessReport {
            commitment_matches: true,
            on_chain: true,
            stored_locally: false,
        };
        assert!(!report.is_correct());
    }
}
