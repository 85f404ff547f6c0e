//! Shielded Notes
//!
//! A Note represents value held privately in the shielded pool.
//!
//! ```text
//! Note = {
//!     asset: [u8; 32],      // Padded token address
//!     value: u128,          // Amount in the smallest unit
//!     owner: [u8; 32],      // Owner's public key
//!     salt: [u8; 32],       // Blinding factor, unique per note
//!     leaf_index: u64,      // Position in commitment list (set on acceptance)
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::asset::AssetReference;
use crate::commitment::{Commitment, compute_commitment};
use crate::keys::{PublicKey, SecretKey};
use crate::nullifier::{Nullifier, compute_nullifier};
use crate::salt::Salt;

/// Width of the value field inside a commitment pre-image.
pub const VALUE_LEN: usize = 16;

/// A shielded note representing privately held value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// The asset this note is denominated in
    pub asset: AssetReference,
    /// The value (amount) held in this note
    pub value: NoteValue,
    /// Owner's public key (who can spend this note)
    pub owner: PublicKey,
    /// Random blinding factor for hiding commitment
    pub salt: Salt,
    /// Position in the commitment list (None until the ledger accepts it)
    pub leaf_index: Option<u64>,
}

/// Note value with overflow protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NoteValue(pub u128);

impl NoteValue {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    /// Big-endian encoding used in the commitment pre-image
    pub fn to_be_bytes(&self) -> [u8; VALUE_LEN] {
        self.0.to_be_bytes()
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Sum a set of values, `None` on overflow
    pub fn checked_sum<I: IntoIterator<Item = Self>>(values: I) -> Option<Self> {
        values
            .into_iter()
            .try_fold(Self::ZERO, |acc, v| acc.checked_add(v))
    }
}

impl From<u128> for NoteValue {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Note {
    /// Create a new note with a fresh random salt
    pub fn new(asset: AssetReference, value: NoteValue, owner: PublicKey) -> Self {
        Self::with_salt(asset, value, owner, Salt::generate())
    }

    /// Create a note with an explicit salt (for recovery and tests)
    pub fn with_salt(
        asset: AssetReference,
        value: NoteValue,
        owner: PublicKey,
        salt: Salt,
    ) -> Self {
        Self {
            asset,
            value,
            owner,
            salt,
            leaf_index: None,
        }
    }

    /// Compute the commitment for this note
    pub fn commitment(&self) -> Commitment {
        compute_commitment(&self.asset, self.value, &self.owner, &self.salt)
    }

    /// Derive the nullifier for spending this note
    pub fn nullifier(&self, secret_key: &SecretKey) -> Nullifier {
        compute_nullifier(secret_key, &self.salt)
    }

    /// Whether `secret_key` is the owner of this note
    pub fn is_owned_by(&self, secret_key: &SecretKey) -> bool {
        secret_key.public_key() == self.owner
    }

    /// Set the leaf index (called after the ledger accepts the note)
    pub fn with_leaf_index(mut self, leaf_index: u64) -> Self {
        self.leaf_index = Some(leaf_index);
        self
    }

    /// Check if this note has been accepted into the commitment list
    pub fn is_inserted(&self) -> bool {
        self.leaf_index.is_some()
    }
}
