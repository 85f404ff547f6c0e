//! Note Commitments
//!
//! ```text
//! Commitment = SHA-256(asset_reference ‖ value_be128 ‖ owner_pk ‖ salt)
//! ```
//!
//! The commitment is the only part of a note that ever reaches the public
//! ledger. It binds all four fields and hides them behind the random salt.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::AssetReference;
use crate::hash::{HASH_LEN, sha256_concat, short_hex};
use crate::keys::PublicKey;
use crate::note::NoteValue;
use crate::salt::Salt;

/// A note commitment (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub [u8; HASH_LEN]);

impl Commitment {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Abbreviated hex for log lines
    pub fn short(&self) -> String {
        short_hex(&self.0)
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Commit to a note.
pub fn compute_commitment(
    asset: &AssetReference,
    value: NoteValue,
    owner: &PublicKey,
    salt: &Salt,
) -> Commitment {
    Commitment(sha256_concat(&[
        asset.as_bytes(),
        &value.to_be_bytes(),
        owner.as_bytes(),
        salt.as_bytes(),
    ]))
}
