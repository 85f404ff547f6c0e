//! Nullifiers
//!
//! Implements nullifier derivation for double-spend prevention.
//!
//! ```text
//! Nullifier = SHA-256(secret_key ‖ salt)
//! ```
//!
//! Only the note owner can derive it, and it reveals nothing about which
//! commitment was consumed. Once published, the note cannot be spent again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::{HASH_LEN, sha256_concat, short_hex};
use crate::keys::SecretKey;
use crate::salt::Salt;

/// A nullifier (32 bytes) - unique tag for a spent note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(pub [u8; HASH_LEN]);

impl Nullifier {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn short(&self) -> String {
        short_hex(&self.0)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Derive the nullifier of the note carrying `salt`, owned by `secret_key`
pub fn compute_nullifier(secret_key: &SecretKey, salt: &Salt) -> Nullifier {
    Nullifier(sha256_concat(&[secret_key.as_bytes(), salt.as_bytes()]))
}
