//! Shielded Keys
//!
//! ```text
//! public_key = SHA-256(secret_key)
//! ```
//!
//! The derivation is one-way: holding a public key gives no handle on the
//! secret key, and only the secret key can derive a note's nullifier.

use std::fmt;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::hash::{HASH_LEN, sha256};

/// Secret spending key.
///
/// Not serializable, and `Debug` never prints the key material. The core
/// only ever borrows one of these for the duration of a single operation.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; HASH_LEN]);

impl SecretKey {
    /// Generate a random secret key
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = [0u8; HASH_LEN];
        rng.fill_bytes(&mut key);
        Self(key)
    }

    /// Create from raw bytes
    pub fn from_bytes(key: [u8; HASH_LEN]) -> Self {
        Self(key)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Derive the owner public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(sha256(&self.0))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Owner public key (32 bytes). Safe to share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; HASH_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
