//! Note salts.
//!
//! A salt is 32 bytes of full-entropy randomness, unique per note. Reusing a
//! salt for the same owner makes two notes share a nullifier, so only one of
//! them could ever be spent. [`Salt::generate`] avoids reuse by construction
//! and [`SaltGuard`] rejects it when salts come from the caller.

use std::collections::HashSet;
use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::hash::HASH_LEN;
use crate::keys::PublicKey;

/// Random per-note blinding value
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salt(pub [u8; HASH_LEN]);

impl Salt {
    /// Draw a salt from a cryptographically secure RNG
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; HASH_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Draw a salt from the operating system RNG
    pub fn generate() -> Self {
        Self::random(&mut OsRng)
    }

    /// Use explicit salt bytes (for recovery and tests)
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

/// Tracks `(owner, salt)` pairs already used for outputs.
#[derive(Debug, Default)]
pub struct SaltGuard {
    used: HashSet<(PublicKey, Salt)>,
}

impl SaltGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this owner has already been given a note with this salt
    pub fn is_used(&self, owner: &PublicKey, salt: &Salt) -> bool {
        self.used.contains(&(*owner, *salt))
    }

    /// Claim the pair. Returns `false` if it was already claimed.
    ///
    /// Claims are never given back: after a rejection the caller retries
    /// with fresh salts.
    pub fn claim(&mut self, owner: PublicKey, salt: Salt) -> bool {
        self.used.insert((owner, salt))
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
