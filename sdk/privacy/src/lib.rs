//! Shieldpool Privacy SDK
//!
//! Note-based privacy primitives for a shielded pool over a public fungible token.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Shielded Note Lifecycle                      │
//! │                                                                 │
//! │   mint ──▶ Commitment = H(asset ‖ value ‖ owner_pk ‖ salt)      │
//! │              │                                                  │
//! │              ▼                                                  │
//! │   ┌──────────────────────┐        ┌──────────────────────────┐  │
//! │   │  Commitment list     │        │  Nullifier set           │  │
//! │   │  (Merkle leaves,     │        │  N = H(secret_key ‖ salt)│  │
//! │   │   append-only)       │        │  (spent, append-only)    │  │
//! │   └──────────────────────┘        └──────────────────────────┘  │
//! │              │                               ▲                  │
//! │              ▼                               │                  │
//! │   transfer / burn ── membership path + nullifier derivation ────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything in this crate is pure: no I/O, no shared state.

pub mod asset;
pub mod commitment;
pub mod hash;
pub mod keys;
pub mod merkle;
pub mod note;
pub mod nullifier;
pub mod salt;

pub use asset::{Address, AssetReference, ParseError};
pub use commitment::{Commitment, compute_commitment};
pub use keys::{PublicKey, SecretKey};
pub use merkle::{MerklePath, MerkleTree, RootHistory, TREE_DEPTH, hash_children};
pub use note::{Note, NoteValue};
pub use nullifier::{Nullifier, compute_nullifier};
pub use salt::{Salt, SaltGuard};
