//! Circuit Witnesses and Public Inputs
//!
//! ```text
//! ┌──────────┬──────────────────────────────────┬────────────────────────────┐
//! │ Circuit  │ Private witness                  │ Public inputs              │
//! ├──────────┼──────────────────────────────────┼────────────────────────────┤
//! │ mint     │ owner_pk, salt                   │ asset, value, commitment   │
//! │ transfer │ sk, 2 × (value, salt, path),     │ asset, root,               │
//! │          │ 2 × (owner_pk, value, salt)      │ 2 × nullifier,             │
//! │          │                                  │ 2 × commitment             │
//! │ burn     │ sk, value, salt, path            │ asset, root, nullifier,    │
//! │          │                                  │ value, recipient           │
//! └──────────┴──────────────────────────────────┴────────────────────────────┘
//! ```
//!
//! The prover derives every public input from the witness. The orchestrator
//! never hands public inputs to the prover directly.

use std::fmt;

use serde::{Deserialize, Serialize};
use shieldpool_privacy::{
    Address, AssetReference, Commitment, MerklePath, NoteValue, Nullifier, PublicKey, Salt,
    SecretKey,
};

/// Which circuit a proof is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitId {
    Mint,
    Transfer,
    Burn,
}

impl CircuitId {
    /// Domain tag mixed into every proof for this circuit
    pub fn tag(&self) -> &'static [u8] {
        match self {
            CircuitId::Mint => b"shieldpool/mint/v1",
            CircuitId::Transfer => b"shieldpool/transfer/v1",
            CircuitId::Burn => b"shieldpool/burn/v1",
        }
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitId::Mint => f.write_str("mint"),
            CircuitId::Transfer => f.write_str("transfer"),
            CircuitId::Burn => f.write_str("burn"),
        }
    }
}

/// Private material for minting one note
#[derive(Debug, Clone)]
pub struct MintWitness {
    pub asset: AssetReference,
    pub value: NoteValue,
    pub owner: PublicKey,
    pub salt: Salt,
}

/// One note being consumed, with its membership path
#[derive(Debug, Clone)]
pub struct SpendInput {
    pub value: NoteValue,
    pub salt: Salt,
    pub leaf_index: u64,
    pub path: MerklePath,
}

/// One note being created
#[derive(Debug, Clone)]
pub struct OutputWitness {
    pub owner: PublicKey,
    pub value: NoteValue,
    pub salt: Salt,
}

/// Private material for a 2-in / 2-out transfer
#[derive(Debug, Clone)]
pub struct TransferWitness {
    pub asset: AssetReference,
    pub secret_key: SecretKey,
    pub root: [u8; 32],
    pub inputs: [SpendInput; 2],
    pub outputs: [OutputWitness; 2],
}

/// Private material for burning one note back to public tokens
#[derive(Debug, Clone)]
pub struct BurnWitness {
    pub asset: AssetReference,
    pub secret_key: SecretKey,
    pub root: [u8; 32],
    pub input: SpendInput,
    pub recipient: Address,
}

/// Full witness handed to the prover. Never leaves the process.
#[derive(Debug, Clone)]
pub enum Witness {
    Mint(MintWitness),
    Transfer(TransferWitness),
    Burn(BurnWitness),
}

impl Witness {
    pub fn circuit(&self) -> CircuitId {
        match self {
            Witness::Mint(_) => CircuitId::Mint,
            Witness::Transfer(_) => CircuitId::Transfer,
            Witness::Burn(_) => CircuitId::Burn,
        }
    }
}

/// Values the ledger sees alongside a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicInputs {
    Mint {
        asset: AssetReference,
        value: NoteValue,
        commitment: Commitment,
    },
    Transfer {
        asset: AssetReference,
        root: [u8; 32],
        nullifiers: [Nullifier; 2],
        commitments: [Commitment; 2],
    },
    Burn {
        asset: AssetReference,
        root: [u8; 32],
        nullifier: Nullifier,
        value: NoteValue,
        recipient: Address,
    },
}

impl PublicInputs {
    pub fn circuit(&self) -> CircuitId {
        match self {
            PublicInputs::Mint { .. } => CircuitId::Mint,
            PublicInputs::Transfer { .. } => CircuitId::Transfer,
            PublicInputs::Burn { .. } => CircuitId::Burn,
        }
    }

    pub fn asset(&self) -> &AssetReference {
        match self {
            PublicInputs::Mint { asset, .. }
            | PublicInputs::Transfer { asset, .. }
            | PublicInputs::Burn { asset, .. } => asset,
        }
    }

    /// Canonical byte encoding, in the order the verifier absorbs them
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(192);
        match self {
            PublicInputs::Mint {
                asset,
                value,
                commitment,
            } => {
                out.extend_from_slice(asset.as_bytes());
                out.extend_from_slice(&value.to_be_bytes());
                out.extend_from_slice(commitment.as_bytes());
            }
            PublicInputs::Transfer {
                asset,
                root,
                nullifiers,
                commitments,
            } => {
                out.extend_from_slice(asset.as_bytes());
                out.extend_from_slice(root);
                for nullifier in nullifiers {
                    out.extend_from_slice(nullifier.as_bytes());
                }
                for commitment in commitments {
                    out.extend_from_slice(commitment.as_bytes());
                }
            }
            PublicInputs::Burn {
                asset,
                root,
                nullifier,
                value,
                recipient,
            } => {
                out.extend_from_slice(asset.as_bytes());
                out.extend_from_slice(root);
                out.extend_from_slice(nullifier.as_bytes());
                out.extend_from_slice(&value.to_be_bytes());
                out.extend_from_slice(recipient.as_bytes());
            }
        }
        out
    }
}

/// Opaque proof bytes for one circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub circuit: CircuitId,
    pub bytes: Vec<u8>,
}
