//! Proof Service
//!
//! Seam to the zero-knowledge prover.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        ProverService                              │
//! │                                                                   │
//! │   prove(witness) ──▶ mpsc queue ──▶ ┌──────────┐ ┌──────────┐     │
//! │        ▲                            │ worker 0 │ │ worker 1 │ ... │
//! │        │                            └────┬─────┘ └────┬─────┘     │
//! │        └──────────── oneshot reply ◀─────┴────────────┘           │
//! │                                                                   │
//! │   Workers are OS threads outside the tokio runtime: proving is    │
//! │   CPU-bound and shares no mutable state between operations.       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use log::debug;
use shieldpool_privacy::{
    AssetReference, Commitment, NoteValue, Nullifier, SecretKey, compute_commitment,
    compute_nullifier,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::witness::{CircuitId, Proof, PublicInputs, SpendInput, Witness};

// ============================================================================
// Proof Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("{circuit} constraint unsatisfied: {reason}")]
    Unsatisfied { circuit: CircuitId, reason: String },

    #[error("proof service unavailable: {0}")]
    Unavailable(String),
}

impl ProofError {
    fn unsatisfied(circuit: CircuitId, reason: impl Into<String>) -> Self {
        ProofError::Unsatisfied {
            circuit,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Proof Service Trait
// ============================================================================

/// Produces and checks proofs for the mint/transfer/burn circuits
pub trait ProofService: Send + Sync {
    /// Prove `witness` under the circuit it belongs to
    fn prove(&self, witness: &Witness) -> Result<(Proof, PublicInputs), ProofError>;

    /// Check a proof against its public inputs
    fn verify(&self, circuit: CircuitId, proof: &Proof, inputs: &PublicInputs) -> bool;
}

// ============================================================================
// Mock Proof Service
// ============================================================================

/// In-process stand-in for the circuits.
///
/// Checks every constraint the real circuit enforces, then emits a keyed
/// BLAKE3 digest of the circuit tag and public inputs as the proof.
pub struct MockProofService {
    key: [u8; 32],
}

impl MockProofService {
    pub fn new() -> Self {
        Self {
            key: *blake3::hash(b"shieldpool-mock-circuit-v1").as_bytes(),
        }
    }

    fn digest(&self, circuit: CircuitId, inputs: &PublicInputs) -> Vec<u8> {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(circuit.tag());
        hasher.update(&inputs.to_bytes());
        hasher.finalize().as_bytes().to_vec()
    }

    /// Membership and nullifier constraints for one spent note
    fn check_spend(
        circuit: CircuitId,
        asset: &AssetReference,
        secret_key: &SecretKey,
        root: &[u8; 32],
        input: &SpendInput,
    ) -> Result<Nullifier, ProofError> {
        let owner = secret_key.public_key();
        let commitment = compute_commitment(asset, input.value, &owner, &input.salt);

        if input.path.position != input.leaf_index {
            return Err(ProofError::unsatisfied(
                circuit,
                format!(
                    "path is for leaf {}, witness claims {}",
                    input.path.position, input.leaf_index
                ),
            ));
        }
        if !input.path.verify(&commitment, root) {
            return Err(ProofError::unsatisfied(
                circuit,
                format!(
                    "commitment {} is not a member at leaf {}",
                    commitment.short(),
                    input.leaf_index
                ),
            ));
        }

        Ok(compute_nullifier(secret_key, &input.salt))
    }
}

impl Default for MockProofService {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofService for MockProofService {
    fn prove(&self, witness: &Witness) -> Result<(Proof, PublicInputs), ProofError> {
        let circuit = witness.circuit();

        let inputs = match witness {
            Witness::Mint(w) => PublicInputs::Mint {
                asset: w.asset,
                value: w.value,
                commitment: compute_commitment(&w.asset, w.value, &w.owner, &w.salt),
            },

            Witness::Transfer(w) => {
                let mut nullifiers = [Nullifier([0u8; 32]); 2];
                for (slot, input) in nullifiers.iter_mut().zip(&w.inputs) {
                    *slot = Self::check_spend(circuit, &w.asset, &w.secret_key, &w.root, input)?;
                }
                if nullifiers[0] == nullifiers[1] {
                    return Err(ProofError::unsatisfied(circuit, "both inputs are the same note"));
                }

                let input_total = NoteValue::checked_sum(w.inputs.iter().map(|i| i.value))
                    .ok_or_else(|| ProofError::unsatisfied(circuit, "input values overflow"))?;
                let output_total = NoteValue::checked_sum(w.outputs.iter().map(|o| o.value))
                    .ok_or_else(|| ProofError::unsatisfied(circuit, "output values overflow"))?;
                if input_total != output_total {
                    return Err(ProofError::unsatisfied(
                        circuit,
                        format!(
                            "inputs sum to {} but outputs sum to {}",
                            input_total.as_u128(),
                            output_total.as_u128()
                        ),
                    ));
                }

                let mut commitments = [Commitment([0u8; 32]); 2];
                for (slot, output) in commitments.iter_mut().zip(&w.outputs) {
                    *slot = compute_commitment(&w.asset, output.value, &output.owner, &output.salt);
                }
                let unique: HashSet<_> = commitments.iter().collect();
                if unique.len() != commitments.len() {
                    return Err(ProofError::unsatisfied(circuit, "outputs share a commitment"));
                }

                PublicInputs::Transfer {
                    asset: w.asset,
                    root: w.root,
                    nullifiers,
                    commitments,
                }
            }

            Witness::Burn(w) => {
                let nullifier =
                    Self::check_spend(circuit, &w.asset, &w.secret_key, &w.root, &w.input)?;
                PublicInputs::Burn {
                    asset: w.asset,
                    root: w.root,
                    nullifier,
                    value: w.input.value,
                    recipient: w.recipient,
                }
            }
        };

        let proof = Proof {
            circuit,
            bytes: self.digest(circuit, &inputs),
        };
        debug!("proved {} ({} bytes)", circuit, proof.bytes.len());
        Ok((proof, inputs))
    }

    fn verify(&self, circuit: CircuitId, proof: &Proof, inputs: &PublicInputs) -> bool {
        proof.circuit == circuit
            && inputs.circuit() == circuit
            && proof.bytes == self.digest(circuit, inputs)
    }
}

// ============================================================================
// Async Prover Service
// ============================================================================

/// Request to prove a witness
struct ProveRequest {
    witness: Witness,
    reply: oneshot::Sender<Result<(Proof, PublicInputs), ProofError>>,
}

/// Async front to a pool of proving threads
#[derive(Clone)]
pub struct ProverService {
    request_tx: mpsc::Sender<ProveRequest>,
    prover: Arc<dyn ProofService>,
}

impl ProverService {
    /// Start `workers` proving threads fed by a queue of `queue_depth` requests
    pub fn start(
        prover: Arc<dyn ProofService>,
        workers: usize,
        queue_depth: usize,
    ) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<ProveRequest>(queue_depth.max(1));
        let request_rx = Arc::new(Mutex::new(request_rx));

        for id in 0..workers.max(1) {
            let rx = request_rx.clone();
            let prover = prover.clone();
            std::thread::Builder::new()
                .name(format!("prover-{id}"))
                .spawn(move || {
                    loop {
                        let next = match rx.lock() {
                            Ok(mut guard) => guard.blocking_recv(),
                            Err(_) => None,
                        };
                        let Some(request) = next else { break };
                        let result = prover.prove(&request.witness);
                        let _ = request.reply.send(result);
                    }
                    debug!("prover-{id} stopped");
                })
                .context("failed to spawn prover worker")?;
        }

        Ok(Self { request_tx, prover })
    }

    /// Queue a witness for proving and wait for the result
    pub async fn prove(&self, witness: Witness) -> Result<(Proof, PublicInputs), ProofError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.request_tx
            .send(ProveRequest {
                witness,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProofError::Unavailable("prover queue closed".into()))?;

        reply_rx
            .await
            .map_err(|_| ProofError::Unavailable("prover worker crashed".into()))?
    }

    pub fn verify(&self, circuit: CircuitId, proof: &Proof, inputs: &PublicInputs) -> bool {
        self.prover.verify(circuit, proof, inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::witness::{MintWitness, OutputWitness, TransferWitness};
    use shieldpool_privacy::{MerkleTree, PublicKey, Salt};

    fn asset() -> AssetReference {
        AssetReference([7u8; 32])
    }

    /// Tree holding two notes of `sk`, returns the transfer inputs for them
    fn funded_inputs(sk: &SecretKey, values: [u128; 2]) -> (MerkleTree, [SpendInput; 2]) {
        let mut tree = MerkleTree::new();
        let salts = [Salt::from_bytes([1u8; 32]), Salt::from_bytes([2u8; 32])];
        for (value, salt) in values.iter().zip(&salts) {
            let c = compute_commitment(&asset(), NoteValue::new(*value), &sk.public_key(), salt);
            tree.insert(&c);
        }
        let inputs = [0u64, 1].map(|i| SpendInput {
            value: NoteValue::new(values[i as usize]),
            salt: salts[i as usize],
            leaf_index: i,
            path: tree.path(i).unwrap(),
        });
        (tree, inputs)
    }

    fn outputs(values: [u128; 2]) -> [OutputWitness; 2] {
        [
            OutputWitness {
                owner: SecretKey::from_bytes([0x22; 32]).public_key(),
                value: NoteValue::new(values[0]),
                salt: Salt::from_bytes([3u8; 32]),
            },
            OutputWitness {
                owner: SecretKey::from_bytes([0x11; 32]).public_key(),
                value: NoteValue::new(values[1]),
                salt: Salt::from_bytes([4u8; 32]),
            },
        ]
    }

    #[test]
    fn test_mint_proof_verifies() {
        let prover = MockProofService::new();
        let witness = Witness::Mint(MintWitness {
            asset: asset(),
            value: NoteValue::new(0x20),
            owner: PublicKey::from_bytes([1u8; 32]),
            salt: Salt::from_bytes([9u8; 32]),
        });

        let (proof, inputs) = prover.prove(&witness).unwrap();
        assert!(prover.verify(CircuitId::Mint, &proof, &inputs));
        assert!(!prover.verify(CircuitId::Burn, &proof, &inputs));
    }

    #[test]
    fn test_tampered_inputs_fail_verification() {
        let prover = MockProofService::new();
        let witness = Witness::Mint(MintWitness {
            asset: asset(),
            value: NoteValue::new(0x20),
            owner: PublicKey::from_bytes([1u8; 32]),
            salt: Salt::from_bytes([9u8; 32]),
        });
        let (proof, inputs) = prover.prove(&witness).unwrap();

        let PublicInputs::Mint { asset, commitment, .. } = inputs else {
            panic!("expected mint inputs");
        };
        let inflated = PublicInputs::Mint {
            asset,
            value: NoteValue::new(0x2000),
            commitment,
        };
        assert!(!prover.verify(CircuitId::Mint, &proof, &inflated));
    }

    #[test]
    fn test_transfer_conserves_value() {
        let sk = SecretKey::from_bytes([0x11; 32]);
        let (tree, inputs) = funded_inputs(&sk, [0x20, 0x30]);
        let prover = MockProofService::new();

        let ok = Witness::Transfer(TransferWitness {
            asset: asset(),
            secret_key: sk.clone(),
            root: tree.root(),
            inputs: inputs.clone(),
            outputs: outputs([0x40, 0x10]),
        });
        assert!(prover.prove(&ok).is_ok());

        let inflating = Witness::Transfer(TransferWitness {
            asset: asset(),
            secret_key: sk,
            root: tree.root(),
            inputs,
            outputs: outputs([0x40, 0x11]),
        });
        assert!(matches!(
            prover.prove(&inflating),
            Err(ProofError::Unsatisfied { circuit: CircuitId::Transfer, .. })
        ));
    }

    #[test]
    fn test_transfer_rejects_wrong_leaf_index() {
        let sk = SecretKey::from_bytes([0x11; 32]);
        let (tree, mut inputs) = funded_inputs(&sk, [0x20, 0x30]);
        inputs[0].leaf_index = 2;

        let witness = Witness::Transfer(TransferWitness {
            asset: asset(),
            secret_key: sk,
            root: tree.root(),
            inputs,
            outputs: outputs([0x40, 0x10]),
        });
        assert!(MockProofService::new().prove(&witness).is_err());
    }

    #[test]
    fn test_transfer_requires_owner_key() {
        let sk = SecretKey::from_bytes([0x11; 32]);
        let (tree, inputs) = funded_inputs(&sk, [0x20, 0x30]);

        let witness = Witness::Transfer(TransferWitness {
            asset: asset(),
            secret_key: SecretKey::from_bytes([0x33; 32]),
            root: tree.root(),
            inputs,
            outputs: outputs([0x40, 0x10]),
        });
        assert!(MockProofService::new().prove(&witness).is_err());
    }

    #[tokio::test]
    async fn test_prover_service_roundtrip() {
        let service = ProverService::start(Arc::new(MockProofService::new()), 2, 4).unwrap();
        let witness = Witness::Mint(MintWitness {
            asset: asset(),
            value: NoteValue::new(1),
            owner: PublicKey::from_bytes([1u8; 32]),
            salt: Salt::from_bytes([9u8; 32]),
        });

        let (proof, inputs) = service.prove(witness).await.unwrap();
        assert!(service.verify(CircuitId::Mint, &proof, &inputs));
    }
}
