//! Transaction Orchestrator
//!
//! Composes key material, the prover, the ledger and the local registries
//! into mint, transfer and burn. Each call walks one [`Operation`] through
//! `Constructing -> Witnessing -> Submitting -> Confirmed | Rejected`.
//!
//! The orchestrator never writes to the registries itself. Every change
//! arrives as a confirmed ledger receipt and is applied by [`LedgerSync`],
//! so a failure at any step before confirmation leaves them untouched.

mod context;
mod notes;
mod operation;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context as _;
use log::{info, warn};
use shieldpool_privacy::{
    Address, Commitment, Note, NoteValue, Nullifier, PublicKey, Salt, SaltGuard, SecretKey,
    compute_commitment, compute_nullifier,
};

pub use context::ShieldContext;
pub use notes::{BurnResult, CorrectnessReport, InputNote, OutputNote, TransferResult};
pub use operation::{OperationRecord, OperationState};

use operation::Operation;

use crate::error::ShieldError;
use crate::ledger::{LedgerReceipt, LedgerService, OperationKind, SubmitOutcome, Submission};
use crate::proof::{ProofError, ProverService};
use crate::state::{ShieldedState, StateSnapshot};
use crate::sync::LedgerSync;
use crate::witness::{
    BurnWitness, MintWitness, OutputWitness, Proof, PublicInputs, SpendInput, TransferWitness,
    Witness,
};

pub struct Orchestrator {
    prover: ProverService,
    ledger: LedgerService,
    sync: Arc<LedgerSync>,
    /// `(owner, salt)` pairs handed out by this orchestrator. Claims are
    /// never released, so this grows with every output note created.
    salts: Mutex<SaltGuard>,
    /// Most recent finished operations, oldest first, at most `history_limit`
    history: Mutex<VecDeque<OperationRecord>>,
    history_limit: usize,
    next_op: AtomicU64,
}

/// Finished operations kept by default
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

impl Orchestrator {
    pub fn new(prover: ProverService, ledger: LedgerService, sync: Arc<LedgerSync>) -> Self {
        Self {
            prover,
            ledger,
            sync,
            salts: Mutex::new(SaltGuard::new()),
            history: Mutex::new(VecDeque::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
            next_op: AtomicU64::new(1),
        }
    }

    /// Keep only the last `limit` finished operations in [`Self::history`]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    pub fn sync(&self) -> &Arc<LedgerSync> {
        &self.sync
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.sync.snapshot().await
    }

    /// Recent finished operations, oldest first
    pub fn history(&self) -> Vec<OperationRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    // ========================================================================
    // Mint
    // ========================================================================

    /// Move `value` from `ctx.account`'s public balance into a new note for
    /// `owner`. Returns the note with its leaf index set.
    pub async fn mint(
        &self,
        ctx: &ShieldContext,
        value: NoteValue,
        owner: PublicKey,
        salt: Salt,
    ) -> Result<Note, ShieldError> {
        let mut op = self.begin(OperationKind::Mint);
        let result = self.run_mint(&mut op, ctx, value, owner, salt).await;
        self.finish(op, &result);
        result
    }

    async fn run_mint(
        &self,
        op: &mut Operation,
        ctx: &ShieldContext,
        value: NoteValue,
        owner: PublicKey,
        salt: Salt,
    ) -> Result<Note, ShieldError> {
        let kind = op.kind();
        self.refresh(kind).await?;

        let note = Note::with_salt(ctx.asset, value, owner, salt);
        let commitment = note.commitment();
        if self.sync.state().read().await.commitments().contains(&commitment) {
            return Err(ShieldError::SaltReuse { op: kind, owner });
        }
        self.claim_salt(kind, owner, salt)?;

        op.advance(OperationState::Witnessing);
        let witness = Witness::Mint(MintWitness {
            asset: ctx.asset,
            value,
            owner,
            salt,
        });
        let (proof, public_inputs) = self.prove(kind, witness).await?;

        op.advance(OperationState::Submitting);
        let receipt = self.submit(kind, ctx.account, proof, public_inputs).await?;
        let leaf_index = leaf_index_in(kind, &receipt, &commitment)?;
        self.settle(op, &receipt).await;

        Ok(note.with_leaf_index(leaf_index))
    }

    // ========================================================================
    // Transfer
    // ========================================================================

    /// Spend two notes owned by `secret_key` into a note for `recipient`
    /// (output 0) and a change note back to the sender (output 1).
    pub async fn transfer(
        &self,
        ctx: &ShieldContext,
        inputs: [InputNote; 2],
        outputs: [OutputNote; 2],
        recipient: PublicKey,
        secret_key: &SecretKey,
    ) -> Result<TransferResult, ShieldError> {
        let mut op = self.begin(OperationKind::Transfer);
        let result = self
            .run_transfer(&mut op, ctx, inputs, outputs, recipient, secret_key)
            .await;
        self.finish(op, &result);
        result
    }

    async fn run_transfer(
        &self,
        op: &mut Operation,
        ctx: &ShieldContext,
        inputs: [InputNote; 2],
        outputs: [OutputNote; 2],
        recipient: PublicKey,
        secret_key: &SecretKey,
    ) -> Result<TransferResult, ShieldError> {
        let kind = op.kind();
        if inputs[0].commitment == inputs[1].commitment {
            return Err(ShieldError::invalid(kind, "both inputs are the same note"));
        }
        if outputs[0].salt == outputs[1].salt {
            return Err(ShieldError::invalid(kind, "outputs share a salt"));
        }
        if inputs.iter().any(|i| outputs.iter().any(|o| o.salt == i.salt)) {
            return Err(ShieldError::invalid(kind, "output reuses an input salt"));
        }

        let total_in = NoteValue::checked_sum(inputs.iter().map(|i| i.value))
            .ok_or_else(|| ShieldError::invalid(kind, "input values overflow"))?;
        let total_out = NoteValue::checked_sum(outputs.iter().map(|o| o.value))
            .ok_or_else(|| ShieldError::invalid(kind, "output values overflow"))?;
        if total_in != total_out {
            return Err(ShieldError::invalid(
                kind,
                format!(
                    "inputs sum to {} but outputs sum to {}",
                    total_in.as_u128(),
                    total_out.as_u128()
                ),
            ));
        }

        let sender = secret_key.public_key();
        let owners = [recipient, sender];
        let notes = [0, 1]
            .map(|i| Note::with_salt(ctx.asset, outputs[i].value, owners[i], outputs[i].salt));

        self.refresh(kind).await?;
        let (spends, nullifiers, root) = {
            let state = self.sync.state();
            let state = state.read().await;
            let first = resolve_spend(&state, kind, ctx, &inputs[0], secret_key)?;
            let second = resolve_spend(&state, kind, ctx, &inputs[1], secret_key)?;
            for note in &notes {
                if state.commitments().contains(&note.commitment()) {
                    return Err(ShieldError::SaltReuse {
                        op: kind,
                        owner: note.owner,
                    });
                }
            }
            (
                [first.0, second.0],
                [first.1, second.1],
                state.commitments().root(),
            )
        };
        for note in &notes {
            self.claim_salt(kind, note.owner, note.salt)?;
        }

        op.advance(OperationState::Witnessing);
        let witness = Witness::Transfer(TransferWitness {
            asset: ctx.asset,
            secret_key: secret_key.clone(),
            root,
            inputs: spends,
            outputs: [0, 1].map(|i| OutputWitness {
                owner: notes[i].owner,
                value: notes[i].value,
                salt: notes[i].salt,
            }),
        });
        let (proof, public_inputs) = self.prove(kind, witness).await?;

        op.advance(OperationState::Submitting);
        let receipt = self.submit(kind, ctx.account, proof, public_inputs).await?;
        let [recipient_note, change_note] = notes;
        let recipient_index = leaf_index_in(kind, &receipt, &recipient_note.commitment())?;
        let change_index = leaf_index_in(kind, &receipt, &change_note.commitment())?;
        self.settle(op, &receipt).await;

        Ok(TransferResult {
            outputs: [
                recipient_note.with_leaf_index(recipient_index),
                change_note.with_leaf_index(change_index),
            ],
            nullifiers,
            sequence: receipt.sequence,
        })
    }

    // ========================================================================
    // Burn
    // ========================================================================

    /// Spend one note and release its value as public tokens to `recipient`
    pub async fn burn(
        &self,
        ctx: &ShieldContext,
        input: InputNote,
        secret_key: &SecretKey,
        recipient: Address,
    ) -> Result<BurnResult, ShieldError> {
        let mut op = self.begin(OperationKind::Burn);
        let result = self.run_burn(&mut op, ctx, input, secret_key, recipient).await;
        self.finish(op, &result);
        result
    }

    async fn run_burn(
        &self,
        op: &mut Operation,
        ctx: &ShieldContext,
        input: InputNote,
        secret_key: &SecretKey,
        recipient: Address,
    ) -> Result<BurnResult, ShieldError> {
        let kind = op.kind();
        self.refresh(kind).await?;

        let (spend, nullifier, root) = {
            let state = self.sync.state();
            let state = state.read().await;
            let (spend, nullifier) = resolve_spend(&state, kind, ctx, &input, secret_key)?;
            (spend, nullifier, state.commitments().root())
        };

        op.advance(OperationState::Witnessing);
        let witness = Witness::Burn(BurnWitness {
            asset: ctx.asset,
            secret_key: secret_key.clone(),
            root,
            input: spend,
            recipient,
        });
        let (proof, public_inputs) = self.prove(kind, witness).await?;

        op.advance(OperationState::Submitting);
        let receipt = self.submit(kind, ctx.account, proof, public_inputs).await?;
        self.settle(op, &receipt).await;

        Ok(BurnResult {
            nullifier,
            value: input.value,
            recipient,
            sequence: receipt.sequence,
        })
    }

    // ========================================================================
    // Correctness check
    // ========================================================================

    /// Check a note the caller holds against the ledger and the local store
    pub async fn check_correctness(
        &self,
        ctx: &ShieldContext,
        value: NoteValue,
        owner: PublicKey,
        salt: Salt,
        commitment: Commitment,
        leaf_index: u64,
    ) -> anyhow::Result<CorrectnessReport> {
        let recomputed = compute_commitment(&ctx.asset, value, &owner, &salt);
        let on_chain = self
            .ledger
            .commitment_at(leaf_index)
            .await
            .with_context(|| format!("failed to read leaf {leaf_index} from ledger"))?;

        self.sync.catch_up(&self.ledger).await?;
        let stored = self.sync.state().read().await.commitments().get(leaf_index);

        Ok(CorrectnessReport {
            commitment_matches: recomputed == commitment,
            on_chain: on_chain == Some(commitment),
            stored_locally: stored == Some(commitment),
        })
    }

    // ========================================================================
    // Steps
    // ========================================================================

    fn begin(&self, kind: OperationKind) -> Operation {
        Operation::begin(self.next_op.fetch_add(1, Ordering::Relaxed), kind)
    }

    fn finish<T>(&self, op: Operation, result: &Result<T, ShieldError>) {
        let record = op.into_record(result.as_ref().err().map(ToString::to_string));
        match &record.error {
            None => info!(
                "{} #{} confirmed at seq={}",
                record.kind,
                record.id,
                record.sequence.unwrap_or_default()
            ),
            Some(error) => warn!("{} #{} rejected: {}", record.kind, record.id, error),
        }
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push_back(record);
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    /// Bring the registries up to the ledger's head
    async fn refresh(&self, kind: OperationKind) -> Result<(), ShieldError> {
        self.sync
            .catch_up(&self.ledger)
            .await
            .map(|_| ())
            .map_err(|e| ShieldError::storage(kind, e))
    }

    fn claim_salt(
        &self,
        kind: OperationKind,
        owner: PublicKey,
        salt: Salt,
    ) -> Result<(), ShieldError> {
        let mut salts = self.salts.lock().unwrap_or_else(PoisonError::into_inner);
        if salts.claim(owner, salt) {
            Ok(())
        } else {
            Err(ShieldError::SaltReuse { op: kind, owner })
        }
    }

    async fn prove(
        &self,
        kind: OperationKind,
        witness: Witness,
    ) -> Result<(Proof, PublicInputs), ShieldError> {
        self.prover.prove(witness).await.map_err(|e| match e {
            ProofError::Unsatisfied { reason, .. } => ShieldError::invalid(kind, reason),
            source @ ProofError::Unavailable(_) => {
                ShieldError::ProofServiceFailure { op: kind, source }
            }
        })
    }

    async fn submit(
        &self,
        kind: OperationKind,
        sender: Address,
        proof: Proof,
        public_inputs: PublicInputs,
    ) -> Result<LedgerReceipt, ShieldError> {
        let submission = Submission {
            kind,
            sender,
            proof,
            public_inputs,
        };
        match self.ledger.submit(submission).await {
            Ok(SubmitOutcome::Confirmed(receipt)) => Ok(receipt),
            Ok(SubmitOutcome::Rejected(reason)) => Err(ShieldError::from_rejection(kind, reason)),
            Err(e) => Err(ShieldError::LedgerRejected {
                op: kind,
                reason: format!("{e:#}"),
            }),
        }
    }

    /// Mark the operation confirmed and apply its receipt locally.
    ///
    /// The receipt is already final on the ledger, so local failures are only
    /// logged. A receipt that could not be applied stays buffered in
    /// [`LedgerSync`] until the next catch-up.
    async fn settle(&self, op: &mut Operation, receipt: &LedgerReceipt) {
        op.confirm(receipt.sequence);
        let kind = op.kind();

        if let Err(e) = self.sync.observe(receipt.clone()).await {
            warn!(
                "{} seq={} confirmed but not applied locally: {}",
                kind, receipt.sequence, e
            );
            return;
        }

        // Receipts confirmed for other callers may still sit between us and
        // the local head.
        if self.sync.snapshot().await.next_sequence <= receipt.sequence {
            if let Err(e) = self.sync.catch_up(&self.ledger).await {
                warn!(
                    "{} seq={} confirmed, local catch-up deferred: {:#}",
                    kind, receipt.sequence, e
                );
            }
        }
    }
}

/// Resolve the spend material for one input against the current registries
fn resolve_spend(
    state: &ShieldedState,
    kind: OperationKind,
    ctx: &ShieldContext,
    input: &InputNote,
    secret_key: &SecretKey,
) -> Result<(SpendInput, Nullifier), ShieldError> {
    if input.expected_commitment(&ctx.asset, secret_key) != input.commitment {
        return Err(ShieldError::invalid(
            kind,
            format!(
                "input {} is not a note of this asset owned by the spending key",
                input.commitment.short()
            ),
        ));
    }

    let actual = state
        .commitments()
        .get_index(&input.commitment)
        .map_err(|e| ShieldError::from_store(kind, e))?;
    if let Some(claimed) = input.leaf_index.filter(|claimed| *claimed != actual) {
        return Err(ShieldError::StaleIndex {
            op: kind,
            commitment: input.commitment,
            claimed,
            actual,
        });
    }

    let nullifier = compute_nullifier(secret_key, &input.salt);
    if state.nullifiers().contains(&nullifier) {
        return Err(ShieldError::AlreadySpent { op: kind, nullifier });
    }

    let path = state.commitments().path(actual).ok_or_else(|| ShieldError::Storage {
        op: kind,
        reason: format!("no membership path for leaf {actual}"),
    })?;

    Ok((
        SpendInput {
            value: input.value,
            salt: input.salt,
            leaf_index: actual,
            path,
        },
        nullifier,
    ))
}

fn leaf_index_in(
    kind: OperationKind,
    receipt: &LedgerReceipt,
    commitment: &Commitment,
) -> Result<u64, ShieldError> {
    receipt
        .appended()
        .find(|(_, c)| c == commitment)
        .map(|(leaf_index, _)| leaf_index)
        .ok_or_else(|| ShieldError::Storage {
            op: kind,
            reason: format!(
                "receipt seq={} has no leaf for {}",
                receipt.sequence,
                commitment.short()
            ),
        })
}
