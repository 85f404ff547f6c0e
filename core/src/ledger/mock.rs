//! Mock Ledger (for testing)
//!
//! In-process shield contract over a fungible token. Everything a submission
//! touches (token balances, commitment tree, nullifier set, receipt log) sits
//! behind one lock, so a transaction is applied in full or not at all.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shieldpool_privacy::{
    Address, AssetReference, Commitment, MerkleTree, NoteValue, Nullifier, RootHistory,
};

use super::{LedgerAdapter, LedgerEvent, LedgerReceipt, RejectReason, SubmitOutcome, Submission};
use crate::proof::ProofService;
use crate::witness::PublicInputs;

/// Public metadata of the underlying token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub total_supply: NoteValue,
}

struct LedgerInner {
    token: TokenInfo,
    balances: HashMap<Address, NoteValue>,
    tree: MerkleTree,
    roots: RootHistory,
    nullifiers: HashSet<Nullifier>,
    receipts: Vec<LedgerReceipt>,
    reject_next: Option<String>,
}

impl LedgerInner {
    fn balance(&self, account: &Address) -> NoteValue {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn debit(&mut self, account: &Address, amount: NoteValue) -> Result<(), RejectReason> {
        let available = self.balance(account);
        let remaining = available
            .checked_sub(amount)
            .ok_or(RejectReason::InsufficientBalance {
                needed: amount,
                available,
            })?;
        self.balances.insert(*account, remaining);
        Ok(())
    }

    fn credit(&mut self, account: &Address, amount: NoteValue) -> Result<(), RejectReason> {
        let updated = self
            .balance(account)
            .checked_add(amount)
            .ok_or_else(|| RejectReason::Other("balance overflow".into()))?;
        self.balances.insert(*account, updated);
        Ok(())
    }

    fn append(&mut self, commitment: Commitment) -> LedgerEvent {
        let leaf_index = self.tree.insert(&commitment);
        self.roots.push(self.tree.root());
        LedgerEvent::LeafAppended {
            leaf_index,
            commitment,
        }
    }

    fn check_spend(&self, root: &[u8; 32], nullifiers: &[Nullifier]) -> Result<(), RejectReason> {
        if !self.roots.is_valid(root) {
            return Err(RejectReason::UnknownRoot);
        }
        let mut seen = HashSet::new();
        for nullifier in nullifiers {
            if self.nullifiers.contains(nullifier) || !seen.insert(*nullifier) {
                return Err(RejectReason::NullifierSpent(*nullifier));
            }
        }
        Ok(())
    }
}

/// In-process shield contract and token ledger
pub struct MockLedger {
    asset: AssetReference,
    shield_address: Address,
    verifier: Arc<dyn ProofService>,
    inner: Mutex<LedgerInner>,
}

impl MockLedger {
    pub fn new(
        asset: AssetReference,
        verifier: Arc<dyn ProofService>,
        root_history: usize,
    ) -> Self {
        let tree = MerkleTree::new();
        let mut roots = RootHistory::new(root_history.max(1));
        roots.push(tree.root());

        let mut pool = [0u8; 20];
        pool.copy_from_slice(&blake3::hash(asset.as_bytes()).as_bytes()[..20]);

        Self {
            asset,
            shield_address: Address::from_bytes(pool),
            verifier,
            inner: Mutex::new(LedgerInner {
                token: TokenInfo {
                    name: "OpsCoin".into(),
                    symbol: "OPS".into(),
                    total_supply: NoteValue::ZERO,
                },
                balances: HashMap::new(),
                tree,
                roots,
                nullifiers: HashSet::new(),
                receipts: Vec::new(),
                reject_next: None,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerInner>> {
        self.inner.lock().map_err(|_| anyhow!("mock ledger state poisoned"))
    }

    pub fn asset(&self) -> &AssetReference {
        &self.asset
    }

    /// Account holding the tokens locked in the shielded pool
    pub fn shield_address(&self) -> Address {
        self.shield_address
    }

    /// Refuse the next submission with `reason`
    pub fn reject_next(&self, reason: impl Into<String>) -> Result<()> {
        self.lock()?.reject_next = Some(reason.into());
        Ok(())
    }

    pub fn root(&self) -> Result<[u8; 32]> {
        Ok(self.lock()?.tree.root())
    }

    pub fn leaf_count(&self) -> Result<u64> {
        Ok(self.lock()?.tree.next_position())
    }

    // ========================================================================
    // Public token
    // ========================================================================

    /// Issue new public tokens to `to`
    pub fn mint_public(&self, to: &Address, amount: NoteValue) -> Result<()> {
        let mut inner = self.lock()?;
        let supply = inner
            .token
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| anyhow!("total supply overflow"))?;
        inner.credit(to, amount).map_err(|e| anyhow!("{e}"))?;
        inner.token.total_supply = supply;
        Ok(())
    }

    pub fn transfer_public(&self, from: &Address, to: &Address, amount: NoteValue) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.balance(from) < amount {
            bail!("{} cannot transfer {}: insufficient balance", from, amount.as_u128());
        }
        if from != to && inner.balance(to).checked_add(amount).is_none() {
            bail!("{} cannot receive {}: balance overflow", to, amount.as_u128());
        }
        inner.debit(from, amount).map_err(|e| anyhow!("{e}"))?;
        inner.credit(to, amount).map_err(|e| anyhow!("{e}"))?;
        Ok(())
    }

    /// Destroy public tokens held by `from`
    pub fn burn_public(&self, from: &Address, amount: NoteValue) -> Result<()> {
        let mut inner = self.lock()?;
        let supply = inner
            .token
            .total_supply
            .checked_sub(amount)
            .ok_or_else(|| anyhow!("total supply underflow"))?;
        inner.debit(from, amount).map_err(|e| anyhow!("{e}"))?;
        inner.token.total_supply = supply;
        Ok(())
    }

    pub fn token_info(&self) -> Result<TokenInfo> {
        Ok(self.lock()?.token.clone())
    }

    // ========================================================================
    // Shield contract
    // ========================================================================

    fn execute(
        &self,
        inner: &mut LedgerInner,
        submission: &Submission,
    ) -> Result<Vec<LedgerEvent>, RejectReason> {
        let inputs = &submission.public_inputs;
        if inputs.asset() != &self.asset {
            return Err(RejectReason::AssetMismatch);
        }
        let circuit = submission.kind.circuit();
        if !self.verifier.verify(circuit, &submission.proof, inputs) {
            return Err(RejectReason::InvalidProof);
        }

        // Every check runs before the first write.
        match inputs {
            PublicInputs::Mint {
                value, commitment, ..
            } => {
                if inner.balance(&self.shield_address).checked_add(*value).is_none() {
                    return Err(RejectReason::Other("pool balance overflow".into()));
                }
                inner.debit(&submission.sender, *value)?;
                inner.credit(&self.shield_address, *value)?;
                let leaf = inner.append(*commitment);
                Ok(vec![
                    LedgerEvent::PublicTransfer {
                        from: submission.sender,
                        to: self.shield_address,
                        amount: *value,
                    },
                    leaf,
                ])
            }

            PublicInputs::Transfer {
                root,
                nullifiers,
                commitments,
                ..
            } => {
                inner.check_spend(root, nullifiers)?;
                let mut events = Vec::with_capacity(4);
                for nullifier in nullifiers {
                    inner.nullifiers.insert(*nullifier);
                    events.push(LedgerEvent::Nullified {
                        nullifier: *nullifier,
                    });
                }
                for commitment in commitments {
                    events.push(inner.append(*commitment));
                }
                Ok(events)
            }

            PublicInputs::Burn {
                root,
                nullifier,
                value,
                recipient,
                ..
            } => {
                inner.check_spend(root, std::slice::from_ref(nullifier))?;
                let pooled = inner.balance(&self.shield_address);
                if pooled < *value {
                    return Err(RejectReason::InsufficientBalance {
                        needed: *value,
                        available: pooled,
                    });
                }
                if inner.balance(recipient).checked_add(*value).is_none() {
                    return Err(RejectReason::Other("recipient balance overflow".into()));
                }
                inner.debit(&self.shield_address, *value)?;
                inner.credit(recipient, *value)?;
                inner.nullifiers.insert(*nullifier);
                Ok(vec![
                    LedgerEvent::Nullified {
                        nullifier: *nullifier,
                    },
                    LedgerEvent::PublicTransfer {
                        from: self.shield_address,
                        to: *recipient,
                        amount: *value,
                    },
                ])
            }
        }
    }
}

impl LedgerAdapter for MockLedger {
    fn submit(&self, submission: &Submission) -> Result<SubmitOutcome> {
        let mut inner = self.lock()?;

        if let Some(reason) = inner.reject_next.take() {
            debug!("{} rejected by injected failure: {}", submission.kind, reason);
            return Ok(SubmitOutcome::Rejected(RejectReason::Other(reason)));
        }
        let events = match self.execute(&mut inner, submission) {
            Ok(events) => events,
            Err(reason) => {
                debug!("{} rejected: {}", submission.kind, reason);
                return Ok(SubmitOutcome::Rejected(reason));
            }
        };

        let sequence = inner.receipts.len() as u64;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&sequence.to_be_bytes());
        hasher.update(&submission.proof.bytes);
        let receipt = LedgerReceipt {
            sequence,
            tx_hash: *hasher.finalize().as_bytes(),
            kind: submission.kind,
            events,
        };

        info!(
            "ledger confirmed {} seq={} tx={}",
            receipt.kind,
            receipt.sequence,
            receipt.short_hash()
        );
        inner.receipts.push(receipt.clone());
        Ok(SubmitOutcome::Confirmed(receipt))
    }

    fn receipts_since(&self, from: u64) -> Result<Vec<LedgerReceipt>> {
        let inner = self.lock()?;
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(inner.receipts.len());
        Ok(inner.receipts[start..].to_vec())
    }

    fn commitment_at(&self, leaf_index: u64) -> Result<Option<Commitment>> {
        Ok(self.lock()?.tree.get(leaf_index))
    }

    fn is_nullified(&self, nullifier: &Nullifier) -> Result<bool> {
        Ok(self.lock()?.nullifiers.contains(nullifier))
    }

    fn balance_of(&self, account: &Address) -> Result<NoteValue> {
        Ok(self.lock()?.balance(account))
    }
}
