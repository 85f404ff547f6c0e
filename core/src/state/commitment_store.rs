//! Commitment Store
//!
//! Append-only, index-ordered list of accepted commitments. Leaf `i` is the
//! `i`-th commitment the ledger confirmed; indices are never reused or
//! reassigned. Backed by the Merkle tree so membership paths can be served
//! for any stored leaf.

use std::collections::HashMap;

use shieldpool_privacy::{Commitment, MerklePath, MerkleTree, RootHistory};

use super::StoreError;

#[derive(Debug, Clone)]
pub struct CommitmentStore {
    tree: MerkleTree,
    /// First leaf index of each commitment
    index: HashMap<Commitment, u64>,
    roots: RootHistory,
}

impl CommitmentStore {
    pub fn new(root_history: usize) -> Self {
        let tree = MerkleTree::new();
        let mut roots = RootHistory::new(root_history.max(1));
        roots.push(tree.root());

        Self {
            tree,
            index: HashMap::new(),
            roots,
        }
    }

    /// Append a ledger-confirmed commitment and return its leaf index
    pub fn append(&mut self, commitment: Commitment) -> u64 {
        let leaf_index = self.tree.insert(&commitment);
        self.index.entry(commitment).or_insert(leaf_index);
        self.roots.push(self.tree.root());
        leaf_index
    }

    /// Leaf index of an accepted commitment
    pub fn get_index(&self, commitment: &Commitment) -> Result<u64, StoreError> {
        self.index
            .get(commitment)
            .copied()
            .ok_or(StoreError::NotFound(*commitment))
    }

    pub fn contains(&self, commitment: &Commitment) -> bool {
        self.index.contains_key(commitment)
    }

    pub fn get(&self, leaf_index: u64) -> Option<Commitment> {
        self.tree.get(leaf_index)
    }

    /// Number of leaves, which is also the next leaf index
    pub fn len(&self) -> u64 {
        self.tree.next_position()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn root(&self) -> [u8; 32] {
        self.tree.root()
    }

    /// Membership path for a stored leaf
    pub fn path(&self, leaf_index: u64) -> Option<MerklePath> {
        self.tree.path(leaf_index)
    }

    /// Whether `root` is the current root or one of the recent ones
    pub fn is_known_root(&self, root: &[u8; 32]) -> bool {
        self.roots.is_valid(root)
    }
}
