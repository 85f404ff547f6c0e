//! Commitment tree.
//!
//! Append-only SHA-256 Merkle tree of fixed depth over the commitment list.
//! Leaf `i` is the commitment with leaf index `i`. Unfilled leaves are
//! `[0; 32]`, so the root of an empty subtree of height `h` is a constant.
//!
//! ```text
//!   height 2            root
//!                    /        \
//!   height 1     n(0,1)      n(2,3)
//!                /    \      /    \
//!   height 0   c0     c1   c2    empty
//! ```
//!
//! Because leaves only append, the nodes at each height form a dense prefix
//! and are kept in plain vectors.

use std::collections::VecDeque;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::hash::{HASH_LEN, sha256_concat};

pub const TREE_DEPTH: usize = 32;

type Node = [u8; HASH_LEN];

/// Parent of two nodes
pub fn hash_children(left: &Node, right: &Node) -> Node {
    sha256_concat(&[left, right])
}

/// Root of an all-empty subtree, indexed by height
fn empty_subtree(height: usize) -> Node {
    static EMPTY: OnceLock<Vec<Node>> = OnceLock::new();
    let table = EMPTY.get_or_init(|| {
        let mut table = vec![[0u8; HASH_LEN]];
        for h in 0..TREE_DEPTH {
            let below = table[h];
            table.push(hash_children(&below, &below));
        }
        table
    });
    table.get(height).copied().unwrap_or([0u8; HASH_LEN])
}

/// Authentication path for one leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    pub position: u64,
    /// One sibling per height, leaf level first
    pub siblings: Vec<Node>,
}

impl MerklePath {
    /// Fold `leaf` up the path; the bits of `position` pick the side at each
    /// height, so a path only verifies at the index it was issued for.
    pub fn root_for(&self, leaf: &Commitment) -> Node {
        self.siblings
            .iter()
            .enumerate()
            .fold(leaf.0, |node, (height, sibling)| {
                if (self.position >> height) & 1 == 1 {
                    hash_children(sibling, &node)
                } else {
                    hash_children(&node, sibling)
                }
            })
    }

    pub fn verify(&self, leaf: &Commitment, root: &Node) -> bool {
        self.siblings.len() == TREE_DEPTH
            && self.position < (1u64 << TREE_DEPTH)
            && &self.root_for(leaf) == root
    }
}

#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `levels[h][i]` is node `i` at height `h`; `levels[0]` are the leaves
    levels: Vec<Vec<Node>>,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self {
            levels: vec![Vec::new(); TREE_DEPTH + 1],
        }
    }

    pub fn root(&self) -> Node {
        self.node(TREE_DEPTH, 0)
    }

    /// Index the next appended leaf will get
    pub fn next_position(&self) -> u64 {
        self.levels[0].len() as u64
    }

    /// Append a commitment, returning its leaf index
    pub fn insert(&mut self, commitment: &Commitment) -> u64 {
        let position = self.next_position();
        self.levels[0].push(commitment.0);

        let mut index = position;
        for height in 0..TREE_DEPTH {
            let left = self.node(height, index & !1);
            let right = self.node(height, index | 1);
            index >>= 1;

            let parent = hash_children(&left, &right);
            let row = &mut self.levels[height + 1];
            match row.get_mut(index as usize) {
                Some(slot) => *slot = parent,
                None => row.push(parent),
            }
        }
        position
    }

    pub fn path(&self, position: u64) -> Option<MerklePath> {
        if position >= self.next_position() {
            return None;
        }
        let siblings = (0..TREE_DEPTH)
            .map(|height| self.node(height, (position >> height) ^ 1))
            .collect();
        Some(MerklePath { position, siblings })
    }

    pub fn contains(&self, position: u64, commitment: &Commitment) -> bool {
        self.get(position).as_ref() == Some(commitment)
    }

    pub fn get(&self, position: u64) -> Option<Commitment> {
        let index = usize::try_from(position).ok()?;
        self.levels[0].get(index).copied().map(Commitment)
    }

    fn node(&self, height: usize, index: u64) -> Node {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.levels[height].get(i).copied())
            .unwrap_or_else(|| empty_subtree(height))
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Last `capacity` roots, newest first.
///
/// A spend proven against a root that was current a few appends ago is still
/// accepted, as long as that root has not aged out.
#[derive(Debug, Clone, Default)]
pub struct RootHistory {
    recent: VecDeque<Node>,
    capacity: usize,
}

impl RootHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, root: Node) {
        self.recent.push_front(root);
        self.recent.truncate(self.capacity);
    }

    pub fn is_valid(&self, root: &Node) -> bool {
        self.recent.contains(root)
    }

    pub fn current(&self) -> Option<&Node> {
        self.recent.front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(byte: u8) -> Commitment {
        Commitment([byte; 32])
    }

    #[test]
    fn empty_root_is_zero_subtree() {
        let tree = MerkleTree::new();
        assert_eq!(tree.next_position(), 0);
        assert_eq!(tree.root(), empty_subtree(TREE_DEPTH));
        assert_eq!(empty_subtree(1), hash_children(&[0u8; 32], &[0u8; 32]));
    }

    #[test]
    fn every_leaf_has_a_valid_path() {
        let mut tree = MerkleTree::new();
        for i in 0..5u8 {
            assert_eq!(tree.insert(&leaf(i + 1)), i as u64);
        }
        let root = tree.root();
        for i in 0..5u64 {
            let path = tree.path(i).unwrap();
            assert!(path.verify(&leaf(i as u8 + 1), &root), "leaf {i}");
            assert!(!path.verify(&leaf(0xee), &root));
        }
        assert!(tree.path(5).is_none());
    }

    #[test]
    fn small_tree_matches_hand_computed_root() {
        let mut tree = MerkleTree::new();
        tree.insert(&leaf(1));
        tree.insert(&leaf(2));
        tree.insert(&leaf(3));

        let left = hash_children(&[1u8; 32], &[2u8; 32]);
        let right = hash_children(&[3u8; 32], &empty_subtree(0));
        let mut expected = hash_children(&left, &right);
        for height in 2..TREE_DEPTH {
            expected = hash_children(&expected, &empty_subtree(height));
        }
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn path_does_not_verify_at_another_index() {
        let mut tree = MerkleTree::new();
        tree.insert(&leaf(1));
        tree.insert(&leaf(2));

        let mut path = tree.path(0).unwrap();
        path.position = 1;
        assert!(!path.verify(&leaf(1), &tree.root()));
    }

    #[test]
    fn old_path_verifies_only_against_old_root() {
        let mut tree = MerkleTree::new();
        tree.insert(&leaf(1));
        let (old_root, old_path) = (tree.root(), tree.path(0).unwrap());

        tree.insert(&leaf(2));
        assert_ne!(tree.root(), old_root);
        assert!(old_path.verify(&leaf(1), &old_root));
        assert!(!old_path.verify(&leaf(1), &tree.root()));
    }

    #[test]
    fn get_and_contains() {
        let mut tree = MerkleTree::new();
        tree.insert(&leaf(7));
        assert_eq!(tree.get(0), Some(leaf(7)));
        assert!(tree.contains(0, &leaf(7)));
        assert!(!tree.contains(0, &leaf(8)));
        assert_eq!(tree.get(1), None);
    }

    #[test]
    fn root_history_evicts_oldest() {
        let mut history = RootHistory::new(2);
        for byte in 1..=3u8 {
            history.push([byte; 32]);
        }
        assert!(!history.is_valid(&[1u8; 32]));
        assert!(history.is_valid(&[2u8; 32]));
        assert_eq!(history.current(), Some(&[3u8; 32]));
    }
}
