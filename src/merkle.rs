// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Merkle Ledger
//!
//! Binary SHA-256 tree over the ordered row leaves. The tree is rebuilt
//! from scratch on every query and never persisted; only its root is kept
//! (as the trust anchor).
//!
//! ## Construction
//!
//! ```text
//! level k+1 [i] = SHA-256(level k [2i] || level k [2i+1])
//! ```
//!
//! An unpaired last node is hashed with itself. The empty tree has an
//! all-zero root; a single leaf is its own root.

use serde::Serialize;

use crate::crypto::{serialize_hex, sha256};
use crate::models::Digest;

/// Root of the empty leaf sequence.
pub const EMPTY_ROOT: Digest = [0u8; 32];

/// Which side of the running hash a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Sibling is the left operand: `H(sibling || current)`
    Left,
    /// Sibling is the right operand: `H(current || sibling)`
    Right,
}

/// One step of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProofStep {
    #[serde(serialize_with = "serialize_hex")]
    pub sibling: Digest,
    pub side: Side,
}

/// Inclusion proof for the leaf at `leaf_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerkleProof {
    pub leaf_index: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub leaf: Digest,
    pub path: Vec<ProofStep>,
}

impl MerkleProof {
    /// Fold the path over the leaf and compare with `root`.
    pub fn verify(&self, root: &Digest) -> bool {
        let computed = self.path.iter().fold(self.leaf, |current, step| match step.side {
            Side::Left => hash_pair(&step.sibling, &current),
            Side::Right => hash_pair(&current, &step.sibling),
        });
        computed == *root
    }
}

/// A fully materialized tree: `levels[0]` are the leaves, the last level is the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build all levels over `leaves` (in the given order).
    pub fn build(leaves: &[Digest]) -> Self {
        if leaves.is_empty() {
            return Self { levels: Vec::new() };
        }

        let mut levels = vec![leaves.to_vec()];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = current
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    pub fn root(&self) -> Digest {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(EMPTY_ROOT)
    }

    pub fn levels(&self) -> &[Vec<Digest>] {
        &self.levels
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Inclusion proof for the leaf at `index`, or `None` if out of range.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = *self.levels.first()?.get(index)?;
        let mut path = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let is_right_child = idx % 2 == 1;
            let sibling_idx = if is_right_child { idx - 1 } else { idx + 1 };
            // Unpaired last node was hashed with itself.
            let sibling = level.get(sibling_idx).unwrap_or(&level[idx]);
            path.push(ProofStep {
                sibling: *sibling,
                side: if is_right_child { Side::Left } else { Side::Right },
            });
            idx /= 2;
        }

        Some(MerkleProof {
            leaf_index: index,
            leaf,
            path,
        })
    }
}

fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    sha256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> Digest {
        sha256(&[n])
    }

    fn leaves(n: usize) -> Vec<Digest> {
        (0..n as u8).map(leaf).collect()
    }

    #[test]
    fn empty_sequence_has_zero_root() {
        let tree = MerkleTree::build(&[]);
        assert_eq!(tree.root(), EMPTY_ROOT);
        assert!(tree.levels().is_empty());
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn single_leaf_is_root() {
        let l = leaf(1);
        let tree = MerkleTree::build(&[l]);
        assert_eq!(tree.root(), l);
        assert_eq!(tree.levels().len(), 1);
    }

    #[test]
    fn two_leaves_hash_concatenation() {
        let (a, b) = (leaf(1), leaf(2));
        let tree = MerkleTree::build(&[a, b]);
        assert_eq!(tree.root(), sha256(&[a, b].concat()));
    }

    #[test]
    fn three_leaves_duplicate_last_node() {
        let (a, b, c) = (leaf(1), leaf(2), leaf(3));
        let tree = MerkleTree::build(&[a, b, c]);
        let ab = sha256(&[a, b].concat());
        let cc = sha256(&[c, c].concat());
        assert_eq!(tree.root(), sha256(&[ab, cc].concat()));
        assert_eq!(tree.levels().len(), 3);
        assert_eq!(tree.levels()[1], vec![ab, cc]);
    }

    #[test]
    fn build_is_deterministic() {
        let input = leaves(7);
        assert_eq!(MerkleTree::build(&input), MerkleTree::build(&input));
        assert_eq!(MerkleTree::build(&input).root(), MerkleTree::build(&input).root());
    }

    #[test]
    fn deleting_any_leaf_changes_root() {
        for n in 2..=9 {
            let input = leaves(n);
            let root = MerkleTree::build(&input).root();
            for removed in 0..n {
                let mut shorter = input.clone();
                shorter.remove(removed);
                assert_ne!(
                    MerkleTree::build(&shorter).root(),
                    root,
                    "removing leaf {removed} of {n} kept the root"
                );
            }
        }
    }

    #[test]
    fn reordering_changes_root() {
        let input = leaves(4);
        let mut swapped = input.clone();
        swapped.swap(1, 2);
        assert_ne!(MerkleTree::build(&input).root(), MerkleTree::build(&swapped).root());
    }

    #[test]
    fn every_proof_verifies() {
        for n in 1..=9 {
            let tree = MerkleTree::build(&leaves(n));
            let root = tree.root();
            for i in 0..n {
                let proof = tree.proof(i).unwrap();
                assert_eq!(proof.leaf, leaf(i as u8));
                assert!(proof.verify(&root), "proof {i} of {n} failed");
            }
            assert!(tree.proof(n).is_none());
        }
    }

    #[test]
    fn proof_for_unpaired_node_uses_itself() {
        let (a, b, c) = (leaf(1), leaf(2), leaf(3));
        let tree = MerkleTree::build(&[a, b, c]);
        let proof = tree.proof(2).unwrap();
        assert_eq!(proof.path[0], ProofStep { sibling: c, side: Side::Right });
        assert_eq!(
            proof.path[1],
            ProofStep {
                sibling: sha256(&[a, b].concat()),
                side: Side::Left
            }
        );
    }

    #[test]
    fn tampered_proof_fails() {
        let tree = MerkleTree::build(&leaves(5));
        let root = tree.root();

        let mut wrong_sibling = tree.proof(3).unwrap();
        wrong_sibling.path[0].sibling[0] ^= 1;
        assert!(!wrong_sibling.verify(&root));

        let mut wrong_leaf = tree.proof(3).unwrap();
        wrong_leaf.leaf = leaf(42);
        assert!(!wrong_leaf.verify(&root));

        let mut wrong_side = tree.proof(0).unwrap();
        wrong_side.path[0].side = Side::Left;
        assert!(!wrong_side.verify(&root));
    }
}
