//! Inclusion proofs: ordered sibling hashes from a leaf to its root.
//!
//! A proof is a single ordered path of `(side, hash)` steps: first the
//! authentication path from the leaf up to its containing peak, then the
//! remaining peaks in position order. Folding is uniform for both halves —
//! `Side::Left` means the step's hash is the left operand of `node_hash` and
//! the accumulator is the right; `Side::Right` is the mirror. This lets
//! `bag_peaks`-style right-to-left peak folding and ordinary sibling folding
//! share one verification loop.

use serde::{Deserialize, Serialize};

use crate::hash::{self, node_hash, Hash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub side: Side,
    #[serde(with = "hash::hex_serde")]
    pub hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub leaf_index: u64,
    pub mmr_size: u64,
    #[serde(with = "hash::hex_serde")]
    pub leaf_hash: Hash,
    pub path: Vec<PathStep>,
}

impl InclusionProof {
    /// Fold the path starting from `leaf_hash` and compare against `root`.
    pub fn verify(&self, root: &Hash) -> bool {
        let mut acc = self.leaf_hash;
        for step in &self.path {
            acc = match step.side {
                Side::Left => node_hash(&step.hash, &acc),
                Side::Right => node_hash(&acc, &step.hash),
            };
        }
        acc == *root
    }
}
