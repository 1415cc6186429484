//! Append-only Merkle Mountain Range: store, engine, and inclusion proofs.

pub mod engine;
pub mod proof;
pub mod store;

pub use engine::MmrEngine;
pub use proof::{InclusionProof, PathStep, Side};
pub use store::MmrStore;

use crate::hash::Hash;

/// A single stored node. Height is 0 for leaves, `1 + min(children heights)`
/// for internals. Positions are 0-based and strictly monotonic; a node at
/// position `i` is fully determined by leaves at positions `< i` and is never
/// rewritten once appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub position: u64,
    pub height: u8,
    pub hash: Hash,
}
