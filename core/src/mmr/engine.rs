//! Append leaves, bag peaks, and produce inclusion proofs.
//!
//! Peaks are tracked as an in-memory stack of `(height, position)` pairs,
//! maintained incrementally on append and reconstructed once at `open` by
//! replaying the store: consecutive equal-height peaks are always followed
//! immediately by their merge result, because `append_leaf` writes the merge
//! before returning, so replay never needs to recompute a hash — it only
//! needs to recognize where merges already happened.

use crate::error::{Error, Result};
use crate::hash::{self, Hash};

use super::proof::{InclusionProof, PathStep, Side};
use super::store::MmrStore;
use super::Node;

pub struct MmrEngine {
    store: MmrStore,
    peaks: Vec<(u8, u64)>,
    leaf_positions: Vec<u64>,
}

impl MmrEngine {
    pub fn open(mut store: MmrStore) -> Result<Self> {
        let size = store.size();
        let (peaks, leaf_positions) = Self::replay(&mut store, size)?;
        Ok(Self {
            store,
            peaks,
            leaf_positions,
        })
    }

    /// Reconstruct the peak stack and leaf-position index as they existed
    /// when the store held exactly `size` nodes. Used both to open a store
    /// from scratch (`size = store.size()`) and to rebuild the historical
    /// state a past signature actually covers (`size = entry.size`), since a
    /// proof against an older signed root must be built against the peaks
    /// that existed at that size, not the engine's current live peaks.
    fn replay(store: &mut MmrStore, size: u64) -> Result<(Vec<(u8, u64)>, Vec<u64>)> {
        let mut peaks: Vec<(u8, u64)> = Vec::new();
        let mut leaf_positions = Vec::new();
        let mut pos = 0u64;
        while pos < size {
            let node = store.get(pos)?;
            if node.height == 0 {
                leaf_positions.push(pos);
            }
            peaks.push((node.height, pos));
            pos += 1;
            while peaks.len() >= 2 && peaks[peaks.len() - 1].0 == peaks[peaks.len() - 2].0 {
                peaks.pop();
                peaks.pop();
                if pos >= size {
                    return Err(Error::StoreCorrupt(
                        "mmr store ended mid-merge: two equal-height peaks with no recorded merge result".into(),
                    ));
                }
                let merged = store.get(pos)?;
                peaks.push((merged.height, pos));
                pos += 1;
            }
        }
        Ok((peaks, leaf_positions))
    }

    pub fn leaf_count(&self) -> u64 {
        self.leaf_positions.len() as u64
    }

    pub fn size(&self) -> u64 {
        self.store.size()
    }

    /// Current committed root: `bag_peaks` over the stored peak hashes.
    /// Errors on an empty MMR; callers must check `leaf_count() > 0` first.
    pub fn root(&mut self) -> Result<Hash> {
        if self.peaks.is_empty() {
            return Err(Error::InvalidInput("mmr has no leaves yet".into()));
        }
        let mut hashes = Vec::with_capacity(self.peaks.len());
        for &(_, pos) in &self.peaks {
            hashes.push(self.store.get(pos)?.hash);
        }
        Ok(hash::bag_peaks(&hashes))
    }

    /// Append a leaf; returns `(leaf_index, mmr_size, root)`.
    pub fn append_leaf(&mut self, content: &[u8]) -> Result<(u64, u64, Hash)> {
        let leaf = hash::leaf_hash(content);
        let pos = self.store.size();
        self.store.append(Node { position: pos, height: 0, hash: leaf })?;
        self.leaf_positions.push(pos);
        self.peaks.push((0, pos));

        while self.peaks.len() >= 2 {
            let (h_top, p_top) = self.peaks[self.peaks.len() - 1];
            let (h_prev, p_prev) = self.peaks[self.peaks.len() - 2];
            if h_top != h_prev {
                break;
            }
            let left = self.store.get(p_prev)?.hash;
            let right = self.store.get(p_top)?.hash;
            let merged_hash = hash::node_hash(&left, &right);
            let merged_pos = self.store.size();
            self.store.append(Node { position: merged_pos, height: h_top + 1, hash: merged_hash })?;
            self.peaks.pop();
            self.peaks.pop();
            self.peaks.push((h_top + 1, merged_pos));
        }

        let leaf_index = self.leaf_count() - 1;
        let root = self.root()?;
        Ok((leaf_index, self.store.size(), root))
    }

    /// Binary decomposition of a leaf count into descending powers of two,
    /// in position order. The MMR's peaks always cover contiguous leaf runs
    /// of exactly these sizes, largest (leftmost) first.
    fn peak_sizes(leaf_count: u64) -> Vec<u64> {
        (0..64)
            .rev()
            .filter(|bit| (leaf_count >> bit) & 1 == 1)
            .map(|bit| 1u64 << bit)
            .collect()
    }

    /// Build the authentication path and root for a perfect binary tree over
    /// `leaves`, proving `leaves[index]`. `leaves.len()` must be a power of
    /// two (or 1, the trivial single-leaf peak).
    fn build_peak_proof(leaves: &[Hash], index: usize) -> (Vec<PathStep>, Hash) {
        let mut level = leaves.to_vec();
        let mut idx = index;
        let mut path = Vec::new();
        while level.len() > 1 {
            let sibling = level[idx ^ 1];
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            path.push(PathStep { side, hash: sibling });
            level = level
                .chunks(2)
                .map(|pair| hash::node_hash(&pair[0], &pair[1]))
                .collect();
            idx /= 2;
        }
        (path, level[0])
    }

    /// Produce an inclusion proof for `leaf_index` at the current MMR size.
    pub fn prove(&mut self, leaf_index: u64) -> Result<InclusionProof> {
        let size = self.store.size();
        self.prove_as_of(leaf_index, size)
    }

    /// Produce an inclusion proof for `leaf_index` as the MMR existed when it
    /// held exactly `as_of_size` nodes, rather than at the engine's current
    /// live state. Needed to verify a leaf against an older signed root: the
    /// peaks bagged into that root are not necessarily the live peaks if the
    /// MMR has grown since the signature was taken. `as_of_size` must be a
    /// size the store actually passed through (e.g. a recorded signature's
    /// `size`), not an arbitrary value.
    pub fn prove_as_of(&mut self, leaf_index: u64, as_of_size: u64) -> Result<InclusionProof> {
        if as_of_size > self.store.size() {
            return Err(Error::InvalidInput(format!(
                "as_of_size {as_of_size} exceeds store size {}",
                self.store.size()
            )));
        }
        let (peaks, leaf_positions) = if as_of_size == self.store.size() {
            (self.peaks.clone(), self.leaf_positions.clone())
        } else {
            Self::replay(&mut self.store, as_of_size)?
        };
        let leaf_count = leaf_positions.len() as u64;
        if leaf_index >= leaf_count {
            return Err(Error::InvalidInput(format!(
                "leaf index {leaf_index} out of range (leaf count {leaf_count} as of size {as_of_size})"
            )));
        }

        let sizes = Self::peak_sizes(leaf_count);
        let mut peak_idx = 0;
        let mut peak_start_leaf = 0u64;
        for (i, &sz) in sizes.iter().enumerate() {
            if leaf_index < peak_start_leaf + sz {
                peak_idx = i;
                break;
            }
            peak_start_leaf += sz;
        }
        let peak_size = sizes[peak_idx];
        let index_within = (leaf_index - peak_start_leaf) as usize;

        let mut leaves = Vec::with_capacity(peak_size as usize);
        for li in peak_start_leaf..(peak_start_leaf + peak_size) {
            let pos = leaf_positions[li as usize];
            leaves.push(self.store.get(pos)?.hash);
        }
        let leaf_hash = leaves[index_within];
        let (mut path, _peak_root) = Self::build_peak_proof(&leaves, index_within);

        let mut peak_roots = Vec::with_capacity(peaks.len());
        for &(_, pos) in &peaks {
            peak_roots.push(self.store.get(pos)?.hash);
        }

        let m = peak_roots.len();
        if peak_idx < m - 1 {
            let bagged_right = hash::bag_peaks(&peak_roots[peak_idx + 1..]);
            path.push(PathStep {
                side: Side::Right,
                hash: bagged_right,
            });
        }
        for i in (0..peak_idx).rev() {
            path.push(PathStep {
                side: Side::Left,
                hash: peak_roots[i],
            });
        }

        Ok(InclusionProof {
            leaf_index,
            mmr_size: as_of_size,
            leaf_hash,
            path,
        })
    }

    /// Linear scan for the latest leaf whose hash equals `needle`.
    pub fn find_leaf_by_hash(&mut self, needle: &Hash) -> Result<Option<u64>> {
        for (leaf_index, &pos) in self.leaf_positions.iter().enumerate().rev() {
            if &self.store.get(pos)?.hash == needle {
                return Ok(Some(leaf_index as u64));
            }
        }
        Ok(None)
    }
}
