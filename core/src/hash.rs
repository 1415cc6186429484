//! Domain-tagged SHA-256 — the only hash primitives permitted on MMR data.
//!
//! CONSTITUTIONAL RULE: callers outside this module must never invoke SHA-256
//! directly on MMR leaf or node data. `leaf_hash` and `node_hash` are the only
//! entry points, so every digest that ends up in the log carries its domain
//! tag by construction.

use sha2::{Digest, Sha256};

pub type Hash = [u8; 32];

const LEAF_TAG: u8 = 0x00;
const NODE_TAG: u8 = 0x01;

/// `SHA256(0x00 || payload)`. The payload for a file snapshot is the raw file
/// bytes; no normalization is applied. The empty payload is a valid input.
pub fn leaf_hash(payload: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_TAG]);
    hasher.update(payload);
    hasher.finalize().into()
}

/// `SHA256(0x01 || left || right)`.
pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_TAG]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Fold a sequence of peaks (in position order) into a single root:
/// `acc = peaks.last(); for p in peaks[..-1].rev() { acc = node_hash(p, acc) }`.
/// The empty sequence has no defined root; callers must not call this on size 0.
pub fn bag_peaks(peaks: &[Hash]) -> Hash {
    let mut iter = peaks.iter().rev();
    let mut acc = *iter.next().expect("bag_peaks requires at least one peak");
    for peak in iter {
        acc = node_hash(peak, &acc);
    }
    acc
}

/// Constant-time equality, used wherever a hash comparison could leak timing
/// information about secret material (HMAC keys, signatures).
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

pub fn to_hex(h: &Hash) -> String {
    hex::encode(h)
}

pub fn from_hex(s: &str) -> Option<Hash> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

/// `serde(with = "hash::hex_serde")` for fields that must round-trip as
/// lowercase hex strings in the evidence packet and signatures ledger.
pub mod hex_serde {
    use super::Hash;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(h: &Hash, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(h))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(d)?;
        super::from_hex(&s).ok_or_else(|| D::Error::custom("expected 32-byte hex string"))
    }
}
