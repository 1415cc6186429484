//! Evidence packager and offline verifier.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{self, Hash};
use crate::mmr::{InclusionProof, MmrEngine};
use crate::sigchain::SignatureLog;
use crate::signer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    pub file_path: String,
    #[serde(with = "hash::hex_serde")]
    pub file_hash: Hash,
    pub mmr_index: u64,
    pub mmr_size: u64,
    #[serde(with = "hash::hex_serde")]
    pub mmr_root: Hash,
    pub inclusion_proof: InclusionProof,
    /// Hex-encoded signature, empty string when not yet signed.
    pub signature: String,
    pub public_key: String,
}

impl Packet {
    /// Canonical form for signature binding: sorted keys, UTF-8, no
    /// trailing whitespace. `serde_json`'s `BTreeMap` path gives us sorted
    /// keys for free on a flat internally-produced structure like this one.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let value = serde_json::to_value(self)?;
        let sorted: std::collections::BTreeMap<String, serde_json::Value> =
            serde_json::from_value(value)?;
        Ok(serde_json::to_vec(&sorted)?)
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build an evidence packet for `content` observed at `file_path`.
///
/// When a signature covers this leaf, the proof is built against that
/// signature's own size rather than the engine's current live state: the
/// MMR may have grown since the signature was taken, and a proof against the
/// live peaks would fold to the live root, not the one the signature
/// actually covers. This keeps `mmr_root`, `inclusion_proof`, and
/// `signature` mutually consistent so a holder of just the packet can
/// validate it without a live MMR or signatures log.
pub fn export(
    file_path: &str,
    content: &[u8],
    mmr: &mut MmrEngine,
    sig_log: &SignatureLog,
    public_key: [u8; 32],
) -> Result<Packet> {
    let file_hash = hash::leaf_hash(content);
    let leaf_index = mmr
        .find_leaf_by_hash(&file_hash)?
        .ok_or_else(|| Error::NotWitnessed { path: file_path.into() })?;

    let (proof, root, signature) = match sig_log.find_covering(leaf_index) {
        Some(entry) => {
            let proof = mmr.prove_as_of(leaf_index, entry.size)?;
            (proof, entry.root, hex::encode(entry.signature))
        }
        None => {
            let proof = mmr.prove(leaf_index)?;
            let root = mmr.root()?;
            (proof, root, String::new())
        }
    };

    Ok(Packet {
        file_path: file_path.to_string(),
        file_hash,
        mmr_index: leaf_index,
        mmr_size: proof.mmr_size,
        mmr_root: root,
        inclusion_proof: proof,
        signature,
        public_key: hex::encode(public_key),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl VerifyResult {
    fn ok() -> Self {
        Self { valid: true, error: None }
    }
    fn fail(msg: impl Into<String>) -> Self {
        Self { valid: false, error: Some(msg.into()) }
    }
}

/// Recompute the file hash, locate its leaf, reconstruct the MMR state at
/// the covering signature's size, validate the inclusion proof against the
/// recorded root, and verify the Ed25519 signature. Any failing step sets
/// `valid = false` with a specific error; only all passing yields
/// `valid = true`.
pub fn verify(
    content: &[u8],
    public_key: &[u8; 32],
    mmr: &mut MmrEngine,
    sig_log: &SignatureLog,
) -> Result<VerifyResult> {
    let file_hash = hash::leaf_hash(content);
    let Some(leaf_index) = mmr.find_leaf_by_hash(&file_hash)? else {
        return Ok(VerifyResult::fail("not_witnessed"));
    };

    let Some(entry) = sig_log.find_covering(leaf_index) else {
        return Ok(VerifyResult::fail("not_signed"));
    };

    let proof = mmr.prove_as_of(leaf_index, entry.size)?;
    if !proof.verify(&entry.root) {
        return Ok(VerifyResult::fail("inclusion_proof_invalid"));
    }

    if !signer::verify(public_key, &entry.root, &entry.signature) {
        return Ok(VerifyResult::fail("signature_invalid"));
    }

    Ok(VerifyResult::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmr::MmrStore;
    use crate::sigchain::Entry;
    use chrono::Utc;
    use ed25519_dalek::Signer as _;
    use tempfile::{NamedTempFile, TempDir};

    fn setup() -> (MmrEngine, SignatureLog, ed25519_dalek::SigningKey) {
        use rand_core::OsRng;
        let dir = TempDir::new().unwrap();
        let mmr = MmrEngine::open(MmrStore::open(dir.path().join("mmr.dat")).unwrap()).unwrap();
        let sig_path = NamedTempFile::new().unwrap();
        let sig_log = SignatureLog::open(sig_path.path()).unwrap();
        let key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        std::mem::forget(dir);
        std::mem::forget(sig_path);
        (mmr, sig_log, key)
    }

    #[test]
    fn export_then_verify_round_trips() {
        let (mut mmr, mut sig_log, key) = setup();
        mmr.append_leaf(b"hello").unwrap();
        let root = mmr.root().unwrap();
        let signature = key.sign(&root).to_bytes();
        sig_log
            .append(Entry { timestamp: Utc::now(), root, signature, size: mmr.size() })
            .unwrap();

        let pub_key = key.verifying_key().to_bytes();
        let packet = export("f.txt", b"hello", &mut mmr, &sig_log, pub_key).unwrap();
        assert_eq!(packet.mmr_index, 0);
        assert!(!packet.signature.is_empty());

        let result = verify(b"hello", &pub_key, &mut mmr, &sig_log).unwrap();
        assert!(result.valid, "{:?}", result.error);
    }

    #[test]
    fn verify_fails_for_unwitnessed_content() {
        let (mut mmr, sig_log, key) = setup();
        mmr.append_leaf(b"hello").unwrap();
        let pub_key = key.verifying_key().to_bytes();
        let result = verify(b"hello!", &pub_key, &mut mmr, &sig_log).unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("not_witnessed"));
    }

    #[test]
    fn export_then_verify_still_valid_after_later_appends() {
        let (mut mmr, mut sig_log, key) = setup();
        mmr.append_leaf(b"hello").unwrap();
        let root = mmr.root().unwrap();
        let signed_size = mmr.size();
        let signature = key.sign(&root).to_bytes();
        sig_log
            .append(Entry { timestamp: Utc::now(), root, signature, size: signed_size })
            .unwrap();

        // The daemon keeps witnessing other files after this checkpoint was signed.
        mmr.append_leaf(b"world").unwrap();
        mmr.append_leaf(b"more").unwrap();

        let pub_key = key.verifying_key().to_bytes();
        let packet = export("f.txt", b"hello", &mut mmr, &sig_log, pub_key).unwrap();
        assert_eq!(packet.mmr_root, root);
        assert_eq!(packet.mmr_size, signed_size);
        assert!(!packet.signature.is_empty());

        let result = verify(b"hello", &pub_key, &mut mmr, &sig_log).unwrap();
        assert!(result.valid, "{:?}", result.error);
    }

    #[test]
    fn export_fails_for_unwitnessed_content() {
        let (mut mmr, sig_log, key) = setup();
        mmr.append_leaf(b"hello").unwrap();
        let pub_key = key.verifying_key().to_bytes();
        let err = export("f.txt", b"other", &mut mmr, &sig_log, pub_key).unwrap_err();
        assert!(matches!(err, Error::NotWitnessed { .. }));
    }

    #[test]
    fn export_without_signature_emits_empty_field() {
        let (mut mmr, sig_log, key) = setup();
        mmr.append_leaf(b"hello").unwrap();
        let pub_key = key.verifying_key().to_bytes();
        let packet = export("f.txt", b"hello", &mut mmr, &sig_log, pub_key).unwrap();
        assert_eq!(packet.signature, "");
    }

    #[test]
    fn canonical_bytes_have_sorted_keys() {
        let (mut mmr, sig_log, key) = setup();
        mmr.append_leaf(b"hello").unwrap();
        let pub_key = key.verifying_key().to_bytes();
        let packet = export("f.txt", b"hello", &mut mmr, &sig_log, pub_key).unwrap();
        let bytes = packet.canonical_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let file_hash_pos = text.find("\"file_hash\"").unwrap();
        let file_path_pos = text.find("\"file_path\"").unwrap();
        assert!(file_hash_pos < file_path_pos, "keys must be sorted alphabetically");
    }
}
