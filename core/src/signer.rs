//! Ed25519 signing over committed MMR roots.
//!
//! Accepts private keys as a raw 32-byte seed, a raw 64-byte expanded
//! keypair (seed || public), or an OpenSSH PEM file (optionally
//! passphrase-protected). Key material is zeroized on drop; nothing here
//! ever logs key bytes.

use std::fs;
use std::path::Path;

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::hash::Hash;

pub struct Signer {
    key: SigningKey,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &hex::encode(self.key.verifying_key().to_bytes()))
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn from_raw_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_raw_expanded(bytes: &[u8; 64]) -> Result<Self> {
        let key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|e| Error::KeyError(format!("invalid expanded keypair: {e}")))?;
        Ok(Self { key })
    }

    /// Load a private key file in any of the three supported encodings.
    pub fn load_private<P: AsRef<Path>>(path: P, passphrase: Option<&str>) -> Result<Self> {
        let raw = Zeroizing::new(fs::read(path.as_ref())?);

        if raw.len() == 32 {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&raw);
            return Ok(Self::from_raw_seed(&seed));
        }
        if raw.len() == 64 {
            let mut bytes = [0u8; 64];
            bytes.copy_from_slice(&raw);
            return Self::from_raw_expanded(&bytes);
        }

        let text = std::str::from_utf8(&raw)
            .map_err(|_| Error::KeyError("key file is neither raw bytes nor valid UTF-8 PEM".into()))?;
        if text.contains("BEGIN OPENSSH PRIVATE KEY") {
            return Self::from_openssh_pem(text, passphrase);
        }

        Err(Error::KeyError(format!(
            "unsupported key file: {} bytes, not raw seed/expanded key, not OpenSSH PEM",
            raw.len()
        )))
    }

    fn from_openssh_pem(text: &str, passphrase: Option<&str>) -> Result<Self> {
        let private = ssh_key::PrivateKey::from_openssh(text)
            .map_err(|e| Error::KeyError(format!("invalid OpenSSH private key: {e}")))?;

        let private = if private.is_encrypted() {
            let passphrase = passphrase
                .ok_or_else(|| Error::KeyError("key is encrypted; no passphrase supplied".into()))?;
            private
                .decrypt(passphrase.as_bytes())
                .map_err(|_| Error::KeyError("wrong passphrase or unsupported cipher".into()))?
        } else {
            private
        };

        let keypair = private
            .key_data()
            .ed25519()
            .ok_or_else(|| Error::KeyError("OpenSSH key is not Ed25519".into()))?;
        Ok(Self::from_raw_seed(&keypair.private.to_bytes()))
    }

    /// Parse a public key from 32 raw bytes or an OpenSSH authorized-keys line.
    pub fn parse_public_key(data: &[u8]) -> Result<[u8; 32]> {
        if data.len() == 32 {
            let mut out = [0u8; 32];
            out.copy_from_slice(data);
            return Ok(out);
        }
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::KeyError("public key is neither 32 raw bytes nor authorized-keys text".into()))?;
        let public = ssh_key::PublicKey::from_openssh(text.trim())
            .map_err(|e| Error::KeyError(format!("invalid authorized-keys line: {e}")))?;
        let ed25519 = public
            .key_data()
            .ed25519()
            .ok_or_else(|| Error::KeyError("authorized key is not Ed25519".into()))?;
        Ok(*ed25519.as_ref())
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn sign_root(&self, root: &Hash) -> [u8; 64] {
        self.key.sign(root).to_bytes()
    }
}

/// Returns `false` rather than an error for wrong-length input or invalid
/// encodings — only a successful, strict verification yields `true`.
pub fn verify(pubkey: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(pubkey) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    vk.verify_strict(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn signer() -> Signer {
        let key = SigningKey::generate(&mut OsRng);
        Signer { key }
    }

    #[test]
    fn sign_then_verify_roundtrips() {
        let s = signer();
        let root = [3u8; 32];
        let sig = s.sign_root(&root);
        assert!(verify(&s.public_key(), &root, &sig));
    }

    #[test]
    fn verify_fails_for_wrong_message() {
        let s = signer();
        let sig = s.sign_root(&[1u8; 32]);
        assert!(!verify(&s.public_key(), &[2u8; 32], &sig));
    }

    #[test]
    fn verify_fails_for_invalid_pubkey() {
        assert!(!verify(&[0u8; 32], b"msg", &[0u8; 64]));
    }

    #[test]
    fn raw_seed_and_expanded_key_agree() {
        let seed = [42u8; 32];
        let from_seed = Signer::from_raw_seed(&seed);
        let expanded_bytes = from_seed.key.to_keypair_bytes();
        let from_expanded = Signer::from_raw_expanded(&expanded_bytes).unwrap();
        assert_eq!(from_seed.public_key(), from_expanded.public_key());
    }

    #[test]
    fn load_private_raw_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.key");
        std::fs::write(&path, [9u8; 32]).unwrap();
        let s = Signer::load_private(&path, None).unwrap();
        assert_eq!(s.public_key(), Signer::from_raw_seed(&[9u8; 32]).public_key());
    }

    #[test]
    fn load_private_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.key");
        std::fs::write(&path, b"not a key at all, wrong length").unwrap();
        assert!(Signer::load_private(&path, None).is_err());
    }

    #[test]
    fn parse_public_key_raw_bytes() {
        let pk = [5u8; 32];
        assert_eq!(Signer::parse_public_key(&pk).unwrap(), pk);
    }
}
