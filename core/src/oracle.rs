//! Signing-oracle capability: the abstraction point for hardware-backed
//! signing (TPM, Secure Enclave). Only the trait boundary is defined here —
//! concrete hardware backends are external collaborators.

use crate::error::Result;
use crate::hash::Hash;
use crate::signer::Signer;

pub trait SigningOracle: Send + Sync {
    fn device_id(&self) -> &str;
    fn derive(&self, challenge: &[u8]) -> Result<[u8; 32]>;
    fn sign(&self, message: &Hash) -> Result<[u8; 64]>;
}

/// The default oracle: an in-process Ed25519 key, no hardware backing.
pub struct SoftwareOracle {
    signer: Signer,
}

impl SoftwareOracle {
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }
}

impl SigningOracle for SoftwareOracle {
    fn device_id(&self) -> &str {
        "software"
    }

    fn derive(&self, challenge: &[u8]) -> Result<[u8; 32]> {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"witnessd-software-oracle-derive-v1");
        hasher.update(self.signer.public_key());
        hasher.update(challenge);
        Ok(hasher.finalize().into())
    }

    fn sign(&self, message: &Hash) -> Result<[u8; 64]> {
        Ok(self.signer.sign_root(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_oracle_signs_with_its_wrapped_key() {
        let signer = Signer::from_raw_seed(&[1u8; 32]);
        let pubkey = signer.public_key();
        let oracle = SoftwareOracle::new(signer);
        let sig = oracle.sign(&[2u8; 32]).unwrap();
        assert!(crate::signer::verify(&pubkey, &[2u8; 32], &sig));
    }

    #[test]
    fn derive_is_deterministic_for_the_same_challenge() {
        let oracle = SoftwareOracle::new(Signer::from_raw_seed(&[1u8; 32]));
        assert_eq!(oracle.derive(b"x").unwrap(), oracle.derive(b"x").unwrap());
    }
}
