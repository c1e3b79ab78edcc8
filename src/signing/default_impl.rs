//! Concrete `ed25519-dalek` + `sha2` implementation of [`super::SigningKey`]
//! and [`super::VerifyingKey`], wired in behind the `std-crypto` feature.
//! The core crate never imports these crates directly; only this module and
//! the CLI binary do.

use ed25519_dalek::{Signature, Signer as _, SigningKey as DalekSigningKey, Verifier as _, VerifyingKey as DalekVerifyingKey};
use sha2::{Digest, Sha256};

use super::{DigestAlg, KeyId, SigningKey, VerifyingKey};

pub fn sha256(content: &[u8]) -> Vec<u8> {
    Sha256::digest(content).to_vec()
}

/// An ed25519 keypair, key-id'd by the first 16 bytes of the SHA-256 hash
/// of its public key.
pub struct Ed25519Signer {
    key: DalekSigningKey,
    id: KeyId,
}

impl Ed25519Signer {
    pub fn new(key: DalekSigningKey) -> Self {
        let id = key_id_of(&key.verifying_key());
        Ed25519Signer { key, id }
    }

    pub fn generate<R: rand::CryptoRng + rand::RngCore>(rng: &mut R) -> Self {
        Self::new(DalekSigningKey::generate(rng))
    }

    pub fn verifying_key(&self) -> Ed25519Verifier {
        Ed25519Verifier::new(self.key.verifying_key())
    }

    /// The raw 32-byte secret key, for persisting a generated keypair.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.key.to_bytes()
    }
}

impl SigningKey for Ed25519Signer {
    fn key_id(&self) -> KeyId {
        self.id
    }

    fn digest_alg(&self) -> DigestAlg {
        DigestAlg::Sha256
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key.sign(message).to_bytes().to_vec()
    }
}

/// The public half of an [`Ed25519Signer`], for verification only.
pub struct Ed25519Verifier {
    key: DalekVerifyingKey,
    id: KeyId,
}

impl Ed25519Verifier {
    pub fn new(key: DalekVerifyingKey) -> Self {
        let id = key_id_of(&key);
        Ed25519Verifier { key, id }
    }

    /// The raw 32-byte public key, for persisting alongside a generated
    /// keypair's secret half.
    pub fn public_bytes(&self) -> [u8; 32] {
        self.key.to_bytes()
    }
}

impl VerifyingKey for Ed25519Verifier {
    fn key_id(&self) -> KeyId {
        self.id
    }

    fn digest_alg(&self) -> DigestAlg {
        DigestAlg::Sha256
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let sig = match Signature::from_slice(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        self.key.verify(message, &sig).is_ok()
    }
}

fn key_id_of(key: &DalekVerifyingKey) -> KeyId {
    let digest = Sha256::digest(key.as_bytes());
    let mut id = [0u8; 16];
    id.copy_from_slice(&digest[..16]);
    KeyId(id)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn signer_and_its_own_verifier_agree_on_key_id() {
        let signer = Ed25519Signer::generate(&mut OsRng);
        let verifier = signer.verifying_key();
        assert_eq!(signer.key_id(), verifier.key_id());
    }

    #[test]
    fn signature_verifies_only_against_matching_digest() {
        let signer = Ed25519Signer::generate(&mut OsRng);
        let verifier = signer.verifying_key();
        let digest = sha256(b"manifest bytes");
        let signature = signer.sign(&digest);
        assert!(verifier.verify(&digest, &signature));
        assert!(!verifier.verify(&sha256(b"different bytes"), &signature));
    }
}
