//! Detached multi-signer signatures over a content slab, and the trust
//! context used to produce and check them.
//!
//! The core never names a concrete crypto crate: [`SigningKey`] and
//! [`VerifyingKey`] are the opaque capability boundary. [`default_impl`]
//! wires a concrete `ed25519-dalek` + `sha2` implementation behind the
//! `std-crypto` feature for the CLI and the test suite.

mod error;

#[cfg(feature = "std-crypto")]
pub mod default_impl;

pub use error::TrustError;

use std::collections::HashMap;

use crate::container::FileHeader;

/// Digest algorithm identifier carried in a [`SignatureBlock`]'s `hash_alg`
/// byte. More variants can be added without changing the wire layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum DigestAlg {
    Sha256 = 0,
}

impl DigestAlg {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(DigestAlg::Sha256),
            _ => None,
        }
    }
}

/// A 16-byte identifier correlating a signature to the key that produced
/// it, independent of any particular key encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct KeyId(pub [u8; 16]);

/// A key capable of producing a detached signature over an arbitrary
/// message (the file header, signature prefix, and content digest,
/// concatenated by [`Trust::sign`]).
pub trait SigningKey {
    fn key_id(&self) -> KeyId;
    fn digest_alg(&self) -> DigestAlg;
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// A key capable of checking a detached signature over the same message
/// [`SigningKey::sign`] produced.
pub trait VerifyingKey {
    fn key_id(&self) -> KeyId;
    fn digest_alg(&self) -> DigestAlg;
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// One detached signature: which key produced it, over which digest
/// algorithm, and the signature bytes themselves.
#[derive(Clone, Debug)]
pub struct SignatureBlock {
    pub sign_ver: u8,
    pub hash_alg: u8,
    pub key_id: KeyId,
    pub signature: Vec<u8>,
}

const SIGN_VER: u8 = 1;

impl SignatureBlock {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 16 + 4 + self.signature.len());
        out.push(self.sign_ver);
        out.push(self.hash_alg);
        out.extend_from_slice(&[0u8; 2]); // reserved
        out.extend_from_slice(&self.key_id.0);
        out.extend_from_slice(&(self.signature.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.signature);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, TrustError> {
        if buf.len() < 24 {
            return Err(TrustError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "signature block shorter than its fixed header",
            )));
        }
        let sign_ver = buf[0];
        let hash_alg = buf[1];
        let mut key_id = [0u8; 16];
        key_id.copy_from_slice(&buf[4..20]);
        let sig_len = u32::from_le_bytes(buf[20..24].try_into().unwrap()) as usize;
        let signature = buf
            .get(24..24 + sig_len)
            .ok_or_else(|| {
                TrustError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "signature block truncated",
                ))
            })?
            .to_vec();
        Ok(SignatureBlock { sign_ver, hash_alg, key_id: KeyId(key_id), signature })
    }
}

/// The set of keys a caller trusts for verification, and the keys it holds
/// for signing. Held and trusted keys are independent: a signer need not
/// trust its own key, and a verifier need not hold any signing key at all.
#[derive(Default)]
pub struct Trust {
    pub trusted: Vec<Box<dyn VerifyingKey>>,
    pub held: Vec<Box<dyn SigningKey>>,
}

impl Trust {
    pub fn new() -> Self {
        Trust { trusted: Vec::new(), held: Vec::new() }
    }

    pub fn trust(mut self, key: Box<dyn VerifyingKey>) -> Self {
        self.trusted.push(key);
        self
    }

    pub fn hold(mut self, key: Box<dyn SigningKey>) -> Self {
        self.held.push(key);
        self
    }

    /// One signature per held key, each over that key's own digest
    /// algorithm computed from `content`. The bytes actually signed are
    /// `header || sig_prefix(ver, alg, key_id) || digest`, so a signature
    /// binds the file's schema id and the signature block's own metadata,
    /// not just the content slab.
    pub fn sign(&self, header: FileHeader, content: &[u8]) -> Vec<SignatureBlock> {
        let mut digests: HashMap<DigestAlg, Vec<u8>> = HashMap::new();
        self.held
            .iter()
            .map(|key| {
                let alg = key.digest_alg();
                let digest = digests
                    .entry(alg)
                    .or_insert_with(|| digest_for(alg, content))
                    .clone();
                let message = signed_message(header, SIGN_VER, alg, key.key_id(), &digest);
                let signature = key.sign(&message);
                tracing::debug!(key_id = ?key.key_id(), alg = ?alg, "signed content slab");
                SignatureBlock { sign_ver: SIGN_VER, hash_alg: alg as u8, key_id: key.key_id(), signature }
            })
            .collect()
    }

    /// Succeeds iff at least one block's key id matches a trusted key and
    /// that key verifies the block's signature over the same
    /// `header || sig_prefix || digest` message [`Trust::sign`] produced.
    /// The digest for each algorithm present among `blocks` is computed at
    /// most once.
    pub fn verify(&self, header: FileHeader, content: &[u8], blocks: &[SignatureBlock]) -> Result<(), TrustError> {
        if blocks.is_empty() {
            return Err(TrustError::NoKey);
        }
        let mut digests: HashMap<DigestAlg, Vec<u8>> = HashMap::new();
        for block in blocks {
            let alg = match DigestAlg::from_bits(block.hash_alg) {
                Some(alg) => alg,
                None => continue,
            };
            let key = match self.trusted.iter().find(|k| k.key_id() == block.key_id) {
                Some(k) => k,
                None => continue,
            };
            let digest = digests.entry(alg).or_insert_with(|| digest_for(alg, content));
            let message = signed_message(header, block.sign_ver, alg, block.key_id, digest);
            if key.verify(&message, &block.signature) {
                tracing::debug!(key_id = ?block.key_id, "signature verified");
                return Ok(());
            }
        }
        tracing::warn!(block_count = blocks.len(), "no signature verified against a trusted key");
        Err(TrustError::KeyRejected)
    }
}

fn digest_for(alg: DigestAlg, content: &[u8]) -> Vec<u8> {
    match alg {
        #[cfg(feature = "std-crypto")]
        DigestAlg::Sha256 => default_impl::sha256(content),
        #[cfg(not(feature = "std-crypto"))]
        DigestAlg::Sha256 => content.to_vec(),
    }
}

/// The fixed 24-byte prefix of a [`SignatureBlock`]'s wire encoding with the
/// signature field zeroed: version, hash algorithm, reserved padding, key
/// id, and a zero signature length, matching the layout
/// [`SignatureBlock::encode`] writes before appending the signature itself.
fn sig_prefix(sign_ver: u8, hash_alg: u8, key_id: KeyId) -> [u8; 24] {
    let mut buf = [0u8; 24];
    buf[0] = sign_ver;
    buf[1] = hash_alg;
    buf[4..20].copy_from_slice(&key_id.0);
    buf
}

/// The message a key actually signs or verifies: the file header (binding
/// the schema id), the signature block's own prefix (binding its
/// version/algorithm/key id), then the content digest.
fn signed_message(header: FileHeader, sign_ver: u8, alg: DigestAlg, key_id: KeyId, digest: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(FileHeader::SIZE + 24 + digest.len());
    msg.extend_from_slice(&header.encode());
    msg.extend_from_slice(&sig_prefix(sign_ver, alg as u8, key_id));
    msg.extend_from_slice(digest);
    msg
}
