//! Agent identity: ed25519 keypair derived from a seed phrase, and the
//! public address derived from the verifying key.
//!
//! ```text
//! signing key = ed25519(SHA256(seed phrase))
//! address     = "agent1q" + hex(verifying key)      (71 chars)
//! ```
//!
//! The derivation is deterministic, so a peer's address can be written into
//! config (or computed from its seed) before that peer has ever started.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Prefix shared by every agent address.
pub const ADDRESS_PREFIX: &str = "agent1q";

/// Loaded agent identity. Cheap to clone.
#[derive(Clone)]
pub struct Identity {
    address: String,
    signing_key: SigningKey,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity").field("address", &self.address).finish_non_exhaustive()
    }
}

impl Identity {
    /// Derive the identity for `seed`. The seed must not be empty.
    pub fn from_seed(seed: &str) -> Result<Self, AppError> {
        if seed.trim().is_empty() {
            return Err(AppError::Identity("seed phrase must not be empty".into()));
        }
        let secret: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
        let signing_key = SigningKey::from_bytes(&secret);
        let address = address_for(&signing_key.verifying_key());
        Ok(Self { address, signing_key })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign `message`, returning the hex-encoded signature.
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }
}

/// Address for a verifying key.
pub fn address_for(key: &VerifyingKey) -> String {
    format!("{ADDRESS_PREFIX}{}", hex::encode(key.to_bytes()))
}

/// Recover the verifying key embedded in `address`.
pub fn verifying_key_from_address(address: &str) -> Result<VerifyingKey, AppError> {
    let hex_part = address
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or_else(|| AppError::Identity(format!("address must start with '{ADDRESS_PREFIX}': {address}")))?;
    let bytes = hex::decode(hex_part)
        .map_err(|e| AppError::Identity(format!("address is not hex-encoded: {e}")))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AppError::Identity("address key is not 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| AppError::Identity(format!("address key is not a valid ed25519 point: {e}")))
}

/// Check a hex-encoded signature produced by [`Identity::sign`].
pub fn verify(address: &str, message: &[u8], signature_hex: &str) -> Result<(), AppError> {
    let key = verifying_key_from_address(address)?;
    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| AppError::Identity(format!("signature is not hex-encoded: {e}")))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| AppError::Identity("signature is not 64 bytes".into()))?;
    key.verify(message, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| AppError::Identity(format!("bad signature from {address}")))
}

/// `true` if `address` is syntactically a valid agent address.
pub fn is_valid_address(address: &str) -> bool {
    verifying_key_from_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_address() {
        let a = Identity::from_seed("my_very_secret_creator_seed_phrase_123").unwrap();
        let b = Identity::from_seed("my_very_secret_creator_seed_phrase_123").unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn different_seeds_differ() {
        let a = Identity::from_seed("seed a").unwrap();
        let b = Identity::from_seed("seed b").unwrap();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn address_shape() {
        let id = Identity::from_seed("shape").unwrap();
        assert!(id.address().starts_with(ADDRESS_PREFIX));
        assert_eq!(id.address().len(), ADDRESS_PREFIX.len() + 64);
        assert!(is_valid_address(id.address()));
    }

    #[test]
    fn empty_seed_rejected() {
        assert!(Identity::from_seed("   ").is_err());
    }

    #[test]
    fn sign_then_verify() {
        let id = Identity::from_seed("signer").unwrap();
        let sig = id.sign(b"hello");
        verify(id.address(), b"hello", &sig).unwrap();
    }

    #[test]
    fn tampered_message_fails_verification() {
        let id = Identity::from_seed("signer").unwrap();
        let sig = id.sign(b"hello");
        assert!(verify(id.address(), b"hellO", &sig).is_err());
    }

    #[test]
    fn signature_from_other_agent_fails() {
        let a = Identity::from_seed("a").unwrap();
        let b = Identity::from_seed("b").unwrap();
        let sig = a.sign(b"hello");
        assert!(verify(b.address(), b"hello", &sig).is_err());
    }

    #[test]
    fn foreign_address_formats_are_invalid() {
        assert!(!is_valid_address("agent1qtdvskm3g5ngmvfuqek6shrpjz6ed8jc84s6phmark05z5a8naxawu5jsrq"));
        assert!(!is_valid_address("not-an-address"));
        assert!(!is_valid_address(""));
    }
}
