//! Ed25519 signing key material for catalog-issued tokens.
//!
//! # Purpose
//! Holds the single Ed25519 key the service signs with, plus the
//! `jsonwebtoken` encoding/decoding forms derived from it.
//!
//! # Key invariants
//! - The private key is a raw 32-byte seed; the public key is always derived
//!   from it so the pair cannot drift apart.
//! - The algorithm is pinned to EdDSA.
//! - The `kid` is derived from the public key and is not secret.
//!
//! # Security
//! The seed must never be logged. `Debug` only prints the `kid`.
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use rand::RngCore;
use std::fmt;
use thiserror::Error;

pub const ED25519_SEED_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid signing seed: {0}")]
    InvalidSeed(String),
    #[error("encode Ed25519 key: {0}")]
    Encoding(String),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    public_key: [u8; ED25519_SEED_LEN],
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Generate a key from a fresh random seed.
    pub fn generate() -> Result<Self, KeyError> {
        let mut seed = [0u8; ED25519_SEED_LEN];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; ED25519_SEED_LEN]) -> Result<Self, KeyError> {
        let signing_key = Ed25519SigningKey::from_bytes(&seed);
        let public_key = signing_key.verifying_key().to_bytes();
        // jsonwebtoken takes EdDSA private keys as PKCS8 DER and public keys as
        // the base64url `x` JWK component.
        let der = signing_key
            .to_pkcs8_der()
            .map_err(|err| KeyError::Encoding(err.to_string()))?;
        let encoding = EncodingKey::from_ed_der(der.as_bytes());
        let decoding = DecodingKey::from_ed_components(&URL_SAFE_NO_PAD.encode(public_key))?;
        Ok(Self {
            kid: hex::encode(&public_key[..8]),
            public_key,
            encoding,
            decoding,
        })
    }

    /// Parse a hex encoded 32-byte seed, as found in configuration.
    pub fn from_hex_seed(value: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(value.trim()).map_err(|err| KeyError::InvalidSeed(err.to_string()))?;
        let seed: [u8; ED25519_SEED_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            KeyError::InvalidSeed(format!(
                "expected {ED25519_SEED_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Self::from_seed(seed)
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key(&self) -> &[u8; ED25519_SEED_LEN] {
        &self.public_key
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    /// JWT header pinned to EdDSA and carrying this key's `kid`.
    pub fn header(&self) -> Header {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_derivation_is_deterministic() {
        let a = SigningKey::from_seed([7u8; 32]).expect("key");
        let b = SigningKey::from_seed([7u8; 32]).expect("key");
        assert_eq!(a.kid(), b.kid());
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn hex_seed_must_be_32_bytes() {
        let key = SigningKey::from_hex_seed(&"01".repeat(32)).expect("key");
        assert_eq!(key.kid().len(), 16);
        let err = SigningKey::from_hex_seed("abcd").err().expect("short seed");
        assert!(matches!(err, KeyError::InvalidSeed(_)));
        let err = SigningKey::from_hex_seed("zz").err().expect("bad hex");
        assert!(matches!(err, KeyError::InvalidSeed(_)));
    }

    #[test]
    fn generated_keys_differ() {
        let a = SigningKey::generate().expect("key");
        let b = SigningKey::generate().expect("key");
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn debug_output_hides_key_material() {
        let key = SigningKey::from_seed([9u8; 32]).expect("key");
        let rendered = format!("{key:?}");
        assert!(rendered.contains(key.kid()));
        assert!(!rendered.contains("encoding"));
    }
}
