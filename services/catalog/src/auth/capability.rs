//! Short-lived capability tokens.
//!
//! # Purpose
//! A capability token grants its bearer access to one anonymous listing route
//! for a short window. Tokens are stateless: a signed JWT carrying a random
//! nonce (`jti`), issue time and expiry. Nothing is stored server side.
//!
//! # Key invariants
//! - A token verifies iff it was signed by the service key, carries the
//!   capability issuer/audience, and `now < exp`.
//! - Expiry is checked against the caller supplied clock in
//!   [`CapabilityTokenService::verify_at`], without leeway, so tests can pin
//!   the boundary exactly.
//! - Tokens remain reusable until they expire.
//!
//! # Security
//! The audience differs from access tokens, so an access token never opens
//! the capability route and vice versa.
use crate::auth::keys::SigningKey;
use jsonwebtoken::{Algorithm, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

pub const CAPABILITY_ISSUER: &str = "catalog-api";
pub const CAPABILITY_AUDIENCE: &str = "catalog-capability";
pub const DEFAULT_CAPABILITY_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityClaims {
    pub iss: String,
    pub aud: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability token is invalid: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("capability token was signed by an unknown key")]
    UnknownKey,
    #[error("capability token has expired")]
    Expired,
}

/// Issues and verifies capability tokens with the service signing key.
///
/// # Example
/// ```rust
/// use catalog::auth::capability::CapabilityTokenService;
/// use catalog::auth::keys::SigningKey;
/// use std::sync::Arc;
/// use std::time::{Duration, SystemTime};
///
/// let key = Arc::new(SigningKey::from_seed([1u8; 32]).expect("key"));
/// let service = CapabilityTokenService::new(key, Duration::from_secs(30));
/// let now = SystemTime::now();
/// let token = service.issue_at(now).expect("issue");
/// assert!(service.verify_at(&token, now).is_ok());
/// assert!(service.verify_at(&token, now + Duration::from_secs(30)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CapabilityTokenService {
    key: Arc<SigningKey>,
    ttl: Duration,
}

impl CapabilityTokenService {
    pub fn new(key: Arc<SigningKey>, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self) -> Result<String, CapabilityError> {
        self.issue_at(SystemTime::now())
    }

    /// Mint a token valid for `[now, now + ttl)`.
    pub fn issue_at(&self, now: SystemTime) -> Result<String, CapabilityError> {
        let iat = epoch_seconds(now);
        let claims = CapabilityClaims {
            iss: CAPABILITY_ISSUER.to_string(),
            aud: CAPABILITY_AUDIENCE.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat,
            exp: iat + self.ttl.as_secs() as i64,
        };
        Ok(jsonwebtoken::encode(
            &self.key.header(),
            &claims,
            self.key.encoding_key(),
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<CapabilityClaims, CapabilityError> {
        self.verify_at(token, SystemTime::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        now: SystemTime,
    ) -> Result<CapabilityClaims, CapabilityError> {
        let header = jsonwebtoken::decode_header(token)?;
        if header.kid.as_deref().is_some_and(|kid| kid != self.key.kid()) {
            return Err(CapabilityError::UnknownKey);
        }
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[CAPABILITY_AUDIENCE]);
        validation.set_issuer(&[CAPABILITY_ISSUER]);
        // Expiry is enforced below against the injected clock.
        validation.validate_exp = false;
        validation.required_spec_claims =
            HashSet::from(["exp", "iss", "aud"].map(String::from));
        let data =
            jsonwebtoken::decode::<CapabilityClaims>(token, self.key.decoding_key(), &validation)?;
        if epoch_seconds(now) >= data.claims.exp {
            return Err(CapabilityError::Expired);
        }
        Ok(data.claims)
    }
}

fn epoch_seconds(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}
