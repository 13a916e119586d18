//! Bearer access tokens.
//!
//! # Purpose
//! Access tokens identify a caller and carry the `admin` flag that backs the
//! admin authorization policy. The catalog only verifies them; minting lives
//! here so an external issuer (or a test) sharing the signing seed can produce
//! tokens the service accepts.
//!
//! # Security
//! - EdDSA only; issuer and audience are pinned.
//! - The audience differs from capability tokens, so one can never stand in
//!   for the other.
use crate::auth::keys::SigningKey;
use jsonwebtoken::{Algorithm, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const ACCESS_ISSUER: &str = "catalog-auth";
pub const ACCESS_AUDIENCE: &str = "catalog-api";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("key error: {0}")]
    Key(String),
}

pub fn mint_access_token(
    key: &SigningKey,
    subject: &str,
    email: &str,
    admin: bool,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = now_epoch_seconds();
    let claims = AccessClaims {
        iss: ACCESS_ISSUER.to_string(),
        aud: ACCESS_AUDIENCE.to_string(),
        sub: subject.to_string(),
        email: email.to_string(),
        admin,
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    Ok(jsonwebtoken::encode(
        &key.header(),
        &claims,
        key.encoding_key(),
    )?)
}

/// Verify signature, issuer, audience and expiry of an access token.
pub fn verify_access_token(
    key: &SigningKey,
    token: &str,
    leeway: u64,
) -> Result<AccessClaims, TokenError> {
    let header = jsonwebtoken::decode_header(token)?;
    if let Some(kid) = header.kid.as_deref()
        && kid != key.kid()
    {
        return Err(TokenError::Key(format!("unknown kid {kid}")));
    }
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_audience(&[ACCESS_AUDIENCE]);
    validation.set_issuer(&[ACCESS_ISSUER]);
    validation.leeway = leeway;
    let data = jsonwebtoken::decode::<AccessClaims>(token, key.decoding_key(), &validation)?;
    Ok(data.claims)
}

pub(crate) fn now_epoch_seconds() -> i64 {
    // A clock before the epoch clamps to zero instead of panicking.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_seed([3u8; 32]).expect("key")
    }

    #[test]
    fn mint_and_verify_roundtrip_keeps_admin_flag() {
        let key = key();
        let token = mint_access_token(&key, "u1", "u1@example.com", true, Duration::from_secs(60))
            .expect("mint");
        let claims = verify_access_token(&key, &token, 0).expect("verify");
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "u1@example.com");
        assert!(claims.admin);
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let other = SigningKey::from_seed([4u8; 32]).expect("key");
        let token = mint_access_token(&other, "u1", "u1@example.com", false, Duration::from_secs(60))
            .expect("mint");
        assert!(verify_access_token(&key(), &token, 0).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            verify_access_token(&key(), "not-a-jwt", 0),
            Err(TokenError::Jwt(_))
        ));
    }
}
