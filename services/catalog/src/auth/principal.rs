//! Caller identity and request guards.
//!
//! # Purpose
//! Resolves the [`Principal`] behind a request's bearer token and provides the
//! guards handlers call before mutating anything.
//!
//! # Notes
//! A request without an `Authorization` header is anonymous. A request with a
//! malformed or unverifiable one is rejected with 401 even on anonymous
//! routes, so a broken client never silently loses its identity.
use crate::api::error::{ApiError, api_forbidden, api_unauthorized};
use crate::app::AppState;
use crate::auth::policy::Policy;
use crate::auth::tokens::{AccessClaims, verify_access_token};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN_LEEWAY_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<AccessClaims> for Principal {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            is_admin: claims.admin,
        }
    }
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

pub(crate) fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Principal>, ApiError> {
    if !headers.contains_key(axum::http::header::AUTHORIZATION) {
        return Ok(None);
    }
    let bearer =
        extract_bearer(headers).ok_or_else(|| api_unauthorized("invalid authorization header"))?;
    let claims = verify_access_token(&state.signing_key, bearer, ACCESS_TOKEN_LEEWAY_SECS)
        .map_err(|err| {
            tracing::debug!(error = %err, "rejected access token");
            api_unauthorized("invalid token")
        })?;
    Ok(Some(Principal::from(claims)))
}

pub(crate) async fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, ApiError> {
    let principal =
        authenticate(state, headers)?.ok_or_else(|| api_unauthorized("missing bearer token"))?;
    if !state
        .authorizer
        .is_authorized(Some(&principal), Policy::Authenticated)
        .await
    {
        return Err(api_forbidden("access denied"));
    }
    Ok(principal)
}

pub(crate) async fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, ApiError> {
    let principal = require_user(state, headers).await?;
    if !state
        .authorizer
        .is_authorized(Some(&principal), Policy::Admin)
        .await
    {
        return Err(api_forbidden("admin privileges required"));
    }
    Ok(principal)
}

/// Whether the caller may see privileged hypermedia links.
pub(crate) async fn is_privileged(state: &AppState, principal: Option<&Principal>) -> bool {
    state.authorizer.is_authorized(principal, Policy::Admin).await
}
