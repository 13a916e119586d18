//! Authorization policies.
use crate::auth::principal::Principal;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Any verified caller.
    Authenticated,
    /// Callers whose access token carries the admin claim.
    Admin,
}

/// Decides whether an (optional) principal satisfies a policy.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn is_authorized(&self, principal: Option<&Principal>, policy: Policy) -> bool;
}

/// Evaluates policies from the claims already present on the principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsAuthorizer;

#[async_trait]
impl Authorizer for ClaimsAuthorizer {
    async fn is_authorized(&self, principal: Option<&Principal>, policy: Policy) -> bool {
        match (principal, policy) {
            (None, _) => false,
            (Some(_), Policy::Authenticated) => true,
            (Some(principal), Policy::Admin) => principal.is_admin,
        }
    }
}
