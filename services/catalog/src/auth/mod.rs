//! Catalog authentication and authorization modules.
//!
//! # Purpose
//! Groups signing keys, bearer access tokens, capability tokens, principals
//! and authorization policies.
pub mod capability;
pub mod keys;
pub mod policy;
pub mod principal;
pub mod tokens;
