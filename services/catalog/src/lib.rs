//! Catalog service library crate.
//!
//! # Purpose
//! Exposes the catalog API surface (authors, books and comments), the query
//! builder glue, response caching, tokens, and storage for use by the binary
//! and tests.
pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod files;
pub mod hypermedia;
pub mod model;
pub mod observability;
pub mod patch;
pub mod query;
pub mod store;
pub mod validation;
