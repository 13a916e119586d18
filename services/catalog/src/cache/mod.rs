//! Tag-addressed response cache.
//!
//! # Purpose
//! Cacheable read endpoints store their rendered responses under a
//! [`CacheTag`]. Writers evict the whole tag once their store commit has
//! succeeded, so the next read observes the new state.
//!
//! # Key invariants
//! - Eviction happens after a successful commit and never on a failed write.
//! - A response rendered before an eviction is not stored after it: writers
//!   bump the tag generation and [`ResponseCache::set`] drops entries whose
//!   generation is stale.
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, StatusCode};

pub mod memory;
pub mod middleware;

pub use memory::{DEFAULT_CAPACITY, InMemoryResponseCache};
pub use middleware::{CachePolicy, cached_read};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    Authors,
    Books,
    Comments,
}

impl CacheTag {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheTag::Authors => "authors",
            CacheTag::Books => "books",
            CacheTag::Comments => "comments",
        }
    }
}

/// Rendered response kept by the cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
}

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedResponse>;

    /// Current generation of `tag`; advances on every eviction.
    async fn generation(&self, tag: CacheTag) -> u64;

    /// Store `response` unless `tag` was evicted after `generation` was read.
    async fn set(&self, key: String, tag: CacheTag, generation: u64, response: CachedResponse);

    async fn evict_by_tag(&self, tag: CacheTag);
}
