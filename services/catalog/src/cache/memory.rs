//! In-process [`ResponseCache`] with a fixed time-to-live and a bounded
//! number of entries.
//!
//! Entries live in an [`LruCache`]: once `capacity` is reached the least
//! recently read response is dropped. Expired entries are purged on every
//! write so idle keys do not accumulate between evictions.
use super::{CacheTag, CachedResponse, ResponseCache};
use async_trait::async_trait;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(1023);

#[derive(Debug)]
struct Entry {
    tag: CacheTag,
    stored_at: Instant,
    response: CachedResponse,
}

#[derive(Debug)]
struct State {
    entries: LruCache<String, Entry>,
    generations: HashMap<CacheTag, u64>,
}

impl State {
    fn purge_expired(&mut self, ttl: Duration) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.stored_at.elapsed() >= ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }
}

#[derive(Debug)]
pub struct InMemoryResponseCache {
    ttl: Duration,
    state: Mutex<State>,
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl InMemoryResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            ttl,
            state: Mutex::new(State {
                entries: LruCache::new(capacity),
                generations: HashMap::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut state = self.state.lock().await;
        match state.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                metrics::counter!("catalog_cache_hits_total", "tag" => entry.tag.as_str())
                    .increment(1);
                return Some(entry.response.clone());
            }
            Some(_) => {}
            None => return None,
        }
        state.entries.pop(key);
        None
    }

    async fn generation(&self, tag: CacheTag) -> u64 {
        self.state
            .lock()
            .await
            .generations
            .get(&tag)
            .copied()
            .unwrap_or(0)
    }

    async fn set(&self, key: String, tag: CacheTag, generation: u64, response: CachedResponse) {
        let mut state = self.state.lock().await;
        let current = state.generations.get(&tag).copied().unwrap_or(0);
        if current != generation {
            tracing::debug!(
                tag = tag.as_str(),
                key = %key,
                "discarding response rendered before eviction"
            );
            return;
        }
        let purged = state.purge_expired(self.ttl);
        if purged > 0 {
            tracing::debug!(purged = purged as u64, "purged expired cached responses");
        }
        let entry = Entry {
            tag,
            stored_at: Instant::now(),
            response,
        };
        if let Some((dropped, _)) = state.entries.push(key.clone(), entry) {
            if dropped != key {
                metrics::counter!("catalog_cache_capacity_drops_total").increment(1);
            }
        }
    }

    async fn evict_by_tag(&self, tag: CacheTag) {
        let mut state = self.state.lock().await;
        *state.generations.entry(tag).or_insert(0) += 1;
        state.purge_expired(self.ttl);
        let tagged: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.tag == tag)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &tagged {
            state.entries.pop(key);
        }
        let evicted = tagged.len();
        metrics::counter!("catalog_cache_evictions_total", "tag" => tag.as_str())
            .increment(evicted as u64);
        tracing::debug!(
            tag = tag.as_str(),
            evicted = evicted as u64,
            "evicted cached responses"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::StatusCode;

    fn response(body: &'static str) -> CachedResponse {
        CachedResponse {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn eviction_only_touches_its_tag() {
        let cache = InMemoryResponseCache::default();
        cache
            .set("a".to_string(), CacheTag::Authors, 0, response("authors"))
            .await;
        cache
            .set("b".to_string(), CacheTag::Books, 0, response("books"))
            .await;
        cache.evict_by_tag(CacheTag::Authors).await;
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.get("b").await.expect("books").body, "books");
    }

    #[tokio::test]
    async fn stale_generation_is_not_stored() {
        let cache = InMemoryResponseCache::default();
        let generation = cache.generation(CacheTag::Authors).await;
        cache.evict_by_tag(CacheTag::Authors).await;
        cache
            .set("a".to_string(), CacheTag::Authors, generation, response("old"))
            .await;
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.generation(CacheTag::Authors).await, generation + 1);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryResponseCache::new(Duration::from_millis(20));
        cache
            .set("a".to_string(), CacheTag::Books, 0, response("books"))
            .await;
        assert!(cache.get("a").await.is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("a").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn expired_entries_are_purged_on_write() {
        let cache = InMemoryResponseCache::new(Duration::from_millis(5));
        for index in 0..500 {
            cache
                .set(format!("key-{index}"), CacheTag::Books, 0, response("books"))
                .await;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache
            .set("fresh".to_string(), CacheTag::Authors, 0, response("authors"))
            .await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entries_of_other_tags_are_purged_on_eviction() {
        let cache = InMemoryResponseCache::new(Duration::from_millis(5));
        cache
            .set("books".to_string(), CacheTag::Books, 0, response("books"))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.evict_by_tag(CacheTag::Authors).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn capacity_drops_least_recently_read_entry() {
        let capacity = NonZeroUsize::new(2).expect("non-zero");
        let cache = InMemoryResponseCache::with_capacity(DEFAULT_TTL, capacity);
        cache
            .set("a".to_string(), CacheTag::Books, 0, response("a"))
            .await;
        cache
            .set("b".to_string(), CacheTag::Books, 0, response("b"))
            .await;
        assert!(cache.get("a").await.is_some());
        cache
            .set("c".to_string(), CacheTag::Books, 0, response("c"))
            .await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("c").await.is_some());
    }
}
