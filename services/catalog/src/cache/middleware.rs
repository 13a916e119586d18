//! Axum middleware serving cacheable reads from a [`ResponseCache`].
//!
//! Attach with `route_layer(from_fn_with_state(CachePolicy::new(..), cached_read))`.
//! Only anonymous `GET` requests participate; anything carrying an
//! `Authorization` header is rendered fresh because its body may depend on the
//! caller's privileges. Only `200 OK` responses are stored.
use super::{CacheTag, CachedResponse, ResponseCache};
use crate::api::TOTAL_QUANTITY_HEADER;
use crate::api::error::api_internal_message;
use crate::hypermedia::wants_hypermedia;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub const CACHE_STATUS_HEADER: &str = "x-cache";

#[derive(Clone)]
pub struct CachePolicy {
    cache: Arc<dyn ResponseCache>,
    tag: CacheTag,
}

impl CachePolicy {
    pub fn new(cache: Arc<dyn ResponseCache>, tag: CacheTag) -> Self {
        Self { cache, tag }
    }
}

fn replayed_headers() -> [HeaderName; 2] {
    [
        header::CONTENT_TYPE,
        HeaderName::from_static(TOTAL_QUANTITY_HEADER),
    ]
}

fn cache_key(request: &Request) -> String {
    let uri = request.uri();
    let target = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or_else(|| uri.path());
    let hypermedia = if wants_hypermedia(request.headers()) {
        "links"
    } else {
        "plain"
    };
    format!("{} {target} {hypermedia}", request.method())
}

fn replay(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    *response.status_mut() = cached.status;
    let headers = response.headers_mut();
    for (name, value) in cached.headers {
        headers.insert(name, value);
    }
    headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static("hit"));
    response
}

pub async fn cached_read(
    State(policy): State<CachePolicy>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET || request.headers().contains_key(header::AUTHORIZATION) {
        return next.run(request).await;
    }

    let key = cache_key(&request);
    if let Some(cached) = policy.cache.get(&key).await {
        return replay(cached);
    }
    metrics::counter!("catalog_cache_misses_total", "tag" => policy.tag.as_str()).increment(1);

    let generation = policy.cache.generation(policy.tag).await;
    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "failed to buffer cacheable response");
            return api_internal_message("internal error").into_response();
        }
    };
    let headers = replayed_headers()
        .into_iter()
        .filter_map(|name| {
            let value = parts.headers.get(&name)?.clone();
            Some((name, value))
        })
        .collect();
    policy
        .cache
        .set(
            key,
            policy.tag,
            generation,
            CachedResponse {
                status: parts.status,
                headers,
                body: bytes.clone(),
            },
        )
        .await;
    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("miss"));
    Response::from_parts(parts, Body::from(bytes))
}
