#![allow(dead_code)]

use axum::Router;
use axum::response::Response;
use catalog::app::{AppState, build_router};
use catalog::auth::capability::CapabilityTokenService;
use catalog::auth::keys::SigningKey;
use catalog::auth::policy::{Authorizer, ClaimsAuthorizer};
use catalog::auth::tokens::mint_access_token;
use catalog::cache::InMemoryResponseCache;
use catalog::files::LocalFileStore;
use catalog::hypermedia::LinkBuilder;
use catalog::query::author_sort_fields;
use catalog::store::memory::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BASE_URL: &str = "http://catalog.test";
pub const ADMIN_EMAIL: &str = "admin@catalog.test";

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Router over fresh in-memory state, plus the key needed to mint tokens for it.
pub struct TestApp {
    pub router: Router,
    pub key: Arc<SigningKey>,
    pub files: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_capability_ttl(Duration::from_secs(30))
    }

    pub fn with_capability_ttl(ttl: Duration) -> Self {
        Self::build(ttl, Arc::new(ClaimsAuthorizer))
    }

    pub fn with_authorizer(authorizer: Arc<dyn Authorizer>) -> Self {
        Self::build(Duration::from_secs(30), authorizer)
    }

    fn build(ttl: Duration, authorizer: Arc<dyn Authorizer>) -> Self {
        let files = tempfile::tempdir().expect("files dir");
        let key = Arc::new(SigningKey::from_seed([7u8; 32]).expect("signing key"));
        let state = AppState {
            store: Arc::new(InMemoryStore::new()),
            cache: Arc::new(InMemoryResponseCache::new(Duration::from_secs(60))),
            files: Arc::new(LocalFileStore::new(files.path(), BASE_URL)),
            authorizer,
            signing_key: key.clone(),
            capabilities: CapabilityTokenService::new(key.clone(), ttl),
            links: LinkBuilder::new(BASE_URL),
            author_sorts: author_sort_fields(),
        };
        Self {
            router: build_router(state),
            key,
            files,
        }
    }

    pub fn admin_token(&self) -> String {
        mint_access_token(&self.key, "admin-1", ADMIN_EMAIL, true, Duration::from_secs(300))
            .expect("admin token")
    }

    pub fn user_token(&self, subject: &str, email: &str) -> String {
        mint_access_token(&self.key, subject, email, false, Duration::from_secs(300))
            .expect("user token")
    }

    pub async fn send(&self, request: axum::http::Request<axum::body::Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("response")
    }

    /// Create an author as admin and return its id.
    pub async fn seed_author(&self, names: &str, last_names: &str) -> i64 {
        let response = self
            .send(crate::http_helpers::authorized(
                crate::http_helpers::json_request(
                    "POST",
                    "/v1/authors",
                    serde_json::json!({ "names": names, "last_names": last_names }),
                ),
                &self.admin_token(),
            ))
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        read_json(response).await["id"].as_i64().expect("author id")
    }

    /// Create a book as admin and return its id.
    pub async fn seed_book(&self, title: &str, author_ids: &[i64]) -> i64 {
        let response = self
            .send(crate::http_helpers::authorized(
                crate::http_helpers::json_request(
                    "POST",
                    "/v1/books",
                    serde_json::json!({ "title": title, "author_ids": author_ids }),
                ),
                &self.admin_token(),
            ))
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        read_json(response).await["id"].as_i64().expect("book id")
    }
}
