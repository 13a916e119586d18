//! Catalog HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Cacheable reads are grouped per cache tag so each group gets its own
//! `cached_read` layer. Paths are registered in exactly one group.
use crate::api;
use crate::api::error::api_internal_message;
use crate::api::openapi::ApiDoc;
use crate::auth::capability::CapabilityTokenService;
use crate::auth::keys::SigningKey;
use crate::auth::policy::Authorizer;
use crate::cache::{CachePolicy, CacheTag, ResponseCache, cached_read};
use crate::files::{FILES_ROUTE, FileStore};
use crate::hypermedia::LinkBuilder;
use crate::model::AuthorRecord;
use crate::store::CatalogStore;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use catalog_query::SortRegistry;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub cache: Arc<dyn ResponseCache>,
    pub files: Arc<dyn FileStore>,
    pub authorizer: Arc<dyn Authorizer>,
    pub signing_key: Arc<SigningKey>,
    pub capabilities: CapabilityTokenService,
    pub links: LinkBuilder,
    pub author_sorts: SortRegistry<AuthorRecord>,
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    api_internal_message("internal error").into_response()
}

fn cached(state: &AppState, tag: CacheTag, routes: Router<AppState>) -> Router<AppState> {
    routes.route_layer(axum::middleware::from_fn_with_state(
        CachePolicy::new(state.cache.clone(), tag),
        cached_read,
    ))
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    let author_reads = cached(
        &state,
        CacheTag::Authors,
        Router::new()
            .route(
                "/v1/authors",
                get(api::authors::list_authors).post(api::authors::create_author),
            )
            .route(
                "/v1/authors/:id",
                get(api::authors::get_author)
                    .put(api::authors::update_author)
                    .patch(api::authors::patch_author)
                    .delete(api::authors::delete_author),
            ),
    );

    let book_reads = cached(
        &state,
        CacheTag::Books,
        Router::new()
            .route(
                "/v1/books",
                get(api::books::list_books).post(api::books::create_book),
            )
            .route(
                "/v1/books/:id",
                get(api::books::get_book)
                    .put(api::books::update_book)
                    .delete(api::books::delete_book),
            ),
    );

    let comment_reads = cached(
        &state,
        CacheTag::Comments,
        Router::new()
            .route(
                "/v1/books/:id/comments",
                get(api::comments::list_comments).post(api::comments::create_comment),
            )
            .route(
                "/v1/books/:id/comments/:comment_id",
                get(api::comments::get_comment)
                    .patch(api::comments::patch_comment)
                    .delete(api::comments::delete_comment),
            ),
    );

    Router::new()
        .route("/v1", get(api::root::get_root))
        .route("/v1/system/health", get(api::system::system_health))
        .route("/v1/openapi.json", get(openapi_document))
        .route("/v1/authors/filter", get(api::authors::filter_authors))
        .route(
            "/v1/authors/with-picture",
            post(api::authors::create_author_with_picture),
        )
        .route(
            "/v1/authors/:id/picture",
            put(api::authors::replace_picture),
        )
        .route(
            "/v1/author-collection",
            post(api::author_collection::create_authors),
        )
        .route(
            "/v1/author-collection/:ids",
            get(api::author_collection::get_authors_by_ids),
        )
        .route(
            "/v1/books/list/get-token",
            get(api::books::get_listing_token),
        )
        .route(
            "/v1/books/list/:token",
            get(api::books::list_books_with_token),
        )
        .merge(author_reads)
        .merge(book_reads)
        .merge(comment_reads)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(trace_layer)
        .with_state(state)
}

/// Serve stored uploads from `root` under `/files`.
pub fn with_file_serving(router: Router, root: &Path) -> Router {
    router.nest_service(FILES_ROUTE, ServeDir::new(root))
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
