//! Book API handlers, including the capability-gated listing.
//!
//! # Purpose
//! Listing, lookup, creation, update and deletion of books, plus the pair of
//! endpoints that mint a short-lived listing URL and serve it.
//!
//! # Key invariants
//! - A book always has at least one author, every author exists, and the
//!   credit order is the order the client sent.
//! - Book writes commit the book and its relation rows together, then evict
//!   the `books` and `authors` tags (deletion also evicts `comments`).
use crate::api::error::{
    ApiError, api_internal, api_internal_message, api_not_found, api_validation_fields,
};
use crate::api::types::{
    BookInput, BookSummaryResponse, BookWithAuthorsResponse, ListingTokenResponse,
};
use crate::api::{evict, json_body, total_quantity, validated};
use crate::app::AppState;
use crate::auth::principal::{authenticate, require_admin};
use crate::cache::CacheTag;
use crate::hypermedia::Route;
use crate::model::{BookDraft, BookRecord};
use crate::query::books_by_title;
use crate::store::StoreError;
use crate::validation::single_field_error;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use catalog_query::{Pagination, QuerySource, paginate};

pub const EXPIRED_TOKEN_MESSAGE: &str = "the token has expired";

const BOOK_WRITE_TAGS: [CacheTag; 2] = [CacheTag::Books, CacheTag::Authors];

/// Validate the body and confirm every referenced author exists.
async fn book_draft(state: &AppState, input: BookInput) -> Result<BookDraft, ApiError> {
    let input = validated(input)?;
    let author_ids = input.author_ids.unwrap_or_default();
    let existing = state
        .store
        .existing_author_ids(&author_ids)
        .await
        .map_err(|err| api_internal("failed to check authors", &err))?;
    let missing: Vec<String> = author_ids
        .iter()
        .filter(|id| !existing.contains(id))
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(api_validation_fields(single_field_error(
            "author_ids",
            format!("the following authors do not exist: {}", missing.join(",")),
        )));
    }
    Ok(BookDraft {
        title: input.title.unwrap_or_default(),
        author_ids,
    })
}

/// Map a failed book write: a missing author is a client error on
/// `author_ids`, a missing book is a 404.
fn book_write_error(err: StoreError, message: &str) -> ApiError {
    match &err {
        StoreError::NotFound(what) => match what.strip_prefix("author ") {
            Some(id) => api_validation_fields(single_field_error(
                "author_ids",
                format!("the following authors do not exist: {id}"),
            )),
            None => api_not_found("book not found"),
        },
        StoreError::Unexpected(_) => api_internal(message, &err),
    }
}

fn summaries(records: Vec<BookRecord>) -> Vec<BookSummaryResponse> {
    records
        .into_iter()
        .map(|record| BookSummaryResponse::from(record.book))
        .collect()
}

#[utoipa::path(
    get,
    path = "/v1/books",
    tag = "books",
    params(
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("records_per_page" = Option<u32>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Books ordered by title; total in `total-quantity`", body = [BookSummaryResponse])
    )
)]
pub(crate) async fn list_books(
    Query(pagination): Query<Pagination>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authenticate(&state, &headers)?;
    let page = paginate(state.store.as_ref(), &books_by_title(), pagination)
        .await
        .map_err(|err| api_internal("failed to list books", &err))?;
    Ok((total_quantity(page.total), Json(summaries(page.items))).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "Book with authors in credit order", body = BookWithAuthorsResponse),
        (status = 404, description = "Book not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_book(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BookWithAuthorsResponse>, ApiError> {
    authenticate(&state, &headers)?;
    match state.store.get_book_record(id).await {
        Ok(record) => Ok(Json(BookWithAuthorsResponse::from(record))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("book not found")),
        Err(err) => Err(api_internal("failed to load book", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/books",
    tag = "books",
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = BookWithAuthorsResponse),
        (status = 400, description = "Invalid book", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Admin required", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers).await?;
    let draft = book_draft(&state, json_body(body)?).await?;
    let record = state
        .store
        .create_book(draft)
        .await
        .map_err(|err| book_write_error(err, "failed to create book"))?;
    evict(&state, &BOOK_WRITE_TAGS).await;
    tracing::info!(book_id = record.book.id, "book created");
    let location = state.links.resolve(Route::Book(record.book.id));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(BookWithAuthorsResponse::from(record)),
    )
        .into_response())
}

#[utoipa::path(
    put,
    path = "/v1/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book identifier")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = BookWithAuthorsResponse),
        (status = 400, description = "Invalid book", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_book(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<BookWithAuthorsResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let input = json_body(body)?;
    let exists = state
        .store
        .book_exists(id)
        .await
        .map_err(|err| api_internal("failed to load book", &err))?;
    if !exists {
        return Err(api_not_found("book not found"));
    }
    let draft = book_draft(&state, input).await?;
    let record = state
        .store
        .update_book(id, draft)
        .await
        .map_err(|err| book_write_error(err, "failed to update book"))?;
    evict(&state, &BOOK_WRITE_TAGS).await;
    Ok(Json(BookWithAuthorsResponse::from(record)))
}

#[utoipa::path(
    delete,
    path = "/v1/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book identifier")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_book(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    match state.store.delete_book(id).await {
        Ok(()) => {}
        Err(StoreError::NotFound(_)) => return Err(api_not_found("book not found")),
        Err(err) => return Err(api_internal("failed to delete book", &err)),
    }
    evict(
        &state,
        &[CacheTag::Books, CacheTag::Authors, CacheTag::Comments],
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/books/list/get-token",
    tag = "books",
    responses(
        (status = 200, description = "Short-lived URL of the book listing", body = ListingTokenResponse),
        (status = 403, description = "Admin required", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_listing_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListingTokenResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let token = state.capabilities.issue().map_err(|err| {
        tracing::error!(error = %err, "failed to issue capability token");
        api_internal_message("failed to issue token")
    })?;
    let url = state
        .links
        .url(&format!("{}/list/{token}", Route::Books.path()));
    Ok(Json(ListingTokenResponse {
        url,
        expires_in_secs: state.capabilities.ttl().as_secs(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/books/list/{token}",
    tag = "books",
    params(("token" = String, Path, description = "Capability token from get-token")),
    responses(
        (status = 200, description = "Every book ordered by title", body = [BookSummaryResponse]),
        (status = 400, description = "Token invalid or expired", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_books_with_token(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<BookSummaryResponse>>, ApiError> {
    if let Err(err) = state.capabilities.verify(&token) {
        tracing::debug!(error = %err, "rejected capability token");
        return Err(api_validation_fields(single_field_error(
            "token",
            EXPIRED_TOKEN_MESSAGE,
        )));
    }
    let records = QuerySource::<BookRecord>::fetch(state.store.as_ref(), &books_by_title())
        .await
        .map_err(|err| api_internal("failed to list books", &err))?;
    Ok(Json(summaries(records)))
}
