//! Comment API handlers nested under a book.
//!
//! # Key invariants
//! - Soft-deleted comments behave as missing on every route.
//! - Only the comment's author may patch or delete it (403 otherwise).
//! - Every successful write evicts the `comments` tag after the commit.
use crate::api::error::{
    ApiError, api_forbidden, api_internal, api_not_found, api_validation_fields,
};
use crate::api::types::{CommentInput, CommentResponse};
use crate::api::{evict, json_body, validated};
use crate::app::AppState;
use crate::auth::principal::{Principal, authenticate, require_user};
use crate::cache::CacheTag;
use crate::model::{Comment, CommentDraft};
use crate::patch::{PatchOperation, apply_patch};
use crate::store::StoreError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

async fn ensure_book_exists(state: &AppState, book_id: i64) -> Result<(), ApiError> {
    let exists = state
        .store
        .book_exists(book_id)
        .await
        .map_err(|err| api_internal("failed to check book existence", &err))?;
    if !exists {
        return Err(api_not_found("book not found"));
    }
    Ok(())
}

async fn load_comment(state: &AppState, book_id: i64, id: Uuid) -> Result<Comment, ApiError> {
    match state.store.get_comment(book_id, id).await {
        Ok(comment) => Ok(comment),
        Err(StoreError::NotFound(_)) => Err(api_not_found("comment not found")),
        Err(err) => Err(api_internal("failed to load comment", &err)),
    }
}

/// Load a visible comment the caller owns.
async fn owned_comment(
    state: &AppState,
    principal: &Principal,
    book_id: i64,
    id: Uuid,
) -> Result<Comment, ApiError> {
    let comment = load_comment(state, book_id, id).await?;
    if comment.user_id != principal.user_id {
        return Err(api_forbidden("only the author of a comment can change it"));
    }
    Ok(comment)
}

#[utoipa::path(
    get,
    path = "/v1/books/{book_id}/comments",
    tag = "comments",
    params(("book_id" = i64, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "Visible comments, newest first", body = [CommentResponse]),
        (status = 404, description = "Book not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_comments(
    Path(book_id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    authenticate(&state, &headers)?;
    ensure_book_exists(&state, book_id).await?;
    let comments = state
        .store
        .list_comments(book_id)
        .await
        .map_err(|err| api_internal("failed to list comments", &err))?;
    Ok(Json(
        comments.into_iter().map(CommentResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/books/{book_id}/comments/{id}",
    tag = "comments",
    params(
        ("book_id" = i64, Path, description = "Book identifier"),
        ("id" = Uuid, Path, description = "Comment identifier")
    ),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 404, description = "Comment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_comment(
    Path((book_id, id)): Path<(i64, Uuid)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CommentResponse>, ApiError> {
    authenticate(&state, &headers)?;
    let comment = load_comment(&state, book_id, id).await?;
    Ok(Json(CommentResponse::from(comment)))
}

#[utoipa::path(
    post,
    path = "/v1/books/{book_id}/comments",
    tag = "comments",
    params(("book_id" = i64, Path, description = "Book identifier")),
    request_body = CommentInput,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Invalid comment", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller not allowed to comment", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_comment(
    Path(book_id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CommentInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = require_user(&state, &headers).await?;
    let input = validated(json_body(body)?)?;
    ensure_book_exists(&state, book_id).await?;
    let draft = CommentDraft {
        body: input.body.unwrap_or_default(),
        user_id: principal.user_id,
        user_email: principal.email,
    };
    let comment = match state.store.create_comment(book_id, draft).await {
        Ok(comment) => comment,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("book not found")),
        Err(err) => return Err(api_internal("failed to create comment", &err)),
    };
    evict(&state, &[CacheTag::Comments]).await;
    let location = state
        .links
        .url(&format!("/v1/books/{book_id}/comments/{}", comment.id));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CommentResponse::from(comment)),
    )
        .into_response())
}

#[utoipa::path(
    patch,
    path = "/v1/books/{book_id}/comments/{id}",
    tag = "comments",
    params(
        ("book_id" = i64, Path, description = "Book identifier"),
        ("id" = Uuid, Path, description = "Comment identifier")
    ),
    request_body = [PatchOperation],
    responses(
        (status = 204, description = "Comment patched"),
        (status = 400, description = "Invalid patch or resulting comment", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Not the comment's author", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Book or comment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_comment(
    Path((book_id, id)): Path<(i64, Uuid)>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Vec<PatchOperation>>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let principal = require_user(&state, &headers).await?;
    let operations = json_body(body)?;
    ensure_book_exists(&state, book_id).await?;
    let comment = owned_comment(&state, &principal, book_id, id).await?;
    let view = CommentInput {
        body: Some(comment.body),
    };
    let patched = apply_patch(&view, &operations).map_err(api_validation_fields)?;
    match state
        .store
        .update_comment(book_id, id, patched.body.unwrap_or_default())
        .await
    {
        Ok(_) => {}
        Err(StoreError::NotFound(_)) => return Err(api_not_found("comment not found")),
        Err(err) => return Err(api_internal("failed to patch comment", &err)),
    }
    evict(&state, &[CacheTag::Comments]).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/books/{book_id}/comments/{id}",
    tag = "comments",
    params(
        ("book_id" = i64, Path, description = "Book identifier"),
        ("id" = Uuid, Path, description = "Comment identifier")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the comment's author", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Book or comment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_comment(
    Path((book_id, id)): Path<(i64, Uuid)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let principal = require_user(&state, &headers).await?;
    ensure_book_exists(&state, book_id).await?;
    owned_comment(&state, &principal, book_id, id).await?;
    match state.store.soft_delete_comment(book_id, id).await {
        Ok(()) => {}
        Err(StoreError::NotFound(_)) => return Err(api_not_found("comment not found")),
        Err(err) => return Err(api_internal("failed to delete comment", &err)),
    }
    evict(&state, &[CacheTag::Comments]).await;
    Ok(StatusCode::NO_CONTENT)
}
