//! Author API handlers.
//!
//! # Purpose
//! Listing, lookup, search, creation (JSON or multipart with a picture),
//! full update, picture replacement, patch and deletion of authors.
//!
//! # Key invariants
//! - Mutations require the admin policy and evict the `authors` and `books`
//!   cache tags once the store commit has succeeded.
//! - Validation failures report every failing field before anything is
//!   loaded or written.
use crate::api::error::{
    ApiError, api_internal, api_internal_message, api_not_found, api_validation_error,
    api_validation_fields,
};
use crate::api::types::{AuthorInput, AuthorResponse, AuthorWithBooksResponse};
use crate::api::{decorator_for, evict, json_body, total_quantity, validated};
use crate::app::AppState;
use crate::auth::principal::{authenticate, require_admin};
use crate::cache::CacheTag;
use crate::files::{FileStoreError, Upload};
use crate::hypermedia::{Listing, Route};
use crate::patch::{PatchOperation, apply_patch};
use crate::query::{AuthorFilter, AuthorListing, all_authors_query, build_author_query};
use crate::store::StoreError;
use crate::validation::{REQUIRED_MESSAGE, single_field_error};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use catalog_query::{Pagination, paginate};

/// File store container holding author pictures.
pub const PICTURE_CONTAINER: &str = "authors";

const AUTHOR_WRITE_TAGS: [CacheTag; 2] = [CacheTag::Authors, CacheTag::Books];

fn file_error(err: FileStoreError) -> ApiError {
    tracing::error!(error = %err, "author picture storage failed");
    api_internal_message("failed to store author picture")
}

fn created(state: &AppState, author: AuthorResponse) -> Response {
    let location = state.links.resolve(Route::Author(author.id));
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(author),
    )
        .into_response()
}

/// Author fields and optional picture read from a multipart form.
async fn read_author_form(
    mut multipart: Multipart,
) -> Result<(AuthorInput, Option<Upload>), ApiError> {
    let malformed = |err: axum::extract::multipart::MultipartError| {
        tracing::debug!(error = %err, "rejected multipart body");
        api_validation_error("malformed multipart body")
    };
    let mut input = AuthorInput::default();
    let mut picture = None;
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "names" => input.names = Some(field.text().await.map_err(malformed)?),
            "last_names" => input.last_names = Some(field.text().await.map_err(malformed)?),
            "identification" => {
                let value = field.text().await.map_err(malformed)?;
                input.identification = (!value.is_empty()).then_some(value);
            }
            "picture" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;
                if !bytes.is_empty() {
                    picture = Some(Upload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }
    Ok((input, picture))
}

#[utoipa::path(
    get,
    path = "/v1/authors",
    tag = "authors",
    params(
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("records_per_page" = Option<u32>, Query, description = "Page size"),
        ("IncludeHATEOAS" = Option<String>, Header, description = "`Y` to include links")
    ),
    responses(
        (status = 200, description = "Authors ordered by names; total in `total-quantity`", body = [AuthorResponse])
    )
)]
pub(crate) async fn list_authors(
    Query(pagination): Query<Pagination>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let principal = authenticate(&state, &headers)?;
    let page = paginate(state.store.as_ref(), &all_authors_query(), pagination)
        .await
        .map_err(|err| api_internal("failed to list authors", &err))?;
    let items: Vec<AuthorResponse> = page
        .items
        .into_iter()
        .map(|record| AuthorResponse::from(record.author))
        .collect();
    let decorator = decorator_for(&state, &headers, principal.as_ref()).await;
    Ok((
        total_quantity(page.total),
        Json(Listing::build(items, decorator)),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/v1/authors/{id}",
    tag = "authors",
    params(
        ("id" = i64, Path, description = "Author identifier"),
        ("IncludeHATEOAS" = Option<String>, Header, description = "`Y` to include links")
    ),
    responses(
        (status = 200, description = "Author with credited books", body = AuthorWithBooksResponse),
        (status = 404, description = "Author not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_author(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthorWithBooksResponse>, ApiError> {
    let principal = authenticate(&state, &headers)?;
    let record = match state.store.get_author_record(id).await {
        Ok(record) => record,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("author not found")),
        Err(err) => return Err(api_internal("failed to load author", &err)),
    };
    let response = AuthorWithBooksResponse::from(record);
    let response = match decorator_for(&state, &headers, principal.as_ref()).await {
        Some(decorator) => decorator.item(response),
        None => response,
    };
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/authors/filter",
    tag = "authors",
    params(AuthorFilter),
    responses(
        (status = 200, description = "Matching authors; total in `total-quantity`", body = [AuthorResponse])
    )
)]
pub(crate) async fn filter_authors(
    Query(filter): Query<AuthorFilter>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let principal = authenticate(&state, &headers)?;
    let query = build_author_query(&filter, &state.author_sorts);
    let page = paginate(state.store.as_ref(), &query, filter.pagination())
        .await
        .map_err(|err| api_internal("failed to filter authors", &err))?;
    let decorator = decorator_for(&state, &headers, principal.as_ref()).await;
    let listing = AuthorListing::project(page.items, filter.include_books, decorator);
    Ok((total_quantity(page.total), Json(listing)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/authors",
    tag = "authors",
    request_body = AuthorInput,
    responses(
        (status = 201, description = "Author created", body = AuthorResponse),
        (status = 400, description = "Invalid author", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Admin required", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_author(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AuthorInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers).await?;
    let input = validated(json_body(body)?)?;
    let author = state
        .store
        .create_author(input.into_draft(None))
        .await
        .map_err(|err| api_internal("failed to create author", &err))?;
    evict(&state, &AUTHOR_WRITE_TAGS).await;
    tracing::info!(author_id = author.id, "author created");
    Ok(created(&state, AuthorResponse::from(author)))
}

#[utoipa::path(
    post,
    path = "/v1/authors/with-picture",
    tag = "authors",
    request_body(content = String, content_type = "multipart/form-data", description = "names, last_names, identification and an optional picture file"),
    responses(
        (status = 201, description = "Author created", body = AuthorResponse),
        (status = 400, description = "Invalid author", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Admin required", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_author_with_picture(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers).await?;
    let (input, upload) = read_author_form(multipart).await?;
    let input = validated(input)?;
    let picture = match upload {
        Some(upload) => Some(
            state
                .files
                .store(PICTURE_CONTAINER, upload)
                .await
                .map_err(file_error)?,
        ),
        None => None,
    };
    let author = state
        .store
        .create_author(input.into_draft(picture))
        .await
        .map_err(|err| api_internal("failed to create author", &err))?;
    evict(&state, &AUTHOR_WRITE_TAGS).await;
    tracing::info!(author_id = author.id, "author created with picture");
    Ok(created(&state, AuthorResponse::from(author)))
}

#[utoipa::path(
    put,
    path = "/v1/authors/{id}",
    tag = "authors",
    params(("id" = i64, Path, description = "Author identifier")),
    request_body = AuthorInput,
    responses(
        (status = 200, description = "Author updated", body = AuthorResponse),
        (status = 400, description = "Invalid author", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_author(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AuthorInput>, JsonRejection>,
) -> Result<Json<AuthorResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let input = validated(json_body(body)?)?;
    let current = match state.store.get_author(id).await {
        Ok(author) => author,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("author not found")),
        Err(err) => return Err(api_internal("failed to load author", &err)),
    };
    let author = match state
        .store
        .update_author(id, input.into_draft(current.picture))
        .await
    {
        Ok(author) => author,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("author not found")),
        Err(err) => return Err(api_internal("failed to update author", &err)),
    };
    evict(&state, &AUTHOR_WRITE_TAGS).await;
    Ok(Json(AuthorResponse::from(author)))
}

#[utoipa::path(
    put,
    path = "/v1/authors/{id}/picture",
    tag = "authors",
    params(("id" = i64, Path, description = "Author identifier")),
    request_body(content = String, content_type = "multipart/form-data", description = "picture file"),
    responses(
        (status = 200, description = "Picture replaced", body = AuthorResponse),
        (status = 400, description = "Missing picture", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn replace_picture(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<AuthorResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let (_, upload) = read_author_form(multipart).await?;
    let upload = upload
        .ok_or_else(|| api_validation_fields(single_field_error("picture", REQUIRED_MESSAGE)))?;
    let mut author = match state.store.get_author(id).await {
        Ok(author) => author,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("author not found")),
        Err(err) => return Err(api_internal("failed to load author", &err)),
    };
    let url = state
        .files
        .edit(author.picture.as_deref(), PICTURE_CONTAINER, upload)
        .await
        .map_err(file_error)?;
    author.picture = Some(url);
    let author = state
        .store
        .update_author(id, (&author).into())
        .await
        .map_err(|err| api_internal("failed to update author", &err))?;
    evict(&state, &AUTHOR_WRITE_TAGS).await;
    Ok(Json(AuthorResponse::from(author)))
}

#[utoipa::path(
    patch,
    path = "/v1/authors/{id}",
    tag = "authors",
    params(("id" = i64, Path, description = "Author identifier")),
    request_body = [PatchOperation],
    responses(
        (status = 204, description = "Author patched"),
        (status = 400, description = "Invalid patch or resulting author", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_author(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Vec<PatchOperation>>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    let operations = json_body(body)?;
    let mut author = match state.store.get_author(id).await {
        Ok(author) => author,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("author not found")),
        Err(err) => return Err(api_internal("failed to load author", &err)),
    };
    let patched =
        apply_patch(&AuthorInput::from(&author), &operations).map_err(api_validation_fields)?;
    author.apply(patched.into_draft(author.picture.clone()));
    match state.store.update_author(id, (&author).into()).await {
        Ok(_) => {}
        Err(StoreError::NotFound(_)) => return Err(api_not_found("author not found")),
        Err(err) => return Err(api_internal("failed to patch author", &err)),
    }
    evict(&state, &AUTHOR_WRITE_TAGS).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/authors/{id}",
    tag = "authors",
    params(("id" = i64, Path, description = "Author identifier")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_author(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    let author = match state.store.delete_author(id).await {
        Ok(author) => author,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("author not found")),
        Err(err) => return Err(api_internal("failed to delete author", &err)),
    };
    evict(&state, &AUTHOR_WRITE_TAGS).await;
    // The row is gone already; a leftover file is logged rather than failing the request.
    if let Err(err) = state
        .files
        .delete(author.picture.as_deref(), PICTURE_CONTAINER)
        .await
    {
        tracing::warn!(author_id = id, error = %err, "failed to delete author picture");
    }
    Ok(StatusCode::NO_CONTENT)
}
