//! Author collection handlers: batch lookup by ids and bulk creation.
use crate::api::error::{ApiError, api_internal, api_not_found, api_validation_fields};
use crate::api::types::{AuthorInput, AuthorResponse, AuthorWithBooksResponse};
use crate::api::{evict, json_body};
use crate::app::AppState;
use crate::auth::principal::{authenticate, require_admin};
use crate::cache::CacheTag;
use crate::hypermedia::Route;
use crate::validation::{FieldErrors, single_field_error, validate_fields};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Distinct ids from a comma-separated list, in first-seen order. Segments
/// that are not integers are skipped.
pub(crate) fn parse_ids(raw: &str) -> Vec<i64> {
    let mut ids = Vec::new();
    for id in raw
        .split(',')
        .filter_map(|segment| segment.trim().parse::<i64>().ok())
    {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[utoipa::path(
    get,
    path = "/v1/author-collection/{ids}",
    tag = "authors",
    params(("ids" = String, Path, description = "Comma-separated author ids")),
    responses(
        (status = 200, description = "Requested authors in request order", body = [AuthorWithBooksResponse]),
        (status = 400, description = "No valid id supplied", body = crate::api::types::ErrorResponse),
        (status = 404, description = "At least one author is missing", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_authors_by_ids(
    Path(raw_ids): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<AuthorWithBooksResponse>>, ApiError> {
    authenticate(&state, &headers)?;
    let ids = parse_ids(&raw_ids);
    if ids.is_empty() {
        return Err(api_validation_fields(single_field_error(
            "ids",
            "no valid id was found",
        )));
    }
    let records = state
        .store
        .author_records_by_ids(&ids)
        .await
        .map_err(|err| api_internal("failed to load authors", &err))?;
    if records.len() != ids.len() {
        return Err(api_not_found("one or more authors were not found"));
    }
    Ok(Json(
        records
            .into_iter()
            .map(AuthorWithBooksResponse::from)
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/author-collection",
    tag = "authors",
    request_body = [AuthorInput],
    responses(
        (status = 201, description = "Authors created", body = [AuthorResponse]),
        (status = 400, description = "Invalid authors; fields are keyed by list index", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Admin required", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_authors(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Vec<AuthorInput>>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers).await?;
    let inputs = json_body(body)?;
    if inputs.is_empty() {
        return Err(api_validation_fields(single_field_error(
            "authors",
            "at least one author is required",
        )));
    }
    let mut errors = FieldErrors::new();
    for (index, input) in inputs.iter().enumerate() {
        if let Err(fields) = validate_fields(input) {
            errors.extend(
                fields
                    .into_iter()
                    .map(|(field, messages)| (format!("[{index}].{field}"), messages)),
            );
        }
    }
    if !errors.is_empty() {
        return Err(api_validation_fields(errors));
    }

    let drafts = inputs
        .into_iter()
        .map(|input| input.into_draft(None))
        .collect();
    let authors = state
        .store
        .create_authors(drafts)
        .await
        .map_err(|err| api_internal("failed to create authors", &err))?;
    evict(&state, &[CacheTag::Authors, CacheTag::Books]).await;
    tracing::info!(count = authors.len() as u64, "authors created");

    let ids = authors
        .iter()
        .map(|author| author.id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let location = format!("{}/{ids}", state.links.resolve(Route::AuthorCollection));
    let body: Vec<AuthorResponse> = authors.into_iter().map(AuthorResponse::from).collect();
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_skips_garbage_and_duplicates() {
        assert_eq!(parse_ids("3, 1,x,3,,2"), vec![3, 1, 2]);
        assert!(parse_ids("a,b").is_empty());
    }
}
