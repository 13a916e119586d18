//! Catalog HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and the helpers they share: total-count
//! headers, body validation, hypermedia set-up and post-commit cache eviction.
pub mod author_collection;
pub mod authors;
pub mod books;
pub mod comments;
pub mod error;
pub mod openapi;
pub mod root;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_validation_error, api_validation_fields};
use crate::app::AppState;
use crate::auth::principal::{Principal, is_privileged};
use crate::cache::CacheTag;
use crate::hypermedia::{Decorator, wants_hypermedia};
use crate::validation::validate_fields;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use validator::Validate;

/// Response header carrying the pre-pagination match count.
pub const TOTAL_QUANTITY_HEADER: &str = "total-quantity";

pub(crate) fn total_quantity(total: u64) -> [(HeaderName, HeaderValue); 1] {
    [(
        HeaderName::from_static(TOTAL_QUANTITY_HEADER),
        HeaderValue::from(total),
    )]
}

/// Unwrap a JSON body, mapping a missing or malformed document to 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected request body");
            Err(api_validation_error(&rejection.body_text()))
        }
    }
}

/// Run the body's validation rules, reporting every failing field.
pub(crate) fn validated<T: Validate>(input: T) -> Result<T, ApiError> {
    validate_fields(&input).map_err(api_validation_fields)?;
    Ok(input)
}

/// Decorator for this request, or `None` when the caller did not opt in.
///
/// The privilege check runs at most once per request.
pub(crate) async fn decorator_for<'a>(
    state: &'a AppState,
    headers: &HeaderMap,
    principal: Option<&Principal>,
) -> Option<Decorator<'a>> {
    if !wants_hypermedia(headers) {
        return None;
    }
    let privileged = is_privileged(state, principal).await;
    Some(Decorator::new(&state.links, privileged))
}

/// Evict cached reads for `tags`. Call only after the store commit succeeded.
pub(crate) async fn evict(state: &AppState, tags: &[CacheTag]) {
    for tag in tags {
        state.cache.evict_by_tag(*tag).await;
    }
}
