//! API entry point listing the links available to the caller.
use crate::api::error::ApiError;
use crate::app::AppState;
use crate::auth::principal::{authenticate, is_privileged};
use crate::hypermedia::{Link, root_links};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    get,
    path = "/v1",
    tag = "system",
    responses(
        (status = 200, description = "Entry links for the caller", body = [Link]),
        (status = 401, description = "Invalid token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_root(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Link>>, ApiError> {
    let principal = authenticate(&state, &headers)?;
    let privileged = is_privileged(&state, principal.as_ref()).await;
    Ok(Json(root_links(&state.links, privileged)))
}
