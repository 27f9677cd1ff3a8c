//! # Shared Views API
//!
//! Read-only snapshots by share token; the only write is appending a comment.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use matchdeck_core::state::{ShareComment, SharedEntity, SharedList};

use super::{ApiError, ErrorResponse};
use crate::SharedState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    pub display_name: String,
    #[schema(value_type = Vec<Object>)]
    pub entities: Vec<SharedEntity>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentRequest {
    #[serde(default)]
    pub author: String,
    pub body: String,
}

pub fn share_routes() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_share))
        .route("/:token", get(get_share))
        .route("/:token/comments", post(add_comment))
}

/// Snapshot a list of entities under a new share token
#[utoipa::path(
    post,
    path = "/api/v1/share",
    tag = "share",
    request_body = CreateShareRequest,
    responses(
        (status = 201, description = "Shared list created"),
        (status = 422, description = "Display name is empty", body = ErrorResponse)
    )
)]
pub async fn create_share(
    State(state): State<SharedState>,
    Json(req): Json<CreateShareRequest>,
) -> Result<(StatusCode, Json<SharedList>), ApiError> {
    let name = req.display_name.trim();
    if name.is_empty() {
        return Err(ApiError::Unprocessable("displayName is required".to_string()));
    }
    let list = state.shares.create(name, &req.entities)?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// Look up a shared list by token
#[utoipa::path(
    get,
    path = "/api/v1/share/{token}",
    tag = "share",
    params(("token" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "Shared list with comments"),
        (status = 404, description = "Unknown token", body = ErrorResponse)
    )
)]
pub async fn get_share(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<SharedList>, ApiError> {
    match state.shares.lookup(&token)? {
        Some(list) => Ok(Json(list)),
        None => Err(ApiError::NotFound(format!("no shared list for token '{}'", token))),
    }
}

/// Append a comment to a shared list
#[utoipa::path(
    post,
    path = "/api/v1/share/{token}/comments",
    tag = "share",
    params(("token" = String, Path, description = "Share token")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment appended"),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 422, description = "Empty or oversized comment", body = ErrorResponse)
    )
)]
pub async fn add_comment(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<ShareComment>), ApiError> {
    let comment = state.shares.append_comment(&token, &req.author, &req.body)?;
    Ok((StatusCode::CREATED, Json(comment)))
}
