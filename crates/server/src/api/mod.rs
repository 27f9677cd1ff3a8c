//! # HTTP API
//!
//! Routes under `/api/v1`, grouped by concern.

pub mod config;
pub mod results;
pub mod scan;
pub mod share;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use matchdeck_core::error::ValidationError;
use matchdeck_core::state::ShareError;

use crate::SharedState;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures a handler can report
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            Self::BadRequest(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Unprocessable(m) => m,
            Self::Internal(m) => {
                tracing::error!("Request failed: {}", m);
                m
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Unprocessable(e.to_string())
    }
}

impl From<ShareError> for ApiError {
    fn from(e: ShareError) -> Self {
        match e {
            ShareError::InvalidToken(_) => Self::BadRequest(e.to_string()),
            ShareError::NotFound(_) => Self::NotFound(e.to_string()),
            ShareError::InvalidComment => Self::Unprocessable(e.to_string()),
            ShareError::Storage(inner) => Self::Internal(format!("{:#}", inner)),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", e))
    }
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .nest("/config", config::config_routes())
        .nest("/scan", scan::scan_routes())
        .nest("/results", results::results_routes())
        .nest("/share", share::share_routes())
}
