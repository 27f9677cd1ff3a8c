//! # Results API

use axum::{
    extract::{Path, RawQuery, State},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use matchdeck_core::error::FetchError;
use matchdeck_core::results::{parse_payload, ResultPage, ResultPageState, SubmitRejected};
use matchdeck_core::scan::Destination;

use super::{ApiError, ErrorResponse};
use crate::SharedState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    /// One of idle, analyzing, live, not_found, error
    pub status: String,
    #[schema(value_type = Object)]
    pub page: ResultPageState,
    /// Message carried in from a failed scan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_warning: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    pub startup_id: String,
    pub row_count: usize,
}

pub fn results_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_results))
        .route("/:startup_id", put(put_results))
}

/// Render the result page for a results destination
#[utoipa::path(
    get,
    path = "/api/v1/results",
    tag = "results",
    params(
        ("url" = String, Query, description = "URL as originally submitted"),
        ("startupId" = Option<String>, Query, description = "Resolved startup id"),
        ("reason" = Option<String>, Query, description = "Failure reason, e.g. scan_failed"),
        ("error" = Option<String>, Query, description = "Failure message from the scan")
    ),
    responses(
        (status = 200, description = "Settled page state", body = ResultsResponse),
        (status = 422, description = "Destination failed validation", body = ErrorResponse)
    )
)]
pub async fn get_results(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ResultsResponse>, ApiError> {
    let destination = Destination::from_query(query.as_deref().unwrap_or_default())?;

    let mut page = ResultPage::new();
    page.open(state.backends.fetcher.as_ref(), &destination)
        .await
        .map_err(|e| match e {
            SubmitRejected::Invalid(e) => ApiError::from(e),
            other => ApiError::Internal(other.to_string()),
        })?;

    Ok(Json(ResultsResponse {
        status: page.status().as_str().to_string(),
        scan_warning: page.scan_warning().map(str::to_string),
        page: page.state().clone(),
    }))
}

/// Store the results contract for a startup in the local store
#[utoipa::path(
    put,
    path = "/api/v1/results/{startup_id}",
    tag = "results",
    params(("startup_id" = String, Path, description = "Startup id")),
    responses(
        (status = 200, description = "Contract stored", body = StoredResponse),
        (status = 422, description = "Payload is not a valid contract", body = ErrorResponse)
    )
)]
pub async fn put_results(
    State(state): State<SharedState>,
    Path(startup_id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<StoredResponse>, ApiError> {
    let contract = match parse_payload(payload) {
        Ok(Some(contract)) => contract,
        Ok(None) => return Err(ApiError::Unprocessable("payload is empty".to_string())),
        Err(FetchError::Backend(message)) => return Err(ApiError::Unprocessable(message)),
        Err(e) => return Err(ApiError::Unprocessable(e.to_string())),
    };

    state.payloads.save(&startup_id, &contract)?;
    tracing::info!("Stored {} result rows for {}", contract.row_count(), startup_id);

    Ok(Json(StoredResponse {
        startup_id,
        row_count: contract.row_count(),
    }))
}
