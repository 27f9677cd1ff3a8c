//! # Config API
//!
//! `PATCH` merges into the persisted file; the running server keeps its
//! config until restart. Validation sees `MATCHDECK_*` overrides, the saved
//! file never contains them.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use matchdeck_core::config::{ConfigPatch, MatchdeckConfig};

use super::{ApiError, ErrorResponse};
use crate::SharedState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    #[schema(value_type = Object)]
    pub config: MatchdeckConfig,
    pub restart_required: bool,
}

pub fn config_routes() -> Router<SharedState> {
    Router::new().route("/", get(get_config).patch(update_config))
}

/// Active configuration (API key omitted)
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Active configuration", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        config: state.config.clone(),
        restart_required: false,
    })
}

/// Merge a partial update into the persisted configuration
#[utoipa::path(
    patch,
    path = "/api/v1/config",
    tag = "config",
    request_body(content = Object, description = "Fields to change; omitted fields keep their saved value"),
    responses(
        (status = 200, description = "Saved configuration", body = ConfigResponse),
        (status = 409, description = "Existing config file is unreadable", body = ErrorResponse),
        (status = 422, description = "Merged configuration is invalid", body = ErrorResponse)
    )
)]
pub async fn update_config(
    State(state): State<SharedState>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let mut config = MatchdeckConfig::try_load_from(&state.config_path)
        .await
        .map_err(|e| ApiError::Conflict(format!("{:#}", e)))?;
    config.merge(patch);

    let mut effective = config.clone();
    effective.apply_env_from(|key| (state.env_lookup)(key));
    effective
        .validate()
        .map_err(|e| ApiError::Unprocessable(format!("{:#}", e)))?;
    config.save_to(&state.config_path).await?;
    tracing::info!("Saved config to {}", state.config_path.display());

    Ok(Json(ConfigResponse {
        config,
        restart_required: true,
    }))
}
