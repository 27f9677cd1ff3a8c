//! # Scan API
//!
//! Starts scan activations. `POST /scan` waits for the navigation decision;
//! `GET /scan/stream` streams the activation as Server-Sent Events and tears
//! it down when the client goes away.

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;

use matchdeck_core::scan::{Destination, NavigationDecision, ScanEvent, ScanEventKind, ScanOutcome};

use super::{ApiError, ErrorResponse};
use crate::SharedState;

/// Events buffered per streamed activation
const STREAM_BUFFER: usize = 32;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// URL as typed by the user
    pub url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StreamQuery {
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub scan_id: String,
    #[schema(value_type = Object)]
    pub outcome: ScanOutcome,
    #[schema(value_type = Object)]
    pub destination: Destination,
    /// `/results?...` path to navigate to
    pub navigate_to: String,
}

impl From<NavigationDecision> for ScanResponse {
    fn from(decision: NavigationDecision) -> Self {
        Self {
            navigate_to: decision.destination.to_path(),
            scan_id: decision.scan_id,
            outcome: decision.outcome,
            destination: decision.destination,
        }
    }
}

pub fn scan_routes() -> Router<SharedState> {
    Router::new()
        .route("/", post(start_scan))
        .route("/stream", get(scan_stream))
}

/// Run a scan to its navigation decision
#[utoipa::path(
    post,
    path = "/api/v1/scan",
    tag = "scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Navigation decision", body = ScanResponse),
        (status = 422, description = "URL failed validation", body = ErrorResponse)
    )
)]
pub async fn start_scan(
    State(state): State<SharedState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let decision = state.orchestrator.run(&req.url).await?;
    Ok(Json(decision.into()))
}

/// Stream a scan activation as Server-Sent Events
///
/// The stream ends after the `navigation_decided` event. Disconnecting
/// earlier tears the activation down.
#[utoipa::path(
    get,
    path = "/api/v1/scan/stream",
    tag = "scan",
    params(("url" = String, Query, description = "URL as typed by the user")),
    responses(
        (status = 200, description = "text/event-stream of scan events"),
        (status = 422, description = "URL failed validation", body = ErrorResponse)
    )
)]
pub async fn scan_stream(
    State(state): State<SharedState>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (tx, rx) = mpsc::channel::<ScanEvent>(STREAM_BUFFER);
    let handle = state.orchestrator.start_with_events(&query.url, Some(tx))?;
    tracing::debug!("Streaming scan {}", handle.scan_id());

    // The handle rides along with the stream until the final event, so a
    // client disconnect drops it and tears the activation down
    let stream = stream::unfold(
        (ReceiverStream::new(rx), Some(handle)),
        |(mut events, handle)| async move {
            let Some(handle) = handle else {
                return None;
            };
            let Some(event) = events.next().await else {
                return None;
            };
            let finished = matches!(
                event.kind,
                ScanEventKind::NavigationDecided | ScanEventKind::TornDown
            );
            let handle = (!finished).then_some(handle);
            Some((Ok::<_, Infallible>(to_sse(&event)), (events, handle)))
        },
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &ScanEvent) -> Event {
    let json = serde_json::to_string(event).unwrap_or_default();
    Event::default().event(event.name()).id(event.id.clone()).data(json)
}
