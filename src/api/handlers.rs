//! Request Handlers

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::{
    games::{settlement::SettlementEngine, types::{PlayerId, RawPlayRequest}},
    ledger::{LedgerRepository, Reconciliation},
    metrics::SettlementMetrics,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared application state
pub struct AppState {
    pub engine: Arc<SettlementEngine>,
    /// Same ledger the engine settles against; used by the debug routes
    pub ledger: Arc<dyn LedgerRepository>,
    pub metrics: Option<SettlementMetrics>,
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/tuplaus
pub async fn play_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawPlayRequest>, JsonRejection>,
) -> Result<Json<PlayResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(request_id = %request_id.0, "Undecodable play request: {}", rejection);
        ApiError::bad_request(request_id.0.clone(), rejection.body_text())
    })?;

    let outcome = state
        .engine
        .settle(&request)
        .await
        .map_err(|e| ApiError::from_settlement(request_id.0.clone(), e))?;

    Ok(Json(PlayResponse::from(outcome)))
}

/// GET /metrics
pub async fn metrics_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let metrics = state.metrics.as_ref().ok_or_else(|| {
        ApiError::service_unavailable(request_id.0.clone(), "Metrics are disabled".to_string())
    })?;

    let body = metrics
        .encode()
        .map_err(|e| ApiError::internal_error(request_id.0.clone(), format!("Failed to encode metrics: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

/// POST /api/debug/addPlayer
pub async fn add_player_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddPlayerRequest>, JsonRejection>,
) -> Result<Json<AddPlayerResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(request_id.0.clone(), rejection.body_text()))?;

    let player = state
        .ledger
        .create_player(request.player)
        .await
        .map_err(|e| ApiError::from_ledger(request_id.0.clone(), e))?;

    debug!(player_id = %player.id, balance = %player.balance, "Player added");
    Ok(Json(AddPlayerResponse {
        player: player.into(),
    }))
}

/// GET /api/debug/everything
pub async fn everything_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<EverythingResponse>, ApiError> {
    let players = state
        .ledger
        .list_players()
        .await
        .map_err(|e| ApiError::from_ledger(request_id.0.clone(), e))?;
    let events = state
        .ledger
        .list_events()
        .await
        .map_err(|e| ApiError::from_ledger(request_id.0.clone(), e))?;

    Ok(Json(EverythingResponse {
        everything: Everything {
            players: players.into_iter().map(PlayerView::from).collect(),
            events: events.into_iter().map(EventView::from).collect(),
        },
    }))
}

/// DELETE /api/debug/everything
pub async fn delete_everything_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state
        .ledger
        .clear()
        .await
        .map_err(|e| ApiError::from_ledger(request_id.0.clone(), e))?;

    warn!(request_id = %request_id.0, "Ledger cleared through debug route");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/debug/reconcile/:player_id
pub async fn reconcile_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> Result<Json<Reconciliation>, ApiError> {
    let report = state
        .ledger
        .reconcile(PlayerId(player_id))
        .await
        .map_err(|e| ApiError::from_ledger(request_id.0.clone(), e))?;

    if !report.is_balanced() {
        warn!(
            player_id,
            expected = %report.expected_balance,
            stored = %report.stored_balance,
            "Ledger out of balance"
        );
    }
    Ok(Json(report))
}
