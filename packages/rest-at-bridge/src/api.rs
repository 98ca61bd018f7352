//! REST handlers over the bridge registry.
//!
//! Request handlers that receive REST-AT traffic resolve their bridge here;
//! the coordinator-facing participant resource lives under the configured
//! participant segment.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::bridge::{BridgeRegistry, InboundBridge};
use crate::config::ServiceConfig;
use crate::error::BridgeError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: BridgeRegistry,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(registry: BridgeRegistry, config: ServiceConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }
}

// ── Request / Response Types ─────────────────────────────────────────────────

/// POST /bridges
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBridgeRequest {
    pub transaction_url: String,
    /// Overrides the configured base URL for the participant URL.
    pub base_url: Option<String>,
}

/// `?transactionUrl=...`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub transaction_url: String,
}

/// GET /{segment}/:participant_id
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub participant_id: String,
    pub transaction_url: String,
}

/// Generic response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn success<T: Serialize>(
    status: StatusCode,
    data: Option<T>,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        status,
        Json(ApiResponse {
            ok: true,
            data,
            error: None,
        }),
    )
}

fn error_response<T: Serialize>(
    status: StatusCode,
    msg: &str,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        status,
        Json(ApiResponse {
            ok: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn status_for(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::BridgeNotFound(_) => StatusCode::NOT_FOUND,
        BridgeError::IdentifierRequired(_) => StatusCode::BAD_REQUEST,
        BridgeError::Conflict { .. } => StatusCode::CONFLICT,
        BridgeError::Enlistment(_) => StatusCode::BAD_GATEWAY,
        BridgeError::CreationInterrupted(_) => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::BranchAllocation(_) | BridgeError::StopFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn bridge_error<T: Serialize>(err: BridgeError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::warn!(error = %err, "[Api] Bridge operation failed");
    }
    error_response(status, &err.to_string())
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the router, mounting the participant resource under the
/// configured segment.
pub fn router(state: AppState) -> Router {
    let participant_path = format!("/{}/:participant_id", state.config.participant_segment);

    Router::new()
        .route(
            "/bridges",
            post(create_bridge).get(get_bridge).delete(delete_bridge),
        )
        .route(
            &participant_path,
            get(get_participant).delete(delete_participant),
        )
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /bridges — Get or create the bridge for a transaction.
///
/// 201 when this request created the bridge, 200 when it already existed.
pub async fn create_bridge(
    State(state): State<AppState>,
    Json(req): Json<CreateBridgeRequest>,
) -> impl IntoResponse {
    let base_url = req
        .base_url
        .unwrap_or_else(|| state.config.base_url.clone());

    match state
        .registry
        .ensure(&req.transaction_url, &base_url)
        .await
    {
        Ok((bridge, true)) => success(StatusCode::CREATED, Some(bridge)),
        Ok((bridge, false)) => success(StatusCode::OK, Some(bridge)),
        Err(e) => bridge_error(e),
    }
}

/// GET /bridges?transactionUrl= — Existing bridge, if any.
pub async fn get_bridge(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> impl IntoResponse {
    match state.registry.get(&query.transaction_url) {
        Ok(Some(bridge)) => success(StatusCode::OK, Some(bridge)),
        Ok(None) => error_response::<InboundBridge>(StatusCode::NOT_FOUND, "Bridge not found"),
        Err(e) => bridge_error(e),
    }
}

/// DELETE /bridges?transactionUrl= — Stop and remove a bridge.
pub async fn delete_bridge(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> impl IntoResponse {
    match state.registry.remove_by_transaction(&query.transaction_url) {
        Ok(()) => success::<()>(StatusCode::OK, None),
        Err(e) => bridge_error(e),
    }
}

/// GET /{segment}/:participant_id — Transaction owning a participant.
pub async fn get_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> impl IntoResponse {
    match state
        .registry
        .lookup_transaction_for_participant(&participant_id)
    {
        Ok(Some(transaction_url)) => success(
            StatusCode::OK,
            Some(ParticipantInfo {
                participant_id,
                transaction_url,
            }),
        ),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Participant not found"),
        Err(e) => bridge_error(e),
    }
}

/// DELETE /{segment}/:participant_id — Remove a bridge by participant id.
pub async fn delete_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.remove_by_participant(&participant_id) {
        Ok(()) => success::<()>(StatusCode::OK, None),
        Err(BridgeError::IdentifierRequired(_)) => {
            error_response(StatusCode::NOT_FOUND, "Participant not found")
        }
        Err(e) => bridge_error(e),
    }
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "rest-at-bridge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Statistics endpoint.
async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "bridges": state.registry.bridge_count(),
        "recoverable_participants": state.registry.recoverable_participants().len(),
        "timestamp": chrono::Utc::now().timestamp_millis(),
    }))
}
