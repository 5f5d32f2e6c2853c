//! Liveness and manual trigger endpoints

use super::{ErrorResponse, OkResponse};
use crate::api::server::AppState;
use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};

/// Liveness check; touches nothing
pub async fn health() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

/// Run one discovery pass and respond when it has finished
pub async fn run_once(
    State(state): State<AppState>,
) -> Result<Json<OkResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("Manual discovery pass requested");

    match state.discovery.run_once().await {
        Ok(report) => {
            info!(
                "Manual pass: {} candidates, {} bought, {} failed",
                report.candidates, report.bought, report.failed
            );
            Ok(Json(OkResponse { ok: true }))
        }
        Err(e) => {
            error!("Manual discovery pass failed: {:#}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Discovery pass failed: {}", e),
                }),
            ))
        }
    }
}
