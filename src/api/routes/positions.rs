//! Position API endpoints

use super::ErrorResponse;
use crate::api::server::AppState;
use crate::types::PositionView;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Positions response
#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub positions: Vec<PositionView>,
    pub total: usize,
}

/// List open positions
pub async fn list_positions(
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let positions = state.db.list_positions().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Database error: {}", e),
            }),
        )
    })?;

    let positions: Vec<PositionView> = positions.iter().map(PositionView::from).collect();
    let total = positions.len();

    Ok(Json(PositionsResponse { positions, total }))
}
