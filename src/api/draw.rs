use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::DrawStatus;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentDrawResponse {
    pub sequence_number: i64,
    pub window_start_ms: i64,
    pub window_end_ms: i64,
}

/// The unique running draw's window. No running draw is a server error,
/// not an empty body.
pub async fn get_current_draw(
    State(state): State<AppState>,
) -> Result<Json<CurrentDrawResponse>, AppError> {
    let draw = state
        .repo
        .get_draw_by_status(DrawStatus::Running)
        .await?
        .ok_or_else(|| AppError::Internal("no active draw".to_string()))?;

    Ok(Json(CurrentDrawResponse {
        sequence_number: draw.sequence_number,
        window_start_ms: draw.window_start.as_i64(),
        window_end_ms: draw.window_end.as_i64(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAddressResponse {
    pub address: String,
}

/// The stable collection address contributions are sent to.
pub async fn get_deposit_address(
    State(state): State<AppState>,
) -> Result<Json<DepositAddressResponse>, AppError> {
    Ok(Json(DepositAddressResponse {
        address: state.config.collection_address.clone(),
    }))
}
