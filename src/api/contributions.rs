use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::DrawStatus;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDto {
    pub sender: String,
    pub amount: i64,
    pub time_ms: i64,
    pub tx_hash: String,
}

/// Filtered contribution transfers for the active window, for leaderboard
/// rendering. An empty array is a valid response (no running draw, or no
/// contributions yet); ledger fetch failures surface as a server error.
pub async fn get_contributions(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContributionDto>>, AppError> {
    let transfers = state
        .aggregator
        .filtered_window_transfers(DrawStatus::Running)
        .await?;

    let contributions = transfers
        .into_iter()
        .map(|t| ContributionDto {
            sender: t.sender.as_str().to_string(),
            amount: t.amount,
            time_ms: t.time_ms.as_i64(),
            tx_hash: t.tx_hash.as_str().to_string(),
        })
        .collect();

    Ok(Json(contributions))
}
