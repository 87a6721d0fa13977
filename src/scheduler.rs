//! Time-driven triggers for the settlement and retry passes.
//!
//! Two independent interval loops: a slow settlement cadence and a faster
//! retry cadence. The passes share no in-memory state; each reads fresh
//! rows from the store, so concurrent firings are safe at the row level.

use crate::domain::TimeMs;
use crate::settlement::SettlementRunner;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::error;

/// Spawn the two pass loops. The first tick of each interval fires
/// immediately, which doubles as crash recovery on startup: a draw left in
/// processing is settled on the first settlement pass.
pub fn spawn(
    runner: Arc<SettlementRunner>,
    settlement_interval: Duration,
    retry_interval: Duration,
) -> (JoinHandle<()>, JoinHandle<()>) {
    let settlement_runner = runner.clone();
    let settlement_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(settlement_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = settlement_runner.run_settlement_pass(TimeMs::now()).await {
                error!(error = %e, "Settlement pass aborted");
            }
        }
    });

    let retry_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(retry_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = runner.run_retry_pass().await {
                error!(error = %e, "Retry pass aborted");
            }
        }
    });

    (settlement_handle, retry_handle)
}
