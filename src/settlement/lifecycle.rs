//! Draw lifecycle manager: the state machine boundary between "accepting
//! contributions" and "settling".
//!
//! Status only ever moves forward: Pending → Running → Processing → Done.
//! Guard failures here are expected outcomes of a pass firing early, not
//! faults; the runner logs them and waits for the next cadence.

use crate::db::repo::{PromoteOutcome, StartOutcome};
use crate::db::Repository;
use crate::domain::{Draw, TimeMs};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No draw is currently running.
    #[error("no active draw")]
    NoActiveDraw,
    /// No pending draw ends today or tomorrow, or a draw is still running.
    #[error("no eligible draw to start")]
    NoEligibleDraw,
    /// The running draw's window end date is still in the future.
    #[error("draw window has not elapsed")]
    WindowNotElapsed,
    /// An earlier draw is still settling; promotion waits for it.
    #[error("previous draw still processing")]
    ProcessingBacklog,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl LifecycleError {
    /// Guard violations no-op the pass; database errors abort it.
    pub fn is_guard(&self) -> bool {
        !matches!(self, LifecycleError::Db(_))
    }
}

#[derive(Clone)]
pub struct LifecycleManager {
    repo: Arc<Repository>,
}

impl LifecycleManager {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Move the running draw to processing once its window end date is on
    /// or before today (UTC) and any prior settlement has completed. No
    /// write occurs on a guard failure.
    pub async fn finalize_current_draw(&self, now: TimeMs) -> Result<Draw, LifecycleError> {
        match self.repo.promote_running_to_processing(now).await? {
            PromoteOutcome::Promoted(draw) => {
                info!(draw_id = %draw.id, sequence = draw.sequence_number, "Draw moved to processing");
                Ok(draw)
            }
            PromoteOutcome::NoRunning => Err(LifecycleError::NoActiveDraw),
            PromoteOutcome::WindowOpen(_) => Err(LifecycleError::WindowNotElapsed),
            PromoteOutcome::ProcessingExists(_) => Err(LifecycleError::ProcessingBacklog),
        }
    }

    /// Start the lowest-sequence pending draw whose window ends today or
    /// tomorrow. Never succeeds while another draw is running.
    pub async fn start_next_draw(&self, now: TimeMs) -> Result<Draw, LifecycleError> {
        match self.repo.promote_next_pending_to_running(now).await? {
            StartOutcome::Started(draw) => {
                info!(draw_id = %draw.id, sequence = draw.sequence_number, "Draw started");
                Ok(draw)
            }
            StartOutcome::RunningExists(_) | StartOutcome::NoCandidate => {
                Err(LifecycleError::NoEligibleDraw)
            }
        }
    }

    /// Pre-materialize daily windows so that coverage extends `days` days
    /// past today. Sequence numbers continue from the stored maximum;
    /// re-running is idempotent.
    ///
    /// Returns the number of draws created.
    pub async fn ensure_upcoming_draws(
        &self,
        now: TimeMs,
        days: i64,
    ) -> Result<usize, LifecycleError> {
        let start_of_today = now
            .date_utc()
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();
        let coverage_target = start_of_today + days * DAY_MS;

        let mut window_start = match self.repo.latest_window_end().await? {
            Some(end) if end > start_of_today => end,
            _ => start_of_today,
        };
        let mut sequence = self.repo.max_sequence_number().await?.unwrap_or(0) + 1;

        let mut draws = Vec::new();
        while window_start < coverage_target {
            let window_end = window_start + DAY_MS;
            draws.push(Draw::pending(
                sequence,
                TimeMs::new(window_start),
                TimeMs::new(window_end),
            ));
            sequence += 1;
            window_start = window_end;
        }

        let created = self.repo.insert_draws_batch(&draws).await?;
        if created > 0 {
            info!(created, "Materialized upcoming draw windows");
        }
        Ok(created)
    }
}
