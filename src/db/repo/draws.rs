//! Draw row operations and guarded status transitions.
//!
//! The two promote operations run as single transactions: select candidate,
//! re-check the guard with a status predicate on the UPDATE, commit. A
//! concurrent scheduler firing therefore cannot promote the same draw
//! twice; the loser sees zero rows affected and reports no candidate.

use super::{draw_from_row, Repository};
use crate::domain::{Decimal, Draw, DrawStatus, Identity, TimeMs};
use sqlx::Row;

const DAY_MS: i64 = 86_400_000;

/// Outcome of attempting to move the running draw to processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoteOutcome {
    /// The running draw is now processing.
    Promoted(Draw),
    /// No draw is currently running.
    NoRunning,
    /// The running draw's window has not elapsed yet; nothing written.
    WindowOpen(Draw),
    /// An earlier draw has not finished settling; nothing written.
    ProcessingExists(Draw),
}

/// Outcome of attempting to start the next pending draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The pending draw is now running.
    Started(Draw),
    /// A draw is still running; nothing written.
    RunningExists(Draw),
    /// No pending draw ends today or tomorrow.
    NoCandidate,
}

/// First instant (ms) of the UTC day `now` falls on.
fn start_of_today_ms(now: TimeMs) -> i64 {
    now.date_utc()
        .and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .timestamp_millis()
}

impl Repository {
    /// Insert a draw, ignoring duplicates on sequence_number.
    ///
    /// Returns true if a row was written.
    pub async fn insert_draw(&self, draw: &Draw) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO draws
            (id, sequence_number, window_start_ms, window_end_ms, status,
             total_collected, fee_rate, winner, created_at_ms, updated_at_ms)
            VALUES (?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?)
            ON CONFLICT(sequence_number) DO NOTHING
            "#,
        )
        .bind(&draw.id)
        .bind(draw.sequence_number)
        .bind(draw.window_start.as_i64())
        .bind(draw.window_end.as_i64())
        .bind(draw.status.as_str())
        .bind(draw.created_at.as_i64())
        .bind(draw.updated_at.as_i64())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a batch of pre-materialized draws in one transaction.
    ///
    /// Returns the number of newly inserted rows (excludes duplicates).
    pub async fn insert_draws_batch(&self, draws: &[Draw]) -> Result<usize, sqlx::Error> {
        if draws.is_empty() {
            return Ok(0);
        }

        let mut total_inserted = 0usize;
        let mut tx = self.pool().begin().await?;

        for draw in draws {
            let result = sqlx::query(
                r#"
                INSERT INTO draws
                (id, sequence_number, window_start_ms, window_end_ms, status,
                 total_collected, fee_rate, winner, created_at_ms, updated_at_ms)
                VALUES (?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?)
                ON CONFLICT(sequence_number) DO NOTHING
                "#,
            )
            .bind(&draw.id)
            .bind(draw.sequence_number)
            .bind(draw.window_start.as_i64())
            .bind(draw.window_end.as_i64())
            .bind(draw.status.as_str())
            .bind(draw.created_at.as_i64())
            .bind(draw.updated_at.as_i64())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                total_inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    /// Fetch the single draw in `status`, if any.
    ///
    /// The lifecycle invariant keeps running and processing unique; the
    /// lowest sequence number wins if the invariant is ever violated.
    pub async fn get_draw_by_status(
        &self,
        status: DrawStatus,
    ) -> Result<Option<Draw>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT * FROM draws
            WHERE status = ?
            ORDER BY sequence_number ASC
            LIMIT 1
            "#,
        )
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(draw_from_row))
    }

    pub async fn get_draw_by_id(&self, id: &str) -> Result<Option<Draw>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM draws WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.as_ref().map(draw_from_row))
    }

    /// Highest sequence number present, None for an empty table.
    pub async fn max_sequence_number(&self) -> Result<Option<i64>, sqlx::Error> {
        let row = sqlx::query("SELECT MAX(sequence_number) as max_seq FROM draws")
            .fetch_one(self.pool())
            .await?;

        Ok(row.get::<Option<i64>, _>("max_seq"))
    }

    /// Latest window end across all draws, None for an empty table.
    pub async fn latest_window_end(&self) -> Result<Option<i64>, sqlx::Error> {
        let row = sqlx::query("SELECT MAX(window_end_ms) as max_end FROM draws")
            .fetch_one(self.pool())
            .await?;

        Ok(row.get::<Option<i64>, _>("max_end"))
    }

    pub async fn count_draws_by_status(&self, status: DrawStatus) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM draws WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(self.pool())
            .await?;

        Ok(row.get("n"))
    }

    /// Move the running draw to processing if its window end date is on or
    /// before today (UTC) and no other draw is still processing. No write
    /// occurs on a guard failure.
    ///
    /// The processing check keeps the "at most one processing" invariant
    /// across aborted passes: a draw stuck in processing blocks further
    /// promotion until it settles.
    pub async fn promote_running_to_processing(
        &self,
        now: TimeMs,
    ) -> Result<PromoteOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let processing = sqlx::query("SELECT * FROM draws WHERE status = 'processing' LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(row) = processing {
            let draw = draw_from_row(&row);
            tx.rollback().await?;
            return Ok(PromoteOutcome::ProcessingExists(draw));
        }

        let row = sqlx::query("SELECT * FROM draws WHERE status = 'running' LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(PromoteOutcome::NoRunning);
        };
        let draw = draw_from_row(&row);

        // Window end date must be <= today, i.e. strictly before tomorrow.
        let start_of_tomorrow = start_of_today_ms(now) + DAY_MS;
        if draw.window_end.as_i64() >= start_of_tomorrow {
            tx.rollback().await?;
            return Ok(PromoteOutcome::WindowOpen(draw));
        }

        let updated_at = TimeMs::now();
        let result = sqlx::query(
            r#"
            UPDATE draws SET status = 'processing', updated_at_ms = ?
            WHERE id = ? AND status = 'running'
            "#,
        )
        .bind(updated_at.as_i64())
        .bind(&draw.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Lost a race with a concurrent pass.
            tx.rollback().await?;
            return Ok(PromoteOutcome::NoRunning);
        }

        tx.commit().await?;
        Ok(PromoteOutcome::Promoted(Draw {
            status: DrawStatus::Processing,
            updated_at,
            ..draw
        }))
    }

    /// Start the lowest-sequence pending draw whose window ends today or
    /// tomorrow (UTC). Fails without writing while a draw is still running.
    pub async fn promote_next_pending_to_running(
        &self,
        now: TimeMs,
    ) -> Result<StartOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let running = sqlx::query("SELECT * FROM draws WHERE status = 'running' LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(row) = running {
            let draw = draw_from_row(&row);
            tx.rollback().await?;
            return Ok(StartOutcome::RunningExists(draw));
        }

        let start_of_today = start_of_today_ms(now);
        let end_of_tomorrow = start_of_today + 2 * DAY_MS;

        let row = sqlx::query(
            r#"
            SELECT * FROM draws
            WHERE status = 'pending' AND window_end_ms >= ? AND window_end_ms < ?
            ORDER BY sequence_number ASC
            LIMIT 1
            "#,
        )
        .bind(start_of_today)
        .bind(end_of_tomorrow)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(StartOutcome::NoCandidate);
        };
        let draw = draw_from_row(&row);

        let updated_at = TimeMs::now();
        let result = sqlx::query(
            r#"
            UPDATE draws SET status = 'running', updated_at_ms = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(updated_at.as_i64())
        .bind(&draw.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(StartOutcome::NoCandidate);
        }

        tx.commit().await?;
        Ok(StartOutcome::Started(Draw {
            status: DrawStatus::Running,
            updated_at,
            ..draw
        }))
    }

    /// Stamp a processing draw as done with its settlement totals. This is
    /// the single commit point making the settlement externally visible.
    ///
    /// Returns false (no write) if the draw is not in processing.
    pub async fn finalize_draw(
        &self,
        draw_id: &str,
        total_collected: Decimal,
        fee_rate: Decimal,
        winner: Option<&Identity>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE draws
            SET status = 'done', total_collected = ?, fee_rate = ?, winner = ?, updated_at_ms = ?
            WHERE id = ? AND status = 'processing'
            "#,
        )
        .bind(total_collected.to_canonical_string())
        .bind(fee_rate.to_canonical_string())
        .bind(winner.map(|w| w.as_str().to_string()))
        .bind(TimeMs::now().as_i64())
        .bind(draw_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::*;

    // 2024-01-15T00:00:00Z
    const DAY_START: i64 = 1_705_276_800_000;

    fn make_draw(seq: i64, start: i64, end: i64) -> Draw {
        Draw::pending(seq, TimeMs::new(start), TimeMs::new(end))
    }

    fn noon(day_start: i64) -> TimeMs {
        TimeMs::new(day_start + DAY_MS / 2)
    }

    #[tokio::test]
    async fn test_insert_draw_dedups_on_sequence() {
        let (repo, _temp) = setup_test_db().await;
        let draw = make_draw(1, DAY_START, DAY_START + DAY_MS);
        assert!(repo.insert_draw(&draw).await.unwrap());

        let dup = make_draw(1, DAY_START + DAY_MS, DAY_START + 2 * DAY_MS);
        assert!(!repo.insert_draw(&dup).await.unwrap());
    }

    #[tokio::test]
    async fn test_start_next_picks_lowest_sequence_in_reach() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_draws_batch(&[
            make_draw(2, DAY_START + DAY_MS, DAY_START + 2 * DAY_MS),
            make_draw(1, DAY_START, DAY_START + DAY_MS),
            make_draw(3, DAY_START + 5 * DAY_MS, DAY_START + 6 * DAY_MS),
        ])
        .await
        .unwrap();

        let outcome = repo
            .promote_next_pending_to_running(noon(DAY_START))
            .await
            .unwrap();
        match outcome {
            StartOutcome::Started(draw) => assert_eq!(draw.sequence_number, 1),
            other => panic!("expected Started, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_next_refuses_while_running() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_draws_batch(&[
            make_draw(1, DAY_START, DAY_START + DAY_MS),
            make_draw(2, DAY_START + DAY_MS, DAY_START + 2 * DAY_MS),
        ])
        .await
        .unwrap();

        repo.promote_next_pending_to_running(noon(DAY_START))
            .await
            .unwrap();
        let outcome = repo
            .promote_next_pending_to_running(noon(DAY_START))
            .await
            .unwrap();
        assert!(matches!(outcome, StartOutcome::RunningExists(_)));
        assert_eq!(
            repo.count_draws_by_status(DrawStatus::Running).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_start_next_ignores_far_future_windows() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_draw(&make_draw(1, DAY_START + 5 * DAY_MS, DAY_START + 6 * DAY_MS))
            .await
            .unwrap();

        let outcome = repo
            .promote_next_pending_to_running(noon(DAY_START))
            .await
            .unwrap();
        assert!(matches!(outcome, StartOutcome::NoCandidate));
    }

    #[tokio::test]
    async fn test_promote_running_guards_open_window() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_draw(&make_draw(1, DAY_START, DAY_START + DAY_MS))
            .await
            .unwrap();
        repo.promote_next_pending_to_running(noon(DAY_START))
            .await
            .unwrap();

        // Still mid-window: window ends tomorrow, guard must hold.
        let outcome = repo
            .promote_running_to_processing(noon(DAY_START))
            .await
            .unwrap();
        assert!(matches!(outcome, PromoteOutcome::WindowOpen(_)));

        // The next day the window end date is "today": promote succeeds.
        let outcome = repo
            .promote_running_to_processing(noon(DAY_START + DAY_MS))
            .await
            .unwrap();
        match outcome {
            PromoteOutcome::Promoted(draw) => {
                assert_eq!(draw.status, DrawStatus::Processing)
            }
            other => panic!("expected Promoted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_promote_refused_while_prior_draw_processing() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_draws_batch(&[
            make_draw(1, DAY_START, DAY_START + DAY_MS),
            make_draw(2, DAY_START + DAY_MS, DAY_START + 2 * DAY_MS),
        ])
        .await
        .unwrap();

        // Draw 1 reaches processing but never settles; draw 2 starts.
        repo.promote_next_pending_to_running(noon(DAY_START))
            .await
            .unwrap();
        repo.promote_running_to_processing(noon(DAY_START + DAY_MS))
            .await
            .unwrap();
        repo.promote_next_pending_to_running(noon(DAY_START + DAY_MS))
            .await
            .unwrap();

        // Draw 2's window has elapsed too, but promotion must wait.
        let outcome = repo
            .promote_running_to_processing(noon(DAY_START + 2 * DAY_MS))
            .await
            .unwrap();
        match outcome {
            PromoteOutcome::ProcessingExists(draw) => assert_eq!(draw.sequence_number, 1),
            other => panic!("expected ProcessingExists, got {:?}", other),
        }
        assert_eq!(
            repo.count_draws_by_status(DrawStatus::Processing)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_promote_running_without_running_draw() {
        let (repo, _temp) = setup_test_db().await;
        let outcome = repo
            .promote_running_to_processing(noon(DAY_START))
            .await
            .unwrap();
        assert!(matches!(outcome, PromoteOutcome::NoRunning));
    }

    #[tokio::test]
    async fn test_finalize_draw_requires_processing() {
        let (repo, _temp) = setup_test_db().await;
        let draw = make_draw(1, DAY_START, DAY_START + DAY_MS);
        repo.insert_draw(&draw).await.unwrap();

        let total = Decimal::from_str_canonical("10").unwrap();
        let fee = Decimal::from_str_canonical("0.05").unwrap();
        // Pending draw: finalize is a no-op.
        assert!(!repo.finalize_draw(&draw.id, total, fee, None).await.unwrap());

        repo.promote_next_pending_to_running(noon(DAY_START))
            .await
            .unwrap();
        repo.promote_running_to_processing(noon(DAY_START + DAY_MS))
            .await
            .unwrap();

        let winner = Identity::new("EQwinner".to_string());
        assert!(repo
            .finalize_draw(&draw.id, total, fee, Some(&winner))
            .await
            .unwrap());

        let stored = repo.get_draw_by_id(&draw.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DrawStatus::Done);
        assert_eq!(stored.total_collected, Some(total));
        assert_eq!(stored.winner, Some(winner));

        // Done is terminal: a second finalize writes nothing.
        assert!(!repo.finalize_draw(&draw.id, total, fee, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_max_sequence_and_latest_window_end() {
        let (repo, _temp) = setup_test_db().await;
        assert_eq!(repo.max_sequence_number().await.unwrap(), None);

        repo.insert_draws_batch(&[
            make_draw(1, DAY_START, DAY_START + DAY_MS),
            make_draw(2, DAY_START + DAY_MS, DAY_START + 2 * DAY_MS),
        ])
        .await
        .unwrap();

        assert_eq!(repo.max_sequence_number().await.unwrap(), Some(2));
        assert_eq!(
            repo.latest_window_end().await.unwrap(),
            Some(DAY_START + 2 * DAY_MS)
        );
    }
}
