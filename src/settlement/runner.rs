//! Pass runner: wires lifecycle, aggregation, prize computation, and
//! issuance into the two scheduled passes.

use crate::config::Config;
use crate::domain::{Decimal, DrawStatus, TimeMs};
use crate::settlement::{
    compute_schedule, Aggregator, DistributionEngine, LifecycleError, LifecycleManager,
    RetrySummary, SettlementError,
};
use tracing::{debug, info};

#[derive(Clone)]
pub struct SettlementRunner {
    lifecycle: LifecycleManager,
    aggregator: Aggregator,
    engine: DistributionEngine,
    config: Config,
}

impl SettlementRunner {
    pub fn new(
        lifecycle: LifecycleManager,
        aggregator: Aggregator,
        engine: DistributionEngine,
        config: Config,
    ) -> Self {
        Self {
            lifecycle,
            aggregator,
            engine,
            config,
        }
    }

    /// One settlement pass: finalize the current draw, start the next one,
    /// then settle whatever draw is in processing.
    ///
    /// Ordering is strict: the Running→Processing commit happens before
    /// aggregation reads the processing window, aggregation completes
    /// before issuance, and the done-stamp commits only after every
    /// issuance attempt is recorded. A crash mid-pass leaves the draw in
    /// processing for the next pass to pick up; no state is carried in
    /// memory between passes. While such a draw remains processing, the
    /// finalize guard refuses to promote the next one, so this pass settles
    /// the backlog first and promotion resumes on the following pass.
    pub async fn run_settlement_pass(&self, now: TimeMs) -> Result<(), SettlementError> {
        info!("Settlement pass starting");

        match self.lifecycle.finalize_current_draw(now).await {
            Ok(_) => {}
            Err(LifecycleError::Db(e)) => return Err(e.into()),
            Err(guard) => debug!(reason = %guard, "Finalize guard did not fire"),
        }

        match self.lifecycle.start_next_draw(now).await {
            Ok(_) => {}
            Err(LifecycleError::Db(e)) => return Err(e.into()),
            Err(guard) => debug!(reason = %guard, "No draw started"),
        }

        let Some(window) = self
            .aggregator
            .fetch_window_contributions(DrawStatus::Processing)
            .await?
        else {
            info!("Settlement pass complete: nothing to settle");
            return Ok(());
        };

        let totals = self.aggregator.aggregate(&window);
        let total_minor: i64 = totals.iter().map(|t| t.total).sum();
        let total = Decimal::from_minor_units(total_minor);

        match compute_schedule(
            &totals,
            total,
            self.config.top_prize_share,
            self.config.individual_prize_share,
        ) {
            None => {
                info!(draw_id = %window.draw.id, "Empty window, finalizing with zero total");
                self.engine
                    .finalize_draw(&window.draw.id, Decimal::zero(), self.config.payout_fee, None)
                    .await?;
            }
            Some(schedule) => {
                info!(
                    draw_id = %window.draw.id,
                    participants = schedule.payouts.len(),
                    winner = %schedule.winner,
                    total = %total,
                    "Issuing payouts"
                );
                self.engine
                    .issue_payouts(&schedule.payouts, &window.draw.id)
                    .await?;
                self.engine
                    .finalize_draw(
                        &window.draw.id,
                        total,
                        self.config.payout_fee,
                        Some(&schedule.winner),
                    )
                    .await?;
            }
        }

        info!("Settlement pass complete");
        Ok(())
    }

    /// One retry pass: re-attempt failed payouts under the retry ceiling.
    pub async fn run_retry_pass(&self) -> Result<RetrySummary, SettlementError> {
        let summary = self.engine.retry_pending().await?;
        if summary.attempted > 0 {
            info!(
                attempted = summary.attempted,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Retry pass complete"
            );
        }
        Ok(summary)
    }
}
