//! Distribution engine: idempotent payout issuance and the bounded retry
//! sweep.
//!
//! Issuance is deliberately serialized with a fixed delay between outbound
//! submissions: the ledger gateway signs everything with one identity and
//! does not tolerate rapid concurrent submissions from it. Do not turn this
//! loop into concurrent dispatch.

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{Decimal, Distribution, Identity, TimeMs, STATUS_ERROR};
use crate::ledger::LedgerClient;
use crate::settlement::{PayoutItem, SettlementError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The recorded result of one issuance attempt (or skip) for a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceOutcome {
    pub recipient: Identity,
    pub amount: Decimal,
    pub status: String,
    pub error: Option<String>,
    /// True when a row with this idempotency key already existed and no
    /// submission was attempted.
    pub skipped: bool,
}

/// Counts from one retry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetrySummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct DistributionEngine {
    ledger: Arc<dyn LedgerClient>,
    repo: Arc<Repository>,
    config: Config,
}

impl DistributionEngine {
    pub fn new(ledger: Arc<dyn LedgerClient>, repo: Arc<Repository>, config: Config) -> Self {
        Self {
            ledger,
            repo,
            config,
        }
    }

    /// Issue the scheduled payouts for a draw, recipient by recipient.
    ///
    /// For each payout the idempotency key (draw_id, recipient, amount) is
    /// checked first; an existing row skips the recipient entirely. Both
    /// successful and failed submissions are recorded as distribution rows;
    /// failures are data here, never errors - the batch always runs to the
    /// end. Returns every outcome, skips included.
    pub async fn issue_payouts(
        &self,
        payouts: &[PayoutItem],
        draw_id: &str,
    ) -> Result<Vec<IssuanceOutcome>, SettlementError> {
        let mut outcomes = Vec::with_capacity(payouts.len());
        let mut submitted_any = false;

        for item in payouts {
            // Rounded once here; the stored key and the submitted amount
            // must be the same value.
            let amount = item.amount.rounded();

            if let Some(existing) = self
                .repo
                .find_distribution(draw_id, &item.recipient, amount)
                .await?
            {
                debug!(
                    draw_id = %draw_id,
                    recipient = %item.recipient,
                    "Distribution already recorded, skipping issuance"
                );
                outcomes.push(IssuanceOutcome {
                    recipient: item.recipient.clone(),
                    amount,
                    status: existing.status,
                    error: existing.error_message,
                    skipped: true,
                });
                continue;
            }

            if submitted_any && self.config.payout_spacing_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.payout_spacing_ms)).await;
            }
            submitted_any = true;

            let result = self
                .ledger
                .submit_transfer(
                    item.recipient.as_str(),
                    amount.to_minor_units(),
                    self.config.payout_fee.to_minor_units(),
                )
                .await;

            let now = TimeMs::now();
            let distribution = match result {
                Ok(receipt) => {
                    info!(
                        draw_id = %draw_id,
                        recipient = %item.recipient,
                        amount = %amount,
                        tx_hash = %receipt.tx_hash,
                        "Payout issued"
                    );
                    Distribution {
                        id: uuid::Uuid::new_v4().to_string(),
                        draw_id: draw_id.to_string(),
                        recipient: item.recipient.clone(),
                        prize_amount: amount,
                        fee_paid: self.config.payout_fee,
                        status: receipt.status,
                        tx_hash: Some(receipt.tx_hash),
                        retry_count: 0,
                        error_message: None,
                        transaction_at: Some(receipt.time_ms),
                        created_at: now,
                        updated_at: now,
                    }
                }
                Err(e) => {
                    warn!(
                        draw_id = %draw_id,
                        recipient = %item.recipient,
                        amount = %amount,
                        error = %e,
                        "Payout failed, recorded for retry"
                    );
                    Distribution {
                        id: uuid::Uuid::new_v4().to_string(),
                        draw_id: draw_id.to_string(),
                        recipient: item.recipient.clone(),
                        prize_amount: amount,
                        fee_paid: self.config.payout_fee,
                        status: STATUS_ERROR.to_string(),
                        tx_hash: None,
                        retry_count: 0,
                        error_message: Some(e.to_string()),
                        transaction_at: None,
                        created_at: now,
                        updated_at: now,
                    }
                }
            };

            self.repo.insert_distribution(&distribution).await?;
            outcomes.push(IssuanceOutcome {
                recipient: distribution.recipient,
                amount,
                status: distribution.status,
                error: distribution.error_message,
                skipped: false,
            });
        }

        Ok(outcomes)
    }

    /// Stamp the draw done with its settlement totals, after all issuance
    /// attempts for it have been recorded.
    pub async fn finalize_draw(
        &self,
        draw_id: &str,
        total_collected: Decimal,
        fee_rate: Decimal,
        winner: Option<&Identity>,
    ) -> Result<(), SettlementError> {
        let stamped = self
            .repo
            .finalize_draw(draw_id, total_collected, fee_rate, winner)
            .await?;

        if stamped {
            info!(draw_id = %draw_id, total = %total_collected, "Draw finalized");
        } else {
            warn!(draw_id = %draw_id, "Finalize skipped: draw is not in processing");
        }
        Ok(())
    }

    /// Re-attempt failed distributions still under the retry ceiling,
    /// re-submitting the exact recorded (recipient, amount, fee). Rows past
    /// the ceiling are not selected and only surface through logs.
    pub async fn retry_pending(&self) -> Result<RetrySummary, SettlementError> {
        let retryable = self
            .repo
            .list_retryable_distributions(self.config.max_payout_retries)
            .await?;

        let mut summary = RetrySummary::default();

        for (i, dist) in retryable.iter().enumerate() {
            if i > 0 && self.config.payout_spacing_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.payout_spacing_ms)).await;
            }

            summary.attempted += 1;
            let next_retry_count = dist.retry_count + 1;

            match self
                .ledger
                .submit_transfer(
                    dist.recipient.as_str(),
                    dist.prize_amount.to_minor_units(),
                    dist.fee_paid.to_minor_units(),
                )
                .await
            {
                Ok(receipt) => {
                    info!(
                        distribution_id = %dist.id,
                        recipient = %dist.recipient,
                        retry_count = next_retry_count,
                        "Retried payout succeeded"
                    );
                    self.repo
                        .update_distribution_attempt(
                            &dist.id,
                            &receipt.status,
                            Some(&receipt.tx_hash),
                            Some(receipt.time_ms),
                            next_retry_count,
                            None,
                        )
                        .await?;
                    summary.succeeded += 1;
                }
                Err(e) => {
                    self.repo
                        .update_distribution_attempt(
                            &dist.id,
                            STATUS_ERROR,
                            None,
                            None,
                            next_retry_count,
                            Some(&e.to_string()),
                        )
                        .await?;
                    summary.failed += 1;

                    if next_retry_count > self.config.max_payout_retries {
                        warn!(
                            distribution_id = %dist.id,
                            draw_id = %dist.draw_id,
                            recipient = %dist.recipient,
                            retry_count = next_retry_count,
                            "Retry ceiling reached, no further attempts"
                        );
                    } else {
                        warn!(
                            distribution_id = %dist.id,
                            recipient = %dist.recipient,
                            retry_count = next_retry_count,
                            error = %e,
                            "Retried payout failed"
                        );
                    }
                }
            }
        }

        Ok(summary)
    }
}
