//! Transaction aggregator: fetch, filter, and group inbound contributions
//! for a draw window.
//!
//! Both the settlement path (processing draw) and the read path (running
//! draw) go through this component, parameterized by the draw status to
//! resolve against.

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{ContributionTransfer, Draw, DrawStatus, SenderTotal, TimeMs};
use crate::ledger::{LedgerClient, LedgerError};
use crate::settlement::SettlementError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The transfers accumulated for one draw's window, with the draw they
/// were resolved against.
#[derive(Debug, Clone)]
pub struct WindowContributions {
    pub draw: Draw,
    pub transfers: Vec<ContributionTransfer>,
}

#[derive(Clone)]
pub struct Aggregator {
    ledger: Arc<dyn LedgerClient>,
    repo: Arc<Repository>,
    config: Config,
}

impl Aggregator {
    pub fn new(ledger: Arc<dyn LedgerClient>, repo: Arc<Repository>, config: Config) -> Self {
        Self {
            ledger,
            repo,
            config,
        }
    }

    /// Resolve the draw in `status` and pull its window's raw transfers,
    /// paginating until no continuation cursor remains.
    ///
    /// Returns None when no draw is in the target status — callers treat
    /// that as "nothing to settle". `NotFound` from the ledger ends
    /// pagination successfully with whatever has accumulated; any other
    /// ledger error aborts with `LedgerUnavailable`.
    pub async fn fetch_window_contributions(
        &self,
        status: DrawStatus,
    ) -> Result<Option<WindowContributions>, SettlementError> {
        let Some(draw) = self.repo.get_draw_by_status(status).await? else {
            return Ok(None);
        };

        let mut transfers = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = match self
                .ledger
                .fetch_transfers(&self.config.collection_address, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(LedgerError::NotFound) => break,
                Err(e) => return Err(SettlementError::LedgerUnavailable(e)),
            };

            transfers.extend(page.transfers);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            draw_id = %draw.id,
            count = transfers.len(),
            "Accumulated raw transfers for window"
        );

        Ok(Some(WindowContributions { draw, transfers }))
    }

    /// The read-path view: transfers of the draw in `status`, filtered to
    /// its window but not grouped. Empty when no draw is in that status.
    pub async fn filtered_window_transfers(
        &self,
        status: DrawStatus,
    ) -> Result<Vec<ContributionTransfer>, SettlementError> {
        let Some(window) = self.fetch_window_contributions(status).await? else {
            return Ok(Vec::new());
        };

        Ok(filter_transfers(
            window.transfers,
            window.draw.window_start,
            window.draw.window_end,
            self.config.min_contribution,
            &self.config.blocked_addresses,
        ))
    }

    /// Filter and group a window's transfers using the configured minimum
    /// and blocklist.
    pub fn aggregate(&self, window: &WindowContributions) -> Vec<SenderTotal> {
        filter_and_group(
            window.transfers.clone(),
            window.draw.window_start,
            window.draw.window_end,
            self.config.min_contribution,
            &self.config.blocked_addresses,
        )
    }
}

/// Retain transfers inside [window_start, window_end] (inclusive both
/// ends), at or above `min_amount`, from senders not on the blocklist.
pub fn filter_transfers(
    transfers: Vec<ContributionTransfer>,
    window_start: TimeMs,
    window_end: TimeMs,
    min_amount: i64,
    blocked: &[String],
) -> Vec<ContributionTransfer> {
    transfers
        .into_iter()
        .filter(|t| {
            t.time_ms >= window_start
                && t.time_ms <= window_end
                && t.amount >= min_amount
                && !blocked.iter().any(|b| b == t.sender.as_str())
        })
        .collect()
}

/// Sum amounts per sender, one aggregate per distinct sender, in
/// first-seen order. Order is not semantically meaningful but must be
/// deterministic so settlement is reproducible.
pub fn group_by_sender(transfers: &[ContributionTransfer]) -> Vec<SenderTotal> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<SenderTotal> = Vec::new();

    for transfer in transfers {
        match index.get(transfer.sender.as_str()) {
            Some(&i) => totals[i].total += transfer.amount,
            None => {
                index.insert(transfer.sender.as_str().to_string(), totals.len());
                totals.push(SenderTotal {
                    sender: transfer.sender.clone(),
                    total: transfer.amount,
                });
            }
        }
    }

    totals
}

/// Filter then group: the single aggregation used by both the read and
/// settlement paths.
pub fn filter_and_group(
    transfers: Vec<ContributionTransfer>,
    window_start: TimeMs,
    window_end: TimeMs,
    min_amount: i64,
    blocked: &[String],
) -> Vec<SenderTotal> {
    let filtered = filter_transfers(transfers, window_start, window_end, min_amount, blocked);
    group_by_sender(&filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Identity, TxHash};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn make_transfer(sender: &str, amount: i64, time_ms: i64) -> ContributionTransfer {
        ContributionTransfer::new(
            Identity::new(sender.to_string()),
            amount,
            TimeMs::new(time_ms),
            TxHash::new(format!("{}-{}", sender, time_ms)),
        )
    }

    #[test]
    fn test_filter_window_inclusive_both_ends() {
        let transfers = vec![
            make_transfer("EQa", 100, 999),
            make_transfer("EQa", 100, 1000),
            make_transfer("EQa", 100, 2000),
            make_transfer("EQa", 100, 2001),
        ];
        let kept = filter_transfers(transfers, TimeMs::new(1000), TimeMs::new(2000), 0, &[]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].time_ms, TimeMs::new(1000));
        assert_eq!(kept[1].time_ms, TimeMs::new(2000));
    }

    #[test]
    fn test_filter_min_amount_and_blocklist() {
        let transfers = vec![
            make_transfer("EQa", 50, 1500),
            make_transfer("EQa", 100, 1500),
            make_transfer("EQblocked", 100, 1500),
        ];
        let blocked = vec!["EQblocked".to_string()];
        let kept = filter_transfers(
            transfers,
            TimeMs::new(1000),
            TimeMs::new(2000),
            100,
            &blocked,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].sender.as_str(), "EQa");
    }

    #[test]
    fn test_group_preserves_first_seen_order() {
        let transfers = vec![
            make_transfer("EQb", 10, 1),
            make_transfer("EQa", 20, 2),
            make_transfer("EQb", 30, 3),
        ];
        let totals = group_by_sender(&transfers);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].sender.as_str(), "EQb");
        assert_eq!(totals[0].total, 40);
        assert_eq!(totals[1].sender.as_str(), "EQa");
        assert_eq!(totals[1].total, 20);
    }

    #[test]
    fn test_filter_and_group_randomized_never_admits_excluded() {
        let mut rng = StdRng::seed_from_u64(42);
        let window_start = TimeMs::new(10_000);
        let window_end = TimeMs::new(20_000);
        let min_amount = 500;
        let blocked = vec!["EQblocked".to_string()];
        let senders = ["EQa", "EQb", "EQc", "EQblocked"];

        for _ in 0..100 {
            let transfers: Vec<ContributionTransfer> = (0..50)
                .map(|_| {
                    make_transfer(
                        senders[rng.gen_range(0..senders.len())],
                        rng.gen_range(0..2000),
                        rng.gen_range(0..30_000),
                    )
                })
                .collect();

            let expected_total: i64 = transfers
                .iter()
                .filter(|t| {
                    t.time_ms >= window_start
                        && t.time_ms <= window_end
                        && t.amount >= min_amount
                        && t.sender.as_str() != "EQblocked"
                })
                .map(|t| t.amount)
                .sum();

            let totals = filter_and_group(
                transfers,
                window_start,
                window_end,
                min_amount,
                &blocked,
            );

            assert!(totals.iter().all(|t| t.sender.as_str() != "EQblocked"));
            assert!(totals.iter().all(|t| t.total >= min_amount));
            assert_eq!(totals.iter().map(|t| t.total).sum::<i64>(), expected_total);
        }
    }

    #[test]
    fn test_empty_input_groups_to_empty() {
        assert!(group_by_sender(&[]).is_empty());
    }
}
