//! Draw settlement pipeline: lifecycle transitions, contribution
//! aggregation, prize computation, and idempotent payout issuance.

pub mod aggregator;
pub mod engine;
pub mod lifecycle;
pub mod prize;
pub mod runner;

pub use aggregator::{filter_and_group, filter_transfers, group_by_sender, Aggregator};
pub use engine::{DistributionEngine, IssuanceOutcome, RetrySummary};
pub use lifecycle::{LifecycleError, LifecycleManager};
pub use prize::{compute_schedule, PayoutItem, PrizeSchedule};
pub use runner::SettlementRunner;

use crate::ledger::LedgerError;
use thiserror::Error;

/// Failures that abort a settlement or retry pass.
///
/// Per-recipient issuance failures are not here: those are recorded as
/// distribution rows and retried later.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(LedgerError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
