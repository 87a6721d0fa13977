//! Inbound contribution transfers and per-sender aggregates.

use crate::domain::{Identity, TimeMs, TxHash};
use serde::{Deserialize, Serialize};

/// One inbound transfer to the collection address, as reported by the
/// ledger. Read-only; the ledger's returned sequence is the source of
/// truth for a window once pagination is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionTransfer {
    pub sender: Identity,
    /// Amount in integer minor units.
    pub amount: i64,
    pub time_ms: TimeMs,
    pub tx_hash: TxHash,
}

impl ContributionTransfer {
    pub fn new(sender: Identity, amount: i64, time_ms: TimeMs, tx_hash: TxHash) -> Self {
        Self {
            sender,
            amount,
            time_ms,
            tx_hash,
        }
    }
}

/// Summed contributions for one sender within a window.
///
/// Output order of the aggregator is first-seen order, which makes
/// settlement (including winner tie-breaks) reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderTotal {
    pub sender: Identity,
    /// Total in integer minor units.
    pub total: i64,
}
