//! Distribution: one recorded payout attempt for a draw.

use crate::domain::{Decimal, Identity, TimeMs, TxHash};
use serde::{Deserialize, Serialize};

/// Status tag recorded when an issuance attempt fails. Successful attempts
/// record the ledger receipt's own status string.
pub const STATUS_ERROR: &str = "Error";

/// One intended or completed payout, owned by its draw (cascade-deleted).
///
/// The tuple (draw_id, recipient, prize_amount) is the idempotency key:
/// issuance skips any recipient for which a row with that exact key already
/// exists. Rows are created on every attempt, success or failure, and are
/// mutated only by retry passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: String,
    pub draw_id: String,
    pub recipient: Identity,
    /// Major units, canonical decimal.
    pub prize_amount: Decimal,
    pub fee_paid: Decimal,
    pub status: String,
    pub tx_hash: Option<TxHash>,
    pub retry_count: i64,
    pub error_message: Option<String>,
    pub transaction_at: Option<TimeMs>,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

impl Distribution {
    /// True once the attempt has a confirmed ledger outcome.
    pub fn is_settled(&self) -> bool {
        self.status != STATUS_ERROR
    }
}
