//! Ledger client abstraction: paginated reads of inbound transfers to the
//! collection address, and submission of outbound payouts.
//!
//! Signing and nonce management live behind the gateway the HTTP client
//! talks to; from this crate's perspective a submission either returns a
//! receipt or an error. The gateway does not tolerate rapid concurrent
//! submissions from one signing identity, so callers serialize payouts.

use crate::domain::{ContributionTransfer, TimeMs, TxHash};
use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::HttpLedgerClient;
pub use mock::MockLedger;

/// One page of inbound transfers. `next_cursor` of None means pagination is
/// exhausted; a page is never assumed to be the complete window on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPage {
    pub transfers: Vec<ContributionTransfer>,
    pub next_cursor: Option<String>,
}

/// Receipt for a submitted outbound transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub tx_hash: TxHash,
    /// Confirmed amount in minor units.
    pub amount: i64,
    pub time_ms: TimeMs,
    /// Gateway status tag, e.g. "applied".
    pub status: String,
}

#[async_trait]
pub trait LedgerClient: Send + Sync + fmt::Debug {
    /// Fetch one page of inbound transfers to `address`, starting from
    /// `cursor` (None for the first page).
    async fn fetch_transfers(
        &self,
        address: &str,
        cursor: Option<&str>,
    ) -> Result<TransferPage, LedgerError>;

    /// Submit a signed transfer of `amount_minor` minor units to `to`,
    /// paying `fee_minor` in network fees.
    async fn submit_transfer(
        &self,
        to: &str,
        amount_minor: i64,
        fee_minor: i64,
    ) -> Result<TransferReceipt, LedgerError>;
}

/// Error type for ledger operations.
#[derive(Debug, Clone)]
pub enum LedgerError {
    /// Network error (connection timeout, DNS failure).
    NetworkError(String),
    /// HTTP error (5xx, unexpected 4xx).
    HttpError { status: u16, message: String },
    /// Invalid JSON or malformed response.
    ParseError(String),
    /// Rate limit exceeded.
    RateLimited,
    /// No transfers at this cursor; ends pagination successfully.
    NotFound,
    /// The gateway rejected the submission.
    Rejected(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            LedgerError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            LedgerError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            LedgerError::RateLimited => write!(f, "Rate limited"),
            LedgerError::NotFound => write!(f, "Not found"),
            LedgerError::Rejected(msg) => write!(f, "Submission rejected: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}
