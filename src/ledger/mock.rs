//! Mock ledger for testing without network calls.

use super::{LedgerClient, LedgerError, TransferPage, TransferReceipt};
use crate::domain::{ContributionTransfer, TimeMs, TxHash};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A recorded outbound submission, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub to: String,
    pub amount_minor: i64,
    pub fee_minor: i64,
}

/// Mock ledger with scripted inbound transfers and controllable submission
/// outcomes. Inbound transfers are served in pages of `page_size` to
/// exercise the pagination loop.
#[derive(Debug)]
pub struct MockLedger {
    transfers: Vec<ContributionTransfer>,
    page_size: usize,
    fetch_error: Option<LedgerError>,
    fail_submissions_to: Mutex<HashSet<String>>,
    submissions: Mutex<Vec<RecordedSubmission>>,
    seq: AtomicU64,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            transfers: Vec::new(),
            page_size: 2,
            fetch_error: None,
            fail_submissions_to: Mutex::new(HashSet::new()),
            submissions: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn with_transfer(mut self, transfer: ContributionTransfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    pub fn with_transfers(mut self, transfers: Vec<ContributionTransfer>) -> Self {
        self.transfers.extend(transfers);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Every fetch returns this error instead of a page.
    pub fn with_fetch_error(mut self, error: LedgerError) -> Self {
        self.fetch_error = Some(error);
        self
    }

    /// Submissions to this recipient fail until `clear_failure` is called.
    pub fn with_failing_recipient(self, to: &str) -> Self {
        self.fail_submissions_to
            .lock()
            .unwrap()
            .insert(to.to_string());
        self
    }

    /// Let subsequent submissions to `to` succeed.
    pub fn clear_failure(&self, to: &str) {
        self.fail_submissions_to.lock().unwrap().remove(to);
    }

    /// All submissions attempted so far, in order.
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().unwrap().clone()
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn fetch_transfers(
        &self,
        _address: &str,
        cursor: Option<&str>,
    ) -> Result<TransferPage, LedgerError> {
        if let Some(err) = &self.fetch_error {
            return Err(err.clone());
        }

        let offset: usize = match cursor {
            None => 0,
            Some(c) => c
                .parse()
                .map_err(|_| LedgerError::ParseError(format!("bad cursor: {}", c)))?,
        };

        if offset >= self.transfers.len() {
            return Ok(TransferPage {
                transfers: Vec::new(),
                next_cursor: None,
            });
        }

        let end = (offset + self.page_size).min(self.transfers.len());
        let next_cursor = (end < self.transfers.len()).then(|| end.to_string());

        Ok(TransferPage {
            transfers: self.transfers[offset..end].to_vec(),
            next_cursor,
        })
    }

    async fn submit_transfer(
        &self,
        to: &str,
        amount_minor: i64,
        fee_minor: i64,
    ) -> Result<TransferReceipt, LedgerError> {
        self.submissions.lock().unwrap().push(RecordedSubmission {
            to: to.to_string(),
            amount_minor,
            fee_minor,
        });

        if self.fail_submissions_to.lock().unwrap().contains(to) {
            return Err(LedgerError::Rejected(format!(
                "scripted failure for {}",
                to
            )));
        }

        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        Ok(TransferReceipt {
            tx_hash: TxHash::new(format!("mock-tx-{}", n)),
            amount: amount_minor,
            time_ms: TimeMs::now(),
            status: "applied".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identity;

    fn make_transfer(n: i64) -> ContributionTransfer {
        ContributionTransfer::new(
            Identity::new(format!("EQsender{}", n)),
            n * 1_000_000_000,
            TimeMs::new(n * 1000),
            TxHash::new(format!("hash{}", n)),
        )
    }

    #[tokio::test]
    async fn test_pagination_walks_all_pages() {
        let ledger = MockLedger::new()
            .with_transfers((1..=5).map(make_transfer).collect())
            .with_page_size(2);

        let mut cursor: Option<String> = None;
        let mut seen = Vec::new();
        loop {
            let page = ledger
                .fetch_transfers("EQpool", cursor.as_deref())
                .await
                .unwrap();
            seen.extend(page.transfers);
            match page.next_cursor {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_submit_records_and_succeeds() {
        let ledger = MockLedger::new();
        let receipt = ledger.submit_transfer("EQr", 100, 5).await.unwrap();
        assert_eq!(receipt.status, "applied");
        assert_eq!(
            ledger.submissions(),
            vec![RecordedSubmission {
                to: "EQr".to_string(),
                amount_minor: 100,
                fee_minor: 5,
            }]
        );
    }

    #[tokio::test]
    async fn test_scripted_failure_then_recovery() {
        let ledger = MockLedger::new().with_failing_recipient("EQr");
        assert!(ledger.submit_transfer("EQr", 100, 5).await.is_err());
        ledger.clear_failure("EQr");
        assert!(ledger.submit_transfer("EQr", 100, 5).await.is_ok());
        assert_eq!(ledger.submissions().len(), 2);
    }
}
