//! HTTP ledger gateway client.

use super::{LedgerClient, LedgerError, TransferPage, TransferReceipt};
use crate::domain::{ContributionTransfer, Identity, TimeMs, TxHash};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Ledger client talking JSON to a gateway that fronts the chain and holds
/// the signing key for outbound transfers.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    client: Client,
    base_url: String,
}

impl HttpLedgerClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post_json(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(LedgerError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(LedgerError::RateLimited));
            }
            if status == 404 {
                return Err(backoff::Error::permanent(LedgerError::NotFound));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(LedgerError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(LedgerError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(LedgerError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn fetch_transfers(
        &self,
        address: &str,
        cursor: Option<&str>,
    ) -> Result<TransferPage, LedgerError> {
        debug!("Fetching transfers for address={}, cursor={:?}", address, cursor);

        let payload = serde_json::json!({
            "address": address,
            "cursor": cursor,
        });

        let response = self.post_json("/v1/transfers/incoming", payload).await?;

        let items = response
            .get("transfers")
            .and_then(|v| v.as_array())
            .ok_or_else(|| LedgerError::ParseError("Expected transfers array".to_string()))?;

        let mut transfers = Vec::new();
        for item in items {
            match parse_transfer(item) {
                Ok(t) => transfers.push(t),
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable transfer");
                }
            }
        }

        let next_cursor = response
            .get("nextCursor")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok(TransferPage {
            transfers,
            next_cursor,
        })
    }

    async fn submit_transfer(
        &self,
        to: &str,
        amount_minor: i64,
        fee_minor: i64,
    ) -> Result<TransferReceipt, LedgerError> {
        debug!(
            "Submitting transfer to={}, amount_minor={}, fee_minor={}",
            to, amount_minor, fee_minor
        );

        let payload = serde_json::json!({
            "to": to,
            "amount": amount_minor,
            "fee": fee_minor,
        });

        let response = self.post_json("/v1/transfers/send", payload).await?;

        if let Some(reason) = response.get("rejected").and_then(|v| v.as_str()) {
            return Err(LedgerError::Rejected(reason.to_string()));
        }

        parse_receipt(&response)
    }
}

fn parse_transfer(item: &serde_json::Value) -> Result<ContributionTransfer, LedgerError> {
    let sender = item
        .get("from")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LedgerError::ParseError("Missing from field".to_string()))?;

    let amount = item
        .get("amount")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| LedgerError::ParseError("Missing amount field".to_string()))?;

    let time_ms = item
        .get("time")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| LedgerError::ParseError("Missing time field".to_string()))?;

    let tx_hash = item
        .get("hash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LedgerError::ParseError("Missing hash field".to_string()))?;

    Ok(ContributionTransfer::new(
        Identity::new(sender.to_string()),
        amount,
        TimeMs::new(time_ms),
        TxHash::new(tx_hash.to_string()),
    ))
}

fn parse_receipt(response: &serde_json::Value) -> Result<TransferReceipt, LedgerError> {
    let tx_hash = response
        .get("hash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LedgerError::ParseError("Missing hash field".to_string()))?;

    let amount = response
        .get("amount")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| LedgerError::ParseError("Missing amount field".to_string()))?;

    let time_ms = response
        .get("time")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| LedgerError::ParseError("Missing time field".to_string()))?;

    let status = response
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("applied")
        .to_string();

    Ok(TransferReceipt {
        tx_hash: TxHash::new(tx_hash.to_string()),
        amount,
        time_ms: TimeMs::new(time_ms),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfer_valid() {
        let item = serde_json::json!({
            "from": "EQsender",
            "amount": 2_000_000_000i64,
            "time": 1000,
            "hash": "abc123"
        });

        let transfer = parse_transfer(&item).unwrap();
        assert_eq!(transfer.sender, Identity::new("EQsender".to_string()));
        assert_eq!(transfer.amount, 2_000_000_000);
        assert_eq!(transfer.time_ms, TimeMs::new(1000));
        assert_eq!(transfer.tx_hash, TxHash::new("abc123".to_string()));
    }

    #[test]
    fn test_parse_transfer_missing_amount() {
        let item = serde_json::json!({
            "from": "EQsender",
            "time": 1000,
            "hash": "abc123"
        });
        assert!(matches!(
            parse_transfer(&item),
            Err(LedgerError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_receipt_defaults_status() {
        let response = serde_json::json!({
            "hash": "def456",
            "amount": 500,
            "time": 2000
        });
        let receipt = parse_receipt(&response).unwrap();
        assert_eq!(receipt.status, "applied");
        assert_eq!(receipt.tx_hash.as_str(), "def456");
    }
}
