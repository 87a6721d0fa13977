use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub ledger_api_url: String,
    /// Address contributions are sent to and payouts are signed from.
    pub collection_address: String,
    /// Minimum contribution counted toward a draw, in minor units.
    pub min_contribution: i64,
    /// Senders excluded from aggregation (the collection address itself,
    /// exchange hot wallets, and so on).
    pub blocked_addresses: Vec<String>,
    pub top_prize_share: Decimal,
    pub individual_prize_share: Decimal,
    /// Fixed network fee attached to each payout, major units.
    pub payout_fee: Decimal,
    /// Enforced spacing between consecutive outbound submissions.
    pub payout_spacing_ms: u64,
    pub max_payout_retries: i64,
    pub settlement_interval_secs: u64,
    pub retry_interval_secs: u64,
    /// How many daily windows to keep materialized ahead.
    pub upcoming_draw_days: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", "8080")?;
        let database_path = required(&env_map, "DATABASE_PATH")?;
        let ledger_api_url = required(&env_map, "LEDGER_API_URL")?;
        let collection_address = required(&env_map, "COLLECTION_ADDRESS")?;

        let min_contribution: i64 = parse_or(&env_map, "MIN_CONTRIBUTION", "1000000000")?;
        let blocked_addresses = env_map
            .get("BLOCKED_ADDRESSES")
            .map(|s| {
                s.split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let top_prize_share = parse_decimal_or(&env_map, "TOP_PRIZE_SHARE", "0.475")?;
        let individual_prize_share = parse_decimal_or(&env_map, "INDIVIDUAL_PRIZE_SHARE", "0.475")?;
        let payout_fee = parse_decimal_or(&env_map, "PAYOUT_FEE", "0.05")?;

        let payout_spacing_ms = parse_or(&env_map, "PAYOUT_SPACING_MS", "2000")?;
        let max_payout_retries = parse_or(&env_map, "MAX_PAYOUT_RETRIES", "3")?;
        let settlement_interval_secs = parse_or(&env_map, "SETTLEMENT_INTERVAL_SECS", "86400")?;
        let retry_interval_secs = parse_or(&env_map, "RETRY_INTERVAL_SECS", "900")?;
        let upcoming_draw_days = parse_or(&env_map, "UPCOMING_DRAW_DAYS", "7")?;

        Ok(Config {
            port,
            database_path,
            ledger_api_url,
            collection_address,
            min_contribution,
            blocked_addresses,
            top_prize_share,
            individual_prize_share,
            payout_fee,
            payout_spacing_ms,
            max_payout_retries,
            settlement_interval_secs,
            retry_interval_secs,
            upcoming_draw_days,
        })
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| {
            ConfigError::InvalidValue(
                key.to_string(),
                format!("must be a valid {}", std::any::type_name::<T>()),
            )
        })
}

fn parse_decimal_or(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    Decimal::from_str_canonical(env_map.get(key).map(|s| s.as_str()).unwrap_or(default))
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be a decimal".to_string()))
}
