//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database access.
//! Methods are organized across submodules by domain:
//! - `draws.rs` - draw rows and guarded status transitions
//! - `distributions.rs` - payout attempt records and retry bookkeeping
//!
//! The repository is the sole writer of both tables; the lifecycle manager
//! and the distribution engine are the only callers of the mutating methods.

mod distributions;
mod draws;

pub use draws::{PromoteOutcome, StartOutcome};

use crate::domain::{Decimal, Distribution, Draw, DrawStatus, Identity, TimeMs, TxHash};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) fn draw_from_row(row: &SqliteRow) -> Draw {
    let id: String = row.get("id");
    let status_str: String = row.get("status");
    let status = DrawStatus::parse(&status_str).unwrap_or_else(|| {
        warn!(draw_id = %id, status = %status_str, "Unknown draw status in database, treating as pending");
        DrawStatus::Pending
    });

    Draw {
        sequence_number: row.get("sequence_number"),
        window_start: TimeMs::new(row.get("window_start_ms")),
        window_end: TimeMs::new(row.get("window_end_ms")),
        status,
        total_collected: parse_optional_decimal(row, "total_collected", &id),
        fee_rate: parse_optional_decimal(row, "fee_rate", &id),
        winner: row
            .get::<Option<String>, _>("winner")
            .map(Identity::new),
        created_at: TimeMs::new(row.get("created_at_ms")),
        updated_at: TimeMs::new(row.get("updated_at_ms")),
        id,
    }
}

pub(crate) fn distribution_from_row(row: &SqliteRow) -> Distribution {
    let id: String = row.get("id");
    Distribution {
        draw_id: row.get("draw_id"),
        recipient: Identity::new(row.get("recipient")),
        prize_amount: parse_decimal(row, "prize_amount", &id),
        fee_paid: parse_decimal(row, "fee_paid", &id),
        status: row.get("status"),
        tx_hash: row.get::<Option<String>, _>("tx_hash").map(TxHash::new),
        retry_count: row.get("retry_count"),
        error_message: row.get("error_message"),
        transaction_at: row
            .get::<Option<i64>, _>("transaction_at_ms")
            .map(TimeMs::new),
        created_at: TimeMs::new(row.get("created_at_ms")),
        updated_at: TimeMs::new(row.get("updated_at_ms")),
        id,
    }
}

fn parse_decimal(row: &SqliteRow, column: &str, id: &str) -> Decimal {
    let s: String = row.get(column);
    Decimal::from_str_canonical(&s).unwrap_or_else(|e| {
        warn!(id = %id, column = %column, value = %s, error = %e, "Failed to parse decimal, using default");
        Decimal::default()
    })
}

fn parse_optional_decimal(row: &SqliteRow, column: &str, id: &str) -> Option<Decimal> {
    row.get::<Option<String>, _>(column).map(|s| {
        Decimal::from_str_canonical(&s).unwrap_or_else(|e| {
            warn!(id = %id, column = %column, value = %s, error = %e, "Failed to parse decimal, using default");
            Decimal::default()
        })
    })
}
