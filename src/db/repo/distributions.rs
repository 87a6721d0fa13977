//! Distribution (payout attempt) operations.

use super::{distribution_from_row, Repository};
use crate::domain::{Decimal, Distribution, Identity, TimeMs, TxHash};

impl Repository {
    /// Look up a distribution by its idempotency key
    /// (draw_id, recipient, prize_amount).
    pub async fn find_distribution(
        &self,
        draw_id: &str,
        recipient: &Identity,
        prize_amount: Decimal,
    ) -> Result<Option<Distribution>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT * FROM distributions
            WHERE draw_id = ? AND recipient = ? AND prize_amount = ?
            "#,
        )
        .bind(draw_id)
        .bind(recipient.as_str())
        .bind(prize_amount.to_canonical_string())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(distribution_from_row))
    }

    /// Record a payout attempt. The UNIQUE idempotency key backs up the
    /// pre-issuance existence check; a conflicting insert writes nothing.
    ///
    /// Returns true if a row was written.
    pub async fn insert_distribution(
        &self,
        distribution: &Distribution,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO distributions
            (id, draw_id, recipient, prize_amount, fee_paid, status, tx_hash,
             retry_count, error_message, transaction_at_ms, created_at_ms, updated_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(draw_id, recipient, prize_amount) DO NOTHING
            "#,
        )
        .bind(&distribution.id)
        .bind(&distribution.draw_id)
        .bind(distribution.recipient.as_str())
        .bind(distribution.prize_amount.to_canonical_string())
        .bind(distribution.fee_paid.to_canonical_string())
        .bind(&distribution.status)
        .bind(distribution.tx_hash.as_ref().map(TxHash::as_str))
        .bind(distribution.retry_count)
        .bind(distribution.error_message.as_deref())
        .bind(distribution.transaction_at.map(|t| t.as_i64()))
        .bind(distribution.created_at.as_i64())
        .bind(distribution.updated_at.as_i64())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Apply the outcome of one retry attempt to an existing row.
    pub async fn update_distribution_attempt(
        &self,
        id: &str,
        status: &str,
        tx_hash: Option<&TxHash>,
        transaction_at: Option<TimeMs>,
        retry_count: i64,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE distributions
            SET status = ?, tx_hash = ?, transaction_at_ms = ?,
                retry_count = ?, error_message = ?, updated_at_ms = ?
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(tx_hash.map(TxHash::as_str))
        .bind(transaction_at.map(|t| t.as_i64()))
        .bind(retry_count)
        .bind(error_message)
        .bind(TimeMs::now().as_i64())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Failed distributions still under the retry ceiling, oldest first.
    ///
    /// Failures carry the literal `Error` status; anything else is a ledger
    /// receipt status and therefore settled.
    pub async fn list_retryable_distributions(
        &self,
        max_retries: i64,
    ) -> Result<Vec<Distribution>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM distributions
            WHERE status = ? AND retry_count <= ?
            ORDER BY created_at_ms ASC, id ASC
            "#,
        )
        .bind(crate::domain::STATUS_ERROR)
        .bind(max_retries)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(distribution_from_row).collect())
    }

    /// All distributions recorded for a draw, in creation order.
    pub async fn list_distributions_for_draw(
        &self,
        draw_id: &str,
    ) -> Result<Vec<Distribution>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM distributions
            WHERE draw_id = ?
            ORDER BY created_at_ms ASC, id ASC
            "#,
        )
        .bind(draw_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(distribution_from_row).collect())
    }
}
