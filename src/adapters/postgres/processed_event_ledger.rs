//! PostgreSQL implementation of ProcessedEventLedger.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{MarkOutcome, ProcessedEventLedger};

/// Ledger backed by the `processed_events` table.
///
/// The primary key on `event_id` is the idempotency guard: a concurrent
/// delivery that loses the insert race sees zero affected rows.
pub struct PostgresProcessedEventLedger {
    pool: PgPool,
}

impl PostgresProcessedEventLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedEventLedger for PostgresProcessedEventLedger {
    async fn has_processed(&self, event_id: &str) -> Result<bool, DomainError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM processed_events WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to check processed event: {}", e),
                    )
                })?;

        Ok(exists.0)
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<MarkOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, event_type, processed_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record processed event: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            Ok(MarkOutcome::AlreadyRecorded)
        } else {
            Ok(MarkOutcome::Recorded)
        }
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM processed_events WHERE processed_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to prune processed events: {}", e),
                )
            })?;

        Ok(result.rows_affected())
    }
}
