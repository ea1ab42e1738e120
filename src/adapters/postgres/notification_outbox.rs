//! PostgreSQL implementation of NotificationOutbox.
//!
//! The notification is stored as serialized JSON in a TEXT column; `kind`
//! and `subscription_id` are duplicated as plain columns for inspection.
//!
//! Claiming locks candidate rows with `FOR UPDATE SKIP LOCKED` and pushes
//! their `next_attempt_at` past the lease in the same statement, so
//! dispatchers on different instances never claim the same row at once.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::BillingNotification;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{DeliveryStatus, NotificationOutbox, OutboxEntry};

pub struct PostgresNotificationOutbox {
    pool: PgPool,
}

impl PostgresNotificationOutbox {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    payload: String,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    next_attempt_at: DateTime<Utc>,
}

const CLAIM_DUE_SQL: &str = r#"
    UPDATE notification_outbox
    SET next_attempt_at = NOW() + make_interval(secs => $2)
    WHERE id IN (
        SELECT id
        FROM notification_outbox
        WHERE status IN ('pending', 'failed')
          AND next_attempt_at <= NOW()
        ORDER BY created_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
    )
    RETURNING id, payload, status, attempts, last_error, created_at, processed_at, next_attempt_at
"#;

const MARK_FAILED_SQL: &str = r#"
    UPDATE notification_outbox
    SET attempts = attempts + 1,
        status = CASE WHEN attempts + 1 >= $3 THEN 'dead' ELSE 'failed' END,
        last_error = $2,
        processed_at = NOW(),
        next_attempt_at = $4
    WHERE id = $1
"#;

impl TryFrom<OutboxRow> for OutboxEntry {
    type Error = DomainError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let notification: BillingNotification = serde_json::from_str(&row.payload).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid outbox payload: {}", e),
            )
            .with_detail("outbox_id", row.id.to_string())
        })?;

        let status = DeliveryStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid outbox status: {}", row.status),
            )
        })?;

        Ok(OutboxEntry {
            id: row.id,
            notification,
            status,
            created_at: row.created_at,
            processed_at: row.processed_at,
            attempts: row.attempts.max(0) as u32,
            last_error: row.last_error,
            next_attempt_at: row.next_attempt_at,
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl NotificationOutbox for PostgresNotificationOutbox {
    async fn enqueue(&self, notification: BillingNotification) -> Result<OutboxEntry, DomainError> {
        let entry = OutboxEntry::new(notification);
        let payload = serde_json::to_string(&entry.notification).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to serialize notification: {}", e),
            )
        })?;

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (
                id, subscription_id, kind, payload, status, attempts, created_at, next_attempt_at
            ) VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.notification.subscription_id.as_uuid())
        .bind(entry.notification.kind.as_str())
        .bind(payload)
        .bind(entry.status.as_str())
        .bind(entry.created_at)
        .bind(entry.next_attempt_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to enqueue notification", e))?;

        Ok(entry)
    }

    async fn claim_due(&self, limit: u32, lease: Duration) -> Result<Vec<OutboxEntry>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(CLAIM_DUE_SQL)
            .bind(i64::from(limit))
            .bind(lease.as_secs_f64())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to claim due notifications", e))?;

        // RETURNING does not preserve the subquery's order.
        let mut entries = rows
            .into_iter()
            .map(OutboxEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn mark_delivered(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET status = 'delivered', attempts = attempts + 1, processed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark notification delivered", e))?;

        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        max_attempts: u32,
        retry_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        sqlx::query(MARK_FAILED_SQL)
            .bind(id)
            .bind(error)
            .bind(i32::try_from(max_attempts).unwrap_or(i32::MAX))
            .bind(retry_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to mark notification failed", e))?;

        Ok(())
    }
}
