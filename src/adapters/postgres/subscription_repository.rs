//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Uniqueness of (subscriber_id, creator_id) is enforced by the
//! `subscriptions_subscriber_creator_key` constraint; `insert_if_absent`
//! relies on it through `ON CONFLICT DO NOTHING`. A provider reference
//! already held by another row violates
//! `subscriptions_provider_subscription_id_key` and surfaces as
//! `ConcurrentModification`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Subscription, SubscriptionStatus};
use crate::domain::foundation::{
    CreatorId, DomainError, ErrorCode, MinorUnits, SubscriberId, SubscriptionId, Timestamp,
};
use crate::ports::{InsertOutcome, SubscriptionRepository};

const SELECT_COLUMNS: &str = r#"
    id, subscriber_id, creator_id, provider_subscription_id, status,
    cancel_at_period_end, current_period_start, current_period_end,
    price_at_purchase, created_at, updated_at
"#;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    subscriber_id: String,
    creator_id: String,
    provider_subscription_id: Option<String>,
    status: String,
    cancel_at_period_end: bool,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    price_at_purchase: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", field, e))
        };

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            subscriber_id: SubscriberId::new(row.subscriber_id)
                .map_err(|e| corrupt("subscriber_id", &e))?,
            creator_id: CreatorId::new(row.creator_id).map_err(|e| corrupt("creator_id", &e))?,
            provider_subscription_id: row.provider_subscription_id,
            status: row
                .status
                .parse::<SubscriptionStatus>()
                .map_err(|e| corrupt("status", &e))?,
            cancel_at_period_end: row.cancel_at_period_end,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            price_at_purchase: MinorUnits::new(row.price_at_purchase)
                .map_err(|e| corrupt("price_at_purchase", &e))?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const PROVIDER_ID_CONSTRAINT: &str = "subscriptions_provider_subscription_id_key";

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some(PROVIDER_ID_CONSTRAINT) {
            return DomainError::new(
                ErrorCode::ConcurrentModification,
                "Provider subscription already linked to another subscription",
            );
        }
    }
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
        .with_detail("subscription_id", id.to_string())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let sql = format!("SELECT {} FROM subscriptions WHERE id = $1", SELECT_COLUMNS);
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find subscription by id", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE provider_subscription_id = $1",
            SELECT_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(provider_subscription_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find subscription by provider id", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_pair(
        &self,
        subscriber_id: &SubscriberId,
        creator_id: &CreatorId,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE subscriber_id = $1 AND creator_id = $2",
            SELECT_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(subscriber_id.as_str())
            .bind(creator_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn insert_if_absent(
        &self,
        subscription: &Subscription,
    ) -> Result<InsertOutcome, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO subscriptions (
                id, subscriber_id, creator_id, provider_subscription_id, status,
                cancel_at_period_end, current_period_start, current_period_end,
                price_at_purchase, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT ON CONSTRAINT subscriptions_subscriber_creator_key DO NOTHING
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let inserted: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(subscription.id.as_uuid())
            .bind(subscription.subscriber_id.as_str())
            .bind(subscription.creator_id.as_str())
            .bind(&subscription.provider_subscription_id)
            .bind(subscription.status.as_str())
            .bind(subscription.cancel_at_period_end)
            .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
            .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
            .bind(subscription.price_at_purchase.value())
            .bind(subscription.created_at.as_datetime())
            .bind(subscription.updated_at.as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to insert subscription", e))?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Inserted(Subscription::try_from(row)?));
        }

        // Lost the race; the winner's row is visible once its insert committed.
        self.find_by_pair(&subscription.subscriber_id, &subscription.creator_id)
            .await?
            .map(InsertOutcome::Existing)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ConcurrentModification,
                    "Subscription insert conflicted but no row was found",
                )
            })
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                provider_subscription_id = $2,
                status = $3,
                cancel_at_period_end = $4,
                current_period_start = $5,
                current_period_end = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(&subscription.provider_subscription_id)
        .bind(subscription.status.as_str())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(&subscription.id));
        }
        Ok(())
    }

    async fn restart(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                provider_subscription_id = $2,
                status = $3,
                cancel_at_period_end = $4,
                current_period_start = $5,
                current_period_end = $6,
                price_at_purchase = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(&subscription.provider_subscription_id)
        .bind(subscription.status.as_str())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.price_at_purchase.value())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to restart subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(&subscription.id));
        }
        Ok(())
    }

    async fn link_provider_subscription(
        &self,
        id: &SubscriptionId,
        provider_subscription_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET provider_subscription_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(provider_subscription_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to link provider subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn set_cancel_at_period_end(
        &self,
        id: &SubscriptionId,
        cancel_at_period_end: bool,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET cancel_at_period_end = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(cancel_at_period_end)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update cancel flag", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}
