//! PostgreSQL implementation of CreatorPricing.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{CreatorId, DomainError, ErrorCode, MinorUnits};
use crate::ports::CreatorPricing;

/// Reads creators' current prices from `creator_prices`.
pub struct PostgresCreatorPricing {
    pool: PgPool,
}

impl PostgresCreatorPricing {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreatorPricing for PostgresCreatorPricing {
    async fn current_price(&self, creator_id: &CreatorId) -> Result<Option<MinorUnits>, DomainError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT price_minor_units FROM creator_prices WHERE creator_id = $1")
                .bind(creator_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to load creator price: {}", e),
                    )
                })?;

        row.map(|(price,)| {
            MinorUnits::new(price).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored price: {}", e))
                    .with_detail("creator_id", creator_id.as_str())
            })
        })
        .transpose()
    }
}
