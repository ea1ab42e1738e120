//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionRepository` - Local subscription rows
//! - `PostgresProcessedEventLedger` - Idempotency ledger for provider events
//! - `PostgresNotificationOutbox` - Durable queue for billing notifications
//! - `PostgresCreatorPricing` - Creators' current prices
//!
//! Schema lives in `migrations/` and is applied through [`MIGRATOR`].

mod creator_pricing;
mod notification_outbox;
mod processed_event_ledger;
mod subscription_repository;

pub use creator_pricing::PostgresCreatorPricing;
pub use notification_outbox::PostgresNotificationOutbox;
pub use processed_event_ledger::PostgresProcessedEventLedger;
pub use subscription_repository::PostgresSubscriptionRepository;

use sqlx::migrate::Migrator;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
