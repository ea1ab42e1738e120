//! In-memory adapters for tests and single-process development.
//!
//! Each adapter honours the same constraints as its PostgreSQL counterpart
//! (pair uniqueness, idempotent ledger inserts, field-scoped updates).

mod creator_pricing;
mod notification_outbox;
mod processed_event_ledger;
mod subscription_repository;

pub use creator_pricing::InMemoryCreatorPricing;
pub use notification_outbox::InMemoryNotificationOutbox;
pub use processed_event_ledger::InMemoryProcessedEventLedger;
pub use subscription_repository::InMemorySubscriptionRepository;
