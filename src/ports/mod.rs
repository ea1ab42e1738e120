//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `SubscriptionRepository` - Subscription records keyed by (subscriber, creator)
//! - `ProcessedEventLedger` - Idempotency record for provider events
//! - `CreatorPricing` - Creator's current price, captured at subscription creation
//! - `NotificationOutbox` - Outbound notification queue
//!
//! ## External Service Ports
//!
//! - `PaymentProvider` - The payment provider's subscription API
//! - `NotificationSender` - Notification delivery
//! - `RateLimiter` - Per-principal request limits

mod creator_pricing;
mod notification_outbox;
mod payment_provider;
mod processed_event_ledger;
mod rate_limiter;
mod subscription_repository;

pub use creator_pricing::CreatorPricing;
pub use notification_outbox::{
    DeliveryStatus, NotificationOutbox, NotificationSender, OutboxEntry, RetryBackoff,
};
pub use payment_provider::{PaymentError, PaymentErrorCode, PaymentProvider};
pub use processed_event_ledger::{MarkOutcome, ProcessedEventLedger};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitScope,
    RateLimitStatus, RateLimiter, SUBSCRIPTION_MUTATION_RESOURCE,
};
pub use subscription_repository::{InsertOutcome, SubscriptionRepository};
