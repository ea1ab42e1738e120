//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - REST API (webhook intake, subscription endpoints)
//! - `postgres` - PostgreSQL persistence
//! - `memory` - In-memory persistence for tests and local development
//! - `stripe` - Payment provider client
//! - `rate_limiter` - In-memory and Redis rate limiters
//! - `events` - Background services (notification dispatch, ledger retention)
//! - `notifications` - Notification senders

pub mod events;
pub mod http;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod rate_limiter;
pub mod stripe;

pub use events::{LedgerRetentionTask, NotificationDispatcher, NotificationDispatcherConfig};
pub use rate_limiter::{InMemoryRateLimiter, RateLimitConfig, RedisRateLimiter};
