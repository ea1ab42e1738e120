//! Rate limiter adapters.
//!
//! Implementations of the RateLimiter port for different backends.
//!
//! ## Available Adapters
//!
//! - `InMemoryRateLimiter` - In-memory for testing and single-server
//! - `RedisRateLimiter` - Redis-backed for multi-server deployments
//!
//! ## Usage
//!
//! ```ignore
//! use creator_billing::adapters::rate_limiter::{InMemoryRateLimiter, RateLimitConfig};
//!
//! // Single instance
//! let limiter = InMemoryRateLimiter::with_defaults();
//!
//! // Shared across instances
//! let limiter = RedisRateLimiter::connect("redis://127.0.0.1/", RateLimitConfig::default()).await?;
//! ```

mod config;
mod in_memory;
mod redis;

pub use config::RateLimitConfig;
pub use in_memory::InMemoryRateLimiter;
pub use redis::RedisRateLimiter;
