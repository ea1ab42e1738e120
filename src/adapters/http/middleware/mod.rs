//! HTTP middleware for axum.
//!
//! - `rate_limit` - Global and per-subscriber rate limiting

pub mod rate_limit;

pub use rate_limit::{
    check_mutation_limit, global_rate_limit_middleware, RateLimitRejection, RateLimiterState,
};
