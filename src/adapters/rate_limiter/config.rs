//! Rate limit configuration types.

use serde::{Deserialize, Serialize};

use crate::ports::{RateLimitKey, RateLimitScope, SUBSCRIPTION_MUTATION_RESOURCE};

/// Limits applied by the rate limiter adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per minute across every caller.
    pub global_requests_per_minute: u32,
    /// Cancel/reactivate requests allowed per subscriber per window.
    pub mutation_requests_per_window: u32,
    /// Window duration for subscriber limits, in seconds.
    pub window_secs: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_requests_per_minute: 10_000,
            mutation_requests_per_window: 10,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    /// Returns the (limit, window_secs) pair for a key.
    pub fn limits_for(&self, key: &RateLimitKey) -> (u32, u32) {
        match key.scope {
            RateLimitScope::Global => (self.global_requests_per_minute, 60),
            RateLimitScope::User => match key.resource.as_deref() {
                Some(SUBSCRIPTION_MUTATION_RESOURCE) => {
                    (self.mutation_requests_per_window, self.window_secs)
                }
                _ => (self.global_requests_per_minute, 60),
            },
        }
    }
}
