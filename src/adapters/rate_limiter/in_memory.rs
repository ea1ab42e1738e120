//! In-memory rate limiter implementation for testing and development.
//!
//! Uses a fixed-window counter algorithm with an in-memory HashMap.
//! Not suitable for multi-server deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

use super::config::RateLimitConfig;

/// In-memory rate limiter for testing and single-server deployments.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    /// Per-key window state.
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    /// Unix seconds.
    window_start: i64,
    window_secs: u32,
}

impl WindowState {
    fn window_end(&self) -> i64 {
        self.window_start + i64::from(self.window_secs)
    }
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        let redis_key = key.to_redis_key();
        let (limit, window_secs) = self.config.limits_for(&key);
        let now = Timestamp::now();
        let now_secs = now.as_unix_secs();

        let mut windows = self.windows.write().await;

        let state = windows.entry(redis_key).or_insert_with(|| WindowState {
            count: 0,
            window_start: now_secs,
            window_secs,
        });

        if now_secs >= state.window_end() {
            state.count = 0;
            state.window_start = now_secs;
        }

        let remaining_secs = state.window_end().saturating_sub(now_secs);
        let reset_at = now.plus_secs(remaining_secs);

        if state.count >= limit {
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit,
                retry_after_secs: u32::try_from(remaining_secs).unwrap_or(window_secs).max(1),
                reset_at,
            }));
        }

        state.count += 1;

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(state.count),
            reset_at,
        }))
    }

    async fn reset(&self, key: RateLimitKey) -> Result<(), RateLimitError> {
        self.windows.write().await.remove(&key.to_redis_key());
        Ok(())
    }
}
