//! Redis-backed rate limiter for multi-instance deployments.
//!
//! Uses a fixed-window counter algorithm with Redis INCR + EXPIRE.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

use super::config::RateLimitConfig;

/// Redis-backed rate limiter shared by every instance.
///
/// 1. INCR the key to increment the counter
/// 2. If count is 1, set EXPIRE for the window duration
/// 3. If count > limit, deny the request
///
/// Requests can briefly exceed the limit at window boundaries.
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: MultiplexedConnection,
    config: RateLimitConfig,
}

impl RedisRateLimiter {
    pub fn new(conn: MultiplexedConnection, config: RateLimitConfig) -> Self {
        Self { conn, config }
    }

    /// Opens a multiplexed connection to `redis_url`.
    pub async fn connect(redis_url: &str, config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(redis_url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(unavailable)?;
        Ok(Self::new(conn, config))
    }
}

fn unavailable(e: redis::RedisError) -> RateLimitError {
    RateLimitError::Unavailable(e.to_string())
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        let redis_key = key.to_redis_key();
        let (limit, window_secs) = self.config.limits_for(&key);

        let mut conn = self.conn.clone();

        let count: i64 = conn.incr(&redis_key, 1_i64).await.map_err(unavailable)?;

        if count == 1 {
            conn.expire::<_, ()>(&redis_key, i64::from(window_secs))
                .await
                .map_err(unavailable)?;
        }

        let ttl: i64 = conn.ttl(&redis_key).await.map_err(unavailable)?;
        let reset_secs = if ttl > 0 { ttl } else { i64::from(window_secs) };
        let reset_at = Timestamp::now().plus_secs(reset_secs);

        let count = u32::try_from(count).unwrap_or(u32::MAX);
        if count > limit {
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit,
                retry_after_secs: u32::try_from(reset_secs).unwrap_or(window_secs).max(1),
                reset_at,
            }));
        }

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(count),
            reset_at,
        }))
    }

    async fn reset(&self, key: RateLimitKey) -> Result<(), RateLimitError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key.to_redis_key())
            .await
            .map_err(unavailable)
    }
}

impl std::fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
