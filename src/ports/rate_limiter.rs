//! Rate limiting port for user-initiated subscription mutations.
//!
//! Implementations use a fixed-window counter: in-memory for a single
//! instance, Redis when several instances share the limit.

use async_trait::async_trait;
use std::fmt;

use crate::domain::foundation::{SubscriberId, Timestamp};

/// Resource name for cancel and reactivate requests.
pub const SUBSCRIPTION_MUTATION_RESOURCE: &str = "subscription_mutation";

/// Port for rate limiting operations.
///
/// Implementations should be thread-safe and support concurrent access.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check if request is allowed, consuming one unit of quota if so.
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError>;

    /// Reset rate limit for a key (admin operation).
    async fn reset(&self, key: RateLimitKey) -> Result<(), RateLimitError>;
}

/// Key identifying what to rate limit.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    pub scope: RateLimitScope,
    /// Identifier within the scope (e.g., subscriber id).
    pub identifier: String,
    /// Optional resource for finer-grained limits.
    pub resource: Option<String>,
}

/// The scope at which rate limiting is applied.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum RateLimitScope {
    Global,
    /// Per-authenticated-principal rate limit.
    User,
}

impl RateLimitKey {
    pub fn global() -> Self {
        Self {
            scope: RateLimitScope::Global,
            identifier: "global".to_string(),
            resource: None,
        }
    }

    /// Creates a per-subscriber key for a specific resource.
    pub fn user_resource(subscriber_id: &SubscriberId, resource: &str) -> Self {
        Self {
            scope: RateLimitScope::User,
            identifier: subscriber_id.to_string(),
            resource: Some(resource.to_string()),
        }
    }

    /// Key used by the cancel and reactivate endpoints.
    pub fn subscription_mutation(subscriber_id: &SubscriberId) -> Self {
        Self::user_resource(subscriber_id, SUBSCRIPTION_MUTATION_RESOURCE)
    }

    /// Returns the Redis key string for this rate limit key.
    pub fn to_redis_key(&self) -> String {
        format!("ratelimit:{}", self)
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(f, "{}:{}:{}", self.scope, self.identifier, resource),
            None => write!(f, "{}:{}", self.scope, self.identifier),
        }
    }
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Global => "global",
            RateLimitScope::User => "user",
        }
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed; includes current status.
    Allowed(RateLimitStatus),
    /// Request is denied; includes denial details.
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }
}

/// Current rate limit status.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: Timestamp,
}

/// Details of a rate limit denial.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    pub limit: u32,
    /// Seconds until the client should retry.
    pub retry_after_secs: u32,
    pub reset_at: Timestamp,
}

/// Errors that can occur during rate limiting operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Rate limiter backend is unavailable.
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}
