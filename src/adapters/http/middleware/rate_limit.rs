//! Rate limiting for the billing API.
//!
//! Two scopes are enforced through the `RateLimiter` port:
//! 1. Global limit, as a middleware layer over every route
//! 2. Per-subscriber limit on cancel and reactivate, checked in the handlers
//!
//! Rate limit status is returned in standard HTTP headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: Requests remaining in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `Retry-After`: Seconds to wait (only on 429 response)
//!
//! A limiter backend failure fails open: availability of cancel and
//! reactivate matters more than strict throttling.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::SubscriberId;
use crate::ports::{RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter};

use crate::adapters::http::billing::dto::ErrorResponse;

/// Rate limiter middleware state.
pub type RateLimiterState = Arc<dyn RateLimiter>;

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    /// Unix timestamp when the window resets.
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// Global rate limit over every request.
pub async fn global_rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check(RateLimitKey::global()).await {
        Ok(RateLimitResult::Denied(denied)) => {
            tracing::warn!(limit = denied.limit, "Global rate limit exceeded");
            return RateLimitRejection {
                limit: denied.limit,
                retry_after_secs: denied.retry_after_secs,
                reset_at: denied.reset_at.as_unix_secs(),
            }
            .into_response();
        }
        Ok(RateLimitResult::Allowed(_)) => {}
        Err(e) => tracing::warn!(error = %e, "Rate limiter unavailable"),
    }

    next.run(request).await
}

/// Consumes one unit of the subscriber's cancel/reactivate quota.
///
/// Returns the remaining status for response headers, or `None` when the
/// limiter backend is unavailable.
pub async fn check_mutation_limit(
    limiter: &dyn RateLimiter,
    subscriber_id: &SubscriberId,
) -> Result<Option<RateLimitStatus>, RateLimitRejection> {
    match limiter
        .check(RateLimitKey::subscription_mutation(subscriber_id))
        .await
    {
        Ok(RateLimitResult::Allowed(status)) => Ok(Some(status)),
        Ok(RateLimitResult::Denied(denied)) => {
            tracing::warn!(
                subscriber_id = %subscriber_id,
                retry_after_secs = denied.retry_after_secs,
                "Subscription mutation rate limited"
            );
            Err(RateLimitRejection {
                limit: denied.limit,
                retry_after_secs: denied.retry_after_secs,
                reset_at: denied.reset_at.as_unix_secs(),
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rate limiter unavailable");
            Ok(None)
        }
    }
}

/// Rejection for rate limit exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRejection {
    /// The rate limit that was exceeded.
    pub limit: u32,
    /// Seconds until the limit resets.
    pub retry_after_secs: u32,
    /// Unix timestamp when the window resets.
    pub reset_at: i64,
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(
            "RATE_LIMIT",
            format!(
                "Too many requests. Try again in {} seconds",
                self.retry_after_secs
            ),
        );
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        add_rate_limit_headers(&mut response, self.limit, 0, self.reset_at);
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(self.retry_after_secs),
        );
        response
    }
}

/// Add rate limit headers to a response.
pub fn add_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32, reset_at: i64) {
    let headers = response.headers_mut();
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(
        headers::X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(remaining),
    );
    headers.insert(headers::X_RATELIMIT_RESET.clone(), HeaderValue::from(reset_at));
}
