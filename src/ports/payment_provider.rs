//! Payment provider port for the external system of record.
//!
//! Only two calls are needed: reading a subscription's authoritative state
//! and toggling cancel-at-period-end. The one contract the reconciliation
//! engine relies on is that a missing resource is distinguishable
//! (`PaymentErrorCode::NotFound`) from every other failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{ProviderSubscription, SubscriptionError, WebhookError};
use crate::domain::foundation::{DomainError, ErrorCode};

/// Retry hint used when the provider throttles without saying for how long.
const DEFAULT_PROVIDER_RETRY_AFTER_SECS: u32 = 30;

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Retrieves a subscription by provider ID. A missing subscription is `Ok(None)`.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError>;

    /// Schedules (`true`) or withdraws (`false`) cancellation at period end.
    ///
    /// A missing subscription is `Err` with `PaymentErrorCode::NotFound`.
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<ProviderSubscription, PaymentError>;
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Provider's retry hint for throttled calls.
    pub retry_after_secs: Option<u32>,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retry_after_secs: None,
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn with_retry_after(mut self, secs: u32) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    /// Create a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::RateLimitExceeded, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == PaymentErrorCode::NotFound
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(ErrorCode::ExternalServiceError, err.message)
            .with_detail("payment_error_code", err.code.to_string())
    }
}

impl From<PaymentError> for WebhookError {
    fn from(err: PaymentError) -> Self {
        WebhookError::Provider(err.to_string())
    }
}

/// Generic mapping for mutation paths. `NotFound` must be handled by the
/// caller first, since its meaning differs between cancel and reactivate.
impl From<PaymentError> for SubscriptionError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::RateLimitExceeded => SubscriptionError::RateLimited {
                retry_after_secs: err
                    .retry_after_secs
                    .unwrap_or(DEFAULT_PROVIDER_RETRY_AFTER_SECS),
            },
            PaymentErrorCode::InvalidRequest => SubscriptionError::InvalidRequest(err.message),
            _ => SubscriptionError::Provider {
                retryable: err.is_retryable(),
                message: err.to_string(),
            },
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// The provider rejected the request parameters.
    InvalidRequest,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// The provider returned a 5xx.
    ServiceUnavailable,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ServiceUnavailable
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ServiceUnavailable => "service_unavailable",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
