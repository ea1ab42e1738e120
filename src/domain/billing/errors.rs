//! Errors for user-initiated subscription mutations.
//!
//! # API Codes
//!
//! | Error | Code | HTTP Status |
//! |-------|------|-------------|
//! | NotFound | `SUBSCRIPTION_NOT_FOUND` | 404 |
//! | AlreadyCanceled | `ALREADY_CANCELED` | 409 |
//! | AlreadyCanceling | `ALREADY_CANCELING` | 409 |
//! | NotCanceling | `NOT_CANCELING` | 409 |
//! | Expired | `SUBSCRIPTION_EXPIRED` | 410 |
//! | InvalidRequest | `INVALID_REQUEST` | 400 |
//! | RateLimited | `RATE_LIMIT` | 429 |
//! | Provider | `STRIPE_ERROR` | 502 |
//! | Infrastructure | `SERVER_ERROR` | 500 |

use axum::http::StatusCode;

use crate::domain::foundation::{CreatorId, DomainError};

/// Subscription mutation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The caller has no subscription to this creator.
    NotFound { creator_id: CreatorId },

    /// The subscription is already terminally canceled.
    AlreadyCanceled,

    /// Cancellation at period end is already scheduled.
    AlreadyCanceling,

    /// Reactivation requested for a subscription that is not scheduled to cancel.
    NotCanceling,

    /// The provider no longer has the subscription; the user must resubscribe.
    Expired,

    /// The request cannot be applied to this subscription.
    InvalidRequest(String),

    /// The caller exceeded the mutation rate limit, or the provider throttled us.
    RateLimited { retry_after_secs: u32 },

    /// The payment provider failed the call.
    Provider { message: String, retryable: bool },

    /// Local infrastructure failed.
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn not_found(creator_id: CreatorId) -> Self {
        SubscriptionError::NotFound { creator_id }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        SubscriptionError::InvalidRequest(reason.into())
    }

    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        SubscriptionError::Provider {
            message: message.into(),
            retryable,
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the stable API error code.
    pub fn code(&self) -> &'static str {
        match self {
            SubscriptionError::NotFound { .. } => "SUBSCRIPTION_NOT_FOUND",
            SubscriptionError::AlreadyCanceled => "ALREADY_CANCELED",
            SubscriptionError::AlreadyCanceling => "ALREADY_CANCELING",
            SubscriptionError::NotCanceling => "NOT_CANCELING",
            SubscriptionError::Expired => "SUBSCRIPTION_EXPIRED",
            SubscriptionError::InvalidRequest(_) => "INVALID_REQUEST",
            SubscriptionError::RateLimited { .. } => "RATE_LIMIT",
            SubscriptionError::Provider { .. } => "STRIPE_ERROR",
            SubscriptionError::Infrastructure(_) => "SERVER_ERROR",
        }
    }

    /// Returns a user-facing message. Provider and infrastructure detail is not exposed.
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::NotFound { creator_id } => {
                format!("No subscription found for creator {}", creator_id)
            }
            SubscriptionError::AlreadyCanceled => "Subscription is already canceled".to_string(),
            SubscriptionError::AlreadyCanceling => {
                "Subscription is already set to cancel at the end of the period".to_string()
            }
            SubscriptionError::NotCanceling => {
                "Subscription is not scheduled for cancellation".to_string()
            }
            SubscriptionError::Expired => {
                "Subscription has expired. Please subscribe again".to_string()
            }
            SubscriptionError::InvalidRequest(reason) => format!("Invalid request: {}", reason),
            SubscriptionError::RateLimited { retry_after_secs } => {
                format!("Too many requests. Try again in {} seconds", retry_after_secs)
            }
            SubscriptionError::Provider { retryable: true, .. } => {
                "Payment provider is unavailable. Please try again later".to_string()
            }
            SubscriptionError::Provider { .. } => {
                "Payment provider rejected the request".to_string()
            }
            SubscriptionError::Infrastructure(_) => {
                "Something went wrong. Please try again later".to_string()
            }
        }
    }

    /// Maps the error to the HTTP status returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::NotFound { .. } => StatusCode::NOT_FOUND,
            SubscriptionError::AlreadyCanceled
            | SubscriptionError::AlreadyCanceling
            | SubscriptionError::NotCanceling => StatusCode::CONFLICT,
            SubscriptionError::Expired => StatusCode::GONE,
            SubscriptionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            SubscriptionError::Provider { .. } => StatusCode::BAD_GATEWAY,
            SubscriptionError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::RateLimited { .. }
                | SubscriptionError::Infrastructure(_)
                | SubscriptionError::Provider { retryable: true, .. }
        )
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionError::Provider { message, .. } => {
                write!(f, "{}: {}", self.code(), message)
            }
            SubscriptionError::Infrastructure(message) => {
                write!(f, "{}: {}", self.code(), message)
            }
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

impl std::error::Error for SubscriptionError {}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        SubscriptionError::Infrastructure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_api_contract() {
        let creator = CreatorId::new("creator-1").unwrap();
        assert_eq!(SubscriptionError::not_found(creator).code(), "SUBSCRIPTION_NOT_FOUND");
        assert_eq!(SubscriptionError::AlreadyCanceled.code(), "ALREADY_CANCELED");
        assert_eq!(SubscriptionError::AlreadyCanceling.code(), "ALREADY_CANCELING");
        assert_eq!(SubscriptionError::NotCanceling.code(), "NOT_CANCELING");
        assert_eq!(SubscriptionError::Expired.code(), "SUBSCRIPTION_EXPIRED");
        assert_eq!(SubscriptionError::invalid_request("x").code(), "INVALID_REQUEST");
        assert_eq!(
            SubscriptionError::RateLimited { retry_after_secs: 5 }.code(),
            "RATE_LIMIT"
        );
        assert_eq!(SubscriptionError::provider("boom", false).code(), "STRIPE_ERROR");
        assert_eq!(SubscriptionError::infrastructure("db").code(), "SERVER_ERROR");
    }

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(SubscriptionError::AlreadyCanceling.status_code(), StatusCode::CONFLICT);
        assert_eq!(SubscriptionError::NotCanceling.status_code(), StatusCode::CONFLICT);
        assert_eq!(SubscriptionError::Expired.status_code(), StatusCode::GONE);
        assert_eq!(
            SubscriptionError::RateLimited { retry_after_secs: 1 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            SubscriptionError::provider("x", true).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            SubscriptionError::infrastructure("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn message_hides_provider_detail() {
        let err = SubscriptionError::provider("No such subscription: sub_secret", false);
        assert!(!err.message().contains("sub_secret"));
        assert!(err.to_string().contains("sub_secret"));
    }

    #[test]
    fn retryability_follows_error_class() {
        assert!(SubscriptionError::provider("timeout", true).is_retryable());
        assert!(!SubscriptionError::provider("bad param", false).is_retryable());
        assert!(SubscriptionError::RateLimited { retry_after_secs: 1 }.is_retryable());
        assert!(!SubscriptionError::AlreadyCanceled.is_retryable());
    }

    #[test]
    fn domain_error_becomes_infrastructure() {
        let err: SubscriptionError = DomainError::database("connection reset").into();
        assert!(matches!(err, SubscriptionError::Infrastructure(ref m) if m.contains("connection reset")));
    }
}
