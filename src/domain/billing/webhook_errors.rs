//! Webhook error types for provider event intake.
//!
//! Every failure of the reconciliation endpoint lands here, with the HTTP
//! status the provider sees. 4xx means the delivery can never succeed as
//! sent; 5xx asks the provider to redeliver with backoff.

use axum::http::StatusCode;
use thiserror::Error;

use super::status_mapper::UnsupportedStatus;
use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signature header on the request.
    #[error("Missing signature header")]
    MissingSignature,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature timestamp is outside the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Failed to parse the signature header or the payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A test-mode event reached an endpoint that only accepts live events.
    #[error("Livemode mismatch")]
    LivemodeMismatch,

    /// The webhook signing secret is not configured on this deployment.
    #[error("Webhook secret not configured")]
    SecretNotConfigured,

    /// A verified event of a handled type carries an object that does not decode.
    #[error("Malformed event object: {0}")]
    MalformedObject(String),

    /// The provider reported a subscription status this system does not map.
    #[error("Unsupported provider status: {0}")]
    UnsupportedStatus(String),

    /// A call to the payment provider failed.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this event.
    ///
    /// Verification failures never become valid on redelivery; everything
    /// after verification may.
    pub fn is_retryable(&self) -> bool {
        self.status_code().is_server_error() && !matches!(self, WebhookError::SecretNotConfigured)
    }

    /// Maps the error to the HTTP status code returned to the provider.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::ParseError(_)
            | WebhookError::LivemodeMismatch => StatusCode::BAD_REQUEST,

            WebhookError::SecretNotConfigured
            | WebhookError::MalformedObject(_)
            | WebhookError::UnsupportedStatus(_)
            | WebhookError::Provider(_)
            | WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true for failures of the verification gate.
    pub fn is_verification_failure(&self) -> bool {
        self.status_code() == StatusCode::BAD_REQUEST
    }
}

impl From<UnsupportedStatus> for WebhookError {
    fn from(err: UnsupportedStatus) -> Self {
        WebhookError::UnsupportedStatus(err.status)
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}
