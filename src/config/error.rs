//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A configuration value that loaded but cannot run the service
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Listen port must not be zero")]
    InvalidPort,

    #[error("Request timeout out of range")]
    InvalidTimeout,

    #[error("Database URL must use postgres:// or postgresql://")]
    InvalidDatabaseUrl,

    #[error("Redis URL must use redis:// or rediss://")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Stripe API key must start with sk_")]
    InvalidStripeKey,

    #[error("Stripe webhook secret must start with whsec_")]
    InvalidStripeWebhookSecret,

    #[error("Webhook signing secret is required in production")]
    WebhookSecretRequired,

    #[error("Notification backoff cap is below the base delay")]
    InvalidBackoff,

    #[error("Invalid value for {0}: must be greater than zero")]
    MustBePositive(&'static str),
}
