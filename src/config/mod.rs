//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CREATOR_BILLING` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use creator_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod ledger;
mod notifications;
mod payment;
mod rate_limit;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use ledger::LedgerConfig;
pub use notifications::NotificationsConfig;
pub use payment::PaymentConfig;
pub use rate_limit::{RateLimitBackend, RateLimitSettings};
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (bind address, logging, timeouts)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (Stripe)
    pub payment: PaymentConfig,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CREATOR_BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CREATOR_BILLING__SERVER__BIND_ADDRESS=0.0.0.0:8080` -> `server.bind_address`
    /// - `CREATOR_BILLING__PAYMENT__STRIPE_API_KEY=...` -> `payment.stripe_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CREATOR_BILLING")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// A deployment without a webhook signing secret starts (and refuses
    /// every webhook) outside production; in production it is an error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.rate_limit.validate()?;
        self.notifications.validate()?;
        self.ledger.validate()?;

        if self.is_production() && self.payment.stripe_webhook_secret.is_none() {
            return Err(ValidationError::WebhookSecretRequired);
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "CREATOR_BILLING__DATABASE__URL",
        "CREATOR_BILLING__PAYMENT__STRIPE_API_KEY",
        "CREATOR_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET",
        "CREATOR_BILLING__SERVER__BIND_ADDRESS",
        "CREATOR_BILLING__SERVER__ENVIRONMENT",
        "CREATOR_BILLING__RATE_LIMIT__MUTATION_REQUESTS_PER_WINDOW",
        "CREATOR_BILLING__LEDGER__RETENTION_DAYS",
    ];

    fn set_minimal_env() {
        env::set_var(
            "CREATOR_BILLING__DATABASE__URL",
            "postgresql://billing@localhost/creator_billing",
        );
        env::set_var("CREATOR_BILLING__PAYMENT__STRIPE_API_KEY", "sk_test_xxx");
        env::set_var("CREATOR_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(
            config.database.url,
            "postgresql://billing@localhost/creator_billing"
        );
        assert_eq!(config.database.statement_timeout_secs, 10);
        assert_eq!(
            config.payment.stripe_webhook_secret.as_deref(),
            Some("whsec_xxx")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_section_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.bind_address.port(), 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.rate_limit.backend, RateLimitBackend::Memory);
        assert_eq!(config.notifications.max_attempts, 5);
        assert_eq!(config.ledger.retention_days, 30);
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CREATOR_BILLING__SERVER__BIND_ADDRESS", "127.0.0.1:3000");
        env::set_var("CREATOR_BILLING__RATE_LIMIT__MUTATION_REQUESTS_PER_WINDOW", "3");
        env::set_var("CREATOR_BILLING__LEDGER__RETENTION_DAYS", "45");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.bind_address.to_string(), "127.0.0.1:3000");
        assert_eq!(config.rate_limit.mutation_requests_per_window, 3);
        assert_eq!(config.ledger.retention_days, 45);
    }

    #[test]
    fn test_production_requires_webhook_secret() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("CREATOR_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET");
        env::set_var("CREATOR_BILLING__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::WebhookSecretRequired)
        );
    }

    #[test]
    fn test_development_without_webhook_secret_is_valid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("CREATOR_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
        assert!(config.payment.webhook_verifier().is_none());
    }
}
