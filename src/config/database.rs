//! Database configuration
//!
//! The pool serves two kinds of traffic: webhook deliveries (ledger check,
//! row resolution, ledger insert) and subscriber mutations. Both are short,
//! so acquisition and statement timeouts stay well below the provider's
//! webhook timeout; a stuck query surfaces as a 500 and a redelivery rather
//! than a hung connection.

use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use super::error::ValidationError;

const MAX_POOL_SIZE: u32 = 100;

/// PostgreSQL pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` connection URL
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a free connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Server-side `statement_timeout`, in seconds
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,

    /// Apply `migrations/` on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Opens the pool with the statement timeout applied to every connection.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        let options: PgConnectOptions = self.url.parse()?;
        let options = options.options([(
            "statement_timeout",
            format!("{}s", self.statement_timeout_secs),
        )]);

        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout())
            .connect_with(options)
            .await
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("database.url"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.max_connections == 0 {
            return Err(ValidationError::MustBePositive("database.max_connections"));
        }
        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.max_connections > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.acquire_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("database.acquire_timeout_secs"));
        }
        if self.statement_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("database.statement_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            statement_timeout_secs: default_statement_timeout(),
            run_migrations: default_run_migrations(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_statement_timeout() -> u64 {
    10
}

fn default_run_migrations() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgresql://billing@localhost/creator_billing".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_fail_fast() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(5));
        assert_eq!(config.statement_timeout_secs, 10);
        assert!(config.run_migrations);
    }

    #[test]
    fn url_is_required() {
        assert_eq!(
            DatabaseConfig::default().validate(),
            Err(ValidationError::MissingRequired("database.url"))
        );
    }

    #[test]
    fn only_postgres_urls_are_accepted() {
        let config = DatabaseConfig {
            url: "mysql://localhost/billing".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidDatabaseUrl));
    }

    #[test]
    fn pool_bounds_are_checked() {
        let inverted = DatabaseConfig {
            min_connections: 20,
            max_connections: 5,
            ..valid()
        };
        assert_eq!(inverted.validate(), Err(ValidationError::InvalidPoolSize));

        let oversized = DatabaseConfig {
            max_connections: 150,
            ..valid()
        };
        assert_eq!(oversized.validate(), Err(ValidationError::PoolSizeTooLarge));
    }

    #[test]
    fn zero_statement_timeout_is_rejected() {
        let config = DatabaseConfig {
            statement_timeout_secs: 0,
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MustBePositive("database.statement_timeout_secs"))
        );
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }
}
