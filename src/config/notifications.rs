//! Notification dispatcher configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::events::NotificationDispatcherConfig;
use crate::ports::RetryBackoff;

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Delay between outbox polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Entries delivered per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Attempts before an entry is parked as dead
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles per failed attempt
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// How long a claimed entry stays hidden from other dispatchers
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: u64,
}

impl NotificationsConfig {
    pub fn dispatcher_config(&self) -> NotificationDispatcherConfig {
        NotificationDispatcherConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_batch_size(self.batch_size)
            .with_max_attempts(self.max_attempts)
            .with_backoff(RetryBackoff {
                base: Duration::from_millis(self.backoff_base_ms),
                max: Duration::from_millis(self.backoff_max_ms),
            })
            .with_claim_lease(Duration::from_secs(self.claim_lease_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::MustBePositive(
                "notifications.poll_interval_ms",
            ));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::MustBePositive("notifications.batch_size"));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::MustBePositive("notifications.max_attempts"));
        }
        if self.backoff_base_ms == 0 {
            return Err(ValidationError::MustBePositive("notifications.backoff_base_ms"));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(ValidationError::InvalidBackoff);
        }
        if self.claim_lease_secs == 0 {
            return Err(ValidationError::MustBePositive("notifications.claim_lease_secs"));
        }
        Ok(())
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            claim_lease_secs: default_claim_lease_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_batch_size() -> u32 {
    50
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    300_000
}

fn default_claim_lease_secs() -> u64 {
    60
}
