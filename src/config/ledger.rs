//! Idempotency ledger retention configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::events::DEFAULT_RETENTION_DAYS;

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Days a processed event id is remembered. Must exceed the provider's
    /// redelivery window.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Seconds between retention sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl LedgerConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retention_days == 0 {
            return Err(ValidationError::MustBePositive("ledger.retention_days"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::MustBePositive("ledger.sweep_interval_secs"));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_sweep_interval_secs() -> u64 {
    3600
}
