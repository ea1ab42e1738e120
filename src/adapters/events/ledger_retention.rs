//! LedgerRetentionTask - Prunes old idempotency ledger rows.
//!
//! The provider stops redelivering an event after a few days, so rows older
//! than the retention window can no longer catch a duplicate.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::ProcessedEventLedger;

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

pub struct LedgerRetentionTask {
    ledger: Arc<dyn ProcessedEventLedger>,
    retention_days: u32,
    sweep_interval: Duration,
}

impl LedgerRetentionTask {
    pub fn new(
        ledger: Arc<dyn ProcessedEventLedger>,
        retention_days: u32,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            retention_days,
            sweep_interval,
        }
    }

    /// Sweeps on every interval tick until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.sweep_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_at(Timestamp::now()).await {
                        tracing::error!(error = %e, "Ledger retention sweep failed");
                    }
                }
            }
        }
    }

    /// Deletes rows older than the retention window as of `now`.
    pub async fn sweep_at(&self, now: Timestamp) -> Result<u64, DomainError> {
        let cutoff = now.add_days(-i64::from(self.retention_days));
        let removed = self.ledger.delete_before(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, retention_days = self.retention_days, "Pruned processed events");
        }
        Ok(removed)
    }
}
