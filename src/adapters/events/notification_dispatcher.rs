//! NotificationDispatcher - Background delivery of queued billing notifications.
//!
//! Event handlers only enqueue. This service drains the outbox outside the
//! webhook request path, so a slow or failing delivery channel never delays
//! the provider's acknowledgement.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 500ms | How often to check for pending notifications |
//! | `batch_size` | 50 | Max notifications delivered per poll cycle |
//! | `max_attempts` | 5 | Attempts before an entry is parked as dead |
//! | `backoff` | 1s doubling, capped at 5min | Delay before a failed entry is retried |
//! | `claim_lease` | 60s | How long a claimed entry is hidden from other dispatchers |
//!
//! ## Graceful Shutdown
//!
//! The service listens for a shutdown signal and drains one final batch
//! before stopping.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::DomainError;
use crate::ports::{NotificationOutbox, NotificationSender, RetryBackoff};

#[derive(Debug, Clone)]
pub struct NotificationDispatcherConfig {
    pub poll_interval: Duration,
    pub batch_size: u32,
    pub max_attempts: u32,
    pub backoff: RetryBackoff,
    pub claim_lease: Duration,
}

impl Default for NotificationDispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            batch_size: 50,
            max_attempts: 5,
            backoff: RetryBackoff::default(),
            claim_lease: Duration::from_secs(60),
        }
    }
}

impl NotificationDispatcherConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }
}

/// Counts from one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct NotificationDispatcher {
    outbox: Arc<dyn NotificationOutbox>,
    sender: Arc<dyn NotificationSender>,
    config: NotificationDispatcherConfig,
}

impl NotificationDispatcher {
    pub fn new(outbox: Arc<dyn NotificationOutbox>, sender: Arc<dyn NotificationSender>) -> Self {
        Self::with_config(outbox, sender, NotificationDispatcherConfig::default())
    }

    pub fn with_config(
        outbox: Arc<dyn NotificationOutbox>,
        sender: Arc<dyn NotificationSender>,
        config: NotificationDispatcherConfig,
    ) -> Self {
        Self {
            outbox,
            sender,
            config,
        }
    }

    /// Run the dispatch loop until the shutdown signal is received.
    ///
    /// Outbox failures are logged and retried on the next tick; they never
    /// stop the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.dispatch_logged().await;
                        tracing::info!("Notification dispatcher stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.dispatch_logged().await;
                }
            }
        }
    }

    async fn dispatch_logged(&self) {
        if let Err(e) = self.process_batch().await {
            tracing::error!(error = %e, "Notification dispatch cycle failed");
        }
    }

    /// Claims and delivers a single batch of due notifications.
    pub async fn process_batch(&self) -> Result<DispatchReport, DomainError> {
        let entries = self
            .outbox
            .claim_due(self.config.batch_size, self.config.claim_lease)
            .await?;
        let mut report = DispatchReport::default();

        for entry in entries {
            match self.sender.send(&entry.notification).await {
                Ok(()) => {
                    self.outbox.mark_delivered(entry.id).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    let error_msg = e.to_string();
                    let attempt = entry.attempts + 1;
                    let final_attempt = attempt >= self.config.max_attempts;
                    let retry_at = self.config.backoff.retry_at(attempt, Utc::now());
                    if final_attempt {
                        tracing::error!(
                            outbox_entry_id = %entry.id,
                            subscription_id = %entry.notification.subscription_id,
                            kind = entry.notification.kind.as_str(),
                            error = %error_msg,
                            "Notification parked after final attempt"
                        );
                    } else {
                        tracing::warn!(
                            outbox_entry_id = %entry.id,
                            attempt,
                            retry_at = %retry_at,
                            error = %error_msg,
                            "Notification delivery failed"
                        );
                    }
                    self.outbox
                        .mark_failed(entry.id, &error_msg, self.config.max_attempts, retry_at)
                        .await?;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
