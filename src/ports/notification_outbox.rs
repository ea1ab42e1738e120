//! NotificationOutbox port - Outbound queue for billing notifications.
//!
//! Event handlers enqueue; a background dispatcher delivers. Delivery
//! failures are retried with exponential backoff and can never affect the
//! reconciliation of billing state.
//!
//! Entries are claimed before delivery. A claim moves `next_attempt_at`
//! forward by a lease, so a second dispatcher skips the entry; a claim that
//! is never settled becomes due again when its lease lapses.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::billing::BillingNotification;
use crate::domain::foundation::DomainError;

/// Status of an outbox entry in the delivery pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Waiting for its first delivery attempt
    Pending,
    /// Delivered to the sender
    Delivered,
    /// Last attempt failed; will be retried
    Failed,
    /// Attempts exhausted; parked for manual inspection
    Dead,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Dead => "dead",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeliveryStatus::Pending),
            "delivered" => Some(DeliveryStatus::Delivered),
            "failed" => Some(DeliveryStatus::Failed),
            "dead" => Some(DeliveryStatus::Dead),
            _ => None,
        }
    }
}

/// An entry in the notification outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,

    pub notification: BillingNotification,

    pub status: DeliveryStatus,

    pub created_at: DateTime<Utc>,

    /// When the entry was last attempted
    pub processed_at: Option<DateTime<Utc>>,

    pub attempts: u32,

    pub last_error: Option<String>,

    /// Not picked up before this instant (retry backoff or claim lease)
    pub next_attempt_at: DateTime<Utc>,
}

/// Exponential backoff between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(300),
        }
    }
}

impl RetryBackoff {
    /// Delay before the next attempt once `failed_attempts` have failed.
    ///
    /// `base`, `2 * base`, `4 * base`, ... capped at `max`.
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// When an entry with `failed_attempts` failures becomes due again.
    pub fn retry_at(&self, failed_attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::from_std(self.delay(failed_attempts))
            .unwrap_or_else(|_| chrono::Duration::seconds(self.max.as_secs() as i64))
    }
}

impl OutboxEntry {
    /// Create a new pending outbox entry.
    pub fn new(notification: BillingNotification) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            notification,
            status: DeliveryStatus::Pending,
            created_at: now,
            processed_at: None,
            attempts: 0,
            last_error: None,
            next_attempt_at: now,
        }
    }

    /// Mark the entry as delivered.
    pub fn mark_delivered(&mut self) {
        self.status = DeliveryStatus::Delivered;
        self.processed_at = Some(Utc::now());
        self.attempts += 1;
    }

    /// Mark the entry as failed, parking it once `max_attempts` is reached.
    /// Otherwise it is not due again until `retry_at`.
    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        max_attempts: u32,
        retry_at: DateTime<Utc>,
    ) {
        self.attempts += 1;
        self.status = if self.attempts >= max_attempts {
            DeliveryStatus::Dead
        } else {
            DeliveryStatus::Failed
        };
        self.processed_at = Some(Utc::now());
        self.last_error = Some(error.into());
        self.next_attempt_at = retry_at;
    }

    /// Returns true while the dispatcher should still pick this entry up.
    pub fn is_deliverable(&self) -> bool {
        matches!(self.status, DeliveryStatus::Pending | DeliveryStatus::Failed)
    }

    /// Deliverable and past its backoff or lease.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_deliverable() && self.next_attempt_at <= now
    }
}

/// Port for the notification outbox.
#[async_trait]
pub trait NotificationOutbox: Send + Sync {
    /// Queue a notification for delivery.
    async fn enqueue(&self, notification: BillingNotification) -> Result<OutboxEntry, DomainError>;

    /// Claims up to `limit` due entries (pending or failed, past their
    /// `next_attempt_at`), oldest first, holding each for `lease`.
    ///
    /// An entry claimed by one caller is not returned to another until the
    /// lease lapses.
    async fn claim_due(&self, limit: u32, lease: Duration) -> Result<Vec<OutboxEntry>, DomainError>;

    async fn mark_delivered(&self, id: Uuid) -> Result<(), DomainError>;

    /// Records a failed attempt. The entry becomes `Dead` once `max_attempts`
    /// is reached; otherwise it is due again at `retry_at`.
    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        max_attempts: u32,
        retry_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
}

/// Port for delivering a notification (email, in-app) to the subscriber.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &BillingNotification) -> Result<(), DomainError>;
}
