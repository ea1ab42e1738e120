//! In-memory implementation of NotificationOutbox.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::billing::BillingNotification;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{NotificationOutbox, OutboxEntry};

#[derive(Default)]
pub struct InMemoryNotificationOutbox {
    entries: RwLock<Vec<OutboxEntry>>,
}

impl InMemoryNotificationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every entry, in enqueue order.
    pub async fn entries(&self) -> Vec<OutboxEntry> {
        self.entries.read().await.clone()
    }

    /// Returns the queued notifications, in enqueue order.
    pub async fn notifications(&self) -> Vec<BillingNotification> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| e.notification.clone())
            .collect()
    }

    fn not_found(id: Uuid) -> DomainError {
        DomainError::new(ErrorCode::InternalError, "Outbox entry not found")
            .with_detail("entry_id", id.to_string())
    }
}

#[async_trait]
impl NotificationOutbox for InMemoryNotificationOutbox {
    async fn enqueue(&self, notification: BillingNotification) -> Result<OutboxEntry, DomainError> {
        let entry = OutboxEntry::new(notification);
        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn claim_due(&self, limit: u32, lease: Duration) -> Result<Vec<OutboxEntry>, DomainError> {
        let now = Utc::now();
        let held_until = now + chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::zero());

        let mut entries = self.entries.write().await;
        let mut claimed = Vec::new();
        for entry in entries
            .iter_mut()
            .filter(|e| e.is_due(now))
            .take(limit as usize)
        {
            claimed.push(entry.clone());
            entry.next_attempt_at = held_until;
        }
        Ok(claimed)
    }

    async fn mark_delivered(&self, id: Uuid) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        entry.mark_delivered();
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        max_attempts: u32,
        retry_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        entry.mark_failed(error, max_attempts, retry_at);
        Ok(())
    }
}
