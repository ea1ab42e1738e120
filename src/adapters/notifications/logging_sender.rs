//! NotificationSender that writes each notification to the log.
//!
//! Email and in-app delivery live outside this service; this adapter is the
//! default until one is wired in, and makes queued notifications visible in
//! development.

use async_trait::async_trait;

use crate::domain::billing::BillingNotification;
use crate::domain::foundation::DomainError;
use crate::ports::NotificationSender;

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationSender;

impl LoggingNotificationSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn send(&self, notification: &BillingNotification) -> Result<(), DomainError> {
        tracing::info!(
            subscription_id = %notification.subscription_id,
            subscriber_id = %notification.subscriber_id,
            creator_id = %notification.creator_id,
            kind = notification.kind.as_str(),
            "Billing notification"
        );
        Ok(())
    }
}
