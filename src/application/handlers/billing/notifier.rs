//! Enqueues billing notifications without letting them fail the event.

use std::sync::Arc;

use crate::domain::billing::{BillingNotification, NotificationKind, Subscription};
use crate::ports::NotificationOutbox;

/// Thin wrapper over the outbox used by every event handler.
#[derive(Clone)]
pub struct Notifier {
    outbox: Arc<dyn NotificationOutbox>,
}

impl Notifier {
    pub fn new(outbox: Arc<dyn NotificationOutbox>) -> Self {
        Self { outbox }
    }

    /// Queues a notification. Failures are logged and swallowed.
    pub async fn notify(&self, subscription: &Subscription, kind: NotificationKind) {
        let kind_name = kind.as_str();
        let notification = BillingNotification::for_subscription(subscription, kind);

        match self.outbox.enqueue(notification).await {
            Ok(entry) => tracing::debug!(
                subscription_id = %subscription.id,
                outbox_entry_id = %entry.id,
                kind = kind_name,
                "Notification queued"
            ),
            Err(e) => tracing::warn!(
                subscription_id = %subscription.id,
                kind = kind_name,
                error = %e,
                "Failed to queue notification"
            ),
        }
    }
}
