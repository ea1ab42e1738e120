//! Billing notifications raised by event handlers.
//!
//! Handlers never deliver these directly; they are enqueued on the
//! notification outbox and dispatched outside the reconciliation path.

use serde::{Deserialize, Serialize};

use super::Subscription;
use crate::domain::foundation::{CreatorId, SubscriberId, SubscriptionId, Timestamp};

const SECONDS_PER_DAY: i64 = 86_400;

/// What the subscriber is being told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    /// A paid subscription became active.
    SubscriptionConfirmed,
    /// The first invoice after a trial was paid.
    TrialConverted,
    /// A past-due subscription was paid up.
    PaymentRecovered,
    /// An invoice payment failed; access is suspended.
    PaymentFailed,
    /// The trial ends soon.
    TrialEnding { days_remaining: i64 },
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::SubscriptionConfirmed => "subscription_confirmed",
            NotificationKind::TrialConverted => "trial_converted",
            NotificationKind::PaymentRecovered => "payment_recovered",
            NotificationKind::PaymentFailed => "payment_failed",
            NotificationKind::TrialEnding { .. } => "trial_ending",
        }
    }
}

/// A notification addressed to one subscriber about one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingNotification {
    pub subscription_id: SubscriptionId,
    pub subscriber_id: SubscriberId,
    pub creator_id: CreatorId,
    #[serde(flatten)]
    pub kind: NotificationKind,
}

impl BillingNotification {
    pub fn for_subscription(subscription: &Subscription, kind: NotificationKind) -> Self {
        Self {
            subscription_id: subscription.id,
            subscriber_id: subscription.subscriber_id.clone(),
            creator_id: subscription.creator_id.clone(),
            kind,
        }
    }
}

/// Whole days left until `trial_end`, rounded up and never negative.
pub fn days_until(trial_end: Timestamp, now: Timestamp) -> i64 {
    let secs = trial_end.duration_since(&now).num_seconds();
    if secs <= 0 {
        return 0;
    }
    (secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}
