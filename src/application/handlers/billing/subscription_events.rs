//! SubscriptionEventsHandler - Lifecycle events carrying a full provider subscription.
//!
//! `created` and `updated` may arrive before the checkout event for the same
//! purchase, so both can create the local row. Created patches only period
//! and cancel flag on a row that already exists; updated converges the row
//! fully onto the provider's state.

use crate::domain::billing::{
    days_until, extract_period, map_provider_status, CorrelationKey, NotificationKind,
    ProviderSubscription, Subscription, SubscriptionStatus, WebhookError,
};
use crate::domain::foundation::Timestamp;

use super::event_router::{EventOutcome, IgnoreReason};
use super::notifier::Notifier;
use super::subscription_sync::{should_relink, Creation, InitialState, Located, SubscriptionSync};

pub struct SubscriptionEventsHandler {
    sync: SubscriptionSync,
    notifier: Notifier,
}

/// Result of resolving or creating the row for an incoming subscription.
enum Resolved {
    Found(Located),
    /// Created by this event with the incoming state already applied.
    Created(Subscription),
    Ignored(IgnoreReason),
}

impl SubscriptionEventsHandler {
    pub fn new(sync: SubscriptionSync, notifier: Notifier) -> Self {
        Self { sync, notifier }
    }

    /// `customer.subscription.created`
    pub async fn created(
        &self,
        subscription: &ProviderSubscription,
    ) -> Result<EventOutcome, WebhookError> {
        let state = initial_state(subscription)?;

        let row = match self.resolve(subscription, state).await? {
            Resolved::Ignored(reason) => return Ok(EventOutcome::Ignored(reason)),
            Resolved::Created(row) => row,
            Resolved::Found(Located::Linked(mut row)) => {
                row.apply_period(state.period);
                row.set_cancel_at_period_end(state.cancel_at_period_end);
                self.sync.repository().update(&row).await?;
                row
            }
            Resolved::Found(Located::ByPair(row)) => {
                if !should_relink(&row, &subscription.id) {
                    return Ok(EventOutcome::Ignored(IgnoreReason::LinkedElsewhere));
                }
                self.sync.adopt(row, &subscription.id, state).await?
            }
        };

        if state.status == SubscriptionStatus::Active {
            self.notifier
                .notify(&row, NotificationKind::SubscriptionConfirmed)
                .await;
        }

        Ok(EventOutcome::Applied(row.id))
    }

    /// `customer.subscription.updated`
    ///
    /// Canceled rows are not terminal for this path: the provider is the
    /// system of record, and an update it reports after deletion is applied.
    pub async fn updated(
        &self,
        subscription: &ProviderSubscription,
    ) -> Result<EventOutcome, WebhookError> {
        let state = initial_state(subscription)?;

        let mut row = match self.resolve(subscription, state).await? {
            Resolved::Ignored(reason) => return Ok(EventOutcome::Ignored(reason)),
            Resolved::Created(row) => return Ok(EventOutcome::Applied(row.id)),
            Resolved::Found(Located::Linked(row)) => row,
            Resolved::Found(Located::ByPair(mut row)) => {
                if !should_relink(&row, &subscription.id) {
                    return Ok(EventOutcome::Ignored(IgnoreReason::LinkedElsewhere));
                }
                row.link_provider(&subscription.id);
                row
            }
        };

        let previous = row.apply_provider_state(
            state.status,
            state.period,
            state.cancel_at_period_end,
        );
        self.sync.repository().update(&row).await?;

        if let Some(previous) = previous {
            tracing::info!(
                subscription_id = %row.id,
                provider_subscription_id = %subscription.id,
                from = %previous,
                to = %row.status,
                "Subscription status changed"
            );
        }

        Ok(EventOutcome::Applied(row.id))
    }

    /// `customer.subscription.deleted`
    pub async fn deleted(
        &self,
        subscription: &ProviderSubscription,
    ) -> Result<EventOutcome, WebhookError> {
        let correlation = subscription.correlation();
        let located = self
            .sync
            .locate(&subscription.id, correlation.as_ref())
            .await?;

        let mut row = match located {
            None => {
                tracing::warn!(
                    provider_subscription_id = %subscription.id,
                    "Deletion for unknown subscription"
                );
                return Ok(EventOutcome::Ignored(IgnoreReason::SubscriptionNotFound));
            }
            Some(Located::Linked(row)) => row,
            Some(Located::ByPair(mut row)) => {
                if !should_relink(&row, &subscription.id) {
                    return Ok(EventOutcome::Ignored(IgnoreReason::LinkedElsewhere));
                }
                row.link_provider(&subscription.id);
                row
            }
        };

        row.mark_canceled();
        self.sync.repository().update(&row).await?;

        tracing::info!(
            subscription_id = %row.id,
            provider_subscription_id = %subscription.id,
            "Subscription canceled"
        );

        Ok(EventOutcome::Applied(row.id))
    }

    /// `customer.subscription.trial_will_end`
    pub async fn trial_will_end(
        &self,
        subscription: &ProviderSubscription,
    ) -> Result<EventOutcome, WebhookError> {
        let correlation = subscription.correlation();
        let Some(row) = self
            .sync
            .locate(&subscription.id, correlation.as_ref())
            .await?
            .map(Located::into_inner)
        else {
            tracing::warn!(
                provider_subscription_id = %subscription.id,
                "Trial ending for unknown subscription"
            );
            return Ok(EventOutcome::Ignored(IgnoreReason::SubscriptionNotFound));
        };

        let Some(trial_end) = subscription.trial_end.and_then(Timestamp::from_unix_secs) else {
            tracing::warn!(
                subscription_id = %row.id,
                provider_subscription_id = %subscription.id,
                "Trial ending event without trial end"
            );
            return Ok(EventOutcome::Ignored(IgnoreReason::MissingTrialEnd));
        };

        let days_remaining = days_until(trial_end, Timestamp::now());
        self.notifier
            .notify(&row, NotificationKind::TrialEnding { days_remaining })
            .await;

        Ok(EventOutcome::Unchanged(row.id))
    }

    /// Finds the row by reference then pair, creating it from metadata when absent.
    async fn resolve(
        &self,
        subscription: &ProviderSubscription,
        state: InitialState,
    ) -> Result<Resolved, WebhookError> {
        let correlation = subscription.correlation();
        if let Some(located) = self
            .sync
            .locate(&subscription.id, correlation.as_ref())
            .await?
        {
            return Ok(Resolved::Found(located));
        }

        let Some(key) = correlation else {
            tracing::warn!(
                provider_subscription_id = %subscription.id,
                "Unknown subscription without subscriber/creator metadata"
            );
            return Ok(Resolved::Ignored(IgnoreReason::MissingCorrelation));
        };

        Ok(match self.sync.create(&key, &subscription.id, state).await? {
            Creation::Inserted(row) => Resolved::Created(row),
            Creation::Existing(row) => Resolved::Found(Located::ByPair(row)),
            Creation::UnknownCreator => {
                log_unknown_creator(&key, &subscription.id);
                Resolved::Ignored(IgnoreReason::UnknownCreator)
            }
        })
    }
}

fn initial_state(subscription: &ProviderSubscription) -> Result<InitialState, WebhookError> {
    let status = map_provider_status(&subscription.status).map_err(|e| {
        tracing::error!(
            provider_subscription_id = %subscription.id,
            provider_status = %e.status,
            "Unsupported provider status"
        );
        e
    })?;

    Ok(InitialState {
        status,
        period: extract_period(subscription),
        cancel_at_period_end: subscription.cancel_at_period_end,
    })
}

fn log_unknown_creator(key: &CorrelationKey, provider_subscription_id: &str) {
    tracing::warn!(
        creator_id = %key.creator_id,
        provider_subscription_id,
        "Subscription for creator without a current price"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCreatorPricing, InMemoryNotificationOutbox, InMemorySubscriptionRepository,
    };
    use crate::domain::billing::BillingPeriod;
    use crate::domain::foundation::{CreatorId, MinorUnits, SubscriberId};
    use crate::ports::SubscriptionRepository;
    use serde_json::{json, Value};
    use std::sync::Arc;

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        handler: SubscriptionEventsHandler,
        repo: Arc<InMemorySubscriptionRepository>,
        outbox: Arc<InMemoryNotificationOutbox>,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let pricing = Arc::new(InMemoryCreatorPricing::new());
        pricing
            .set_price(CreatorId::new("creator-1").unwrap(), MinorUnits::new(499).unwrap())
            .await;
        let outbox = Arc::new(InMemoryNotificationOutbox::new());
        let handler = SubscriptionEventsHandler::new(
            SubscriptionSync::new(repo.clone(), pricing),
            Notifier::new(outbox.clone()),
        );
        Fixture {
            handler,
            repo,
            outbox,
        }
    }

    fn provider_subscription(overrides: Value) -> ProviderSubscription {
        let mut base = json!({
            "id": "sub_1",
            "status": "active",
            "cancel_at_period_end": false,
            "current_period_start": 1_704_067_200,
            "current_period_end": 1_706_745_600,
            "metadata": { "subscriber_id": "user-1", "creator_id": "creator-1" }
        });
        if let (Some(base), Some(overrides)) = (base.as_object_mut(), overrides.as_object()) {
            for (k, v) in overrides {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    fn stored(status: SubscriptionStatus, provider_id: Option<&str>) -> Subscription {
        Subscription::create(
            SubscriberId::new("user-1").unwrap(),
            CreatorId::new("creator-1").unwrap(),
            provider_id.map(str::to_string),
            status,
            BillingPeriod::default(),
            false,
            MinorUnits::new(300).unwrap(),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // created
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn created_inserts_row_and_confirms_active_subscription() {
        let f = fixture().await;

        let outcome = f.handler.created(&provider_subscription(json!({}))).await.unwrap();

        assert!(matches!(outcome, EventOutcome::Applied(_)));
        let row = f.repo.find_by_provider_id("sub_1").await.unwrap().unwrap();
        assert_eq!(row.status, SubscriptionStatus::Active);
        let sent = f.outbox.notifications().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::SubscriptionConfirmed);
    }

    #[tokio::test]
    async fn created_for_trial_does_not_confirm() {
        let f = fixture().await;

        f.handler
            .created(&provider_subscription(json!({ "status": "trialing" })))
            .await
            .unwrap();

        assert!(f.outbox.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn created_on_linked_row_patches_period_only() {
        let f = fixture().await;
        let row = stored(SubscriptionStatus::PastDue, Some("sub_1"));
        f.repo.insert_if_absent(&row).await.unwrap();

        f.handler
            .created(&provider_subscription(json!({ "cancel_at_period_end": true })))
            .await
            .unwrap();

        let after = f.repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(after.status, SubscriptionStatus::PastDue);
        assert!(after.cancel_at_period_end);
        assert_eq!(after.current_period_end.unwrap().as_unix_secs(), 1_706_745_600);
    }

    #[tokio::test]
    async fn created_without_metadata_for_unknown_subscription_is_ignored() {
        let f = fixture().await;

        let outcome = f
            .handler
            .created(&provider_subscription(json!({ "metadata": {} })))
            .await
            .unwrap();

        assert_eq!(outcome, EventOutcome::Ignored(IgnoreReason::MissingCorrelation));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // updated
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn updated_converges_status_and_flag() {
        let f = fixture().await;
        let row = stored(SubscriptionStatus::Trialing, Some("sub_1"));
        f.repo.insert_if_absent(&row).await.unwrap();

        f.handler
            .updated(&provider_subscription(json!({
                "status": "past_due",
                "cancel_at_period_end": true
            })))
            .await
            .unwrap();

        let after = f.repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(after.status, SubscriptionStatus::PastDue);
        assert!(after.cancel_at_period_end);
        assert_eq!(after.price_at_purchase.value(), 300);
    }

    #[tokio::test]
    async fn updated_reactivates_a_canceled_row() {
        let f = fixture().await;
        let mut row = stored(SubscriptionStatus::Active, Some("sub_1"));
        row.mark_canceled();
        f.repo.insert_if_absent(&row).await.unwrap();

        f.handler.updated(&provider_subscription(json!({}))).await.unwrap();

        let after = f.repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(after.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn updated_with_unknown_status_leaves_row_untouched() {
        let f = fixture().await;
        let row = stored(SubscriptionStatus::PastDue, Some("sub_1"));
        f.repo.insert_if_absent(&row).await.unwrap();

        let err = f
            .handler
            .updated(&provider_subscription(json!({ "status": "mystery" })))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 500);
        let after = f.repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(after.status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn updated_for_pair_linked_to_other_live_subscription_is_ignored() {
        let f = fixture().await;
        let row = stored(SubscriptionStatus::Active, Some("sub_other"));
        f.repo.insert_if_absent(&row).await.unwrap();

        let outcome = f
            .handler
            .updated(&provider_subscription(json!({ "status": "canceled" })))
            .await
            .unwrap();

        assert_eq!(outcome, EventOutcome::Ignored(IgnoreReason::LinkedElsewhere));
        let after = f.repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(after.status, SubscriptionStatus::Active);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // deleted / trial_will_end
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn deleted_cancels_and_clears_flag() {
        let f = fixture().await;
        let mut row = stored(SubscriptionStatus::Active, Some("sub_1"));
        row.set_cancel_at_period_end(true);
        f.repo.insert_if_absent(&row).await.unwrap();

        f.handler.deleted(&provider_subscription(json!({}))).await.unwrap();

        let after = f.repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(after.status, SubscriptionStatus::Canceled);
        assert!(!after.cancel_at_period_end);
    }

    #[tokio::test]
    async fn deleted_for_unknown_subscription_is_acknowledged() {
        let f = fixture().await;

        let outcome = f.handler.deleted(&provider_subscription(json!({}))).await.unwrap();

        assert_eq!(outcome, EventOutcome::Ignored(IgnoreReason::SubscriptionNotFound));
    }

    #[tokio::test]
    async fn trial_will_end_notifies_with_days_remaining() {
        let f = fixture().await;
        let row = stored(SubscriptionStatus::Trialing, Some("sub_1"));
        f.repo.insert_if_absent(&row).await.unwrap();
        let trial_end = Timestamp::now().add_days(3).plus_secs(-60).as_unix_secs();

        f.handler
            .trial_will_end(&provider_subscription(json!({ "trial_end": trial_end })))
            .await
            .unwrap();

        let sent = f.outbox.notifications().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::TrialEnding { days_remaining: 3 });
    }

    #[tokio::test]
    async fn trial_will_end_without_trial_end_is_ignored() {
        let f = fixture().await;
        let row = stored(SubscriptionStatus::Trialing, Some("sub_1"));
        f.repo.insert_if_absent(&row).await.unwrap();

        let outcome = f
            .handler
            .trial_will_end(&provider_subscription(json!({})))
            .await
            .unwrap();

        assert_eq!(outcome, EventOutcome::Ignored(IgnoreReason::MissingTrialEnd));
        assert!(f.outbox.notifications().await.is_empty());
    }
}
