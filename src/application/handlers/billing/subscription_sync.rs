//! Record resolution shared by the event handlers.
//!
//! Every path that may be first to see a provider subscription resolves the
//! local row the same way: by provider reference, then by the
//! (subscriber, creator) pair from metadata, then by inserting under the
//! pair's uniqueness constraint.

use std::sync::Arc;

use crate::domain::billing::{
    BillingPeriod, CorrelationKey, Subscription, SubscriptionStatus, WebhookError,
};
use crate::ports::{CreatorPricing, InsertOutcome, SubscriptionRepository};

/// How a row was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// Already linked to this provider subscription.
    Linked(Subscription),
    /// Found by (subscriber, creator); the reference still needs backfilling.
    ByPair(Subscription),
}

impl Located {
    pub fn into_inner(self) -> Subscription {
        match self {
            Located::Linked(sub) | Located::ByPair(sub) => sub,
        }
    }
}

/// Result of trying to create a row for a provider subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation {
    Inserted(Subscription),
    /// A concurrent path created the pair's row first.
    Existing(Subscription),
    /// The creator has no current price; the row cannot be priced.
    UnknownCreator,
}

/// Initial state for a newly created row.
#[derive(Debug, Clone, Copy)]
pub struct InitialState {
    pub status: SubscriptionStatus,
    pub period: BillingPeriod,
    pub cancel_at_period_end: bool,
}

#[derive(Clone)]
pub struct SubscriptionSync {
    repository: Arc<dyn SubscriptionRepository>,
    pricing: Arc<dyn CreatorPricing>,
}

impl SubscriptionSync {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        pricing: Arc<dyn CreatorPricing>,
    ) -> Self {
        Self {
            repository,
            pricing,
        }
    }

    pub fn repository(&self) -> &Arc<dyn SubscriptionRepository> {
        &self.repository
    }

    /// Finds the row for a provider subscription, by reference first, then by pair.
    pub async fn locate(
        &self,
        provider_subscription_id: &str,
        correlation: Option<&CorrelationKey>,
    ) -> Result<Option<Located>, WebhookError> {
        if let Some(sub) = self
            .repository
            .find_by_provider_id(provider_subscription_id)
            .await?
        {
            return Ok(Some(Located::Linked(sub)));
        }

        let Some(key) = correlation else {
            return Ok(None);
        };

        Ok(self
            .repository
            .find_by_pair(&key.subscriber_id, &key.creator_id)
            .await?
            .map(Located::ByPair))
    }

    /// Creates the pair's row with the creator's current price.
    pub async fn create(
        &self,
        key: &CorrelationKey,
        provider_subscription_id: &str,
        initial: InitialState,
    ) -> Result<Creation, WebhookError> {
        let Some(price) = self.pricing.current_price(&key.creator_id).await? else {
            return Ok(Creation::UnknownCreator);
        };

        let subscription = Subscription::create(
            key.subscriber_id.clone(),
            key.creator_id.clone(),
            Some(provider_subscription_id.to_string()),
            initial.status,
            initial.period,
            initial.cancel_at_period_end,
            price,
        );

        Ok(match self.repository.insert_if_absent(&subscription).await? {
            InsertOutcome::Inserted(sub) => {
                tracing::info!(
                    subscription_id = %sub.id,
                    provider_subscription_id,
                    status = %sub.status,
                    price_at_purchase = %sub.price_at_purchase,
                    "Subscription created"
                );
                Creation::Inserted(sub)
            }
            InsertOutcome::Existing(sub) => Creation::Existing(sub),
        })
    }

    /// Reconciles a row found by pair (or lost an insert race) with an incoming
    /// provider subscription. Only the reference is patched, unless the row is a
    /// canceled one being picked up by a new checkout, which takes the full
    /// provider state and the creator's current price.
    pub async fn adopt(
        &self,
        mut subscription: Subscription,
        provider_subscription_id: &str,
        incoming: InitialState,
    ) -> Result<Subscription, WebhookError> {
        if is_resubscription(&subscription, provider_subscription_id) {
            let price = match self.pricing.current_price(&subscription.creator_id).await? {
                Some(price) => price,
                None => {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        creator_id = %subscription.creator_id,
                        "Creator has no current price; keeping previous price_at_purchase"
                    );
                    subscription.price_at_purchase
                }
            };
            subscription.restart(
                provider_subscription_id,
                incoming.status,
                incoming.period,
                incoming.cancel_at_period_end,
                price,
            );
            self.repository.restart(&subscription).await?;
            tracing::info!(
                subscription_id = %subscription.id,
                provider_subscription_id,
                status = %subscription.status,
                price_at_purchase = %subscription.price_at_purchase,
                "Canceled subscription picked up by new provider subscription"
            );
            return Ok(subscription);
        }

        if should_relink(&subscription, provider_subscription_id) {
            self.repository
                .link_provider_subscription(&subscription.id, provider_subscription_id)
                .await?;
            subscription.link_provider(provider_subscription_id);
            tracing::info!(
                subscription_id = %subscription.id,
                provider_subscription_id,
                "Provider reference backfilled"
            );
        }

        Ok(subscription)
    }
}

/// Decides whether a row found by pair should take the incoming provider reference.
///
/// An unlinked row always does. A canceled row linked to a different provider
/// subscription does too (the subscriber checked out again). A live row
/// linked elsewhere keeps its link.
pub fn should_relink(subscription: &Subscription, provider_subscription_id: &str) -> bool {
    match subscription.provider_subscription_id.as_deref() {
        None => true,
        Some(existing) if existing == provider_subscription_id => false,
        Some(existing) => {
            let relink = subscription.status.is_terminal();
            if !relink {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    linked_provider_subscription_id = existing,
                    incoming_provider_subscription_id = provider_subscription_id,
                    "Live subscription already linked to another provider subscription"
                );
            }
            relink
        }
    }
}

/// True when a canceled row is being picked up by a new provider subscription.
pub fn is_resubscription(subscription: &Subscription, provider_subscription_id: &str) -> bool {
    subscription.status.is_terminal()
        && subscription
            .provider_subscription_id
            .as_deref()
            .is_some_and(|existing| existing != provider_subscription_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCreatorPricing, InMemorySubscriptionRepository};
    use crate::domain::foundation::{CreatorId, MinorUnits, SubscriberId};

    fn key() -> CorrelationKey {
        CorrelationKey {
            subscriber_id: SubscriberId::new("user-1").unwrap(),
            creator_id: CreatorId::new("creator-1").unwrap(),
        }
    }

    fn initial() -> InitialState {
        InitialState {
            status: SubscriptionStatus::Active,
            period: BillingPeriod::default(),
            cancel_at_period_end: false,
        }
    }

    async fn sync_with_price(price: Option<i64>) -> (SubscriptionSync, Arc<InMemorySubscriptionRepository>) {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let pricing = Arc::new(InMemoryCreatorPricing::new());
        if let Some(price) = price {
            pricing
                .set_price(key().creator_id, MinorUnits::new(price).unwrap())
                .await;
        }
        (SubscriptionSync::new(repo.clone(), pricing), repo)
    }

    #[tokio::test]
    async fn create_captures_current_price() {
        let (sync, _) = sync_with_price(Some(499)).await;

        let created = sync.create(&key(), "sub_1", initial()).await.unwrap();

        match created {
            Creation::Inserted(sub) => {
                assert_eq!(sub.price_at_purchase.value(), 499);
                assert_eq!(sub.provider_subscription_id.as_deref(), Some("sub_1"));
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_for_unknown_creator_is_reported() {
        let (sync, repo) = sync_with_price(None).await;

        let created = sync.create(&key(), "sub_1", initial()).await.unwrap();

        assert_eq!(created, Creation::UnknownCreator);
        assert!(repo.all().await.is_empty());
    }

    #[tokio::test]
    async fn locate_prefers_reference_then_pair() {
        let (sync, _) = sync_with_price(Some(499)).await;
        sync.create(&key(), "sub_1", initial()).await.unwrap();

        assert!(matches!(
            sync.locate("sub_1", None).await.unwrap(),
            Some(Located::Linked(_))
        ));
        assert!(matches!(
            sync.locate("sub_other", Some(&key())).await.unwrap(),
            Some(Located::ByPair(_))
        ));
        assert!(sync.locate("sub_other", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn adopt_backfills_reference_without_touching_status() {
        let (sync, repo) = sync_with_price(Some(499)).await;
        let row = Subscription::create(
            key().subscriber_id,
            key().creator_id,
            None,
            SubscriptionStatus::Trialing,
            BillingPeriod::default(),
            false,
            MinorUnits::new(499).unwrap(),
        );
        repo.insert_if_absent(&row).await.unwrap();

        let adopted = sync.adopt(row.clone(), "sub_9", initial()).await.unwrap();

        assert_eq!(adopted.status, SubscriptionStatus::Trialing);
        let stored = repo.find_by_provider_id("sub_9").await.unwrap().unwrap();
        assert_eq!(stored.id, row.id);
        assert_eq!(stored.status, SubscriptionStatus::Trialing);
    }

    #[tokio::test]
    async fn adopt_resubscription_takes_provider_state() {
        let (sync, repo) = sync_with_price(Some(799)).await;
        let mut row = Subscription::create(
            key().subscriber_id,
            key().creator_id,
            Some("sub_old".to_string()),
            SubscriptionStatus::Active,
            BillingPeriod::default(),
            false,
            MinorUnits::new(499).unwrap(),
        );
        row.mark_canceled();
        repo.insert_if_absent(&row).await.unwrap();

        let adopted = sync.adopt(row, "sub_new", initial()).await.unwrap();

        assert_eq!(adopted.status, SubscriptionStatus::Active);
        assert_eq!(adopted.price_at_purchase.value(), 799);
        let stored = repo.find_by_provider_id("sub_new").await.unwrap().unwrap();
        assert_eq!(stored.price_at_purchase.value(), 799);
        assert!(repo.find_by_provider_id("sub_old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn adopt_resubscription_without_current_price_keeps_old_price() {
        let (sync, repo) = sync_with_price(None).await;
        let mut row = Subscription::create(
            key().subscriber_id,
            key().creator_id,
            Some("sub_old".to_string()),
            SubscriptionStatus::Active,
            BillingPeriod::default(),
            false,
            MinorUnits::new(499).unwrap(),
        );
        row.mark_canceled();
        repo.insert_if_absent(&row).await.unwrap();

        let adopted = sync.adopt(row, "sub_new", initial()).await.unwrap();

        assert_eq!(adopted.status, SubscriptionStatus::Active);
        assert_eq!(adopted.price_at_purchase.value(), 499);
    }

    #[test]
    fn relink_rules() {
        let mut sub = Subscription::create(
            key().subscriber_id,
            key().creator_id,
            None,
            SubscriptionStatus::Active,
            BillingPeriod::default(),
            false,
            MinorUnits::new(1).unwrap(),
        );
        assert!(should_relink(&sub, "sub_1"));

        sub.provider_subscription_id = Some("sub_1".to_string());
        assert!(!should_relink(&sub, "sub_1"));
        assert!(!should_relink(&sub, "sub_2"));
        assert!(!is_resubscription(&sub, "sub_2"));

        sub.status = SubscriptionStatus::Canceled;
        assert!(should_relink(&sub, "sub_2"));
        assert!(is_resubscription(&sub, "sub_2"));
    }
}
