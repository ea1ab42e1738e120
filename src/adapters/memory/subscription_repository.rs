//! In-memory implementation of SubscriptionRepository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{
    CreatorId, DomainError, ErrorCode, SubscriberId, SubscriptionId, Timestamp,
};
use crate::ports::{InsertOutcome, SubscriptionRepository};

#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    rows: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored row.
    pub async fn all(&self) -> Vec<Subscription> {
        self.rows.read().await.values().cloned().collect()
    }

    /// Number of rows for a (subscriber, creator) pair. Never more than one.
    pub async fn count_for_pair(&self, subscriber_id: &SubscriberId, creator_id: &CreatorId) -> usize {
        self.rows
            .read()
            .await
            .values()
            .filter(|s| &s.subscriber_id == subscriber_id && &s.creator_id == creator_id)
            .count()
    }

    fn not_found(id: &SubscriptionId) -> DomainError {
        DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
            .with_detail("subscription_id", id.to_string())
    }

    /// Fails when a different row already carries the provider reference.
    fn ensure_provider_id_free(
        rows: &HashMap<SubscriptionId, Subscription>,
        id: &SubscriptionId,
        provider_subscription_id: Option<&str>,
    ) -> Result<(), DomainError> {
        let Some(provider_subscription_id) = provider_subscription_id else {
            return Ok(());
        };
        let taken = rows.values().any(|s| {
            &s.id != id && s.provider_subscription_id.as_deref() == Some(provider_subscription_id)
        });
        if taken {
            return Err(provider_id_conflict(provider_subscription_id));
        }
        Ok(())
    }
}

fn provider_id_conflict(provider_subscription_id: &str) -> DomainError {
    DomainError::new(
        ErrorCode::ConcurrentModification,
        "Provider subscription already linked to another subscription",
    )
    .with_detail("provider_subscription_id", provider_subscription_id.to_string())
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|s| s.provider_subscription_id.as_deref() == Some(provider_subscription_id))
            .cloned())
    }

    async fn find_by_pair(
        &self,
        subscriber_id: &SubscriberId,
        creator_id: &CreatorId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|s| &s.subscriber_id == subscriber_id && &s.creator_id == creator_id)
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        subscription: &Subscription,
    ) -> Result<InsertOutcome, DomainError> {
        let mut rows = self.rows.write().await;

        let existing = rows.values().find(|s| {
            s.subscriber_id == subscription.subscriber_id && s.creator_id == subscription.creator_id
        });
        if let Some(existing) = existing {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        Self::ensure_provider_id_free(
            &rows,
            &subscription.id,
            subscription.provider_subscription_id.as_deref(),
        )?;

        rows.insert(subscription.id, subscription.clone());
        Ok(InsertOutcome::Inserted(subscription.clone()))
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut rows = self.rows.write().await;
        Self::ensure_provider_id_free(
            &rows,
            &subscription.id,
            subscription.provider_subscription_id.as_deref(),
        )?;
        let row = rows
            .get_mut(&subscription.id)
            .ok_or_else(|| Self::not_found(&subscription.id))?;

        row.provider_subscription_id = subscription.provider_subscription_id.clone();
        row.status = subscription.status;
        row.cancel_at_period_end = subscription.cancel_at_period_end;
        row.current_period_start = subscription.current_period_start;
        row.current_period_end = subscription.current_period_end;
        row.updated_at = Timestamp::now();
        Ok(())
    }

    async fn restart(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut rows = self.rows.write().await;
        Self::ensure_provider_id_free(
            &rows,
            &subscription.id,
            subscription.provider_subscription_id.as_deref(),
        )?;
        let row = rows
            .get_mut(&subscription.id)
            .ok_or_else(|| Self::not_found(&subscription.id))?;

        row.provider_subscription_id = subscription.provider_subscription_id.clone();
        row.status = subscription.status;
        row.cancel_at_period_end = subscription.cancel_at_period_end;
        row.current_period_start = subscription.current_period_start;
        row.current_period_end = subscription.current_period_end;
        row.price_at_purchase = subscription.price_at_purchase;
        row.updated_at = Timestamp::now();
        Ok(())
    }

    async fn link_provider_subscription(
        &self,
        id: &SubscriptionId,
        provider_subscription_id: &str,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.write().await;
        Self::ensure_provider_id_free(&rows, id, Some(provider_subscription_id))?;
        let row = rows.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        row.provider_subscription_id = Some(provider_subscription_id.to_string());
        row.updated_at = Timestamp::now();
        Ok(())
    }

    async fn set_cancel_at_period_end(
        &self,
        id: &SubscriptionId,
        cancel_at_period_end: bool,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        row.cancel_at_period_end = cancel_at_period_end;
        row.updated_at = Timestamp::now();
        Ok(())
    }
}
