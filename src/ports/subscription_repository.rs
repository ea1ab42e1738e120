//! SubscriptionRepository port - Persistence for subscription records.
//!
//! The store enforces one row per (subscriber, creator) pair. Writes are
//! field-scoped so that each event path patches only what it owns.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{CreatorId, DomainError, SubscriberId, SubscriptionId};

/// Result of an insert keyed on the (subscriber, creator) constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row did not exist and was written as given.
    Inserted(Subscription),
    /// A row for the pair already existed; it is returned untouched.
    Existing(Subscription),
}

impl InsertOutcome {
    /// Returns the stored row regardless of which branch was taken.
    pub fn into_inner(self) -> Subscription {
        match self {
            InsertOutcome::Inserted(sub) | InsertOutcome::Existing(sub) => sub,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Repository port for Subscription persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Finds the row linked to a provider subscription reference.
    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Finds the row for a (subscriber, creator) pair.
    async fn find_by_pair(
        &self,
        subscriber_id: &SubscriberId,
        creator_id: &CreatorId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Inserts the row unless one already exists for its (subscriber, creator) pair.
    ///
    /// Concurrent callers racing on the same pair all succeed; exactly one
    /// observes `Inserted`.
    async fn insert_if_absent(&self, subscription: &Subscription)
        -> Result<InsertOutcome, DomainError>;

    /// Writes status, cancel flag, period and provider reference.
    ///
    /// `price_at_purchase` is never written here.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Writes everything `update` does plus `price_at_purchase`.
    ///
    /// Only for a canceled row taken over by a new purchase.
    async fn restart(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Patches only the provider reference.
    async fn link_provider_subscription(
        &self,
        id: &SubscriptionId,
        provider_subscription_id: &str,
    ) -> Result<(), DomainError>;

    /// Patches only the cancel-at-period-end flag.
    async fn set_cancel_at_period_end(
        &self,
        id: &SubscriptionId,
        cancel_at_period_end: bool,
    ) -> Result<(), DomainError>;
}
