//! GetSubscriptionHandler - Query for the caller's subscription to a creator.

use std::sync::Arc;

use crate::domain::billing::{Subscription, SubscriptionError};
use crate::domain::foundation::{CreatorId, SubscriberId};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub subscriber_id: SubscriberId,
    pub creator_id: CreatorId,
}

pub struct GetSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl GetSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetSubscriptionQuery) -> Result<Subscription, SubscriptionError> {
        self.repository
            .find_by_pair(&query.subscriber_id, &query.creator_id)
            .await?
            .ok_or(SubscriptionError::NotFound {
                creator_id: query.creator_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::billing::{BillingPeriod, SubscriptionStatus};
    use crate::domain::foundation::MinorUnits;

    #[tokio::test]
    async fn returns_only_the_callers_row() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let row = Subscription::create(
            SubscriberId::new("user-1").unwrap(),
            CreatorId::new("creator-1").unwrap(),
            None,
            SubscriptionStatus::Trialing,
            BillingPeriod::default(),
            false,
            MinorUnits::new(499).unwrap(),
        );
        repo.insert_if_absent(&row).await.unwrap();
        let handler = GetSubscriptionHandler::new(repo);

        let found = handler
            .handle(GetSubscriptionQuery {
                subscriber_id: SubscriberId::new("user-1").unwrap(),
                creator_id: CreatorId::new("creator-1").unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(found.id, row.id);

        let err = handler
            .handle(GetSubscriptionQuery {
                subscriber_id: SubscriberId::new("user-2").unwrap(),
                creator_id: CreatorId::new("creator-1").unwrap(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
