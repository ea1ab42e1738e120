//! ReactivateSubscriptionHandler - Withdraws a scheduled cancellation.

use std::sync::Arc;

use crate::domain::billing::{Subscription, SubscriptionError};
use crate::domain::foundation::{CreatorId, SubscriberId};
use crate::ports::{PaymentProvider, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionCommand {
    pub subscriber_id: SubscriberId,
    pub creator_id: CreatorId,
}

#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionResult {
    pub subscription: Subscription,
}

/// Clears cancel-at-period-end, provider first.
///
/// Unlike cancellation, a subscription the provider no longer has cannot be
/// revived: that case surfaces as `SubscriptionError::Expired` and the user
/// must check out again.
pub struct ReactivateSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl ReactivateSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            repository,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReactivateSubscriptionCommand,
    ) -> Result<ReactivateSubscriptionResult, SubscriptionError> {
        let subscription = self
            .repository
            .find_by_pair(&cmd.subscriber_id, &cmd.creator_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(cmd.creator_id.clone()))?;

        subscription.ensure_reactivatable()?;

        let provider_subscription_id = subscription
            .provider_subscription_id
            .clone()
            .ok_or_else(|| {
                SubscriptionError::invalid_request("Subscription has no provider reference yet")
            })?;

        if let Err(e) = self
            .payment_provider
            .set_cancel_at_period_end(&provider_subscription_id, false)
            .await
        {
            if e.is_not_found() {
                tracing::info!(
                    subscription_id = %subscription.id,
                    provider_subscription_id = %provider_subscription_id,
                    "Reactivation refused; provider subscription has expired"
                );
                return Err(SubscriptionError::Expired);
            }
            tracing::warn!(
                subscription_id = %subscription.id,
                error = %e,
                "Provider rejected reactivation"
            );
            return Err(e.into());
        }

        let mut current = self
            .repository
            .find_by_id(&subscription.id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(cmd.creator_id.clone()))?;

        if current.status.is_terminal() {
            return Err(SubscriptionError::Expired);
        }

        self.repository
            .set_cancel_at_period_end(&current.id, false)
            .await?;
        current.set_cancel_at_period_end(false);

        tracing::info!(
            subscription_id = %current.id,
            subscriber_id = %cmd.subscriber_id,
            creator_id = %cmd.creator_id,
            "Scheduled cancellation withdrawn"
        );

        Ok(ReactivateSubscriptionResult {
            subscription: current,
        })
    }
}
