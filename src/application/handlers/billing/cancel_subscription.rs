//! CancelSubscriptionHandler - Schedules cancellation at period end.
//!
//! The provider is called first. The local flag is written only after the
//! provider confirms, so a provider failure leaves local state untouched.
//! Access continues until the period ends; the provider's deletion event
//! performs the terminal transition.

use std::sync::Arc;

use crate::domain::billing::{Subscription, SubscriptionError};
use crate::domain::foundation::{CreatorId, SubscriberId};
use crate::ports::{PaymentProvider, SubscriptionRepository};

/// Command to cancel a subscriber's subscription to one creator.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub subscriber_id: SubscriberId,
    pub creator_id: CreatorId,
}

/// Result of a successful cancellation request.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription: Subscription,
}

pub struct CancelSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl CancelSubscriptionHandler {
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
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, SubscriptionError> {
        // 1. Find and validate
        let subscription = self
            .repository
            .find_by_pair(&cmd.subscriber_id, &cmd.creator_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(cmd.creator_id.clone()))?;

        subscription.ensure_cancelable()?;

        let provider_subscription_id = subscription
            .provider_subscription_id
            .clone()
            .ok_or_else(|| {
                SubscriptionError::invalid_request("Subscription has no provider reference yet")
            })?;

        // 2. Provider first
        match self
            .payment_provider
            .set_cancel_at_period_end(&provider_subscription_id, true)
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                // Nothing left to bill; the local flag still records the request.
                tracing::warn!(
                    subscription_id = %subscription.id,
                    provider_subscription_id = %provider_subscription_id,
                    "Provider subscription already gone; cancelling locally"
                );
            }
            Err(e) => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    error = %e,
                    "Provider rejected cancellation"
                );
                return Err(e.into());
            }
        }

        // 3. Re-read and write only the flag
        let mut current = self
            .repository
            .find_by_id(&subscription.id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(cmd.creator_id.clone()))?;

        if current.status.is_terminal() {
            tracing::info!(
                subscription_id = %current.id,
                "Subscription canceled by provider while request was in flight"
            );
            return Ok(CancelSubscriptionResult {
                subscription: current,
            });
        }

        self.repository
            .set_cancel_at_period_end(&current.id, true)
            .await?;
        current.set_cancel_at_period_end(true);

        tracing::info!(
            subscription_id = %current.id,
            subscriber_id = %cmd.subscriber_id,
            creator_id = %cmd.creator_id,
            "Cancellation scheduled at period end"
        );

        Ok(CancelSubscriptionResult {
            subscription: current,
        })
    }
}
