//! CheckoutCompletedHandler - First link between a checkout and a local row.
//!
//! The checkout session only carries a reference to the provider
//! subscription, so the authoritative state is fetched from the provider
//! before any row is written.

use std::sync::Arc;

use crate::domain::billing::{
    extract_period, map_provider_status, ProviderCheckoutSession, WebhookError,
};
use crate::ports::PaymentProvider;

use super::event_router::{EventOutcome, IgnoreReason};
use super::subscription_sync::{Creation, InitialState, Located, SubscriptionSync};

pub struct CheckoutCompletedHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    sync: SubscriptionSync,
}

impl CheckoutCompletedHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>, sync: SubscriptionSync) -> Self {
        Self {
            payment_provider,
            sync,
        }
    }

    pub async fn handle(
        &self,
        session: &ProviderCheckoutSession,
    ) -> Result<EventOutcome, WebhookError> {
        if !session.is_subscription_mode() {
            tracing::debug!(checkout_session_id = %session.id, mode = %session.mode, "Non-subscription checkout ignored");
            return Ok(EventOutcome::Ignored(IgnoreReason::NotSubscriptionCheckout));
        }

        let Some(key) = session.correlation() else {
            tracing::warn!(
                checkout_session_id = %session.id,
                "Checkout completed without subscriber/creator metadata"
            );
            return Ok(EventOutcome::Ignored(IgnoreReason::MissingCorrelation));
        };

        let Some(provider_subscription_id) = session.subscription.as_ref().map(|s| s.id().to_string())
        else {
            tracing::warn!(
                checkout_session_id = %session.id,
                "Subscription checkout completed without a subscription reference"
            );
            return Ok(EventOutcome::Ignored(IgnoreReason::MissingSubscriptionReference));
        };

        let Some(provider_subscription) = self
            .payment_provider
            .get_subscription(&provider_subscription_id)
            .await?
        else {
            tracing::warn!(
                checkout_session_id = %session.id,
                provider_subscription_id = %provider_subscription_id,
                "Provider no longer knows the checkout's subscription"
            );
            return Ok(EventOutcome::Ignored(IgnoreReason::ProviderSubscriptionMissing));
        };

        let state = InitialState {
            status: map_provider_status(&provider_subscription.status)?,
            period: extract_period(&provider_subscription),
            cancel_at_period_end: provider_subscription.cancel_at_period_end,
        };

        match self.sync.locate(&provider_subscription_id, Some(&key)).await? {
            Some(Located::Linked(existing)) => {
                tracing::debug!(
                    subscription_id = %existing.id,
                    provider_subscription_id = %provider_subscription_id,
                    "Checkout already reconciled by a subscription event"
                );
                return Ok(EventOutcome::Unchanged(existing.id));
            }
            Some(Located::ByPair(existing)) => {
                let adopted = self
                    .sync
                    .adopt(existing, &provider_subscription_id, state)
                    .await?;
                return Ok(EventOutcome::Applied(adopted.id));
            }
            None => {}
        }

        match self.sync.create(&key, &provider_subscription_id, state).await? {
            Creation::Inserted(created) => Ok(EventOutcome::Applied(created.id)),
            Creation::Existing(existing) => {
                let adopted = self
                    .sync
                    .adopt(existing, &provider_subscription_id, state)
                    .await?;
                Ok(EventOutcome::Applied(adopted.id))
            }
            Creation::UnknownCreator => {
                tracing::warn!(
                    creator_id = %key.creator_id,
                    provider_subscription_id = %provider_subscription_id,
                    "Checkout for creator without a current price"
                );
                Ok(EventOutcome::Ignored(IgnoreReason::UnknownCreator))
            }
        }
    }
}
