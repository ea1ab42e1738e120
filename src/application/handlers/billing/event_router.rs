//! EventRouter - Decodes a verified provider event once and dispatches it.

use std::fmt;
use std::sync::Arc;

use crate::domain::billing::{BillingEvent, ProviderEvent, WebhookError};
use crate::domain::foundation::SubscriptionId;
use crate::ports::{CreatorPricing, NotificationOutbox, PaymentProvider, SubscriptionRepository};

use super::checkout_completed::CheckoutCompletedHandler;
use super::invoice_events::InvoiceEventsHandler;
use super::notifier::Notifier;
use super::subscription_events::SubscriptionEventsHandler;
use super::subscription_sync::SubscriptionSync;

/// Why an event was acknowledged without changing any subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotSubscriptionCheckout,
    MissingCorrelation,
    MissingSubscriptionReference,
    ProviderSubscriptionMissing,
    UnknownCreator,
    SubscriptionNotFound,
    /// The pair's row is live and linked to a different provider subscription.
    LinkedElsewhere,
    MissingTrialEnd,
    UnrecognizedEventType,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::NotSubscriptionCheckout => "not_subscription_checkout",
            IgnoreReason::MissingCorrelation => "missing_correlation_metadata",
            IgnoreReason::MissingSubscriptionReference => "missing_subscription_reference",
            IgnoreReason::ProviderSubscriptionMissing => "provider_subscription_missing",
            IgnoreReason::UnknownCreator => "unknown_creator",
            IgnoreReason::SubscriptionNotFound => "subscription_not_found",
            IgnoreReason::LinkedElsewhere => "linked_elsewhere",
            IgnoreReason::MissingTrialEnd => "missing_trial_end",
            IgnoreReason::UnrecognizedEventType => "unrecognized_event_type",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A subscription row was created or changed.
    Applied(SubscriptionId),
    /// The row was found and already reflected the event.
    Unchanged(SubscriptionId),
    /// Acknowledged without touching any row.
    Ignored(IgnoreReason),
}

/// Routes each event type to its handler.
pub struct EventRouter {
    checkout: CheckoutCompletedHandler,
    subscriptions: SubscriptionEventsHandler,
    invoices: InvoiceEventsHandler,
}

impl EventRouter {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        pricing: Arc<dyn CreatorPricing>,
        payment_provider: Arc<dyn PaymentProvider>,
        outbox: Arc<dyn NotificationOutbox>,
    ) -> Self {
        let sync = SubscriptionSync::new(repository.clone(), pricing);
        let notifier = Notifier::new(outbox);
        Self {
            checkout: CheckoutCompletedHandler::new(payment_provider, sync.clone()),
            subscriptions: SubscriptionEventsHandler::new(sync, notifier.clone()),
            invoices: InvoiceEventsHandler::new(repository, notifier),
        }
    }

    /// Applies one verified event.
    ///
    /// # Errors
    ///
    /// - `MalformedObject` if a recognised event carries an object that does not decode
    /// - `UnsupportedStatus` if the provider reports an unmapped status on a status-bearing path
    /// - `Database` / `Provider` on infrastructure failure
    pub async fn route(&self, event: &ProviderEvent) -> Result<EventOutcome, WebhookError> {
        let decoded = BillingEvent::decode(event).map_err(|e| {
            WebhookError::MalformedObject(format!("{} object: {}", event.event_type, e))
        })?;

        match decoded {
            BillingEvent::CheckoutCompleted(session) => self.checkout.handle(&session).await,
            BillingEvent::SubscriptionCreated(sub) => self.subscriptions.created(&sub).await,
            BillingEvent::SubscriptionUpdated(sub) => self.subscriptions.updated(&sub).await,
            BillingEvent::SubscriptionDeleted(sub) => self.subscriptions.deleted(&sub).await,
            BillingEvent::TrialWillEnd(sub) => self.subscriptions.trial_will_end(&sub).await,
            BillingEvent::InvoicePaymentFailed(invoice) => {
                self.invoices.payment_failed(&invoice).await
            }
            BillingEvent::InvoicePaid(invoice) => self.invoices.paid(&invoice).await,
            BillingEvent::Unrecognized(event_type) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event_type,
                    "Unrecognized event type acknowledged"
                );
                Ok(EventOutcome::Ignored(IgnoreReason::UnrecognizedEventType))
            }
        }
    }
}
