//! InvoiceEventsHandler - Payment outcomes for subscription invoices.
//!
//! Invoices never create rows. An invoice whose subscription is not yet
//! known locally is acknowledged; the subscription events will carry the
//! resulting status.

use std::sync::Arc;

use crate::domain::billing::{
    invoice_subscription_id, NotificationKind, PaymentRecovery, ProviderInvoice, Subscription,
    WebhookError,
};
use crate::ports::SubscriptionRepository;

use super::event_router::{EventOutcome, IgnoreReason};
use super::notifier::Notifier;

pub struct InvoiceEventsHandler {
    repository: Arc<dyn SubscriptionRepository>,
    notifier: Notifier,
}

impl InvoiceEventsHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, notifier: Notifier) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// `invoice.payment_failed` - suspends access on a live subscription.
    pub async fn payment_failed(
        &self,
        invoice: &ProviderInvoice,
    ) -> Result<EventOutcome, WebhookError> {
        let mut row = match self.find(invoice).await? {
            Ok(row) => row,
            Err(reason) => return Ok(EventOutcome::Ignored(reason)),
        };

        if !row.record_payment_failure() {
            tracing::debug!(
                subscription_id = %row.id,
                invoice_id = %invoice.id,
                status = %row.status,
                "Payment failure does not change status"
            );
            return Ok(EventOutcome::Unchanged(row.id));
        }

        self.repository.update(&row).await?;
        tracing::info!(
            subscription_id = %row.id,
            invoice_id = %invoice.id,
            "Subscription past due after failed payment"
        );
        self.notifier
            .notify(&row, NotificationKind::PaymentFailed)
            .await;

        Ok(EventOutcome::Applied(row.id))
    }

    /// `invoice.paid` - recovers past-due rows and converts trials.
    pub async fn paid(&self, invoice: &ProviderInvoice) -> Result<EventOutcome, WebhookError> {
        let mut row = match self.find(invoice).await? {
            Ok(row) => row,
            Err(reason) => return Ok(EventOutcome::Ignored(reason)),
        };

        let Some(recovery) = row.record_payment_success() else {
            return Ok(EventOutcome::Unchanged(row.id));
        };

        self.repository.update(&row).await?;

        let kind = match recovery {
            PaymentRecovery::Recovered => NotificationKind::PaymentRecovered,
            PaymentRecovery::TrialConverted => NotificationKind::TrialConverted,
        };
        tracing::info!(
            subscription_id = %row.id,
            invoice_id = %invoice.id,
            recovery = kind.as_str(),
            "Subscription active after payment"
        );
        self.notifier.notify(&row, kind).await;

        Ok(EventOutcome::Applied(row.id))
    }

    async fn find(
        &self,
        invoice: &ProviderInvoice,
    ) -> Result<Result<Subscription, IgnoreReason>, WebhookError> {
        let Some(provider_subscription_id) = invoice_subscription_id(invoice) else {
            tracing::debug!(invoice_id = %invoice.id, "Invoice without subscription reference");
            return Ok(Err(IgnoreReason::MissingSubscriptionReference));
        };

        match self
            .repository
            .find_by_provider_id(&provider_subscription_id)
            .await?
        {
            Some(row) => Ok(Ok(row)),
            None => {
                tracing::info!(
                    invoice_id = %invoice.id,
                    provider_subscription_id = %provider_subscription_id,
                    "Invoice for subscription not yet known locally"
                );
                Ok(Err(IgnoreReason::SubscriptionNotFound))
            }
        }
    }
}
