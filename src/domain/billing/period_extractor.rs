//! Billing-period and subscription-reference lookup across provider schema versions.
//!
//! Newer API versions moved the current period onto subscription items and
//! the invoice's subscription onto `parent.subscription_details`. Each lookup
//! is an ordered list of strategies; the first one that finds data wins.
//! Absence is not an error: callers still apply the rest of the event.

use super::provider_objects::{ProviderInvoice, ProviderSubscription};
use crate::domain::foundation::Timestamp;

/// Current billing period boundaries. Either side may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl BillingPeriod {
    /// Returns true when neither boundary is known.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    fn from_unix(start: Option<i64>, end: Option<i64>) -> Option<Self> {
        let period = Self {
            start: start.and_then(Timestamp::from_unix_secs),
            end: end.and_then(Timestamp::from_unix_secs),
        };
        (!period.is_empty()).then_some(period)
    }
}

/// Where in a subscription object the period may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSource {
    /// `items.data[0].current_period_*` (current schema).
    SubscriptionItem,
    /// `current_period_*` on the subscription itself (legacy schema).
    SubscriptionRoot,
}

/// Strategies in the order they are tried.
pub const PERIOD_STRATEGIES: [PeriodSource; 2] =
    [PeriodSource::SubscriptionItem, PeriodSource::SubscriptionRoot];

impl PeriodSource {
    /// Reads the period from this location, if present there.
    pub fn extract(&self, subscription: &ProviderSubscription) -> Option<BillingPeriod> {
        match self {
            PeriodSource::SubscriptionItem => subscription
                .first_item()
                .and_then(|item| BillingPeriod::from_unix(item.current_period_start, item.current_period_end)),
            PeriodSource::SubscriptionRoot => BillingPeriod::from_unix(
                subscription.current_period_start,
                subscription.current_period_end,
            ),
        }
    }
}

/// Locates the current billing period on a provider subscription.
///
/// Returns an empty period, and logs, when no strategy finds one.
pub fn extract_period(subscription: &ProviderSubscription) -> BillingPeriod {
    for source in PERIOD_STRATEGIES {
        if let Some(period) = source.extract(subscription) {
            return period;
        }
    }

    tracing::warn!(
        provider_subscription_id = %subscription.id,
        "No billing period found on provider subscription"
    );
    BillingPeriod::default()
}

/// Where in an invoice object the subscription reference may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceSubscriptionSource {
    /// `parent.subscription_details.subscription` (current schema).
    ParentDetails,
    /// `subscription` on the invoice itself (legacy schema).
    InvoiceRoot,
    /// `lines.data[*].subscription`.
    LineItems,
}

/// Strategies in the order they are tried.
pub const INVOICE_SUBSCRIPTION_STRATEGIES: [InvoiceSubscriptionSource; 3] = [
    InvoiceSubscriptionSource::ParentDetails,
    InvoiceSubscriptionSource::InvoiceRoot,
    InvoiceSubscriptionSource::LineItems,
];

impl InvoiceSubscriptionSource {
    /// Reads the subscription id from this location, if present there.
    pub fn extract(&self, invoice: &ProviderInvoice) -> Option<String> {
        match self {
            InvoiceSubscriptionSource::ParentDetails => invoice
                .parent
                .as_ref()
                .and_then(|p| p.subscription_details.as_ref())
                .and_then(|d| d.subscription.as_ref())
                .map(|s| s.id().to_string()),
            InvoiceSubscriptionSource::InvoiceRoot => {
                invoice.subscription.as_ref().map(|s| s.id().to_string())
            }
            InvoiceSubscriptionSource::LineItems => invoice
                .lines
                .as_ref()
                .and_then(|lines| lines.data.iter().find_map(|line| line.subscription.as_ref()))
                .map(|s| s.id().to_string()),
        }
    }
}

/// Locates the provider subscription an invoice belongs to.
///
/// Returns `None`, and logs, for invoices not tied to a subscription.
pub fn invoice_subscription_id(invoice: &ProviderInvoice) -> Option<String> {
    let found = INVOICE_SUBSCRIPTION_STRATEGIES
        .iter()
        .find_map(|source| source.extract(invoice))
        .filter(|id| !id.is_empty());

    if found.is_none() {
        tracing::debug!(invoice_id = %invoice.id, "Invoice carries no subscription reference");
    }
    found
}
