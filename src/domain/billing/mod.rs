//! Billing module - subscription state and provider event reconciliation.
//!
//! # Components
//!
//! - `webhook_verifier` - authenticates provider event bodies
//! - `status_mapper` - fail-closed provider status mapping
//! - `period_extractor` - ordered lookups across provider schema versions
//! - `provider_event` - the event envelope and its tagged decoding
//! - `aggregate` - the `Subscription` record and its transitions

mod aggregate;
mod errors;
mod notification;
mod period_extractor;
mod provider_event;
mod provider_objects;
mod status;
mod status_mapper;
mod webhook_errors;
mod webhook_verifier;

pub use aggregate::{PaymentRecovery, Subscription};
pub use errors::SubscriptionError;
pub use notification::{days_until, BillingNotification, NotificationKind};
pub use period_extractor::{
    extract_period, invoice_subscription_id, BillingPeriod, InvoiceSubscriptionSource,
    PeriodSource, INVOICE_SUBSCRIPTION_STRATEGIES, PERIOD_STRATEGIES,
};
pub use provider_event::{
    BillingEvent, ProviderEvent, ProviderEventData, CHECKOUT_SESSION_COMPLETED, INVOICE_PAID,
    INVOICE_PAYMENT_FAILED, SUBSCRIPTION_CREATED, SUBSCRIPTION_DELETED,
    SUBSCRIPTION_TRIAL_WILL_END, SUBSCRIPTION_UPDATED,
};
pub use provider_objects::{
    CorrelationKey, Expandable, InvoiceLine, InvoiceLineList, InvoiceParent,
    InvoiceSubscriptionDetails, ItemPrice, ProviderCheckoutSession, ProviderInvoice,
    ProviderSubscription, SubscriptionItem, SubscriptionItemList, CREATOR_ID_METADATA_KEY,
    SUBSCRIBER_ID_METADATA_KEY,
};
pub use status::SubscriptionStatus;
pub use status_mapper::{map_provider_status, UnsupportedStatus};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{sign_payload, SignatureHeader, WebhookVerifier, DEFAULT_TOLERANCE_SECS};

#[cfg(test)]
pub use provider_event::ProviderEventBuilder;
