//! Provider event envelope and the typed event it decodes into.
//!
//! The envelope is what the signature verifier authenticates. The router
//! decodes it exactly once into [`BillingEvent`], so each handler receives a
//! concrete object type rather than a generic JSON value.

use serde::{Deserialize, Serialize};

use super::provider_objects::{ProviderCheckoutSession, ProviderInvoice, ProviderSubscription};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const SUBSCRIPTION_TRIAL_WILL_END: &str = "customer.subscription.trial_will_end";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";
pub const INVOICE_PAID: &str = "invoice.paid";

/// Authenticated provider event envelope.
///
/// Only the fields the engine reads are captured; the rest of the provider's
/// schema is ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Unique identifier for the event (evt_xxx format). The idempotency key.
    pub id: String,

    /// Type of event (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    pub data: ProviderEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for the event's object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEventData {
    /// The object that triggered the event (shape depends on the event type).
    pub object: serde_json::Value,
}

impl ProviderEvent {
    /// Deserializes the data object as the given provider type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data.object)
    }
}

/// A provider event narrowed to the object type its event type implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted(ProviderCheckoutSession),
    SubscriptionCreated(ProviderSubscription),
    SubscriptionUpdated(ProviderSubscription),
    SubscriptionDeleted(ProviderSubscription),
    TrialWillEnd(ProviderSubscription),
    InvoicePaymentFailed(ProviderInvoice),
    InvoicePaid(ProviderInvoice),
    /// Event types this engine does not act on. Acknowledged, never an error.
    Unrecognized(String),
}

impl BillingEvent {
    /// Decodes the envelope's object according to its event type.
    ///
    /// # Errors
    ///
    /// Returns the serde error when a recognised event type carries an object
    /// that does not match the expected shape.
    pub fn decode(event: &ProviderEvent) -> Result<Self, serde_json::Error> {
        let decoded = match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => BillingEvent::CheckoutCompleted(event.deserialize_object()?),
            SUBSCRIPTION_CREATED => BillingEvent::SubscriptionCreated(event.deserialize_object()?),
            SUBSCRIPTION_UPDATED => BillingEvent::SubscriptionUpdated(event.deserialize_object()?),
            SUBSCRIPTION_DELETED => BillingEvent::SubscriptionDeleted(event.deserialize_object()?),
            SUBSCRIPTION_TRIAL_WILL_END => BillingEvent::TrialWillEnd(event.deserialize_object()?),
            INVOICE_PAYMENT_FAILED => BillingEvent::InvoicePaymentFailed(event.deserialize_object()?),
            INVOICE_PAID => BillingEvent::InvoicePaid(event.deserialize_object()?),
            other => BillingEvent::Unrecognized(other.to_string()),
        };
        Ok(decoded)
    }

    /// Returns the provider event type string.
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::CheckoutCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            BillingEvent::SubscriptionCreated(_) => SUBSCRIPTION_CREATED,
            BillingEvent::SubscriptionUpdated(_) => SUBSCRIPTION_UPDATED,
            BillingEvent::SubscriptionDeleted(_) => SUBSCRIPTION_DELETED,
            BillingEvent::TrialWillEnd(_) => SUBSCRIPTION_TRIAL_WILL_END,
            BillingEvent::InvoicePaymentFailed(_) => INVOICE_PAYMENT_FAILED,
            BillingEvent::InvoicePaid(_) => INVOICE_PAID,
            BillingEvent::Unrecognized(event_type) => event_type,
        }
    }
}

/// Builder for creating test ProviderEvent instances.
#[cfg(test)]
pub struct ProviderEventBuilder {
    id: String,
    event_type: String,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl ProviderEventBuilder {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: event_type.into(),
            object: serde_json::json!({}),
            livemode: false,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> ProviderEvent {
        ProviderEvent {
            id: self.id,
            event_type: self.event_type,
            created: chrono::Utc::now().timestamp(),
            data: ProviderEventData {
                object: self.object,
            },
            livemode: self.livemode,
            api_version: Some("2024-06-20".to_string()),
        }
    }
}
