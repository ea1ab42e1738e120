//! Payment-provider objects as they appear on the wire.
//!
//! These mirror the subset of Stripe's API schema the reconciliation engine
//! reads. Fields that moved between API versions are all optional so one
//! type decodes every schema generation; the period extractor decides which
//! location wins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CreatorId, SubscriberId};

/// Metadata key carrying the creator being subscribed to.
pub const CREATOR_ID_METADATA_KEY: &str = "creator_id";

/// Metadata key carrying the subscribing principal.
pub const SUBSCRIBER_ID_METADATA_KEY: &str = "subscriber_id";

/// A reference that the provider sends either as a bare id or as the expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    /// Returns the referenced object's id in either form.
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

/// The (subscriber, creator) pair that keys a local subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub subscriber_id: SubscriberId,
    pub creator_id: CreatorId,
}

impl CorrelationKey {
    /// Reads the pair from provider metadata.
    ///
    /// Returns `None` when either key is absent or blank.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Option<Self> {
        let subscriber_id = metadata
            .get(SUBSCRIBER_ID_METADATA_KEY)
            .and_then(|v| SubscriberId::new(v.clone()).ok())?;
        let creator_id = metadata
            .get(CREATOR_ID_METADATA_KEY)
            .and_then(|v| CreatorId::new(v.clone()).ok())?;
        Some(Self {
            subscriber_id,
            creator_id,
        })
    }
}

/// A provider subscription object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,

    /// Raw provider lifecycle state; translate with the status mapper.
    pub status: String,

    #[serde(default)]
    pub customer: Option<Expandable>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Legacy period location (pre item-level billing periods).
    #[serde(default)]
    pub current_period_start: Option<i64>,

    /// Legacy period location (pre item-level billing periods).
    #[serde(default)]
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub trial_end: Option<i64>,

    #[serde(default)]
    pub items: Option<SubscriptionItemList>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ProviderSubscription {
    /// Returns the correlation pair stored on the subscription's metadata.
    pub fn correlation(&self) -> Option<CorrelationKey> {
        CorrelationKey::from_metadata(&self.metadata)
    }

    /// Returns the first subscription item, if the provider included any.
    pub fn first_item(&self) -> Option<&SubscriptionItem> {
        self.items.as_ref().and_then(|items| items.data.first())
    }
}

/// List wrapper used by the provider for subscription items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItemList {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// One priced line of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub id: Option<String>,

    /// Item-level period (newer API versions).
    #[serde(default)]
    pub current_period_start: Option<i64>,

    /// Item-level period (newer API versions).
    #[serde(default)]
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub price: Option<ItemPrice>,
}

/// Price attached to a subscription item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPrice {
    pub id: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
}

/// A completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCheckoutSession {
    pub id: String,

    /// `subscription`, `payment` or `setup`.
    pub mode: String,

    #[serde(default)]
    pub subscription: Option<Expandable>,

    #[serde(default)]
    pub customer: Option<Expandable>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ProviderCheckoutSession {
    /// Returns true for recurring-billing checkouts.
    pub fn is_subscription_mode(&self) -> bool {
        self.mode == "subscription"
    }

    /// Returns the correlation pair stored on the session's metadata.
    pub fn correlation(&self) -> Option<CorrelationKey> {
        CorrelationKey::from_metadata(&self.metadata)
    }
}

/// A provider invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInvoice {
    pub id: String,

    /// Legacy subscription reference.
    #[serde(default)]
    pub subscription: Option<Expandable>,

    /// Newer API versions nest the subscription under the invoice's parent.
    #[serde(default)]
    pub parent: Option<InvoiceParent>,

    #[serde(default)]
    pub lines: Option<InvoiceLineList>,

    #[serde(default)]
    pub amount_paid: Option<i64>,

    #[serde(default)]
    pub amount_due: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceParent {
    #[serde(default)]
    pub subscription_details: Option<InvoiceSubscriptionDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSubscriptionDetails {
    #[serde(default)]
    pub subscription: Option<Expandable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineList {
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    #[serde(default)]
    pub subscription: Option<Expandable>,
}
