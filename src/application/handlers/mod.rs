//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult, EventOutcome,
    EventRouter, GetSubscriptionHandler, GetSubscriptionQuery, IgnoreReason,
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler, ReactivateSubscriptionResult,
    ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
};
