//! Billing handlers.
//!
//! ## Provider events
//! - Reconciliation endpoint (verify, ledger, route, record)
//! - One handler per event family, sharing record resolution
//!
//! ## Commands
//! - Cancel at period end
//! - Withdraw a scheduled cancellation
//!
//! ## Queries
//! - Get the caller's subscription to a creator

mod cancel_subscription;
mod checkout_completed;
mod event_router;
mod get_subscription;
mod invoice_events;
mod notifier;
mod reactivate_subscription;
mod reconcile_webhook;
mod subscription_events;
mod subscription_sync;

// Provider events
pub use event_router::{EventOutcome, EventRouter, IgnoreReason};
pub use reconcile_webhook::{
    ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
};

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use reactivate_subscription::{
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler, ReactivateSubscriptionResult,
};

// Queries
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery};
