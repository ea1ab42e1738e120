//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::{
    // Provider events
    EventOutcome, EventRouter, IgnoreReason, ReconcileWebhookCommand, ReconcileWebhookHandler,
    ReconcileWebhookResult,
    // Subscription commands and queries
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    GetSubscriptionHandler, GetSubscriptionQuery, ReactivateSubscriptionCommand,
    ReactivateSubscriptionHandler, ReactivateSubscriptionResult,
};
