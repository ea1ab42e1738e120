//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/webhooks/stripe` - Reconcile a provider event
//! - `GET /api/subscriptions/:creator_id` - The caller's subscription
//! - `POST /api/subscriptions/:creator_id/cancel` - Cancel at period end
//! - `POST /api/subscriptions/:creator_id/reactivate` - Withdraw a scheduled cancellation
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedSubscriber, BillingAppState};
pub use routes::{app_router, billing_router};
