//! Axum router configuration for billing endpoints.

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::adapters::http::middleware::global_rate_limit_middleware;

use super::handlers::{
    cancel_subscription, get_subscription, handle_stripe_webhook, health,
    reactivate_subscription, BillingAppState,
};

/// Subscriber endpoints (require `X-User-Id`).
///
/// # Routes
/// - `GET /:creator_id` - The caller's subscription to a creator
/// - `POST /:creator_id/cancel` - Cancel at period end (rate limited)
/// - `POST /:creator_id/reactivate` - Withdraw a scheduled cancellation (rate limited)
pub fn subscription_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/:creator_id", get(get_subscription))
        .route("/:creator_id/cancel", post(cancel_subscription))
        .route("/:creator_id/reactivate", post(reactivate_subscription))
}

/// Provider webhook endpoints (no user auth, signature verified).
///
/// # Routes
/// - `POST /stripe` - Reconcile a provider event
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Billing routes, suitable for mounting at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/subscriptions", subscription_routes())
        .nest("/webhooks", webhook_routes())
}

/// The complete service: `/api` routes behind the middleware stack, plus `/health`.
///
/// Layers, outermost first: request id, tracing, timeout, global rate limit.
/// The health probe sits outside the timeout and rate limit.
pub fn app_router(state: BillingAppState, request_timeout: Duration) -> Router {
    let rate_limiter = state.rate_limiter.clone();

    let api = Router::new()
        .nest("/api", billing_router())
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            global_rate_limit_middleware,
        ))
        .layer(TimeoutLayer::new(request_timeout));

    let tracing_layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Router::new()
        .merge(api)
        .route("/health", get(health))
        .layer(tracing_layers)
        .with_state(state)
}
