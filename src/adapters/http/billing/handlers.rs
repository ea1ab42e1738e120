//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::rate_limit::add_rate_limit_headers;
use crate::adapters::http::middleware::{check_mutation_limit, RateLimitRejection};
use crate::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, EventRouter, GetSubscriptionHandler,
    GetSubscriptionQuery, ReactivateSubscriptionCommand, ReactivateSubscriptionHandler,
    ReconcileWebhookCommand, ReconcileWebhookHandler,
};
use crate::domain::billing::{SubscriptionError, WebhookError, WebhookVerifier};
use crate::domain::foundation::{CreatorId, SubscriberId};
use crate::ports::{
    CreatorPricing, NotificationOutbox, PaymentProvider, ProcessedEventLedger, RateLimitStatus,
    RateLimiter, SubscriptionRepository,
};

use super::dto::{
    ErrorResponse, HealthResponse, SubscriptionResponse, WebhookAckResponse, WebhookErrorResponse,
};

/// Header carrying the provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Header carrying the authenticated principal, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "X-User-Id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is Arc-wrapped.
#[derive(Clone)]
pub struct BillingAppState {
    pub subscription_repository: Arc<dyn SubscriptionRepository>,
    pub processed_event_ledger: Arc<dyn ProcessedEventLedger>,
    pub creator_pricing: Arc<dyn CreatorPricing>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub notification_outbox: Arc<dyn NotificationOutbox>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// `None` when no signing secret is configured.
    pub webhook_verifier: Option<Arc<WebhookVerifier>>,
}

impl BillingAppState {
    pub fn reconcile_webhook_handler(&self) -> ReconcileWebhookHandler {
        let router = EventRouter::new(
            self.subscription_repository.clone(),
            self.creator_pricing.clone(),
            self.payment_provider.clone(),
            self.notification_outbox.clone(),
        );
        ReconcileWebhookHandler::new(
            self.webhook_verifier.clone(),
            self.processed_event_ledger.clone(),
            router,
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.subscription_repository.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn reactivate_subscription_handler(&self) -> ReactivateSubscriptionHandler {
        ReactivateSubscriptionHandler::new(
            self.subscription_repository.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.subscription_repository.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Caller identity
// ════════════════════════════════════════════════════════════════════════════════

/// The calling subscriber.
///
/// Authentication happens upstream; the gateway forwards the principal in
/// the `X-User-Id` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedSubscriber {
    pub subscriber_id: SubscriberId,
}

/// Rejection type for AuthenticatedSubscriber extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedSubscriber
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let subscriber_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| SubscriberId::new(s.trim()).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedSubscriber { subscriber_id })
    }
}

fn parse_creator_id(raw: String) -> Result<CreatorId, SubscriptionError> {
    CreatorId::new(raw).map_err(|e| SubscriptionError::invalid_request(e.to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscription endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscriptions/:creator_id - The caller's subscription to a creator
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedSubscriber,
    Path(creator_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = GetSubscriptionQuery {
        subscriber_id: user.subscriber_id,
        creator_id: parse_creator_id(creator_id)?,
    };

    let subscription = state.get_subscription_handler().handle(query).await?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

/// POST /api/subscriptions/:creator_id/cancel - Cancel at period end
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedSubscriber,
    Path(creator_id): Path<String>,
) -> Result<Response, BillingApiError> {
    let limit = check_mutation_limit(state.rate_limiter.as_ref(), &user.subscriber_id).await?;

    let cmd = CancelSubscriptionCommand {
        subscriber_id: user.subscriber_id,
        creator_id: parse_creator_id(creator_id)?,
    };
    let result = state.cancel_subscription_handler().handle(cmd).await?;

    Ok(with_limit_headers(
        Json(SubscriptionResponse::from(result.subscription)).into_response(),
        limit,
    ))
}

/// POST /api/subscriptions/:creator_id/reactivate - Withdraw a scheduled cancellation
pub async fn reactivate_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedSubscriber,
    Path(creator_id): Path<String>,
) -> Result<Response, BillingApiError> {
    let limit = check_mutation_limit(state.rate_limiter.as_ref(), &user.subscriber_id).await?;

    let cmd = ReactivateSubscriptionCommand {
        subscriber_id: user.subscriber_id,
        creator_id: parse_creator_id(creator_id)?,
    };
    let result = state.reactivate_subscription_handler().handle(cmd).await?;

    Ok(with_limit_headers(
        Json(SubscriptionResponse::from(result.subscription)).into_response(),
        limit,
    ))
}

fn with_limit_headers(mut response: Response, status: Option<RateLimitStatus>) -> Response {
    if let Some(status) = status {
        add_rate_limit_headers(
            &mut response,
            status.limit,
            status.remaining,
            status.reset_at.as_unix_secs(),
        );
    }
    response
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook and health
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe - Reconcile a provider event
///
/// The body is taken as raw bytes: the signature covers the exact payload.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = ReconcileWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let result = state.reconcile_webhook_handler().handle(cmd).await?;

    Ok(Json(WebhookAckResponse::from(&result)))
}

/// GET /health - Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error for the subscription endpoints.
#[derive(Debug)]
pub enum BillingApiError {
    Subscription(SubscriptionError),
    RateLimited(RateLimitRejection),
}

impl From<SubscriptionError> for BillingApiError {
    fn from(err: SubscriptionError) -> Self {
        Self::Subscription(err)
    }
}

impl From<RateLimitRejection> for BillingApiError {
    fn from(err: RateLimitRejection) -> Self {
        Self::RateLimited(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let err = match self {
            BillingApiError::RateLimited(rejection) => return rejection.into_response(),
            BillingApiError::Subscription(err) => err,
        };

        if let SubscriptionError::Infrastructure(detail) = &err {
            tracing::error!(error = %detail, "Subscription request failed");
        }

        let body = ErrorResponse::new(err.code(), err.message());
        let mut response = (err.status_code(), Json(body)).into_response();

        // Provider throttling reaches the caller with the same retry hint.
        if let SubscriptionError::RateLimited { retry_after_secs } = err {
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs),
            );
        }
        response
    }
}

/// API error for the webhook endpoint.
///
/// The provider gets the status code and a generic message; detail stays in
/// the logs.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let message = match &self.0 {
            err if err.is_verification_failure() => err.to_string(),
            WebhookError::SecretNotConfigured => "Webhook endpoint not configured".to_string(),
            _ => "Webhook processing failed".to_string(),
        };
        let body = WebhookErrorResponse { error: message };
        (self.0.status_code(), Json(body)).into_response()
    }
}
