//! End-to-end tests for provider event reconciliation.
//!
//! Each test drives signed event bodies through the full intake path
//! (verify, ledger, route, record) against in-memory adapters and a mock
//! payment provider, then asserts on the stored subscription rows.

use std::sync::Arc;

use futures::future::join_all;
use secrecy::SecretString;
use serde_json::{json, Value};

use creator_billing::adapters::memory::{
    InMemoryCreatorPricing, InMemoryNotificationOutbox, InMemoryProcessedEventLedger,
    InMemorySubscriptionRepository,
};
use creator_billing::adapters::stripe::MockPaymentProvider;
use creator_billing::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, EventOutcome, EventRouter,
    IgnoreReason, ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
};
use creator_billing::domain::billing::{
    sign_payload, NotificationKind, ProviderSubscription, Subscription, SubscriptionStatus,
    WebhookError, WebhookVerifier,
};
use creator_billing::domain::foundation::{CreatorId, MinorUnits, SubscriberId};
use creator_billing::ports::{PaymentError, SubscriptionRepository};

// =============================================================================
// Test Infrastructure
// =============================================================================

const SECRET: &str = "whsec_pipeline_secret";
const CREATOR: &str = "creator-1";
const SUBSCRIBER: &str = "user-1";
const PERIOD_START: i64 = 1_704_067_200;
const PERIOD_END: i64 = 1_706_745_600;

struct Pipeline {
    handler: Arc<ReconcileWebhookHandler>,
    repo: Arc<InMemorySubscriptionRepository>,
    ledger: Arc<InMemoryProcessedEventLedger>,
    pricing: Arc<InMemoryCreatorPricing>,
    outbox: Arc<InMemoryNotificationOutbox>,
    provider: Arc<MockPaymentProvider>,
}

impl Pipeline {
    async fn new() -> Self {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let ledger = Arc::new(InMemoryProcessedEventLedger::new());
        let pricing = Arc::new(InMemoryCreatorPricing::new());
        let outbox = Arc::new(InMemoryNotificationOutbox::new());
        let provider = Arc::new(MockPaymentProvider::new());

        pricing.set_price(creator(), MinorUnits::new(499).unwrap()).await;

        let router = EventRouter::new(
            repo.clone(),
            pricing.clone(),
            provider.clone(),
            outbox.clone(),
        );
        let verifier = Arc::new(WebhookVerifier::new(SecretString::new(SECRET.to_string())));
        let handler = Arc::new(ReconcileWebhookHandler::new(
            Some(verifier),
            ledger.clone(),
            router,
        ));

        Self {
            handler,
            repo,
            ledger,
            pricing,
            outbox,
            provider,
        }
    }

    async fn deliver(
        &self,
        event_id: &str,
        event_type: &str,
        object: Value,
    ) -> Result<ReconcileWebhookResult, WebhookError> {
        self.handler.handle(signed(event_id, event_type, object)).await
    }

    async fn the_row(&self) -> Subscription {
        self.repo
            .find_by_pair(&subscriber(), &creator())
            .await
            .unwrap()
            .expect("subscription row should exist")
    }

    async fn notifications_of(&self, kind: &NotificationKind) -> usize {
        self.outbox
            .notifications()
            .await
            .iter()
            .filter(|n| &n.kind == kind)
            .count()
    }
}

fn creator() -> CreatorId {
    CreatorId::new(CREATOR).unwrap()
}

fn subscriber() -> SubscriberId {
    SubscriberId::new(SUBSCRIBER).unwrap()
}

fn signed(event_id: &str, event_type: &str, object: Value) -> ReconcileWebhookCommand {
    let payload = serde_json::to_vec(&json!({
        "id": event_id,
        "type": event_type,
        "created": PERIOD_START,
        "data": { "object": object },
        "livemode": false
    }))
    .unwrap();
    let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload);
    ReconcileWebhookCommand {
        payload,
        signature: Some(signature),
    }
}

fn subscription_object(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "cancel_at_period_end": false,
        "items": { "data": [{
            "id": "si_1",
            "current_period_start": PERIOD_START,
            "current_period_end": PERIOD_END,
            "price": { "id": "price_1", "unit_amount": 499 }
        }]},
        "metadata": { "creator_id": CREATOR, "subscriber_id": SUBSCRIBER }
    })
}

fn provider_subscription(id: &str, status: &str) -> ProviderSubscription {
    serde_json::from_value(subscription_object(id, status)).unwrap()
}

fn checkout_object(subscription_id: &str) -> Value {
    json!({
        "id": "cs_1",
        "mode": "subscription",
        "subscription": subscription_id,
        "metadata": { "creator_id": CREATOR, "subscriber_id": SUBSCRIBER }
    })
}

fn invoice_object(id: &str, subscription_id: &str) -> Value {
    json!({
        "id": id,
        "parent": { "subscription_details": { "subscription": subscription_id } }
    })
}

/// Scenario A precondition: a trialing subscription created by checkout.
async fn trialing_pipeline() -> Pipeline {
    let p = Pipeline::new().await;
    p.provider.add_subscription(provider_subscription("sub_1", "trialing"));
    p.deliver("evt_checkout", "checkout.session.completed", checkout_object("sub_1"))
        .await
        .unwrap();
    p
}

/// Active subscription created by the subscription event.
async fn active_pipeline() -> Pipeline {
    let p = Pipeline::new().await;
    p.deliver(
        "evt_created",
        "customer.subscription.created",
        subscription_object("sub_1", "active"),
    )
    .await
    .unwrap();
    p
}

// =============================================================================
// Lifecycle Scenarios
// =============================================================================

#[tokio::test]
async fn checkout_with_trialing_provider_status_creates_trialing_row() {
    let p = trialing_pipeline().await;

    let row = p.the_row().await;
    assert_eq!(row.status, SubscriptionStatus::Trialing);
    assert!(!row.cancel_at_period_end);
    assert_eq!(row.provider_subscription_id.as_deref(), Some("sub_1"));
    assert_eq!(row.price_at_purchase.value(), 499);
    assert_eq!(row.current_period_start.map(|t| t.as_unix_secs()), Some(PERIOD_START));
    assert_eq!(row.current_period_end.map(|t| t.as_unix_secs()), Some(PERIOD_END));
    assert_eq!(p.ledger.event_type("evt_checkout").await.as_deref(), Some("checkout.session.completed"));
}

#[tokio::test]
async fn first_paid_invoice_converts_trial_and_confirms_once() {
    let p = trialing_pipeline().await;

    p.deliver("evt_paid_1", "invoice.paid", invoice_object("in_1", "sub_1"))
        .await
        .unwrap();
    let redelivered = p
        .deliver("evt_paid_1", "invoice.paid", invoice_object("in_1", "sub_1"))
        .await
        .unwrap();
    // Next month's renewal invoice
    p.deliver("evt_paid_2", "invoice.paid", invoice_object("in_2", "sub_1"))
        .await
        .unwrap();

    assert!(matches!(redelivered, ReconcileWebhookResult::AlreadyProcessed { .. }));
    assert_eq!(p.the_row().await.status, SubscriptionStatus::Active);
    assert_eq!(p.notifications_of(&NotificationKind::TrialConverted).await, 1);
    assert_eq!(p.outbox.notifications().await.len(), 1);
}

#[tokio::test]
async fn failed_payment_suspends_and_redelivery_adds_nothing() {
    let p = active_pipeline().await;
    let confirmations = p.notifications_of(&NotificationKind::SubscriptionConfirmed).await;

    p.deliver("evt_failed", "invoice.payment_failed", invoice_object("in_1", "sub_1"))
        .await
        .unwrap();
    let redelivered = p
        .deliver("evt_failed", "invoice.payment_failed", invoice_object("in_1", "sub_1"))
        .await
        .unwrap();

    assert!(matches!(redelivered, ReconcileWebhookResult::AlreadyProcessed { .. }));
    let row = p.the_row().await;
    assert_eq!(row.status, SubscriptionStatus::PastDue);
    assert!(!row.has_access());
    assert_eq!(p.notifications_of(&NotificationKind::PaymentFailed).await, 1);
    assert_eq!(confirmations, 1);
}

#[tokio::test]
async fn update_after_deletion_is_still_applied() {
    let p = active_pipeline().await;
    p.deliver("evt_failed", "invoice.payment_failed", invoice_object("in_1", "sub_1"))
        .await
        .unwrap();

    p.deliver(
        "evt_deleted",
        "customer.subscription.deleted",
        subscription_object("sub_1", "canceled"),
    )
    .await
    .unwrap();
    let row = p.the_row().await;
    assert_eq!(row.status, SubscriptionStatus::Canceled);
    assert!(!row.cancel_at_period_end);

    p.deliver(
        "evt_updated",
        "customer.subscription.updated",
        subscription_object("sub_1", "active"),
    )
    .await
    .unwrap();
    assert_eq!(p.the_row().await.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn recovered_payment_restores_access() {
    let p = active_pipeline().await;
    p.deliver("evt_failed", "invoice.payment_failed", invoice_object("in_1", "sub_1"))
        .await
        .unwrap();

    p.deliver("evt_paid", "invoice.paid", invoice_object("in_1", "sub_1"))
        .await
        .unwrap();

    assert_eq!(p.the_row().await.status, SubscriptionStatus::Active);
    assert_eq!(p.notifications_of(&NotificationKind::PaymentRecovered).await, 1);
}

#[tokio::test]
async fn invoice_events_leave_canceled_rows_alone() {
    let p = active_pipeline().await;
    p.deliver(
        "evt_deleted",
        "customer.subscription.deleted",
        subscription_object("sub_1", "canceled"),
    )
    .await
    .unwrap();

    p.deliver("evt_paid", "invoice.paid", invoice_object("in_9", "sub_1"))
        .await
        .unwrap();
    p.deliver("evt_failed", "invoice.payment_failed", invoice_object("in_9", "sub_1"))
        .await
        .unwrap();

    assert_eq!(p.the_row().await.status, SubscriptionStatus::Canceled);
}

// =============================================================================
// Idempotency and Ordering
// =============================================================================

#[tokio::test]
async fn concurrent_deliveries_converge_on_one_row() {
    let p = Pipeline::new().await;
    p.provider.add_subscription(provider_subscription("sub_1", "trialing"));

    let deliveries = (0..8).map(|_| {
        let handler = p.handler.clone();
        async move {
            handler
                .handle(signed("evt_checkout", "checkout.session.completed", checkout_object("sub_1")))
                .await
        }
    });
    let results = join_all(deliveries).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(p.repo.count_for_pair(&subscriber(), &creator()).await, 1);
    assert_eq!(p.ledger.len().await, 1);
    assert_eq!(p.the_row().await.status, SubscriptionStatus::Trialing);
}

#[tokio::test]
async fn subscription_event_before_checkout_yields_single_linked_row() {
    let p = Pipeline::new().await;
    p.provider.add_subscription(provider_subscription("sub_1", "active"));

    p.deliver(
        "evt_updated",
        "customer.subscription.updated",
        subscription_object("sub_1", "active"),
    )
    .await
    .unwrap();
    let late_checkout = p
        .deliver("evt_checkout", "checkout.session.completed", checkout_object("sub_1"))
        .await
        .unwrap();

    assert!(matches!(
        late_checkout,
        ReconcileWebhookResult::Processed {
            outcome: EventOutcome::Unchanged(_),
            ..
        }
    ));
    assert_eq!(p.repo.all().await.len(), 1);
    let row = p.the_row().await;
    assert_eq!(row.status, SubscriptionStatus::Active);
    assert_eq!(row.provider_subscription_id.as_deref(), Some("sub_1"));
}

#[tokio::test]
async fn price_change_does_not_reprice_existing_subscription() {
    let p = active_pipeline().await;

    p.pricing.set_price(creator(), MinorUnits::new(999).unwrap()).await;
    p.deliver(
        "evt_updated",
        "customer.subscription.updated",
        subscription_object("sub_1", "active"),
    )
    .await
    .unwrap();

    assert_eq!(p.the_row().await.price_at_purchase.value(), 499);
}

#[tokio::test]
async fn resubscribing_after_cancellation_pays_the_current_price() {
    let p = active_pipeline().await;
    p.deliver(
        "evt_deleted",
        "customer.subscription.deleted",
        subscription_object("sub_1", "canceled"),
    )
    .await
    .unwrap();
    assert_eq!(p.the_row().await.status, SubscriptionStatus::Canceled);

    p.pricing.set_price(creator(), MinorUnits::new(999).unwrap()).await;
    p.provider.add_subscription(provider_subscription("sub_2", "active"));
    p.deliver("evt_checkout_again", "checkout.session.completed", checkout_object("sub_2"))
        .await
        .unwrap();

    let row = p.the_row().await;
    assert_eq!(row.status, SubscriptionStatus::Active);
    assert_eq!(row.provider_subscription_id.as_deref(), Some("sub_2"));
    assert_eq!(row.price_at_purchase.value(), 999);
    assert_eq!(p.repo.count_for_pair(&subscriber(), &creator()).await, 1);
}

#[tokio::test]
async fn unknown_creator_is_acknowledged_without_a_row() {
    let p = Pipeline::new().await;
    let mut object = subscription_object("sub_1", "active");
    object["metadata"]["creator_id"] = json!("creator-without-price");

    let result = p
        .deliver("evt_created", "customer.subscription.created", object)
        .await
        .unwrap();

    assert!(matches!(
        result,
        ReconcileWebhookResult::Processed {
            outcome: EventOutcome::Ignored(IgnoreReason::UnknownCreator),
            ..
        }
    ));
    assert!(p.repo.all().await.is_empty());
    assert_eq!(p.ledger.len().await, 1);
}

// =============================================================================
// Fail-Closed Handling
// =============================================================================

#[tokio::test]
async fn unsupported_status_fails_and_is_redelivered() {
    let p = active_pipeline().await;

    let err = p
        .deliver(
            "evt_weird",
            "customer.subscription.updated",
            subscription_object("sub_1", "suspended_by_regulator"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::UnsupportedStatus(ref s) if s == "suspended_by_regulator"));
    assert_eq!(err.status_code(), 500);
    assert!(p.ledger.event_type("evt_weird").await.is_none());
    assert_eq!(p.the_row().await.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn undecodable_object_fails_and_is_redelivered() {
    let p = active_pipeline().await;

    let err = p
        .deliver(
            "evt_truncated",
            "customer.subscription.updated",
            json!({ "id": "sub_1" }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::MalformedObject(_)));
    assert_eq!(err.status_code(), 500);
    assert!(err.is_retryable());
    assert!(p.ledger.event_type("evt_truncated").await.is_none());
    assert_eq!(p.the_row().await.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn provider_outage_during_checkout_is_retried() {
    let p = Pipeline::new().await;
    p.provider.add_subscription(provider_subscription("sub_1", "trialing"));
    p.provider.set_error(PaymentError::network("connection reset"));

    let first = p
        .deliver("evt_checkout", "checkout.session.completed", checkout_object("sub_1"))
        .await;
    let retry = p
        .deliver("evt_checkout", "checkout.session.completed", checkout_object("sub_1"))
        .await
        .unwrap();

    assert!(first.unwrap_err().is_retryable());
    assert!(matches!(retry, ReconcileWebhookResult::Processed { .. }));
    assert_eq!(p.the_row().await.status, SubscriptionStatus::Trialing);
}

// =============================================================================
// Mutators
// =============================================================================

#[tokio::test]
async fn cancel_rejected_by_provider_changes_nothing_locally() {
    let p = active_pipeline().await;
    p.provider.add_subscription(provider_subscription("sub_1", "active"));
    p.provider
        .set_method_error("set_cancel_at_period_end", PaymentError::network("timeout"));
    let handler = CancelSubscriptionHandler::new(p.repo.clone(), p.provider.clone());

    let err = handler
        .handle(CancelSubscriptionCommand {
            subscriber_id: subscriber(),
            creator_id: creator(),
        })
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(!p.the_row().await.cancel_at_period_end);
    assert!(!p.provider.subscription("sub_1").unwrap().cancel_at_period_end);
}

#[tokio::test]
async fn cancel_then_provider_update_keeps_flag_consistent() {
    let p = active_pipeline().await;
    p.provider.add_subscription(provider_subscription("sub_1", "active"));
    let handler = CancelSubscriptionHandler::new(p.repo.clone(), p.provider.clone());

    handler
        .handle(CancelSubscriptionCommand {
            subscriber_id: subscriber(),
            creator_id: creator(),
        })
        .await
        .unwrap();
    let mut echoed = subscription_object("sub_1", "active");
    echoed["cancel_at_period_end"] = json!(true);
    p.deliver("evt_updated", "customer.subscription.updated", echoed)
        .await
        .unwrap();

    let row = p.the_row().await;
    assert!(row.cancel_at_period_end);
    assert!(row.has_access());
}
