//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON response structure for the billing API.
//! The endpoints take no JSON request bodies: the creator comes from the
//! path and the subscriber from the `X-User-Id` header.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::ReconcileWebhookResult;
use crate::domain::billing::{Subscription, SubscriptionStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// A subscriber's subscription to one creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub creator_id: String,
    pub status: SubscriptionStatus,
    /// Whether the subscriber can currently see the creator's content.
    pub has_access: bool,
    pub cancel_at_period_end: bool,
    /// Start of the current billing period (RFC 3339).
    pub current_period_start: Option<String>,
    /// End of the current billing period (RFC 3339).
    pub current_period_end: Option<String>,
    /// Price locked in when the subscription was created, in minor units.
    pub price_at_purchase: i64,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id.to_string(),
            has_access: s.has_access(),
            creator_id: s.creator_id.to_string(),
            status: s.status,
            cancel_at_period_end: s.cancel_at_period_end,
            current_period_start: s.current_period_start.map(|t| t.as_datetime().to_rfc3339()),
            current_period_end: s.current_period_end.map(|t| t.as_datetime().to_rfc3339()),
            price_at_purchase: s.price_at_purchase.value(),
        }
    }
}

/// Acknowledgment returned to the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAckResponse {
    pub received: bool,
    /// `"already_processed"` for a redelivered event, absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<&ReconcileWebhookResult> for WebhookAckResponse {
    fn from(result: &ReconcileWebhookResult) -> Self {
        let status = match result {
            ReconcileWebhookResult::Processed { .. } => None,
            ReconcileWebhookResult::AlreadyProcessed { .. } => Some("already_processed".to_string()),
        };
        Self {
            received: true,
            status,
        }
    }
}

/// Webhook failure body. Deliberately carries no provider or storage detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Standard error response for the subscription API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::{EventOutcome, IgnoreReason};
    use crate::domain::billing::BillingPeriod;
    use crate::domain::foundation::{CreatorId, MinorUnits, SubscriberId, Timestamp};

    #[test]
    fn subscription_response_reports_access_and_price() {
        let sub = Subscription::create(
            SubscriberId::new("user-1").unwrap(),
            CreatorId::new("creator-1").unwrap(),
            Some("sub_1".to_string()),
            SubscriptionStatus::PastDue,
            BillingPeriod {
                start: None,
                end: Timestamp::from_unix_secs(1_706_745_600),
            },
            true,
            MinorUnits::new(499).unwrap(),
        );

        let json = serde_json::to_value(SubscriptionResponse::from(sub)).unwrap();

        assert_eq!(json["status"], "past_due");
        assert_eq!(json["has_access"], false);
        assert_eq!(json["cancel_at_period_end"], true);
        assert_eq!(json["price_at_purchase"], 499);
        assert!(json["current_period_start"].is_null());
        assert_eq!(json["current_period_end"], "2024-02-01T00:00:00+00:00");
    }

    #[test]
    fn ack_for_processed_event_omits_status() {
        let result = ReconcileWebhookResult::Processed {
            event_id: "evt_1".to_string(),
            event_type: "invoice.paid".to_string(),
            outcome: EventOutcome::Ignored(IgnoreReason::SubscriptionNotFound),
        };

        let json = serde_json::to_value(WebhookAckResponse::from(&result)).unwrap();

        assert_eq!(json, serde_json::json!({ "received": true }));
    }

    #[test]
    fn ack_for_redelivery_marks_already_processed() {
        let result = ReconcileWebhookResult::AlreadyProcessed {
            event_id: "evt_1".to_string(),
        };

        let json = serde_json::to_value(WebhookAckResponse::from(&result)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "received": true, "status": "already_processed" })
        );
    }
}
