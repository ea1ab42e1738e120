//! ReconcileWebhookHandler - Intake for payment provider events.
//!
//! Verify, check the ledger, route, then record. The ledger is written only
//! after the handler succeeds, so a failed event is redelivered by the
//! provider and processed again rather than silently dropped.

use std::sync::Arc;

use crate::domain::billing::{WebhookError, WebhookVerifier};
use crate::ports::{MarkOutcome, ProcessedEventLedger};

use super::event_router::{EventOutcome, EventRouter};

/// One delivery as received: the exact body bytes and the signature header.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWebhookResult {
    Processed {
        event_id: String,
        event_type: String,
        outcome: EventOutcome,
    },
    /// The event id is already in the ledger; nothing was re-applied.
    AlreadyProcessed { event_id: String },
}

impl ReconcileWebhookResult {
    pub fn event_id(&self) -> &str {
        match self {
            ReconcileWebhookResult::Processed { event_id, .. }
            | ReconcileWebhookResult::AlreadyProcessed { event_id } => event_id,
        }
    }
}

pub struct ReconcileWebhookHandler {
    /// `None` when no signing secret is configured; every delivery is then refused.
    verifier: Option<Arc<WebhookVerifier>>,
    ledger: Arc<dyn ProcessedEventLedger>,
    router: EventRouter,
}

impl ReconcileWebhookHandler {
    pub fn new(
        verifier: Option<Arc<WebhookVerifier>>,
        ledger: Arc<dyn ProcessedEventLedger>,
        router: EventRouter,
    ) -> Self {
        Self {
            verifier,
            ledger,
            router,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileWebhookCommand,
    ) -> Result<ReconcileWebhookResult, WebhookError> {
        let Some(verifier) = self.verifier.as_ref() else {
            tracing::error!("Webhook signing secret not configured; refusing delivery");
            return Err(WebhookError::SecretNotConfigured);
        };

        let Some(signature) = cmd.signature.as_deref() else {
            tracing::warn!("Webhook delivery without signature header");
            return Err(WebhookError::MissingSignature);
        };

        let event = verifier.verify(&cmd.payload, signature).map_err(|e| {
            tracing::warn!(error = %e, "Webhook rejected");
            e
        })?;

        if self.ledger.has_processed(&event.id).await? {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Event already processed"
            );
            return Ok(ReconcileWebhookResult::AlreadyProcessed { event_id: event.id });
        }

        let outcome = self.router.route(&event).await.map_err(|e| {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                error = %e,
                retryable = e.is_retryable(),
                "Event handling failed"
            );
            e
        })?;

        match self
            .ledger
            .mark_processed(&event.id, &event.event_type)
            .await?
        {
            MarkOutcome::Recorded => {}
            MarkOutcome::AlreadyRecorded => tracing::debug!(
                event_id = %event.id,
                "Concurrent delivery recorded the event first"
            ),
        }

        match outcome {
            EventOutcome::Ignored(reason) => tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                reason = %reason,
                "Event acknowledged without changes"
            ),
            EventOutcome::Applied(subscription_id) | EventOutcome::Unchanged(subscription_id) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    subscription_id = %subscription_id,
                    "Event processed"
                )
            }
        }

        Ok(ReconcileWebhookResult::Processed {
            event_id: event.id,
            event_type: event.event_type,
            outcome,
        })
    }
}
