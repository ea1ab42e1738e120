//! ProcessedEventLedger port - Idempotency record for provider events.
//!
//! A row for an event id means every side effect of that event has been
//! applied. Rows are written only after the event's handler succeeds, so a
//! crash between handling and marking results in a safe redelivery.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Result of recording a processed event.
///
/// Both variants are success: losing a race to a concurrent delivery of the
/// same event still leaves the event recorded exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Port for the processed-event ledger.
///
/// # Example
///
/// ```ignore
/// if ledger.has_processed(&event.id).await? {
///     return Ok(WebhookOutcome::AlreadyProcessed);
/// }
///
/// router.route(&event).await?;
///
/// ledger.mark_processed(&event.id, &event.event_type).await?;
/// ```
#[async_trait]
pub trait ProcessedEventLedger: Send + Sync {
    /// Returns true if the event has already been fully processed.
    async fn has_processed(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Records the event as processed. A duplicate key is `AlreadyRecorded`, not an error.
    async fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<MarkOutcome, DomainError>;

    /// Deletes entries processed before `cutoff`. Returns the number removed.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_event_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn ProcessedEventLedger) {}
    }
}
