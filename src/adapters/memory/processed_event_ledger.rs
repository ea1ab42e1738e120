//! In-memory implementation of ProcessedEventLedger.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{MarkOutcome, ProcessedEventLedger};

#[derive(Debug, Clone)]
struct LedgerRow {
    event_type: String,
    processed_at: Timestamp,
}

#[derive(Default)]
pub struct InMemoryProcessedEventLedger {
    rows: RwLock<HashMap<String, LedgerRow>>,
}

impl InMemoryProcessedEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Event type recorded for an event id.
    pub async fn event_type(&self, event_id: &str) -> Option<String> {
        self.rows.read().await.get(event_id).map(|row| row.event_type.clone())
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ProcessedEventLedger for InMemoryProcessedEventLedger {
    async fn has_processed(&self, event_id: &str) -> Result<bool, DomainError> {
        Ok(self.rows.read().await.contains_key(event_id))
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<MarkOutcome, DomainError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(event_id) {
            return Ok(MarkOutcome::AlreadyRecorded);
        }
        rows.insert(
            event_id.to_string(),
            LedgerRow {
                event_type: event_type.to_string(),
                processed_at: Timestamp::now(),
            },
        );
        Ok(MarkOutcome::Recorded)
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| row.processed_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn has_processed_is_false_for_new_event() {
        let ledger = InMemoryProcessedEventLedger::new();
        assert!(!ledger.has_processed("evt_1").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_mark_is_already_recorded() {
        let ledger = InMemoryProcessedEventLedger::new();

        let first = ledger.mark_processed("evt_1", "invoice.paid").await.unwrap();
        let second = ledger.mark_processed("evt_1", "invoice.paid").await.unwrap();

        assert_eq!(first, MarkOutcome::Recorded);
        assert_eq!(second, MarkOutcome::AlreadyRecorded);
        assert!(ledger.has_processed("evt_1").await.unwrap());
        assert_eq!(ledger.len().await, 1);
        assert_eq!(ledger.event_type("evt_1").await.as_deref(), Some("invoice.paid"));
    }

    #[tokio::test]
    async fn delete_before_removes_older_rows() {
        let ledger = InMemoryProcessedEventLedger::new();
        ledger.mark_processed("evt_1", "invoice.paid").await.unwrap();
        ledger.mark_processed("evt_2", "invoice.paid").await.unwrap();

        let kept = ledger.delete_before(Timestamp::now().add_days(-1)).await.unwrap();
        assert_eq!(kept, 0);

        let removed = ledger.delete_before(Timestamp::now().plus_secs(1)).await.unwrap();
        assert_eq!(removed, 2);
        assert!(ledger.is_empty().await);
    }
}
