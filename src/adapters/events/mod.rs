//! Background services.
//!
//! - `NotificationDispatcher` - Drains the notification outbox
//! - `LedgerRetentionTask` - Prunes old idempotency ledger rows

mod ledger_retention;
mod notification_dispatcher;

pub use ledger_retention::{LedgerRetentionTask, DEFAULT_RETENTION_DAYS};
pub use notification_dispatcher::{
    DispatchReport, NotificationDispatcher, NotificationDispatcherConfig,
};
