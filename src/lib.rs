//! Creator Billing - billing-event reconciliation for a creator-subscription marketplace.
//!
//! Keeps local subscription records consistent with the payment provider,
//! which is the source of truth for billing state. Provider events arrive
//! through a signed webhook, are de-duplicated by event id and applied to
//! local rows; subscriber-initiated cancel and reactivate go to the
//! provider first and are mirrored locally only after it confirms.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
