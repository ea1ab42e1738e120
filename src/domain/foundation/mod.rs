//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types
//! that form the vocabulary of the billing domain.

mod errors;
mod ids;
mod money;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CreatorId, SubscriberId, SubscriptionId};
pub use money::MinorUnits;
pub use timestamp::Timestamp;
