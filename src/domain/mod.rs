//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `billing` - Subscription state machine, provider events and their verification

pub mod billing;
pub mod foundation;
