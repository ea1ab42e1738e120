//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe, plus a configurable
//! mock for tests.
//!
//! # Security
//!
//! - The API key is held in `secrecy::SecretString` and never logged
//! - Webhook signatures are verified in the domain (`WebhookVerifier`), not here

mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter, DEFAULT_STRIPE_API_BASE_URL};
