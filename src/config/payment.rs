//! Payment configuration

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::stripe::{StripeConfig, DEFAULT_STRIPE_API_BASE_URL};
use crate::domain::billing::{WebhookVerifier, DEFAULT_TOLERANCE_SECS};

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    #[serde(default)]
    pub stripe_api_key: String,

    /// Stripe webhook signing secret. Without it every webhook is refused.
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API base URL
    #[serde(default = "default_api_base_url")]
    pub stripe_api_base_url: String,

    /// Reject test-mode events
    #[serde(default)]
    pub require_livemode: bool,

    /// Maximum accepted signature age in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Client configuration for the Stripe adapter.
    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig::new(SecretString::new(self.stripe_api_key.clone()))
            .with_base_url(self.stripe_api_base_url.clone())
    }

    /// The webhook verifier, or `None` when no signing secret is configured.
    pub fn webhook_verifier(&self) -> Option<WebhookVerifier> {
        self.stripe_webhook_secret.as_ref().map(|secret| {
            WebhookVerifier::new(SecretString::new(secret.clone()))
                .with_tolerance(self.signature_tolerance_secs)
                .require_livemode(self.require_livemode)
        })
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("payment.stripe_api_key"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if let Some(secret) = &self.stripe_webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }
        if self.signature_tolerance_secs <= 0 {
            return Err(ValidationError::MustBePositive(
                "payment.signature_tolerance_secs",
            ));
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: None,
            stripe_api_base_url: default_api_base_url(),
            require_livemode: false,
            signature_tolerance_secs: default_signature_tolerance(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_STRIPE_API_BASE_URL.to_string()
}

fn default_signature_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abcd1234".to_string(),
            stripe_webhook_secret: Some("whsec_xyz789".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_test_mode() {
        let config = valid();
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_is_live_mode() {
        let config = PaymentConfig {
            stripe_api_key: "sk_live_xxx".to_string(),
            ..valid()
        };
        assert!(config.is_live_mode());
        assert!(!config.is_test_mode());
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = PaymentConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_webhook_secret_is_allowed_but_disables_verifier() {
        let config = PaymentConfig {
            stripe_webhook_secret: None,
            ..valid()
        };
        assert!(config.validate().is_ok());
        assert!(config.webhook_verifier().is_none());
    }

    #[test]
    fn test_validation_invalid_api_key_prefix() {
        let config = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(), // Publishable key
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));
    }

    #[test]
    fn test_validation_invalid_webhook_secret_prefix() {
        let config = PaymentConfig {
            stripe_webhook_secret: Some("secret_xxx".to_string()),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_validation_non_positive_tolerance() {
        let config = PaymentConfig {
            signature_tolerance_secs: 0,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        let config = valid();
        assert!(config.validate().is_ok());
        assert!(config.webhook_verifier().is_some());
        assert_eq!(config.stripe_config().api_base_url(), DEFAULT_STRIPE_API_BASE_URL);
    }
}
