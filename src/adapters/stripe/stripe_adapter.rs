//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API.
//!
//! # Error Mapping
//!
//! | Stripe response | `PaymentErrorCode` |
//! |-----------------|--------------------|
//! | 404 or `resource_missing` | `NotFound` |
//! | 429 | `RateLimitExceeded` (with `Retry-After`) |
//! | 401 | `AuthenticationError` |
//! | other 4xx | `InvalidRequest` |
//! | 5xx | `ServiceUnavailable` |
//! | transport failure | `NetworkError` |

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::ProviderSubscription;
use crate::ports::{PaymentError, PaymentErrorCode, PaymentProvider};

/// Default Stripe API base URL.
pub const DEFAULT_STRIPE_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_STRIPE_API_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (stripe-mock, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

/// Stripe's error envelope.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripePaymentAdapter {
    /// Create an adapter with a default HTTP client.
    pub fn new(config: StripeConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create an adapter around a shared, preconfigured HTTP client.
    pub fn with_client(config: StripeConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn subscription_url(&self, subscription_id: &str) -> String {
        format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        )
    }

    async fn parse_subscription(
        response: reqwest::Response,
    ) -> Result<ProviderSubscription, PaymentError> {
        response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }

    async fn error_from_response(response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());
        let body = response.text().await.unwrap_or_default();
        map_error_response(status.as_u16(), retry_after, &body)
    }
}

/// Maps a non-success Stripe response onto a `PaymentError`.
pub(crate) fn map_error_response(status: u16, retry_after: Option<u32>, body: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let provider_code = detail.as_ref().and_then(|d| d.code.clone());
    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));

    let code = match status {
        _ if provider_code.as_deref() == Some("resource_missing") => PaymentErrorCode::NotFound,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        401 => PaymentErrorCode::AuthenticationError,
        400..=499 => PaymentErrorCode::InvalidRequest,
        500..=599 => PaymentErrorCode::ServiceUnavailable,
        _ => PaymentErrorCode::ProviderError,
    };

    let mut error = PaymentError::new(code, message);
    if let Some(provider_code) = provider_code {
        error = error.with_provider_code(provider_code);
    }
    if let (PaymentErrorCode::RateLimitExceeded, Some(secs)) = (code, retry_after) {
        error = error.with_retry_after(secs);
    }
    error
}

fn transport_error(err: reqwest::Error) -> PaymentError {
    PaymentError::network(err.to_string())
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, PaymentError> {
        let response = self
            .http_client
            .get(self.subscription_url(subscription_id))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let error = Self::error_from_response(response).await;
            if error.is_not_found() {
                return Ok(None);
            }
            return Err(error);
        }

        Self::parse_subscription(response).await.map(Some)
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<ProviderSubscription, PaymentError> {
        let flag = if cancel_at_period_end { "true" } else { "false" };

        let response = self
            .http_client
            .post(self.subscription_url(subscription_id))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&[("cancel_at_period_end", flag)])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let subscription = Self::parse_subscription(response).await?;
        tracing::info!(
            provider_subscription_id = %subscription.id,
            cancel_at_period_end = subscription.cancel_at_period_end,
            "Stripe subscription cancel flag updated"
        );
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StripeConfig {
        StripeConfig::new(SecretString::new("sk_test_123".to_string()))
    }

    // ══════════════════════════════════════════════════════════════
    // Configuration Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        assert_eq!(test_config().api_base_url(), DEFAULT_STRIPE_API_BASE_URL);
    }

    #[test]
    fn config_with_base_url_trims_trailing_slash() {
        let config = test_config().with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url(), "http://localhost:12111");
    }

    #[test]
    fn config_debug_redacts_api_key() {
        assert!(!format!("{:?}", test_config()).contains("sk_test_123"));
    }

    #[test]
    fn subscription_url_uses_base() {
        let adapter = StripePaymentAdapter::new(test_config().with_base_url("http://stripe.local"));
        assert_eq!(
            adapter.subscription_url("sub_1"),
            "http://stripe.local/v1/subscriptions/sub_1"
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn resource_missing_maps_to_not_found() {
        let body = r#"{"error":{"code":"resource_missing","message":"No such subscription: 'sub_x'","type":"invalid_request_error"}}"#;

        let err = map_error_response(400, None, body);

        assert_eq!(err.code, PaymentErrorCode::NotFound);
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
        assert!(err.message.contains("No such subscription"));
    }

    #[test]
    fn http_404_maps_to_not_found() {
        assert_eq!(map_error_response(404, None, "").code, PaymentErrorCode::NotFound);
    }

    #[test]
    fn http_429_maps_to_rate_limit_with_retry_after() {
        let err = map_error_response(429, Some(12), "");

        assert_eq!(err.code, PaymentErrorCode::RateLimitExceeded);
        assert_eq!(err.retry_after_secs, Some(12));
        assert!(err.is_retryable());
    }

    #[test]
    fn other_client_errors_are_invalid_requests() {
        let body = r#"{"error":{"code":"parameter_invalid_empty","message":"bad"}}"#;
        let err = map_error_response(400, None, body);

        assert_eq!(err.code, PaymentErrorCode::InvalidRequest);
        assert!(!err.is_retryable());
    }

    #[test]
    fn unauthorized_maps_to_authentication_error() {
        assert_eq!(
            map_error_response(401, None, "").code,
            PaymentErrorCode::AuthenticationError
        );
    }

    #[test]
    fn server_errors_are_retryable_outages() {
        let err = map_error_response(503, None, "<html>bad gateway</html>");

        assert_eq!(err.code, PaymentErrorCode::ServiceUnavailable);
        assert!(err.message.contains("503"));
        assert!(err.is_retryable());
    }
}
