//! Rate limit configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::rate_limiter::RateLimitConfig;

/// Which rate limiter implementation to run.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// Per-process counters; limits are not shared between instances.
    #[default]
    Memory,
    /// Shared counters in Redis.
    Redis,
}

/// Rate limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default)]
    pub backend: RateLimitBackend,

    /// Redis connection URL, required for the redis backend
    pub redis_url: Option<String>,

    /// Requests per minute across all callers
    #[serde(default = "default_global_requests_per_minute")]
    pub global_requests_per_minute: u32,

    /// Cancel/reactivate requests allowed per subscriber per window
    #[serde(default = "default_mutation_requests")]
    pub mutation_requests_per_window: u32,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u32,
}

impl RateLimitSettings {
    /// Limits in the shape the limiter adapters take.
    pub fn limits(&self) -> RateLimitConfig {
        RateLimitConfig {
            global_requests_per_minute: self.global_requests_per_minute,
            mutation_requests_per_window: self.mutation_requests_per_window,
            window_secs: self.window_secs,
        }
    }

    /// Validate rate limit configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == RateLimitBackend::Redis {
            let url = self
                .redis_url
                .as_deref()
                .ok_or(ValidationError::MissingRequired("rate_limit.redis_url"))?;
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ValidationError::InvalidRedisUrl);
            }
        }
        if self.global_requests_per_minute == 0 {
            return Err(ValidationError::MustBePositive(
                "rate_limit.global_requests_per_minute",
            ));
        }
        if self.mutation_requests_per_window == 0 {
            return Err(ValidationError::MustBePositive(
                "rate_limit.mutation_requests_per_window",
            ));
        }
        if self.window_secs == 0 {
            return Err(ValidationError::MustBePositive("rate_limit.window_secs"));
        }
        Ok(())
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            backend: RateLimitBackend::default(),
            redis_url: None,
            global_requests_per_minute: default_global_requests_per_minute(),
            mutation_requests_per_window: default_mutation_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_global_requests_per_minute() -> u32 {
    RateLimitConfig::default().global_requests_per_minute
}

fn default_mutation_requests() -> u32 {
    RateLimitConfig::default().mutation_requests_per_window
}

fn default_window_secs() -> u32 {
    RateLimitConfig::default().window_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_limiter_defaults() {
        let settings = RateLimitSettings::default();
        assert_eq!(settings.backend, RateLimitBackend::Memory);
        assert_eq!(settings.limits(), RateLimitConfig::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let settings = RateLimitSettings {
            backend: RateLimitBackend::Redis,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ValidationError::MissingRequired("rate_limit.redis_url"))
        );
    }

    #[test]
    fn test_redis_url_scheme_is_checked() {
        let settings = RateLimitSettings {
            backend: RateLimitBackend::Redis,
            redis_url: Some("http://localhost:6379".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(ValidationError::InvalidRedisUrl));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let settings = RateLimitSettings {
            window_secs: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
