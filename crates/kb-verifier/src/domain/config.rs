//! Verifier configuration with validation.
//!
//! Limits follow the service documentation:
//! <https://docs.kickbox.com/docs/using-the-api#api-limits>

use std::env;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};
use tokio::sync::Semaphore;

use crate::ports::outbound::Transport;

/// Production endpoint
pub const BASE_URL: &str = "https://api.kickbox.com";

/// Endpoint for "EU Only" accounts (signed in from app.eu.kickbox.com)
pub const BASE_URL_EU: &str = "https://api.eu.kickbox.com";

/// Documented ceiling of simultaneous connections per account
pub const MAX_CONCURRENT_CALLS: usize = 25;

/// Documented ceiling of calls per minute
pub const MAX_CALLS_PER_MINUTE: u32 = 8000;

/// Default verification timeout
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(6);

/// Hard ceiling for a verification timeout
pub const MAX_VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default overall timeout for batch submission
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed timeout for batch status queries
pub const BATCH_STATUS_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-wide HTTP timeout of the default transport
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Token bucket parameters for the admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained calls per minute; tokens refill at `calls_per_minute / 60` per second
    pub calls_per_minute: u32,
    /// Bucket capacity. 1 paces calls smoothly with no burst.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls_per_minute: MAX_CALLS_PER_MINUTE,
            burst: 1,
        }
    }
}

impl RateLimitConfig {
    /// Validate and convert into a governor quota.
    pub fn quota(&self) -> Result<Quota, ConfigError> {
        if self.calls_per_minute == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "calls_per_minute must be greater than zero".into(),
            ));
        }
        let burst = NonZeroU32::new(self.burst).ok_or_else(|| {
            ConfigError::InvalidRateLimit("burst must be greater than zero".into())
        })?;
        let period = Duration::from_secs(60) / self.calls_per_minute;
        let quota = Quota::with_period(period).ok_or_else(|| {
            ConfigError::InvalidRateLimit(format!(
                "{} calls per minute is too fast to pace",
                self.calls_per_minute
            ))
        })?;
        Ok(quota.allow_burst(burst))
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("apikey is empty")]
    EmptyApiKey,
    #[error("baseURL is empty")]
    EmptyBaseUrl,
    #[error("invalid concurrency limit: {0}")]
    InvalidConcurrency(String),
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid environment variable {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
    #[error("building http client: {0}")]
    HttpClient(String),
}

/// Immutable, validated verifier configuration.
#[derive(Clone)]
pub struct VerifierConfig {
    api_key: String,
    base_url: String,
    max_concurrent_calls: usize,
    rate_limit: RateLimitConfig,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
    transport: Option<Arc<dyn Transport>>,
    http_timeout: Duration,
}

impl VerifierConfig {
    /// Start a builder with production defaults.
    pub fn builder(api_key: impl Into<String>) -> VerifierConfigBuilder {
        VerifierConfigBuilder::new(api_key.into())
    }

    /// Build a configuration from environment variables.
    ///
    /// See [`VerifierConfigBuilder::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, ConfigError> {
        VerifierConfigBuilder::from_env().build()
    }

    #[cfg(test)]
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        VerifierConfigBuilder::from_lookup(lookup).build()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
    }

    /// Custom rate limiter, if one overrides `rate_limit`
    pub fn rate_limiter(&self) -> Option<&Arc<DefaultDirectRateLimiter>> {
        self.rate_limiter.as_ref()
    }

    /// Custom transport, if one overrides the default HTTP client
    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

impl fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_concurrent_calls", &self.max_concurrent_calls)
            .field("rate_limit", &self.rate_limit)
            .field("custom_rate_limiter", &self.rate_limiter.is_some())
            .field("custom_transport", &self.transport.is_some())
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Builder for [`VerifierConfig`].
///
/// Setters validate eagerly. The first invalid setting is kept and every
/// later setter becomes a no-op, so `build()` reports the first failure.
pub struct VerifierConfigBuilder {
    api_key: String,
    base_url: String,
    max_concurrent_calls: usize,
    allow_above_ceiling: bool,
    rate_limit: RateLimitConfig,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
    transport: Option<Arc<dyn Transport>>,
    http_timeout: Duration,
    error: Option<ConfigError>,
}

impl VerifierConfigBuilder {
    fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            max_concurrent_calls: MAX_CONCURRENT_CALLS,
            allow_above_ceiling: false,
            rate_limit: RateLimitConfig::default(),
            rate_limiter: None,
            transport: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            error: None,
        }
    }

    /// Builder seeded from environment variables. Later setters override.
    ///
    /// # Environment Variables
    ///
    /// - `KICKBOX_API_KEY`: API key (required)
    /// - `KICKBOX_BASE_URL`: endpoint (default: production)
    /// - `KICKBOX_MAX_CONCURRENT_CALLS`: slot pool size (default: 25)
    /// - `KICKBOX_CALLS_PER_MINUTE`: rate limit (default: 8000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Self::new(lookup("KICKBOX_API_KEY").unwrap_or_default());

        if let Some(url) = lookup("KICKBOX_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(raw) = lookup("KICKBOX_MAX_CONCURRENT_CALLS") {
            builder = match raw.trim().parse() {
                Ok(max) => builder.max_concurrent_calls(max),
                Err(_) => builder.fail(ConfigError::InvalidEnv {
                    name: "KICKBOX_MAX_CONCURRENT_CALLS",
                    reason: format!("not a number: {raw}"),
                }),
            };
        }
        if let Some(raw) = lookup("KICKBOX_CALLS_PER_MINUTE") {
            builder = match raw.trim().parse() {
                Ok(calls_per_minute) => builder.rate_limit(RateLimitConfig {
                    calls_per_minute,
                    ..RateLimitConfig::default()
                }),
                Err(_) => builder.fail(ConfigError::InvalidEnv {
                    name: "KICKBOX_CALLS_PER_MINUTE",
                    reason: format!("not a number: {raw}"),
                }),
            };
        }

        builder
    }

    fn fail(self, error: ConfigError) -> Self {
        self.apply(|_| Err(error))
    }

    fn apply(mut self, f: impl FnOnce(&mut Self) -> Result<(), ConfigError>) -> Self {
        if self.error.is_none() {
            if let Err(e) = f(&mut self) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Point the client at another endpoint (regional, mock server).
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.apply(|b| {
            if base_url.is_empty() {
                return Err(ConfigError::EmptyBaseUrl);
            }
            b.base_url = base_url.trim_end_matches('/').to_string();
            Ok(())
        })
    }

    /// Size of the concurrency slot pool.
    pub fn max_concurrent_calls(self, max: usize) -> Self {
        self.apply(|b| {
            if max == 0 {
                return Err(ConfigError::InvalidConcurrency(
                    "max concurrent calls must be greater than zero".into(),
                ));
            }
            b.max_concurrent_calls = max;
            Ok(())
        })
    }

    /// Permit a slot pool larger than the documented service ceiling.
    pub fn allow_above_service_ceiling(mut self) -> Self {
        self.allow_above_ceiling = true;
        self
    }

    pub fn rate_limit(self, rate_limit: RateLimitConfig) -> Self {
        self.apply(|b| {
            rate_limit.quota()?;
            b.rate_limit = rate_limit;
            Ok(())
        })
    }

    /// Use a prebuilt rate limiter instead of one derived from `rate_limit`.
    pub fn custom_rate_limiter(mut self, limiter: Arc<DefaultDirectRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Replace the default reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Client-wide timeout of the default transport.
    pub fn http_timeout(self, timeout: Duration) -> Self {
        self.apply(|b| {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidTimeout(
                    "http timeout must be greater than zero".into(),
                ));
            }
            b.http_timeout = timeout;
            Ok(())
        })
    }

    pub fn build(self) -> Result<VerifierConfig, ConfigError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if self.max_concurrent_calls > MAX_CONCURRENT_CALLS && !self.allow_above_ceiling {
            return Err(ConfigError::InvalidConcurrency(format!(
                "{} exceeds the service ceiling of {}",
                self.max_concurrent_calls, MAX_CONCURRENT_CALLS
            )));
        }
        if self.max_concurrent_calls > Semaphore::MAX_PERMITS {
            return Err(ConfigError::InvalidConcurrency(format!(
                "{} exceeds the slot pool limit of {}",
                self.max_concurrent_calls,
                Semaphore::MAX_PERMITS
            )));
        }

        Ok(VerifierConfig {
            api_key: self.api_key,
            base_url: self.base_url,
            max_concurrent_calls: self.max_concurrent_calls,
            rate_limit: self.rate_limit,
            rate_limiter: self.rate_limiter,
            transport: self.transport,
            http_timeout: self.http_timeout,
        })
    }
}
