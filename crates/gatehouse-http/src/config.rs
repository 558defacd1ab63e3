//! Client configuration.

use std::time::Duration;

use gatehouse_core::error::InvalidInputError;
use gatehouse_core::{ApiUrl, Result};

use crate::retry::RetryPolicy;

/// Base URL of the upstream API.
pub const ENV_API_URL: &str = "GATEHOUSE_API_URL";
/// `"true"` selects the filesystem mock backend.
pub const ENV_USE_MOCK_API: &str = "GATEHOUSE_USE_MOCK_API";
/// Request timeout in whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "GATEHOUSE_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upstream base URL; endpoints live under `/api/v1`.
    pub api_url: ApiUrl,
    /// Whether the mock backend should be used instead of the network.
    pub use_mock: bool,
    /// Applied to every request, including the refresh call.
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            use_mock: false,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("gatehouse/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_url = ApiUrl::new(url.trim())?;
        }

        if let Some(flag) = lookup(ENV_USE_MOCK_API) {
            config.use_mock = flag.trim() == "true";
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| InvalidInputError::Other {
                message: format!("{} must be a whole number of seconds, got '{}'", ENV_TIMEOUT_SECS, secs),
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

fn default_api_url() -> ApiUrl {
    match ApiUrl::new(DEFAULT_API_URL) {
        Ok(url) => url,
        Err(_) => unreachable!("default API URL is valid"),
    }
}
