//! Client configuration.

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use std::fmt;
use std::time::Duration;

/// Default timeout for a whole request, connect to last body byte.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`HttpBackend`](crate::backend::http::HttpBackend).
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    /// Workspace URL, e.g. `https://example.cloud.databricks.com`.
    pub host: String,
    /// Personal access token sent as a bearer token.
    pub token: String,
    /// Global request timeout.
    pub timeout: Duration,
    /// Retry policy for idempotent reads.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Create a configuration with default timeout and retry policy.
    #[must_use]
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy for reads.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Check that host and token are present.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("workspace host is not set".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(Error::Config("access token is not set".to_string()));
        }
        Ok(())
    }

    /// Host with an `https://` scheme and without a trailing slash.
    #[must_use]
    pub fn normalized_host(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}
