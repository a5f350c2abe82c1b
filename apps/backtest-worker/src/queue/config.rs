//! Queue client configuration.

use std::time::Duration;

/// Retry policy for transient queue failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per logical request.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier applied per retry.
    pub backoff_multiplier: f64,
    /// Jitter fraction applied to each delay, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

/// Configuration for the HTTP queue client.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// API base, e.g. `http://localhost:3001/api`.
    pub api_base: String,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Stable identifier this worker claims tasks under.
    pub worker_id: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for poll and report.
    pub retry: RetryConfig,
}

impl QueueConfig {
    /// Build a config with default timeout and retry policy.
    #[must_use]
    pub fn new(api_base: impl Into<String>, worker_id: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_token: None,
            worker_id: worker_id.into(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Attach a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
