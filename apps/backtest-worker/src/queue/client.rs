//! HTTP queue client over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use super::config::{QueueConfig, RetryConfig};
use super::error::QueueError;
use super::TaskQueue;
use crate::result::{BacktestResult, ResultStatus};
use crate::task::Task;

/// Classification of a response status for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusCategory {
    Success,
    /// Transient server-side trouble; back off and retry.
    Retryable,
    /// Lost a claim race (conflict or gone).
    Conflict,
    /// Rejected credentials; fatal.
    Auth,
    /// Anything else; give up immediately.
    NonRetryable,
}

const fn categorize_status(status: u16) -> StatusCategory {
    match status {
        200..=299 => StatusCategory::Success,
        401 | 403 => StatusCategory::Auth,
        409 | 410 => StatusCategory::Conflict,
        408 | 429 | 500..=599 => StatusCategory::Retryable,
        _ => StatusCategory::NonRetryable,
    }
}

/// Exponential backoff with jitter.
struct ExponentialBackoff<'a> {
    retry: &'a RetryConfig,
}

impl ExponentialBackoff<'_> {
    /// Delay before retry number `attempt` (1-based).
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.retry.initial_delay.as_millis() as f64
            * self.retry.backoff_multiplier.powi(exponent as i32);
        let capped = base.min(self.retry.max_delay.as_millis() as f64);
        let jitter = self.retry.jitter.clamp(0.0, 1.0);
        let factor = if jitter > 0.0 {
            1.0 + rand::rng().random_range(-jitter..=jitter)
        } else {
            1.0
        };
        Duration::from_millis((capped * factor).max(0.0) as u64)
    }
}

/// Task queue client speaking the coordination service's HTTP API.
pub struct HttpQueueClient {
    client: reqwest::Client,
    config: QueueConfig,
}

impl HttpQueueClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Transport`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| QueueError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Extract at most one task from a poll body. The service may answer
    /// with a single object, a list, or `null`.
    fn parse_poll_body(body: &str) -> Result<Option<Task>, QueueError> {
        if body.trim().is_empty() {
            return Ok(None);
        }
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| QueueError::JsonParse(e.to_string()))?;
        let task_value = match value {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::Array(items) => match items.into_iter().next() {
                Some(first) => first,
                None => return Ok(None),
            },
            other => other,
        };
        serde_json::from_value(task_value)
            .map(Some)
            .map_err(|e| QueueError::JsonParse(e.to_string()))
    }
}

#[async_trait]
impl TaskQueue for HttpQueueClient {
    async fn poll(&self) -> Result<Option<Task>, QueueError> {
        let url = format!(
            "{}/tasks/pending/poll?worker_id={}",
            self.config.api_base, self.config.worker_id
        );
        let backoff = ExponentialBackoff {
            retry: &self.config.retry,
        };

        for attempt in 1..=self.config.retry.max_attempts {
            let response = self.authorize(self.client.get(&url)).send().await;
            match response {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match categorize_status(status) {
                        StatusCategory::Success => {
                            if status == 204 {
                                return Ok(None);
                            }
                            let body = response
                                .text()
                                .await
                                .map_err(|e| QueueError::Transport(e.to_string()))?;
                            return Self::parse_poll_body(&body);
                        }
                        StatusCategory::Auth => return Err(QueueError::Auth),
                        StatusCategory::Retryable => {
                            debug!(status, attempt, "poll retryable status");
                        }
                        StatusCategory::Conflict | StatusCategory::NonRetryable => {
                            let message = response.text().await.unwrap_or_default();
                            return Err(QueueError::Api { status, message });
                        }
                    }
                }
                Err(e) => {
                    debug!(error = %e, attempt, "poll transport error");
                }
            }
            if attempt < self.config.retry.max_attempts {
                tokio::time::sleep(backoff.delay_for_attempt(attempt)).await;
            }
        }

        Err(QueueError::RetriesExhausted {
            attempts: self.config.retry.max_attempts,
        })
    }

    async fn claim(&self, task_id: &str) -> Result<bool, QueueError> {
        let url = format!(
            "{}/tasks/{task_id}/claim?worker_id={}",
            self.config.api_base, self.config.worker_id
        );

        // Single attempt. After a transport failure the claim outcome is
        // unknown; treating it as a lost race is always safe because an
        // actually-claimed task is requeued by the service's staleness
        // timeout.
        let response = match self.authorize(self.client.post(&url)).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(task_id, error = %e, "claim transport error, treating as lost race");
                return Ok(false);
            }
        };

        let status = response.status().as_u16();
        match categorize_status(status) {
            StatusCategory::Success => Ok(true),
            StatusCategory::Conflict => Ok(false),
            StatusCategory::Auth => Err(QueueError::Auth),
            StatusCategory::Retryable | StatusCategory::NonRetryable => {
                let message = response.text().await.unwrap_or_default();
                Err(QueueError::Api { status, message })
            }
        }
    }

    async fn report(&self, task_id: &str, result: &BacktestResult) -> Result<(), QueueError> {
        // Failures go to the dedicated fail endpoint, successes (and
        // no-data outcomes) to report.
        let suffix = if result.status == ResultStatus::Error {
            "fail"
        } else {
            "report"
        };
        let url = format!("{}/tasks/{task_id}/{suffix}", self.config.api_base);
        let backoff = ExponentialBackoff {
            retry: &self.config.retry,
        };

        for attempt in 1..=self.config.retry.max_attempts {
            let response = self
                .authorize(self.client.post(&url))
                .json(result)
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match categorize_status(status) {
                        StatusCategory::Success => return Ok(()),
                        StatusCategory::Auth => return Err(QueueError::Auth),
                        StatusCategory::Retryable => {
                            debug!(task_id, status, attempt, "report retryable status");
                        }
                        StatusCategory::Conflict | StatusCategory::NonRetryable => {
                            let message = response.text().await.unwrap_or_default();
                            return Err(QueueError::Api { status, message });
                        }
                    }
                }
                Err(e) => {
                    debug!(task_id, error = %e, attempt, "report transport error");
                }
            }
            if attempt < self.config.retry.max_attempts {
                tokio::time::sleep(backoff.delay_for_attempt(attempt)).await;
            }
        }

        Err(QueueError::RetriesExhausted {
            attempts: self.config.retry.max_attempts,
        })
    }
}
