//! Queue client error taxonomy.

use thiserror::Error;

/// Task queue failures.
///
/// Losing a claim race is not represented here: [`claim`] returns
/// `Ok(false)` for that, since contention is normal operation.
///
/// [`claim`]: super::TaskQueue::claim
#[derive(Debug, Error)]
pub enum QueueError {
    /// Credentials were rejected. Fatal, never retried.
    #[error("queue authentication failed (check the API token)")]
    Auth,

    /// A request could not reach the queue or timed out.
    #[error("queue transport error: {0}")]
    Transport(String),

    /// The queue answered with a non-success status.
    #[error("queue API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("queue response parse error: {0}")]
    JsonParse(String),

    /// Retries were exhausted without a success.
    #[error("queue request failed after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl QueueError {
    /// Whether this error should stop the worker instead of being
    /// retried or waited out.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth)
    }
}
