//! Top-level worker errors.
//!
//! Only two things terminate a worker process: an authentication failure
//! against the queue and an unrecoverable local configuration error.
//! Everything else degrades to an `error`-status result record or a retry.

use thiserror::Error;

use crate::queue::QueueError;

/// Fatal errors for the worker process.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// A fatal queue error (authentication failure).
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Invalid local configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
