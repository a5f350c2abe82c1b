//! Task queue protocol.
//!
//! Three operations against the coordination service: poll for a pending
//! task, claim it (atomic compare-and-set on the queue side), and report
//! the result. Claiming can fail benignly when another worker wins the
//! race; reporting is idempotent and delivered at-least-once.

mod client;
mod config;
mod error;

use async_trait::async_trait;

pub use client::HttpQueueClient;
pub use config::{QueueConfig, RetryConfig};
pub use error::QueueError;

use crate::result::BacktestResult;
use crate::task::Task;

/// Remote task queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Fetch the next pending task, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when the queue is unreachable after
    /// retries or rejects the credentials.
    async fn poll(&self) -> Result<Option<Task>, QueueError>;

    /// Attempt to claim a task. `Ok(false)` means another worker won the
    /// race; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Auth`] on rejected credentials and other
    /// variants for unexpected responses. Never retried: after a
    /// transport failure the claim outcome is unknown, and treating it
    /// as a lost race is always safe.
    async fn claim(&self, task_id: &str) -> Result<bool, QueueError>;

    /// Report the result for a claimed task. Safe to deliver more than
    /// once.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when delivery fails after retries.
    async fn report(&self, task_id: &str, result: &BacktestResult) -> Result<(), QueueError>;
}
