//! Worker loop.
//!
//! One task at a time: poll, claim, execute, report, idle. Losing a
//! claim race goes straight back to polling. A shutdown signal is only
//! honored at state boundaries, so a claimed task is always driven to a
//! report before the loop drains.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::adapter::ExecutionAdapter;
use crate::error::WorkerError;
use crate::queue::{QueueError, TaskQueue};
use crate::result::BacktestResult;
use crate::task::Task;

/// Observable worker lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting out the poll interval.
    Idle,
    /// Asking the queue for a pending task.
    Polling,
    /// Racing other workers for a specific task.
    Claiming,
    /// Running a claimed task.
    Executing,
    /// Delivering the result.
    Reporting,
    /// Shutting down; no new work is accepted.
    Draining,
}

/// Single-task worker over a queue and an execution adapter.
pub struct Worker<Q: TaskQueue> {
    queue: Arc<Q>,
    adapter: ExecutionAdapter,
    poll_interval: Duration,
    state: WorkerState,
}

impl<Q: TaskQueue> Worker<Q> {
    /// Build a worker.
    #[must_use]
    pub fn new(queue: Arc<Q>, adapter: ExecutionAdapter, poll_interval: Duration) -> Self {
        Self {
            queue,
            adapter,
            poll_interval,
            state: WorkerState::Idle,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Run until the token is cancelled or a fatal queue error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] on fatal queue errors (rejected
    /// credentials). Transient queue trouble is waited out, never
    /// escalated.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), WorkerError> {
        info!(poll_interval = ?self.poll_interval, "worker started");

        loop {
            if shutdown.is_cancelled() {
                self.state = WorkerState::Draining;
                info!("shutdown requested, draining");
                return Ok(());
            }

            self.state = WorkerState::Polling;
            let polled = tokio::select! {
                () = shutdown.cancelled() => {
                    self.state = WorkerState::Draining;
                    info!("shutdown requested during poll, draining");
                    return Ok(());
                }
                polled = self.queue.poll() => polled,
            };
            let task = match polled {
                Ok(task) => task,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "fatal queue error, stopping");
                    return Err(WorkerError::Queue(e));
                }
                Err(e) => {
                    warn!(error = %e, "poll failed, backing off");
                    None
                }
            };

            if let Some(task) = task {
                // A signal that lands as the poll completes must not
                // admit new work; only in-flight execution and reporting
                // are finished during a drain.
                if shutdown.is_cancelled() {
                    self.state = WorkerState::Draining;
                    info!("shutdown requested, draining");
                    return Ok(());
                }
                self.handle_task(task).await?;
                // Skip the idle sleep after working a task; there may be
                // more pending.
                continue;
            }

            self.state = WorkerState::Idle;
            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Claim, execute, and report one polled task.
    async fn handle_task(&mut self, task: Task) -> Result<(), WorkerError> {
        self.state = WorkerState::Claiming;
        match self.queue.claim(&task.task_id).await {
            Ok(true) => {}
            Ok(false) => {
                info!(task_id = %task.task_id, "lost claim race");
                return Ok(());
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "fatal queue error during claim");
                return Err(WorkerError::Queue(e));
            }
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "claim failed, skipping task");
                return Ok(());
            }
        }

        info!(
            task_id = %task.task_id,
            symbol = %task.symbol,
            strategy = %task.strategy_key,
            "claimed task"
        );

        self.state = WorkerState::Executing;
        let result = self.execute(task.clone()).await;

        self.state = WorkerState::Reporting;
        match self.queue.report(&task.task_id, &result).await {
            Ok(()) => {
                info!(task_id = %task.task_id, status = ?result.status, "reported result");
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "fatal queue error during report");
                Err(WorkerError::Queue(e))
            }
            Err(e) => {
                // The queue's staleness timeout will requeue the task.
                warn!(task_id = %task.task_id, error = %e, "report failed, abandoning task");
                Ok(())
            }
        }
    }

    /// Run the task on the blocking pool. A panicking strategy becomes
    /// an error-status result, never a crashed worker.
    async fn execute(&self, task: Task) -> BacktestResult {
        let adapter = self.adapter.clone();
        let symbol = task.symbol.clone();
        let strategy_key = task.strategy_key.clone();
        let task_id = task.task_id.clone();

        match tokio::task::spawn_blocking(move || adapter.run_task(&task)).await {
            Ok(result) => result,
            Err(e) => {
                error!(task_id = %task_id, error = %e, "execution task aborted");
                let mut result = BacktestResult::execution_error(
                    &symbol,
                    &strategy_key,
                    crate::params::ParameterSet::default(),
                    format!("execution aborted: {e}"),
                );
                result.task_id = Some(task_id);
                result
            }
        }
    }
}

// Re-exported for callers matching on fatality at the loop boundary.
impl WorkerError {
    /// Whether the underlying queue error was fatal.
    #[must_use]
    pub const fn is_fatal_queue(&self) -> bool {
        matches!(self, Self::Queue(QueueError::Auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataError, MarketData};
    use crate::strategy::{Bar, BuiltinStrategies};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct NoData;

    impl MarketData for NoData {
        fn fetch_bars(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Bar>, DataError> {
            Ok(Vec::new())
        }
    }

    /// In-memory queue with a CAS claim and recorded reports.
    #[derive(Default)]
    struct FakeQueue {
        pending: Mutex<Vec<Task>>,
        claimed: AtomicBool,
        reports: Mutex<Vec<BacktestResult>>,
        fatal_poll: AtomicBool,
    }

    #[async_trait::async_trait]
    impl TaskQueue for FakeQueue {
        async fn poll(&self) -> Result<Option<Task>, QueueError> {
            if self.fatal_poll.load(Ordering::SeqCst) {
                return Err(QueueError::Auth);
            }
            Ok(self.pending.lock().unwrap().first().cloned())
        }

        async fn claim(&self, _task_id: &str) -> Result<bool, QueueError> {
            let won = !self.claimed.swap(true, Ordering::SeqCst);
            if won {
                self.pending.lock().unwrap().clear();
            }
            Ok(won)
        }

        async fn report(&self, _task_id: &str, result: &BacktestResult) -> Result<(), QueueError> {
            self.reports.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    fn sample_task() -> Task {
        Task {
            task_id: "t-1".to_string(),
            symbol: "AAPL".to_string(),
            strategy_key: "turtle".to_string(),
            start_date: "20230101".to_string(),
            end_date: "20231231".to_string(),
            initial_cash: rust_decimal_macros::dec!(100000),
            strategy_params: BTreeMap::new(),
            preset_name: None,
        }
    }

    fn worker(queue: Arc<FakeQueue>) -> Worker<FakeQueue> {
        let adapter =
            ExecutionAdapter::new(Arc::new(BuiltinStrategies), Arc::new(NoData));
        Worker::new(queue, adapter, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn drives_task_to_report_then_drains() {
        let queue = Arc::new(FakeQueue::default());
        queue.pending.lock().unwrap().push(sample_task());

        let shutdown = CancellationToken::new();
        let mut worker = worker(Arc::clone(&queue));

        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        worker.run(shutdown).await.unwrap();
        handle.await.unwrap();

        let reports = queue.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].task_id.as_deref(), Some("t-1"));
        assert_eq!(*worker.state(), WorkerState::Draining);
    }

    // The worker loop has no yield point while repeatedly losing the
    // claim race, so the cancel task needs its own runtime thread.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn lost_claim_race_reports_nothing() {
        let queue = Arc::new(FakeQueue::default());
        queue.pending.lock().unwrap().push(sample_task());
        // Another worker already holds the claim.
        queue.claimed.store(true, Ordering::SeqCst);

        let shutdown = CancellationToken::new();
        let mut worker = worker(Arc::clone(&queue));

        let token = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        worker.run(shutdown).await.unwrap();
        assert!(queue.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fatal_poll_error_stops_the_worker() {
        let queue = Arc::new(FakeQueue::default());
        queue.fatal_poll.store(true, Ordering::SeqCst);

        let shutdown = CancellationToken::new();
        let mut worker = worker(queue);

        let err = worker.run(shutdown).await.unwrap_err();
        assert!(err.is_fatal_queue());
    }

    /// Queue whose poll is slow enough for a shutdown signal to land
    /// mid-flight.
    #[derive(Default)]
    struct SlowPollQueue {
        claims: std::sync::atomic::AtomicUsize,
        reports: Mutex<Vec<BacktestResult>>,
    }

    #[async_trait::async_trait]
    impl TaskQueue for SlowPollQueue {
        async fn poll(&self) -> Result<Option<Task>, QueueError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(Some(sample_task()))
        }

        async fn claim(&self, _task_id: &str) -> Result<bool, QueueError> {
            self.claims.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn report(&self, _task_id: &str, result: &BacktestResult) -> Result<(), QueueError> {
            self.reports.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn signal_during_poll_exits_without_taking_new_work() {
        let queue = Arc::new(SlowPollQueue::default());
        let adapter = ExecutionAdapter::new(Arc::new(BuiltinStrategies), Arc::new(NoData));
        let mut worker = Worker::new(Arc::clone(&queue), adapter, Duration::from_millis(10));

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        worker.run(shutdown).await.unwrap();

        // The poll was still in flight when the signal arrived; the task
        // it would have yielded must never be claimed or reported.
        assert_eq!(queue.claims.load(Ordering::SeqCst), 0);
        assert!(queue.reports.lock().unwrap().is_empty());
        assert_eq!(*worker.state(), WorkerState::Draining);
    }

    #[tokio::test]
    async fn cancelled_token_drains_immediately() {
        let queue = Arc::new(FakeQueue::default());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let mut worker = worker(queue);
        worker.run(shutdown).await.unwrap();
        assert_eq!(*worker.state(), WorkerState::Draining);
    }
}
