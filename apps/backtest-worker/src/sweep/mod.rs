//! Offline parameter sweep.
//!
//! Enumerates a Cartesian grid of overrides, runs every combination over
//! one shared bar fetch, and ranks the outcomes. A failing combination
//! yields an error-status result and never aborts the sweep: the result
//! set always has exactly one entry per combination.

mod grid;
mod ranking;

use std::time::Instant;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

pub use grid::{ParameterGrid, SweepRun};
pub use ranking::{Metric, MetricRanking, RankedResult, RankingReport, rank};

use crate::adapter::ExecutionAdapter;
use crate::data::DataError;
use crate::params::{ParameterSet, resolve};
use crate::result::{BacktestResult, ResultStatus};
use crate::strategy::Bar;
use crate::task::DATE_FORMAT;

/// Sweep failures. Per-combination failures are not here; they become
/// error-status results inside the outcome.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The grid enumerates zero combinations.
    #[error("parameter grid is empty")]
    EmptyGrid,

    /// A date string was not `YYYYMMDD` or the range was inverted.
    #[error("invalid date range: {0}")]
    InvalidDates(String),

    /// The shared bar fetch failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The local thread pool could not be built.
    #[error("thread pool setup failed: {0}")]
    ThreadPool(String),
}

/// Parallelism settings.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Worker threads for the local pool; 0 uses the rayon default.
    pub max_threads: usize,
    /// Below this many combinations the sweep runs sequentially.
    pub min_parallel_jobs: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            min_parallel_jobs: 4,
        }
    }
}

/// One sweep request.
#[derive(Debug, Clone)]
pub struct SweepRequest {
    /// Strategy key.
    pub strategy_key: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Range start (`YYYYMMDD`).
    pub start_date: String,
    /// Range end (`YYYYMMDD`), inclusive.
    pub end_date: String,
    /// Starting capital per combination.
    pub initial_cash: Decimal,
    /// The grid to enumerate.
    pub grid: ParameterGrid,
}

/// Aggregate outcome of one sweep.
#[derive(Debug)]
pub struct SweepOutcome {
    /// One result per combination, in enumeration order.
    pub results: Vec<BacktestResult>,
    /// Combinations attempted.
    pub attempted: u64,
    /// Combinations that produced an error-status result.
    pub failed: u64,
    /// Combinations that produced a no-data result.
    pub no_data: u64,
    /// Wall-clock duration of the run phase.
    pub elapsed_ms: u128,
}

/// Runs sweeps over an execution adapter.
pub struct SweepOrchestrator {
    adapter: ExecutionAdapter,
    config: SweepConfig,
}

impl SweepOrchestrator {
    /// Build an orchestrator.
    #[must_use]
    pub fn new(adapter: ExecutionAdapter, config: SweepConfig) -> Self {
        Self { adapter, config }
    }

    /// Run every combination of the request's grid.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError`] for an empty grid, a bad date range, a
    /// failed bar fetch, or a thread-pool setup failure. Individual
    /// combination failures are embedded as error-status results.
    pub fn run(
        &self,
        request: &SweepRequest,
        market_data: &dyn crate::data::MarketData,
    ) -> Result<SweepOutcome, SweepError> {
        let runs = request.grid.combinations();
        if runs.is_empty() {
            return Err(SweepError::EmptyGrid);
        }

        let start = chrono::NaiveDate::parse_from_str(&request.start_date, DATE_FORMAT)
            .map_err(|_| SweepError::InvalidDates(request.start_date.clone()))?;
        let end = chrono::NaiveDate::parse_from_str(&request.end_date, DATE_FORMAT)
            .map_err(|_| SweepError::InvalidDates(request.end_date.clone()))?;
        if end < start {
            return Err(SweepError::InvalidDates(format!(
                "{} precedes {}",
                request.end_date, request.start_date
            )));
        }

        // Bars are fetched once and shared by every combination.
        let bars = market_data.fetch_bars(&request.symbol, start, end)?;
        info!(
            strategy = %request.strategy_key,
            symbol = %request.symbol,
            combinations = runs.len(),
            bars = bars.len(),
            "sweep starting"
        );

        let started = Instant::now();
        let mut results = if runs.len() >= self.config.min_parallel_jobs {
            self.run_parallel(request, &runs, &bars)?
        } else {
            runs.iter()
                .map(|run| self.run_one(request, run, &bars))
                .collect()
        };
        let elapsed_ms = started.elapsed().as_millis();

        results.sort_by_key(|r| r.sweep_index.unwrap_or(u64::MAX));
        let failed = results
            .iter()
            .filter(|r| r.status == ResultStatus::Error)
            .count() as u64;
        let no_data = results
            .iter()
            .filter(|r| r.status == ResultStatus::NoData)
            .count() as u64;

        info!(
            attempted = results.len(),
            failed,
            no_data,
            elapsed_ms,
            "sweep finished"
        );

        Ok(SweepOutcome {
            attempted: results.len() as u64,
            failed,
            no_data,
            elapsed_ms,
            results,
        })
    }

    fn run_parallel(
        &self,
        request: &SweepRequest,
        runs: &[SweepRun],
        bars: &[Bar],
    ) -> Result<Vec<BacktestResult>, SweepError> {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_threads)
            .build()
            .map_err(|e| SweepError::ThreadPool(e.to_string()))?;

        Ok(pool.install(|| {
            runs.par_iter()
                .map(|run| self.run_one(request, run, bars))
                .collect()
        }))
    }

    /// Run one combination. Resolution failures become error-status
    /// results so the outcome stays complete.
    fn run_one(&self, request: &SweepRequest, run: &SweepRun, bars: &[Bar]) -> BacktestResult {
        let mut result = match resolve(&request.strategy_key, None, &run.overrides) {
            Ok(params) => self.adapter.execute(
                &request.symbol,
                &request.strategy_key,
                &params,
                bars,
                request.initial_cash,
            ),
            Err(e) => {
                warn!(index = run.index, error = %e, "combination rejected");
                // Keep the offending overrides on the record so report
                // readers can see the combination without re-enumerating
                // the grid.
                BacktestResult::execution_error(
                    &request.symbol,
                    &request.strategy_key,
                    ParameterSet::from_values(run.overrides.clone()),
                    e.to_string(),
                )
            }
        };
        result.sweep_index = Some(run.index);
        result
    }
}
