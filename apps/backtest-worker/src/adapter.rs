//! Execution adapter.
//!
//! Bridges a task (or one sweep combination) to the strategy library:
//! resolve parameters, fetch bars, run the strategy, compute metrics.
//! Every failure past claiming becomes an error-status result so the
//! queue always learns the outcome; the adapter itself never returns an
//! `Err`.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::data::MarketData;
use crate::metrics;
use crate::params::{resolve, ParameterSet};
use crate::result::{BacktestResult, ResultStatus};
use crate::strategy::{Bar, StrategyLibrary};
use crate::task::Task;

/// Runs backtests against a strategy library and a bar source.
#[derive(Clone)]
pub struct ExecutionAdapter {
    library: Arc<dyn StrategyLibrary>,
    market_data: Arc<dyn MarketData>,
    periods_per_year: u32,
}

impl ExecutionAdapter {
    /// Build an adapter with the default annualization factor.
    #[must_use]
    pub fn new(library: Arc<dyn StrategyLibrary>, market_data: Arc<dyn MarketData>) -> Self {
        Self {
            library,
            market_data,
            periods_per_year: metrics::TRADING_DAYS_PER_YEAR,
        }
    }

    /// Override the Sharpe annualization factor.
    #[must_use]
    pub const fn with_periods_per_year(mut self, periods_per_year: u32) -> Self {
        self.periods_per_year = periods_per_year;
        self
    }

    /// Run one backtest over already-fetched bars with already-resolved
    /// parameters.
    ///
    /// Empty bars produce a `no_data` result; a library failure produces
    /// an `error` result.
    #[must_use]
    pub fn execute(
        &self,
        symbol: &str,
        strategy_key: &str,
        params: &ParameterSet,
        bars: &[Bar],
        initial_cash: Decimal,
    ) -> BacktestResult {
        if bars.is_empty() {
            debug!(symbol, strategy_key, "no bars, reporting no_data");
            return BacktestResult::no_data(symbol, strategy_key, params.clone());
        }

        match self.library.run(strategy_key, params, bars, initial_cash) {
            Ok(output) => {
                let computed = metrics::compute(
                    initial_cash,
                    &output.trades,
                    &output.equity_curve,
                    self.periods_per_year,
                );
                BacktestResult {
                    task_id: None,
                    symbol: symbol.to_string(),
                    strategy_key: strategy_key.to_string(),
                    parameters: params.clone(),
                    metrics: computed,
                    trades: output.trades,
                    equity_curve: output.equity_curve,
                    status: ResultStatus::Ok,
                    error_message: None,
                    sweep_index: None,
                }
            }
            Err(e) => {
                warn!(symbol, strategy_key, error = %e, "strategy run failed");
                BacktestResult::execution_error(symbol, strategy_key, params.clone(), e.to_string())
            }
        }
    }

    /// Run one queue task end to end.
    ///
    /// Resolution, date, and data failures all become error-status
    /// results carrying the task id, so the caller can always report.
    #[must_use]
    pub fn run_task(&self, task: &Task) -> BacktestResult {
        let mut result = self.run_task_inner(task);
        result.task_id = Some(task.task_id.clone());
        result
    }

    fn run_task_inner(&self, task: &Task) -> BacktestResult {
        let params = match resolve(
            &task.strategy_key,
            task.preset_name.as_deref(),
            &task.strategy_params,
        ) {
            Ok(params) => params,
            Err(e) => {
                return BacktestResult::execution_error(
                    &task.symbol,
                    &task.strategy_key,
                    ParameterSet::default(),
                    e.to_string(),
                );
            }
        };

        let (start, end) = match task.date_range() {
            Ok(range) => range,
            Err(message) => {
                return BacktestResult::execution_error(
                    &task.symbol,
                    &task.strategy_key,
                    params,
                    message,
                );
            }
        };

        let bars = match self.market_data.fetch_bars(&task.symbol, start, end) {
            Ok(bars) => bars,
            Err(e) => {
                return BacktestResult::execution_error(
                    &task.symbol,
                    &task.strategy_key,
                    params,
                    e.to_string(),
                );
            }
        };

        self.execute(
            &task.symbol,
            &task.strategy_key,
            &params,
            &bars,
            task.initial_cash,
        )
    }
}
