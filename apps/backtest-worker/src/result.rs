//! Canonical backtest result record.
//!
//! A [`BacktestResult`] is created once per execution attempt and never
//! mutated; a retry supersedes it with a fresh record. The same shape is
//! reported to the queue and collected by the sweep orchestrator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;

/// Outcome classification for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Execution completed and produced metrics.
    Ok,
    /// The requested range yielded no bars. Expected, not an error.
    NoData,
    /// The strategy library or resolution failed.
    Error,
}

/// Position side of a completed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    /// Long position.
    Long,
    /// Short position.
    Short,
}

/// A completed round-trip trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Entry date (`YYYYMMDD`).
    pub entry_date: String,
    /// Exit date (`YYYYMMDD`).
    pub exit_date: String,
    /// Position side.
    pub side: TradeSide,
    /// Entry price.
    pub entry_price: Decimal,
    /// Exit price.
    pub exit_price: Decimal,
    /// Net profit and loss.
    pub pnl: Decimal,
}

impl TradeRecord {
    /// Whether this trade was profitable.
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}

/// One point on the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Date (`YYYYMMDD`).
    pub date: String,
    /// Mark-to-market equity.
    pub equity: Decimal,
}

/// Summary performance metrics for one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Total return as a percentage of initial cash.
    pub total_return_pct: Decimal,
    /// Maximum peak-to-trough drawdown, positive magnitude, percent.
    pub max_drawdown_pct: Decimal,
    /// Winning-trade fraction in `[0, 1]`; 0 when there are no trades.
    pub win_rate: Decimal,
    /// Annualized Sharpe ratio of the daily return series; 0 when the
    /// series has fewer than two points or zero variance.
    pub sharpe_ratio: Decimal,
    /// Number of completed trades.
    pub trade_count: u64,
}

/// Canonical, immutable record of one backtest execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Backing queue task, absent for sweep-mode runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Instrument symbol.
    pub symbol: String,
    /// Strategy key.
    pub strategy_key: String,
    /// The exact resolved parameter set used.
    pub parameters: ParameterSet,
    /// Summary metrics.
    pub metrics: Metrics,
    /// Completed trades in execution order.
    pub trades: Vec<TradeRecord>,
    /// Equity curve in date order.
    pub equity_curve: Vec<EquityPoint>,
    /// Outcome classification.
    pub status: ResultStatus,
    /// Failure description, present iff `status == Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Cartesian enumeration index for sweep-mode runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_index: Option<u64>,
}

impl BacktestResult {
    /// Build a `no_data` result with empty metrics and trades.
    #[must_use]
    pub fn no_data(symbol: &str, strategy_key: &str, parameters: ParameterSet) -> Self {
        Self {
            task_id: None,
            symbol: symbol.to_string(),
            strategy_key: strategy_key.to_string(),
            parameters,
            metrics: Metrics::default(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            status: ResultStatus::NoData,
            error_message: None,
            sweep_index: None,
        }
    }

    /// Build an `error` result carrying the failure message.
    #[must_use]
    pub fn execution_error(
        symbol: &str,
        strategy_key: &str,
        parameters: ParameterSet,
        message: String,
    ) -> Self {
        Self {
            task_id: None,
            symbol: symbol.to_string(),
            strategy_key: strategy_key.to_string(),
            parameters,
            metrics: Metrics::default(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            status: ResultStatus::Error,
            error_message: Some(message),
            sweep_index: None,
        }
    }

    /// Whether the run completed and is comparable in rankings.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, ResultStatus::Ok)
    }
}
