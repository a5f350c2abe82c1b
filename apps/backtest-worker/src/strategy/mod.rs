//! Strategy library seam.
//!
//! The worker treats strategies as an opaque library behind the
//! [`StrategyLibrary`] trait: hand it a key, a resolved parameter set,
//! and bars, get back trades and an equity curve. The built-in library
//! ships a Donchian breakout (`turtle`) and a grid ladder (`grid`).

pub mod builtin;
pub mod registry;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::ParameterSet;

pub use builtin::BuiltinStrategies;

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading date (`YYYYMMDD`).
    pub date: String,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Traded volume.
    #[serde(default)]
    pub volume: Decimal,
}

/// Raw output of one strategy run, before metrics are computed.
#[derive(Debug, Clone, Default)]
pub struct StrategyOutput {
    /// Completed trades in execution order.
    pub trades: Vec<crate::result::TradeRecord>,
    /// Mark-to-market equity per bar.
    pub equity_curve: Vec<crate::result::EquityPoint>,
}

/// Strategy library failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// The library does not implement the requested strategy.
    #[error("strategy '{key}' is not implemented")]
    UnknownStrategy {
        /// The unrecognized strategy key.
        key: String,
    },

    /// The strategy failed during execution.
    #[error("strategy execution failed: {message}")]
    Execution {
        /// Failure description.
        message: String,
    },
}

/// Pluggable strategy execution backend.
pub trait StrategyLibrary: Send + Sync {
    /// Run one strategy over the given bars.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::UnknownStrategy`] for keys the library
    /// does not implement and [`StrategyError::Execution`] when the run
    /// itself fails.
    fn run(
        &self,
        strategy_key: &str,
        params: &ParameterSet,
        bars: &[Bar],
        initial_cash: Decimal,
    ) -> Result<StrategyOutput, StrategyError>;
}
