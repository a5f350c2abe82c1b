// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Backtest Worker - Rust Core Library
//!
//! Distributed backtest execution for the trading research stack.
//!
//! # Components
//!
//! - `params`: typed strategy parameters, per-strategy schemas, presets,
//!   and the default → preset → override resolver
//! - `strategy`: the strategy-library port, the strategy registry, and
//!   small built-in reference strategies
//! - `data`: the market-data port and the local JSON bar cache
//! - `adapter`: marshals bars + parameters into the strategy library and
//!   normalizes output into a [`BacktestResult`]
//! - `metrics`: decimal performance-metric calculations
//! - `queue`: the poll/claim/report protocol client for the shared task
//!   queue, with bounded retry and backoff
//! - `worker`: the polling worker state machine with graceful shutdown
//! - `sweep`: Cartesian parameter-grid enumeration, bounded parallel
//!   execution, and per-metric top-K ranking
//!
//! # Coordination model
//!
//! Many worker processes share a single remote queue. The only cross-worker
//! synchronization primitive is the queue's atomic claim (check-and-set on
//! task state); a claim lost to another worker is expected contention, not
//! an error. Reporting is at-least-once with idempotent overwrite semantics
//! on the queue side.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Execution adapter - strategy library invocation and result normalization.
pub mod adapter;

/// Worker and sweep configuration from environment variables.
pub mod config;

/// Market-data port and local JSON bar cache.
pub mod data;

/// Top-level worker errors.
pub mod error;

/// Performance-metric calculations in decimal arithmetic.
pub mod metrics;

/// Typed parameters, schemas, presets, and resolution.
pub mod params;

/// Task queue protocol client.
pub mod queue;

/// Backtest result record.
pub mod result;

/// Strategy-library port, registry, and built-in strategies.
pub mod strategy;

/// Parameter sweep orchestration and ranking.
pub mod sweep;

/// Remote backtest task.
pub mod task;

/// Polling worker state machine.
pub mod worker;

pub use adapter::ExecutionAdapter;
pub use config::WorkerConfig;
pub use data::{DataError, JsonCacheMarketData, MarketData};
pub use error::WorkerError;
pub use params::{ParamError, ParamValue, ParameterSet, resolve};
pub use queue::{HttpQueueClient, QueueConfig, QueueError, RetryConfig, TaskQueue};
pub use result::{BacktestResult, EquityPoint, Metrics, ResultStatus, TradeRecord, TradeSide};
pub use strategy::{Bar, StrategyError, StrategyLibrary, StrategyOutput};
pub use sweep::{
    Metric, MetricRanking, ParameterGrid, RankingReport, SweepConfig, SweepError,
    SweepOrchestrator, SweepOutcome, SweepRequest, rank,
};
pub use task::{Task, TaskState};
pub use worker::{Worker, WorkerState};
