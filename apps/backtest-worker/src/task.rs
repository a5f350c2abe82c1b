//! Remote backtest task.
//!
//! Tasks are owned by the remote queue; the worker holds a local,
//! disposable copy for the duration of one execution. State transitions
//! are monotonic from the worker's point of view: it only ever sees a
//! `pending` task, claims it, and drives it to a terminal state. Requeue
//! of stale claims is the queue's concern, never the worker's.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::params::ParamValue;

/// Date format used on the wire (`YYYYMMDD`).
pub const DATE_FORMAT: &str = "%Y%m%d";

fn default_cash() -> Decimal {
    Decimal::new(1_000_000, 0)
}

/// One requested backtest, as delivered by the queue's poll endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Queue-assigned stable identifier.
    pub task_id: String,
    /// Instrument symbol, e.g. `000858.SZ`.
    pub symbol: String,
    /// Strategy key, e.g. `turtle`.
    pub strategy_key: String,
    /// Range start (`YYYYMMDD`).
    pub start_date: String,
    /// Range end (`YYYYMMDD`), inclusive.
    pub end_date: String,
    /// Starting capital.
    #[serde(default = "default_cash")]
    pub initial_cash: Decimal,
    /// Strategy-specific parameter overrides.
    #[serde(default)]
    pub strategy_params: BTreeMap<String, ParamValue>,
    /// Optional named preset applied beneath the overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,
}

impl Task {
    /// Parse and validate the task's date range.
    ///
    /// # Errors
    ///
    /// Returns a message when either date is not `YYYYMMDD` or the range
    /// is inverted.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), String> {
        let start = NaiveDate::parse_from_str(&self.start_date, DATE_FORMAT)
            .map_err(|_| format!("invalid start_date '{}'", self.start_date))?;
        let end = NaiveDate::parse_from_str(&self.end_date, DATE_FORMAT)
            .map_err(|_| format!("invalid end_date '{}'", self.end_date))?;
        if end < start {
            return Err(format!(
                "end_date {} precedes start_date {}",
                self.end_date, self.start_date
            ));
        }
        Ok((start, end))
    }
}

/// Queue-side lifecycle of a task.
///
/// Transitions are monotonic: `Pending → Claimed → Running → Completed |
/// Failed`. A task never re-enters `Pending` except through the queue's
/// own staleness/timeout requeue, which this worker does not participate
/// in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Visible to workers, claimable.
    Pending,
    /// Claimed by exactly one worker.
    Claimed,
    /// Execution in progress.
    Running,
    /// Terminal: result reported.
    Completed,
    /// Terminal: failure reported.
    Failed,
}

impl TaskState {
    /// Whether this state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(start: &str, end: &str) -> Task {
        Task {
            task_id: "t-1".to_string(),
            symbol: "000858.SZ".to_string(),
            strategy_key: "turtle".to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            initial_cash: Decimal::new(100_000, 0),
            strategy_params: BTreeMap::new(),
            preset_name: None,
        }
    }

    #[test]
    fn valid_date_range_parses() {
        let (start, end) = task("20230101", "20231231").date_range().unwrap();
        assert!(start < end);
    }

    #[test]
    fn malformed_date_is_rejected() {
        assert!(task("2023-01-01", "20231231").date_range().is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(task("20231231", "20230101").date_range().is_err());
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let json = r#"{
            "task_id": "abc",
            "symbol": "AAPL",
            "strategy_key": "turtle",
            "start_date": "20230101",
            "end_date": "20231231"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.initial_cash, Decimal::new(1_000_000, 0));
        assert!(task.strategy_params.is_empty());
        assert!(task.preset_name.is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Claimed.is_terminal());
    }
}
