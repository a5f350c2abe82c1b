//! Multi-metric top-K ranking of sweep results.
//!
//! Only `ok` results are ranked; `no_data` and `error` runs are counted
//! and skipped. Ties are broken by ascending enumeration index, so a
//! ranking is a pure function of the result set.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::result::{BacktestResult, ResultStatus};

/// A rankable performance metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Total return percent, higher is better.
    TotalReturnPct,
    /// Maximum drawdown magnitude, lower is better.
    MaxDrawdownPct,
    /// Winning-trade fraction, higher is better.
    WinRate,
    /// Annualized Sharpe ratio, higher is better.
    SharpeRatio,
    /// Completed trade count, higher is better.
    TradeCount,
}

impl Metric {
    /// Every rankable metric, in report order.
    pub const ALL: [Self; 5] = [
        Self::TotalReturnPct,
        Self::MaxDrawdownPct,
        Self::WinRate,
        Self::SharpeRatio,
        Self::TradeCount,
    ];

    /// Wire/report key for this metric.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::TotalReturnPct => "total_return_pct",
            Self::MaxDrawdownPct => "max_drawdown_pct",
            Self::WinRate => "win_rate",
            Self::SharpeRatio => "sharpe_ratio",
            Self::TradeCount => "trade_count",
        }
    }

    /// Extract this metric's value from a result.
    #[must_use]
    pub fn value_of(self, result: &BacktestResult) -> Decimal {
        match self {
            Self::TotalReturnPct => result.metrics.total_return_pct,
            Self::MaxDrawdownPct => result.metrics.max_drawdown_pct,
            Self::WinRate => result.metrics.win_rate,
            Self::SharpeRatio => result.metrics.sharpe_ratio,
            Self::TradeCount => Decimal::from(result.metrics.trade_count),
        }
    }

    /// Sort direction. Drawdown is a loss magnitude, so smaller wins.
    #[must_use]
    pub const fn higher_is_better(self) -> bool {
        !matches!(self, Self::MaxDrawdownPct)
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.key() == s)
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

/// One ranked entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    /// Rank within the metric, starting at 1.
    pub rank: usize,
    /// Enumeration index of the underlying run.
    pub sweep_index: u64,
    /// The metric's value for this run.
    pub value: Decimal,
    /// The full result.
    pub result: BacktestResult,
}

/// Top-K list for one metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRanking {
    /// The ranked metric.
    pub metric: Metric,
    /// Top entries, best first.
    pub top: Vec<RankedResult>,
}

/// Full ranking report across all requested metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingReport {
    /// One ranking per requested metric, in request order.
    pub rankings: Vec<MetricRanking>,
    /// Number of results that were rankable.
    pub ranked: usize,
    /// Results skipped because they produced no data.
    pub skipped_no_data: usize,
    /// Results skipped because they failed.
    pub skipped_error: usize,
}

/// Rank results by each requested metric, keeping the top `top_k`.
#[must_use]
pub fn rank(results: &[BacktestResult], metrics: &[Metric], top_k: usize) -> RankingReport {
    let skipped_no_data = results
        .iter()
        .filter(|r| r.status == ResultStatus::NoData)
        .count();
    let skipped_error = results
        .iter()
        .filter(|r| r.status == ResultStatus::Error)
        .count();

    // Pair each rankable result with its tie-break key. Results without
    // an enumeration index fall back to their slice position.
    let rankable: Vec<(u64, &BacktestResult)> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_ok())
        .map(|(pos, r)| (r.sweep_index.unwrap_or(pos as u64), r))
        .collect();

    let rankings = metrics
        .iter()
        .map(|&metric| {
            let mut ordered = rankable.clone();
            ordered.sort_by(|(idx_a, a), (idx_b, b)| {
                let va = metric.value_of(a);
                let vb = metric.value_of(b);
                let primary = if metric.higher_is_better() {
                    vb.cmp(&va)
                } else {
                    va.cmp(&vb)
                };
                primary.then(idx_a.cmp(idx_b))
            });

            let top = ordered
                .into_iter()
                .take(top_k)
                .enumerate()
                .map(|(i, (sweep_index, result))| RankedResult {
                    rank: i + 1,
                    sweep_index,
                    value: metric.value_of(result),
                    result: result.clone(),
                })
                .collect();

            MetricRanking { metric, top }
        })
        .collect();

    RankingReport {
        rankings,
        ranked: rankable.len(),
        skipped_no_data,
        skipped_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;
    use rust_decimal_macros::dec;

    fn ok_result(sweep_index: u64, total_return: Decimal, drawdown: Decimal) -> BacktestResult {
        let mut result = BacktestResult::no_data("AAPL", "turtle", ParameterSet::default());
        result.status = ResultStatus::Ok;
        result.sweep_index = Some(sweep_index);
        result.metrics.total_return_pct = total_return;
        result.metrics.max_drawdown_pct = drawdown;
        result
    }

    #[test]
    fn metric_keys_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.key().parse::<Metric>().unwrap(), metric);
        }
        assert!("sortino".parse::<Metric>().is_err());
    }

    #[test]
    fn top_k_by_total_return() {
        let results = vec![
            ok_result(0, dec!(5), dec!(10)),
            ok_result(1, dec!(20), dec!(10)),
            ok_result(2, dec!(12), dec!(10)),
        ];
        let report = rank(&results, &[Metric::TotalReturnPct], 2);
        let top = &report.rankings[0].top;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].value, dec!(20));
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[1].value, dec!(12));
    }

    #[test]
    fn drawdown_ranks_ascending() {
        let results = vec![
            ok_result(0, dec!(5), dec!(30)),
            ok_result(1, dec!(5), dec!(8)),
            ok_result(2, dec!(5), dec!(15)),
        ];
        let report = rank(&results, &[Metric::MaxDrawdownPct], 3);
        let values: Vec<Decimal> = report.rankings[0].top.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![dec!(8), dec!(15), dec!(30)]);
    }

    #[test]
    fn ties_break_by_ascending_sweep_index() {
        let results = vec![
            ok_result(7, dec!(10), dec!(5)),
            ok_result(3, dec!(10), dec!(5)),
            ok_result(5, dec!(10), dec!(5)),
        ];
        let report = rank(&results, &[Metric::TotalReturnPct], 3);
        let indices: Vec<u64> = report.rankings[0]
            .top
            .iter()
            .map(|e| e.sweep_index)
            .collect();
        assert_eq!(indices, vec![3, 5, 7]);
    }

    #[test]
    fn skipped_results_are_counted_not_ranked() {
        let mut no_data = BacktestResult::no_data("AAPL", "turtle", ParameterSet::default());
        no_data.sweep_index = Some(1);
        let error = {
            let mut r = BacktestResult::execution_error(
                "AAPL",
                "turtle",
                ParameterSet::default(),
                "boom".to_string(),
            );
            r.sweep_index = Some(2);
            r
        };
        let results = vec![ok_result(0, dec!(5), dec!(5)), no_data, error];

        let report = rank(&results, &[Metric::TotalReturnPct], 5);
        assert_eq!(report.ranked, 1);
        assert_eq!(report.skipped_no_data, 1);
        assert_eq!(report.skipped_error, 1);
        assert_eq!(report.rankings[0].top.len(), 1);
    }

    #[test]
    fn missing_sweep_index_falls_back_to_position() {
        let mut a = ok_result(0, dec!(10), dec!(5));
        a.sweep_index = None;
        let mut b = ok_result(0, dec!(10), dec!(5));
        b.sweep_index = None;
        let report = rank(&[a, b], &[Metric::TotalReturnPct], 2);
        let indices: Vec<u64> = report.rankings[0]
            .top
            .iter()
            .map(|e| e.sweep_index)
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn ranking_all_metrics_yields_one_list_each() {
        let results = vec![ok_result(0, dec!(5), dec!(5))];
        let report = rank(&results, &Metric::ALL, 3);
        assert_eq!(report.rankings.len(), 5);
    }
}
