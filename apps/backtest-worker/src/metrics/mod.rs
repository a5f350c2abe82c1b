//! Performance metric calculations.
//!
//! All metrics are computed on [`Decimal`] values. Total return and
//! drawdown are percentages; win rate is a fraction in `[0, 1]`; the
//! Sharpe ratio is annualized from the daily return series derived from
//! the equity curve.

pub mod math;

use rust_decimal::Decimal;

use crate::result::{EquityPoint, Metrics, TradeRecord};

/// Trading periods per year used to annualize the Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Compute summary metrics for one completed run.
///
/// Degenerate inputs produce zeros, never errors: an empty equity curve
/// yields zero return and drawdown, zero trades yield a zero win rate,
/// and a return series with fewer than two points or zero variance
/// yields a zero Sharpe ratio.
#[must_use]
pub fn compute(
    initial_cash: Decimal,
    trades: &[TradeRecord],
    equity_curve: &[EquityPoint],
    periods_per_year: u32,
) -> Metrics {
    Metrics {
        total_return_pct: total_return_pct(initial_cash, equity_curve),
        max_drawdown_pct: max_drawdown_pct(equity_curve),
        win_rate: win_rate(trades),
        sharpe_ratio: sharpe_ratio(equity_curve, periods_per_year),
        trade_count: trades.len() as u64,
    }
}

fn total_return_pct(initial_cash: Decimal, equity_curve: &[EquityPoint]) -> Decimal {
    if initial_cash <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match equity_curve.last() {
        Some(last) => (last.equity / initial_cash - Decimal::ONE) * HUNDRED,
        None => Decimal::ZERO,
    }
}

/// Largest peak-to-trough decline, returned as a positive magnitude in
/// percent. A monotonically rising curve yields zero.
fn max_drawdown_pct(equity_curve: &[EquityPoint]) -> Decimal {
    let mut peak = Decimal::ZERO;
    let mut worst = Decimal::ZERO;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > Decimal::ZERO {
            let drawdown = (peak - point.equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst * HUNDRED
}

fn win_rate(trades: &[TradeRecord]) -> Decimal {
    if trades.is_empty() {
        return Decimal::ZERO;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    Decimal::from(winners as u64) / Decimal::from(trades.len() as u64)
}

/// Annualized Sharpe ratio of the period-over-period return series
/// (risk-free rate assumed zero).
fn sharpe_ratio(equity_curve: &[EquityPoint], periods_per_year: u32) -> Decimal {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return Decimal::ZERO;
    }
    let Some(avg) = math::mean(&returns) else {
        return Decimal::ZERO;
    };
    let Some(std) = math::std_dev(&returns) else {
        return Decimal::ZERO;
    };
    if std == Decimal::ZERO {
        return Decimal::ZERO;
    }
    let Some(annualizer) = math::sqrt_decimal(Decimal::from(periods_per_year)) else {
        return Decimal::ZERO;
    };
    avg / std * annualizer
}

fn period_returns(equity_curve: &[EquityPoint]) -> Vec<Decimal> {
    equity_curve
        .windows(2)
        .filter_map(|pair| {
            let prev = pair[0].equity;
            if prev == Decimal::ZERO {
                None
            } else {
                Some(pair[1].equity / prev - Decimal::ONE)
            }
        })
        .collect()
}
