//! Built-in reference strategies.
//!
//! Two deliberately simple implementations back the worker out of the
//! box: a long-only Donchian breakout (`turtle`) and a price-ladder
//! accumulator (`grid`). Both mark equity to market on every bar and
//! force-close open positions on the final bar.

use rust_decimal::Decimal;

use super::{Bar, StrategyError, StrategyLibrary, StrategyOutput};
use crate::params::ParameterSet;
use crate::result::{EquityPoint, TradeRecord, TradeSide};

/// Default strategy library with `turtle` and `grid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinStrategies;

impl StrategyLibrary for BuiltinStrategies {
    fn run(
        &self,
        strategy_key: &str,
        params: &ParameterSet,
        bars: &[Bar],
        initial_cash: Decimal,
    ) -> Result<StrategyOutput, StrategyError> {
        match strategy_key {
            "turtle" => run_turtle(params, bars, initial_cash),
            "grid" => run_grid(params, bars, initial_cash),
            other => Err(StrategyError::UnknownStrategy {
                key: other.to_string(),
            }),
        }
    }
}

fn require_int(params: &ParameterSet, name: &str) -> Result<i64, StrategyError> {
    params.get_int(name).ok_or_else(|| StrategyError::Execution {
        message: format!("missing int parameter '{name}'"),
    })
}

fn require_decimal(params: &ParameterSet, name: &str) -> Result<Decimal, StrategyError> {
    let raw = params.get_float(name).ok_or_else(|| StrategyError::Execution {
        message: format!("missing float parameter '{name}'"),
    })?;
    Decimal::try_from(raw).map_err(|_| StrategyError::Execution {
        message: format!("parameter '{name}' value {raw} is not representable"),
    })
}

/// One open position lot.
struct Lot {
    entry_date: String,
    entry_price: Decimal,
    shares: Decimal,
}

fn close_lot(trades: &mut Vec<TradeRecord>, lot: Lot, exit_date: &str, exit_price: Decimal) {
    trades.push(TradeRecord {
        entry_date: lot.entry_date,
        exit_date: exit_date.to_string(),
        side: TradeSide::Long,
        entry_price: lot.entry_price,
        exit_price,
        pnl: (exit_price - lot.entry_price) * lot.shares,
    });
}

/// Highest high over `bars[start..end]`.
fn highest_high(bars: &[Bar], start: usize, end: usize) -> Decimal {
    bars[start..end]
        .iter()
        .map(|b| b.high)
        .max()
        .unwrap_or(Decimal::ZERO)
}

/// Lowest low over `bars[start..end]`.
fn lowest_low(bars: &[Bar], start: usize, end: usize) -> Decimal {
    bars[start..end]
        .iter()
        .map(|b| b.low)
        .min()
        .unwrap_or(Decimal::ZERO)
}

/// Simple average true range over the `window` bars ending at `idx`
/// (exclusive).
fn average_true_range(bars: &[Bar], idx: usize, window: usize) -> Decimal {
    if idx < 2 || window == 0 {
        return Decimal::ZERO;
    }
    let start = idx.saturating_sub(window).max(1);
    let mut sum = Decimal::ZERO;
    let mut count = Decimal::ZERO;
    for i in start..idx {
        let prev_close = bars[i - 1].close;
        let range = (bars[i].high - bars[i].low)
            .max((bars[i].high - prev_close).abs())
            .max((bars[i].low - prev_close).abs());
        sum += range;
        count += Decimal::ONE;
    }
    if count == Decimal::ZERO {
        Decimal::ZERO
    } else {
        sum / count
    }
}

/// Long-only Donchian breakout with volatility-scaled sizing.
///
/// Enters a unit when the close breaks the `entry_window` high, pyramids
/// up to `max_units`, and exits everything on an `exit_window` low break
/// or, in `trailing` exit mode, when the close falls more than
/// `trailing_stop_mult` ATRs below the post-entry peak.
fn run_turtle(
    params: &ParameterSet,
    bars: &[Bar],
    initial_cash: Decimal,
) -> Result<StrategyOutput, StrategyError> {
    let entry_window = usize::try_from(require_int(params, "entry_window")?).unwrap_or(20);
    let exit_window = usize::try_from(require_int(params, "exit_window")?).unwrap_or(10);
    let atr_window = usize::try_from(require_int(params, "atr_window")?).unwrap_or(20);
    let max_units = usize::try_from(require_int(params, "max_units")?).unwrap_or(4);
    let risk_pct = require_decimal(params, "risk_pct")?;
    let trailing_mult = require_decimal(params, "trailing_stop_mult")?;
    let trailing = params
        .get("exit_mode")
        .map_or(true, |v| v.render() == "trailing");

    let mut cash = initial_cash;
    let mut lots: Vec<Lot> = Vec::new();
    let mut peak_close = Decimal::ZERO;
    let mut entry_atr = Decimal::ZERO;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());

    for idx in 0..bars.len() {
        let bar = &bars[idx];
        let close = bar.close;

        if !lots.is_empty() {
            if close > peak_close {
                peak_close = close;
            }
            let exit_low = idx >= exit_window
                && close < lowest_low(bars, idx - exit_window, idx);
            let stop_hit = trailing
                && entry_atr > Decimal::ZERO
                && close < peak_close - trailing_mult * entry_atr;
            if exit_low || stop_hit {
                for lot in lots.drain(..) {
                    cash += lot.shares * close;
                    close_lot(&mut trades, lot, &bar.date, close);
                }
            }
        }

        if lots.len() < max_units && idx >= entry_window {
            let breakout = close > highest_high(bars, idx - entry_window, idx);
            if breakout {
                let atr = average_true_range(bars, idx, atr_window);
                if atr > Decimal::ZERO && close > Decimal::ZERO {
                    let position_equity =
                        cash + lots.iter().map(|l| l.shares * close).sum::<Decimal>();
                    let shares = position_equity * risk_pct / atr;
                    let cost = shares * close;
                    if shares > Decimal::ZERO && cost <= cash {
                        cash -= cost;
                        if lots.is_empty() {
                            peak_close = close;
                        }
                        entry_atr = atr;
                        lots.push(Lot {
                            entry_date: bar.date.clone(),
                            entry_price: close,
                            shares,
                        });
                    }
                }
            }
        }

        let holdings: Decimal = lots.iter().map(|l| l.shares * close).sum();
        equity_curve.push(EquityPoint {
            date: bar.date.clone(),
            equity: cash + holdings,
        });
    }

    if let Some(last) = bars.last() {
        for lot in lots.drain(..) {
            cash += lot.shares * last.close;
            close_lot(&mut trades, lot, &last.date, last.close);
        }
        if let Some(point) = equity_curve.last_mut() {
            point.equity = cash;
        }
    }

    Ok(StrategyOutput {
        trades,
        equity_curve,
    })
}

/// Ladder accumulator: buys a fixed-cash batch each `grid_pct` step down
/// from the last fill, sells the most recent batch when price recovers
/// `grid_pct` above its entry.
fn run_grid(
    params: &ParameterSet,
    bars: &[Bar],
    initial_cash: Decimal,
) -> Result<StrategyOutput, StrategyError> {
    let grid_pct = require_decimal(params, "grid_pct")?;
    let max_batches = usize::try_from(require_int(params, "max_batches")?).unwrap_or(5);
    if max_batches == 0 {
        return Err(StrategyError::Execution {
            message: "max_batches must be positive".to_string(),
        });
    }
    let batch_cash = initial_cash / Decimal::from(max_batches as u64);

    let mut cash = initial_cash;
    let mut lots: Vec<Lot> = Vec::new();
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut anchor = bars.first().map(|b| b.close).unwrap_or(Decimal::ZERO);

    for bar in bars {
        let close = bar.close;

        // Sell the newest lot once price recovers a full step above it.
        loop {
            let sell = lots
                .last()
                .is_some_and(|top| close >= top.entry_price * (Decimal::ONE + grid_pct));
            let Some(lot) = (if sell { lots.pop() } else { None }) else {
                break;
            };
            cash += lot.shares * close;
            close_lot(&mut trades, lot, &bar.date, close);
        }

        // Buy a batch each full step below the last fill (or the anchor).
        let reference = lots.last().map(|l| l.entry_price).unwrap_or(anchor);
        if lots.len() < max_batches
            && reference > Decimal::ZERO
            && close <= reference * (Decimal::ONE - grid_pct)
            && close > Decimal::ZERO
        {
            let spend = batch_cash.min(cash);
            if spend > Decimal::ZERO {
                let shares = spend / close;
                cash -= spend;
                lots.push(Lot {
                    entry_date: bar.date.clone(),
                    entry_price: close,
                    shares,
                });
            }
        }
        if lots.is_empty() && close > anchor {
            anchor = close;
        }

        let holdings: Decimal = lots.iter().map(|l| l.shares * close).sum();
        equity_curve.push(EquityPoint {
            date: bar.date.clone(),
            equity: cash + holdings,
        });
    }

    if let Some(last) = bars.last() {
        for lot in lots.drain(..) {
            cash += lot.shares * last.close;
            close_lot(&mut trades, lot, &last.date, last.close);
        }
        if let Some(point) = equity_curve.last_mut() {
            point.equity = cash;
        }
    }

    Ok(StrategyOutput {
        trades,
        equity_curve,
    })
}
