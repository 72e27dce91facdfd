//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! Fractions throughout (0.12 = 12%); the validation gate converts to percent.

use serde::{Deserialize, Serialize};
use zoneflow_core::domain::TradeRecord;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    /// Deepest peak-to-trough decline, as a non-positive fraction.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub avg_win: f64,
    /// Mean losing trade, as a non-positive amount.
    pub avg_loss: f64,
    pub largest_loss: f64,
    pub total_commission: f64,
    pub final_equity: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics. `equity_curve` excludes the starting balance.
    pub fn compute(equity_curve: &[f64], trades: &[TradeRecord], initial_equity: f64) -> Self {
        let mut curve = Vec::with_capacity(equity_curve.len() + 1);
        curve.push(initial_equity);
        curve.extend_from_slice(equity_curve);
        let final_equity = curve.last().copied().unwrap_or(initial_equity);

        Self {
            total_return: total_return(&curve),
            max_drawdown: max_drawdown(&curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            largest_loss: largest_loss(trades),
            total_commission: trades.iter().map(|t| t.commission).sum(),
            final_equity,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&final_eq)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (final_eq - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (0.0 when equity never declines).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn avg_win(trades: &[TradeRecord]) -> f64 {
    mean_f64(
        &trades
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.net_pnl)
            .collect::<Vec<_>>(),
    )
}

pub fn avg_loss(trades: &[TradeRecord]) -> f64 {
    mean_f64(
        &trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.net_pnl)
            .collect::<Vec<_>>(),
    )
}

/// Most negative net PnL of a single trade (0.0 without losers).
pub fn largest_loss(trades: &[TradeRecord]) -> f64 {
    trades
        .iter()
        .map(|t| t.net_pnl)
        .fold(0.0_f64, f64::min)
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
