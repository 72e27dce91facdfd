//! TradeRecord — a completed round trip in the backtest ledger.

use super::{Direction, PositionId};
use crate::analysis::PatternKind;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    TakeProfit,
    EndOfData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Identification ──
    pub position_id: PositionId,
    pub symbol: String,
    pub direction: Direction,
    pub pattern: Option<PatternKind>,

    // ── Entry ──
    pub entry_time: i64,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: i64,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size and PnL ──
    pub size: f64,
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,

    pub candles_held: usize,
}

impl TradeRecord {
    /// Net return as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.size;
        if notional == 0.0 {
            return 0.0;
        }
        self.net_pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}
