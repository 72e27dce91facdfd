//! PositionPlan — the trade instruction handed to the execution venue.

use super::Direction;
use crate::analysis::PatternKind;
use serde::{Deserialize, Serialize};

/// A sized, risk-bounded entry instruction.
///
/// `risk_amount` is the loss realised if the position is stopped out at
/// `stop_price` (before commission).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPlan {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub size: f64,
    pub stop_price: f64,
    pub take_profit_price: f64,
    /// Set only when trailing stops are enabled.
    pub trailing_stop_pct: Option<f64>,
    /// `None` when the signal carried no pattern (flat stop table).
    pub pattern: Option<PatternKind>,
    pub signal_strength: f64,
    pub risk_amount: f64,
    /// Close time of the candle that produced the signal.
    pub timestamp: i64,
}

impl PositionPlan {
    pub fn notional(&self) -> f64 {
        self.size * self.entry_price
    }

    /// Distance from entry to stop, positive when the stop is on the losing side.
    pub fn stop_distance(&self) -> f64 {
        (self.entry_price - self.stop_price) * self.direction.sign()
    }
}
