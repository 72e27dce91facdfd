//! Read-only account and instrument snapshots supplied at evaluation time.

use serde::{Deserialize, Serialize};

/// Account state as reported by the execution side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub equity: f64,
    pub available_margin: f64,
    pub open_position_count: usize,
}

impl AccountState {
    pub fn new(equity: f64, available_margin: f64, open_position_count: usize) -> Self {
        Self {
            equity,
            available_margin,
            open_position_count,
        }
    }

    /// Flat account: all equity available as margin, nothing open.
    pub fn flat(equity: f64) -> Self {
        Self::new(equity, equity, 0)
    }
}

/// Exchange lot-size and notional filters for one instrument.
///
/// A zero value disables the corresponding filter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConstraints {
    pub min_qty: f64,
    pub qty_step: f64,
    pub min_notional: f64,
}

impl InstrumentConstraints {
    pub fn new(min_qty: f64, qty_step: f64, min_notional: f64) -> Self {
        Self {
            min_qty,
            qty_step,
            min_notional,
        }
    }

    /// Floor a raw quantity to the instrument's step size.
    pub fn floor_qty(&self, qty: f64) -> f64 {
        if self.qty_step > 0.0 {
            (qty / self.qty_step).floor() * self.qty_step
        } else {
            qty
        }
    }

    /// True when `qty` at `price` passes the minimum quantity and notional filters.
    pub fn admits(&self, qty: f64, price: f64) -> bool {
        qty > 0.0 && qty >= self.min_qty && qty * price >= self.min_notional
    }
}
