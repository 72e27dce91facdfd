//! Risk sizer — turns a signal into a bounded position plan.
//!
//! # Formula
//! ```text
//! stop_distance = |entry - stop|
//! risk_size     = equity * fixed_trade_percentage / stop_distance
//! size          = min(risk_size,
//!                     equity * max_position_size_pct / entry,
//!                     available_margin * margin_safety_factor * leverage / entry)
//! ```
//! then floored to the instrument's quantity step.
//!
//! # Example
//! - Equity: 1000, risk per trade 2% (20)
//! - Entry 100, stop 98 (2%)
//! - Size: 20 / 2 = 10 units, losing exactly 20 at the stop

use crate::analysis::PatternKind;
use crate::config::{RiskConfig, StopAnchor};
use crate::domain::{AccountState, Direction, InstrumentConstraints, PositionPlan};
use crate::signals::Signal;
use thiserror::Error;

/// Why the sizer refused to produce a plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("position limit reached ({open}/{max} open)")]
    PositionLimit { open: usize, max: usize },

    #[error("invalid stop distance (entry {entry}, stop {stop})")]
    InvalidStopDistance { entry: f64, stop: f64 },

    #[error("insufficient equity ({equity})")]
    InsufficientEquity { equity: f64 },

    #[error("insufficient margin (available {available_margin})")]
    InsufficientMargin { available_margin: f64 },

    #[error("below instrument minimum (size {size}, notional {notional})")]
    BelowInstrumentMinimum { size: f64, notional: f64 },
}

impl Rejection {
    /// Stable reason code for logs and notifications.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::PositionLimit { .. } => "position limit reached",
            Rejection::InvalidStopDistance { .. } => "invalid stop distance",
            Rejection::InsufficientEquity { .. } => "insufficient equity",
            Rejection::InsufficientMargin { .. } => "insufficient margin",
            Rejection::BelowInstrumentMinimum { .. } => "below instrument minimum",
        }
    }
}

/// Size that loses exactly `equity * risk_fraction` if price moves from
/// `entry` to `stop`, before any cap is applied.
pub fn risk_based_size(equity: f64, risk_fraction: f64, entry: f64, stop: f64) -> Result<f64, Rejection> {
    let distance = (entry - stop).abs();
    if !(distance > 0.0) || !distance.is_finite() {
        return Err(Rejection::InvalidStopDistance { entry, stop });
    }
    Ok(equity * risk_fraction / distance)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSizer {
    config: RiskConfig,
    symbol: String,
}

impl RiskSizer {
    pub fn new(config: RiskConfig, symbol: impl Into<String>) -> Self {
        Self {
            config,
            symbol: symbol.into(),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Stop-loss and take-profit fractions for a pattern; flat table without one.
    pub fn stop_fractions(&self, pattern_kind: Option<PatternKind>) -> (f64, f64) {
        match pattern_kind {
            Some(kind) => self.config.stop_table(kind.risk_class()),
            None => (self.config.stop_loss_pct, self.config.take_profit_pct),
        }
    }

    pub fn size(
        &self,
        signal: &Signal,
        pattern_kind: Option<PatternKind>,
        account: &AccountState,
        constraints: &InstrumentConstraints,
    ) -> Result<PositionPlan, Rejection> {
        let cfg = &self.config;

        if account.open_position_count >= cfg.max_open_positions {
            return Err(Rejection::PositionLimit {
                open: account.open_position_count,
                max: cfg.max_open_positions,
            });
        }
        if !(account.equity > 0.0) || !account.equity.is_finite() {
            return Err(Rejection::InsufficientEquity {
                equity: account.equity,
            });
        }

        let entry = signal.entry_price;
        let direction = signal.direction;
        let sign = direction.sign();
        let (sl_pct, tp_pct) = self.stop_fractions(pattern_kind);

        let stop = self.stop_price(signal, sl_pct);
        let distance = (entry - stop) * sign;
        if !(distance > 0.0) || !distance.is_finite() || !(entry > 0.0) {
            return Err(Rejection::InvalidStopDistance { entry, stop });
        }
        let take_profit = entry * (1.0 + sign * tp_pct);

        let risk_size = account.equity * cfg.fixed_trade_percentage / distance;
        let notional_cap = account.equity * cfg.max_position_size_pct / entry;
        let usable_margin = account.available_margin.max(0.0) * cfg.margin_safety_factor;
        let margin_cap = usable_margin * cfg.leverage / entry;

        let capped = risk_size.min(notional_cap).min(margin_cap);
        if !(capped > 0.0) {
            return Err(Rejection::InsufficientMargin {
                available_margin: account.available_margin,
            });
        }

        let size = constraints.floor_qty(capped);
        if !constraints.admits(size, entry) {
            return Err(Rejection::BelowInstrumentMinimum {
                size,
                notional: size * entry,
            });
        }

        Ok(PositionPlan {
            symbol: self.symbol.clone(),
            direction,
            entry_price: entry,
            size,
            stop_price: stop,
            take_profit_price: take_profit,
            trailing_stop_pct: cfg.trailing_stop.then_some(cfg.trailing_stop_pct),
            pattern: pattern_kind,
            signal_strength: signal.strength,
            risk_amount: size * distance,
            timestamp: signal.timestamp,
        })
    }

    fn stop_price(&self, signal: &Signal, sl_pct: f64) -> f64 {
        let entry = signal.entry_price;
        let percent_stop = entry * (1.0 - signal.direction.sign() * sl_pct);
        match (self.config.stop_anchor, &signal.zone) {
            (StopAnchor::Zone, Some(zone)) => {
                let buffer = self.config.zone_stop_buffer;
                match signal.direction {
                    Direction::Long => zone.price_low * (1.0 - buffer),
                    Direction::Short => zone.price_high * (1.0 + buffer),
                }
            }
            _ => percent_stop,
        }
    }
}
