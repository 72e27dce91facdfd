//! Trailing stop tracking for open positions.
//!
//! Each position starts `Armed` at its initial stop. Once a candle closes far
//! enough in the position's favor the stop starts following the best close
//! seen, through a [`RatchetState`] so it can never move back.

use super::ratchet::RatchetState;
use crate::domain::{Direction, PositionId, PositionPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingPhase {
    /// Initial stop in force, trailing not yet triggered.
    Armed,
    Trailing,
}

/// Per-position trailing state. Released when the position closes.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailingState {
    pub position_id: PositionId,
    pub direction: Direction,
    pub entry_price: f64,
    /// `None` keeps the position at its initial stop.
    pub trailing_pct: Option<f64>,
    pub stop: RatchetState,
    pub best_price_seen: f64,
    pub phase: TrailingPhase,
}

impl TrailingState {
    fn from_plan(position_id: PositionId, plan: &PositionPlan) -> Self {
        Self {
            position_id,
            direction: plan.direction,
            entry_price: plan.entry_price,
            trailing_pct: plan.trailing_stop_pct.filter(|p| *p > 0.0 && *p < 1.0),
            stop: RatchetState::new(plan.direction, plan.stop_price),
            best_price_seen: plan.entry_price,
            phase: TrailingPhase::Armed,
        }
    }

    pub fn stop_price(&self) -> f64 {
        self.stop.level()
    }

    /// Feed one candle close. Returns the update if the stop moved.
    fn on_close(&mut self, close: f64) -> Option<StopUpdate> {
        let pct = self.trailing_pct?;
        if !close.is_finite() {
            return None;
        }

        self.best_price_seen = match self.direction {
            Direction::Long => self.best_price_seen.max(close),
            Direction::Short => self.best_price_seen.min(close),
        };

        let excursion =
            (self.best_price_seen - self.entry_price) * self.direction.sign() / self.entry_price;
        if self.phase == TrailingPhase::Armed && excursion < pct {
            return None;
        }
        self.phase = TrailingPhase::Trailing;

        let proposed = match self.direction {
            Direction::Long => self.best_price_seen * (1.0 - pct),
            Direction::Short => self.best_price_seen * (1.0 + pct),
        };
        let previous_stop = self.stop.level();
        let new_stop = self.stop.apply(proposed);
        (new_stop != previous_stop).then_some(StopUpdate {
            position_id: self.position_id,
            previous_stop,
            new_stop,
        })
    }
}

/// A stop level change, handed to the execution collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopUpdate {
    pub position_id: PositionId,
    pub previous_stop: f64,
    pub new_stop: f64,
}

/// Trailing state for every open position of one symbol.
#[derive(Debug, Clone, Default)]
pub struct TrailingStopTracker {
    positions: BTreeMap<PositionId, TrailingState>,
}

impl TrailingStopTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a position at the plan's initial stop.
    pub fn open(&mut self, position_id: PositionId, plan: &PositionPlan) {
        self.positions
            .insert(position_id, TrailingState::from_plan(position_id, plan));
    }

    /// Release a position's state. Unknown ids are ignored.
    pub fn close(&mut self, position_id: PositionId) -> Option<TrailingState> {
        self.positions.remove(&position_id)
    }

    /// Update every tracked position with a candle close, in id order.
    pub fn on_candle_close(&mut self, close: f64) -> Vec<StopUpdate> {
        let updates: Vec<StopUpdate> = self
            .positions
            .values_mut()
            .filter_map(|state| state.on_close(close))
            .collect();
        for update in &updates {
            info!(
                position = %update.position_id,
                previous = update.previous_stop,
                new = update.new_stop,
                "trailing stop tightened"
            );
        }
        updates
    }

    pub fn current_stop(&self, position_id: PositionId) -> Option<f64> {
        self.positions.get(&position_id).map(TrailingState::stop_price)
    }

    pub fn get(&self, position_id: PositionId) -> Option<&TrailingState> {
        self.positions.get(&position_id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
