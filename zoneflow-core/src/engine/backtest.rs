//! Candle-replay backtest over the live pipeline.
//!
//! Per candle, in order:
//! 1. Intrabar: open positions are checked against stop and take-profit
//!    (stop first, gaps fill at the open)
//! 2. Close: the candle goes through [`SymbolPipeline::on_candle`], which
//!    trails stops and may emit a plan
//! 3. Fill: an emitted plan is filled at the same close by the simulated venue
//! 4. Mark-to-market: cash plus unrealized PnL is recorded on the equity curve
//!
//! Candles at or before the newest admitted close are skipped entirely.
//! Positions still open after the last candle are closed at its close.

use super::pipeline::{Decision, SymbolPipeline};
use super::venue::{ExecutionVenue, SubmitOutcome};
use crate::config::{ConfigError, StrategyConfig};
use crate::domain::{
    AccountState, Candle, Direction, ExitReason, PositionId, PositionPlan, TradeRecord,
};
use crate::position_management::TrailingPhase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One point of the equity curve, marked at a candle close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: i64,
    pub equity: f64,
}

/// A signal the sizer refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub timestamp: i64,
    pub direction: Direction,
    pub strength: f64,
    /// Stable reason code.
    pub reason: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub strategy: String,
    pub initial_equity: f64,
    pub final_equity: f64,
    /// Candles admitted by the pipeline. Invalid or out-of-order input is skipped.
    pub candles_processed: usize,
    pub stop_updates: usize,
    pub plans: Vec<PositionPlan>,
    pub rejections: Vec<RejectionRecord>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Replay `candles` through a fresh pipeline built from `config`.
pub fn run_backtest(
    config: &StrategyConfig,
    candles: &[Candle],
    initial_equity: f64,
) -> Result<BacktestReport, ConfigError> {
    if !(initial_equity > 0.0) || !initial_equity.is_finite() {
        return Err(ConfigError::Invalid {
            field: "initial_equity",
            reason: format!("{initial_equity} must be positive"),
        });
    }
    let mut pipeline = SymbolPipeline::new(config)?;
    let constraints = config.constraints();
    let mut venue = SimulatedVenue::new(
        initial_equity,
        config.backtest.commission,
        config.risk.leverage,
    );

    let mut report = BacktestReport {
        symbol: pipeline.symbol().to_string(),
        strategy: pipeline.strategy().name().to_string(),
        initial_equity,
        final_equity: initial_equity,
        candles_processed: 0,
        stop_updates: 0,
        plans: Vec::new(),
        rejections: Vec::new(),
        trades: Vec::new(),
        equity_curve: Vec::with_capacity(candles.len()),
    };

    let mut last_close: Option<(usize, Candle)> = None;
    for (index, candle) in candles.iter().enumerate() {
        // Stale or replayed candles never touch positions or the curve.
        if pipeline
            .candles()
            .last()
            .is_some_and(|newest| candle.close_time <= newest.close_time)
        {
            warn!(close_time = candle.close_time, "skipping stale candle in replay");
            continue;
        }
        if let Err(e) = candle.validate() {
            warn!(close_time = candle.close_time, error = %e, "skipping invalid candle in replay");
            continue;
        }

        // ─── Intrabar exits ───
        let ids: Vec<PositionId> = venue.open.keys().copied().collect();
        for id in ids {
            let Some(position) = venue.open.get(&id) else {
                continue;
            };
            let stop = pipeline
                .current_stop(id)
                .unwrap_or(position.plan.stop_price);
            let Some(exit) = intrabar_exit(
                position.plan.direction,
                stop,
                position.plan.take_profit_price,
                candle,
            ) else {
                continue;
            };
            let reason = match exit {
                Exit::Stop(_) => match pipeline.tracker().get(id).map(|s| s.phase) {
                    Some(TrailingPhase::Trailing) => ExitReason::TrailingStop,
                    _ => ExitReason::StopLoss,
                },
                Exit::TakeProfit(_) => ExitReason::TakeProfit,
            };
            if let Some(trade) = venue.close(id, exit.price(), candle.close_time, index, reason) {
                pipeline.close_position(id, reason);
                report.trades.push(trade);
            }
        }

        // ─── Candle close ───
        let account = venue.account(candle.close);
        if let Some(step) = pipeline.on_candle(*candle, &account, &constraints) {
            report.candles_processed += 1;
            report.stop_updates += step.stop_updates.len();
            match step.decision {
                Decision::Plan(plan) => {
                    venue.fill_index = index;
                    match venue.submit(&plan) {
                        SubmitOutcome::Accepted { position_id } => {
                            pipeline.open_position(position_id, &plan);
                            report.plans.push(plan);
                        }
                        SubmitOutcome::Rejected { reason } => {
                            warn!(close_time = candle.close_time, %reason, "simulated venue refused plan");
                        }
                    }
                }
                Decision::Rejected { signal, rejection } => {
                    report.rejections.push(RejectionRecord {
                        timestamp: signal.timestamp,
                        direction: signal.direction,
                        strength: signal.strength,
                        reason: rejection.reason().to_string(),
                        detail: rejection.to_string(),
                    });
                }
                Decision::WarmingUp | Decision::NoSignal | Decision::Duplicate => {}
            }
            last_close = Some((index, *candle));
        }

        // ─── Mark-to-market ───
        let mark = last_close.map_or(candle.close, |(_, c)| c.close);
        report.equity_curve.push(EquityPoint {
            time: candle.close_time,
            equity: venue.equity(mark),
        });
    }

    // ─── End of data ───
    if let Some((last_index, last)) = last_close {
        let ids: Vec<PositionId> = venue.open.keys().copied().collect();
        for id in ids {
            if let Some(trade) =
                venue.close(id, last.close, last.close_time, last_index, ExitReason::EndOfData)
            {
                pipeline.close_position(id, ExitReason::EndOfData);
                report.trades.push(trade);
            }
        }
    }
    report.final_equity = venue.cash;
    if let Some(point) = report.equity_curve.last_mut() {
        point.equity = venue.cash;
    }

    info!(
        symbol = %report.symbol,
        strategy = %report.strategy,
        candles = report.candles_processed,
        plans = report.plans.len(),
        rejections = report.rejections.len(),
        trades = report.trades.len(),
        final_equity = report.final_equity,
        "backtest finished"
    );
    Ok(report)
}

// ─── Intrabar fill model ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Exit {
    Stop(f64),
    TakeProfit(f64),
}

impl Exit {
    fn price(self) -> f64 {
        match self {
            Exit::Stop(p) | Exit::TakeProfit(p) => p,
        }
    }
}

/// Worst-case intrabar exit: the stop is assumed hit before take-profit, and
/// a gap through either level fills at the open.
fn intrabar_exit(direction: Direction, stop: f64, take_profit: f64, candle: &Candle) -> Option<Exit> {
    match direction {
        Direction::Long => {
            if candle.open <= stop {
                Some(Exit::Stop(candle.open))
            } else if candle.low <= stop {
                Some(Exit::Stop(stop))
            } else if candle.open >= take_profit {
                Some(Exit::TakeProfit(candle.open))
            } else if candle.high >= take_profit {
                Some(Exit::TakeProfit(take_profit))
            } else {
                None
            }
        }
        Direction::Short => {
            if candle.open >= stop {
                Some(Exit::Stop(candle.open))
            } else if candle.high >= stop {
                Some(Exit::Stop(stop))
            } else if candle.open <= take_profit {
                Some(Exit::TakeProfit(candle.open))
            } else if candle.low <= take_profit {
                Some(Exit::TakeProfit(take_profit))
            } else {
                None
            }
        }
    }
}

// ─── Simulated venue ────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct OpenPosition {
    plan: PositionPlan,
    entry_index: usize,
    entry_commission: f64,
}

/// Fills plans at their entry price and keeps cash-settled margin accounting.
#[derive(Debug, Clone)]
struct SimulatedVenue {
    cash: f64,
    commission: f64,
    leverage: f64,
    next_id: u64,
    fill_index: usize,
    open: BTreeMap<PositionId, OpenPosition>,
}

impl SimulatedVenue {
    fn new(cash: f64, commission: f64, leverage: f64) -> Self {
        Self {
            cash,
            commission,
            leverage,
            next_id: 1,
            fill_index: 0,
            open: BTreeMap::new(),
        }
    }

    fn unrealized(&self, price: f64) -> f64 {
        self.open
            .values()
            .map(|p| (price - p.plan.entry_price) * p.plan.direction.sign() * p.plan.size)
            .sum()
    }

    fn equity(&self, price: f64) -> f64 {
        self.cash + self.unrealized(price)
    }

    fn used_margin(&self) -> f64 {
        self.open
            .values()
            .map(|p| p.plan.notional() / self.leverage)
            .sum()
    }

    fn account(&self, price: f64) -> AccountState {
        let equity = self.equity(price);
        AccountState::new(
            equity,
            (equity - self.used_margin()).max(0.0),
            self.open.len(),
        )
    }

    fn close(
        &mut self,
        id: PositionId,
        exit_price: f64,
        exit_time: i64,
        exit_index: usize,
        exit_reason: ExitReason,
    ) -> Option<TradeRecord> {
        let position = self.open.remove(&id)?;
        let plan = position.plan;
        let gross_pnl = (exit_price - plan.entry_price) * plan.direction.sign() * plan.size;
        let exit_commission = exit_price * plan.size * self.commission;
        self.cash += gross_pnl - exit_commission;
        let commission = position.entry_commission + exit_commission;
        Some(TradeRecord {
            position_id: id,
            symbol: plan.symbol,
            direction: plan.direction,
            pattern: plan.pattern,
            entry_time: plan.timestamp,
            entry_price: plan.entry_price,
            exit_time,
            exit_price,
            exit_reason,
            size: plan.size,
            gross_pnl,
            commission,
            net_pnl: gross_pnl - commission,
            candles_held: exit_index.saturating_sub(position.entry_index),
        })
    }
}

impl ExecutionVenue for SimulatedVenue {
    fn submit(&mut self, plan: &PositionPlan) -> SubmitOutcome {
        if !(plan.size > 0.0) || !plan.entry_price.is_finite() {
            return SubmitOutcome::Rejected {
                reason: "invalid size or price".into(),
            };
        }
        let required = plan.notional() / self.leverage;
        let available = self.equity(plan.entry_price) - self.used_margin();
        if required > available {
            return SubmitOutcome::Rejected {
                reason: format!("insufficient margin ({required:.4} > {available:.4})"),
            };
        }

        let entry_commission = plan.notional() * self.commission;
        self.cash -= entry_commission;
        let position_id = PositionId(self.next_id);
        self.next_id += 1;
        self.open.insert(
            position_id,
            OpenPosition {
                plan: plan.clone(),
                entry_index: self.fill_index,
                entry_commission,
            },
        );
        SubmitOutcome::Accepted { position_id }
    }
}
