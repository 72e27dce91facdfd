//! Per-symbol pipeline: aggregation, evaluation, sizing and trailing stops.
//!
//! One [`SymbolPipeline`] owns everything that is stateful for a symbol. Each
//! closed candle is handled run-to-completion:
//!
//! 1. Trailing stops of open positions are updated on the close
//! 2. The snapshot ending at that candle is analyzed and scored
//! 3. A signal, if any, is sized into a [`PositionPlan`] or rejected
//!
//! Live events and historical candles take the same path.

use crate::analysis::Analyzer;
use crate::config::{ConfigError, StrategyConfig};
use crate::data::{CandleAggregator, DropReason, IngestOutcome};
use crate::domain::{
    AccountState, Candle, ExitReason, InstrumentConstraints, PositionId, PositionPlan, PriceEvent,
};
use crate::position_management::{StopUpdate, TrailingState, TrailingStopTracker};
use crate::signals::{Evaluation, Signal, SignalScorer, Strategy};
use crate::sizers::{Rejection, RiskSizer};
use tracing::{debug, info, warn};

/// What the pipeline concluded for one closed candle.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Not enough candles for every analysis window yet.
    WarmingUp,
    NoSignal,
    Plan(PositionPlan),
    Rejected { signal: Signal, rejection: Rejection },
    /// A plan was already emitted for this close time.
    Duplicate,
}

impl Decision {
    pub fn plan(&self) -> Option<&PositionPlan> {
        match self {
            Decision::Plan(plan) => Some(plan),
            _ => None,
        }
    }
}

/// Everything produced by one candle close.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub close_time: i64,
    pub stop_updates: Vec<StopUpdate>,
    pub decision: Decision,
}

#[derive(Debug, Clone)]
pub struct SymbolPipeline {
    symbol: String,
    strategy: Strategy,
    analyzer: Analyzer,
    scorer: SignalScorer,
    sizer: RiskSizer,
    aggregator: CandleAggregator,
    tracker: TrailingStopTracker,
    warmup: usize,
    last_plan_close: Option<i64>,
}

impl SymbolPipeline {
    /// Build a pipeline for `config.market.symbol`. Fails on invalid configuration.
    pub fn new(config: &StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let symbol = config.market.symbol.clone();
        Ok(Self {
            strategy: config.strategy()?,
            analyzer: Analyzer::from_config(&config.analysis),
            scorer: SignalScorer::from_config(&config.analysis),
            sizer: RiskSizer::new(config.risk.clone(), symbol.clone()),
            aggregator: CandleAggregator::new(
                symbol.clone(),
                config.interval_ms()?,
                config.market.buffer_capacity,
            ),
            tracker: TrailingStopTracker::new(),
            warmup: config.warmup_candles(),
            last_plan_close: None,
            symbol,
        })
    }

    /// Feed a live event. Returns one step per candle it closed, oldest first.
    pub fn on_event(
        &mut self,
        event: &PriceEvent,
        account: &AccountState,
        constraints: &InstrumentConstraints,
    ) -> Vec<Step> {
        match self.aggregator.ingest(event) {
            IngestOutcome::Closed(candles) => candles
                .iter()
                .map(|candle| self.step(candle, account, constraints))
                .collect(),
            IngestOutcome::Updated | IngestOutcome::Dropped(_) => Vec::new(),
        }
    }

    /// Feed a closed historical candle.
    ///
    /// Returns `None` when the candle is dropped, except that re-delivering the
    /// candle a plan was emitted for reports [`Decision::Duplicate`]. A partial
    /// live candle closed ahead of `candle` is admitted but not evaluated.
    pub fn on_candle(
        &mut self,
        candle: Candle,
        account: &AccountState,
        constraints: &InstrumentConstraints,
    ) -> Option<Step> {
        match self.aggregator.ingest_candle(candle) {
            IngestOutcome::Closed(_) => Some(self.step(&candle, account, constraints)),
            IngestOutcome::Dropped(DropReason::Duplicate)
                if self.last_plan_close == Some(candle.close_time) =>
            {
                Some(Step {
                    close_time: candle.close_time,
                    stop_updates: Vec::new(),
                    decision: Decision::Duplicate,
                })
            }
            IngestOutcome::Updated | IngestOutcome::Dropped(_) => None,
        }
    }

    /// Analyze and score the current snapshot without changing any state.
    pub fn evaluate(&self) -> Option<Evaluation> {
        let candles = self.aggregator.candles();
        if candles.len() < self.warmup {
            return None;
        }
        self.strategy
            .evaluate(candles, &self.analyzer, &self.scorer)
    }

    /// Start trailing an accepted position.
    pub fn open_position(&mut self, position_id: PositionId, plan: &PositionPlan) {
        info!(
            symbol = %self.symbol,
            position = %position_id,
            direction = %plan.direction,
            entry = plan.entry_price,
            stop = plan.stop_price,
            "tracking position"
        );
        self.tracker.open(position_id, plan);
    }

    /// Release a closed position's trailing state.
    pub fn close_position(
        &mut self,
        position_id: PositionId,
        reason: ExitReason,
    ) -> Option<TrailingState> {
        let state = self.tracker.close(position_id);
        if state.is_some() {
            info!(symbol = %self.symbol, position = %position_id, ?reason, "position closed");
        }
        state
    }

    pub fn update_trailing(&mut self, candle: &Candle) -> Vec<StopUpdate> {
        self.tracker.on_candle_close(candle.close)
    }

    pub fn current_stop(&self, position_id: PositionId) -> Option<f64> {
        self.tracker.current_stop(position_id)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn candles(&self) -> &[Candle] {
        self.aggregator.candles()
    }

    pub fn aggregator(&self) -> &CandleAggregator {
        &self.aggregator
    }

    pub fn tracker(&self) -> &TrailingStopTracker {
        &self.tracker
    }

    pub fn sizer(&self) -> &RiskSizer {
        &self.sizer
    }

    fn step(
        &mut self,
        candle: &Candle,
        account: &AccountState,
        constraints: &InstrumentConstraints,
    ) -> Step {
        let stop_updates = self.update_trailing(candle);

        // Snapshot ending at this candle, so each close from a multi-close
        // event sees only its own history.
        let candles = self.aggregator.candles();
        let end = candles.partition_point(|c| c.close_time <= candle.close_time);
        let decision = self.decide(&candles[..end], account, constraints);

        match &decision {
            Decision::Plan(plan) => {
                self.last_plan_close = Some(candle.close_time);
                info!(
                    symbol = %self.symbol,
                    close_time = candle.close_time,
                    direction = %plan.direction,
                    entry = plan.entry_price,
                    size = plan.size,
                    stop = plan.stop_price,
                    take_profit = plan.take_profit_price,
                    strength = plan.signal_strength,
                    "position plan emitted"
                );
            }
            Decision::Rejected { signal, rejection } => {
                warn!(
                    symbol = %self.symbol,
                    close_time = candle.close_time,
                    direction = %signal.direction,
                    strength = signal.strength,
                    reason = rejection.reason(),
                    "signal rejected: {rejection}"
                );
            }
            Decision::Duplicate => {
                debug!(symbol = %self.symbol, close_time = candle.close_time, "plan already emitted");
            }
            Decision::WarmingUp | Decision::NoSignal => {}
        }

        Step {
            close_time: candle.close_time,
            stop_updates,
            decision,
        }
    }

    fn decide(
        &self,
        snapshot: &[Candle],
        account: &AccountState,
        constraints: &InstrumentConstraints,
    ) -> Decision {
        let Some(last) = snapshot.last() else {
            return Decision::WarmingUp;
        };
        if self
            .last_plan_close
            .is_some_and(|emitted| emitted >= last.close_time)
        {
            return Decision::Duplicate;
        }
        if snapshot.len() < self.warmup {
            return Decision::WarmingUp;
        }
        let Some(evaluation) = self
            .strategy
            .evaluate(snapshot, &self.analyzer, &self.scorer)
        else {
            return Decision::WarmingUp;
        };
        let Some(signal) = evaluation.signal else {
            return Decision::NoSignal;
        };
        match self
            .sizer
            .size(&signal, signal.pattern, account, constraints)
        {
            Ok(plan) => Decision::Plan(plan),
            Err(rejection) => Decision::Rejected { signal, rejection },
        }
    }
}
