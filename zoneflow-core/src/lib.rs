//! Zoneflow Core — candle aggregation, market-structure analysis, signal
//! scoring, risk sizing and trailing stops.
//!
//! This crate contains the per-symbol trading pipeline:
//! - Domain types (candles, feed events, account snapshots, plans, trades)
//! - Candle aggregation into a bounded, ordered buffer
//! - Support/resistance zones, candlestick patterns and market metrics
//! - Multi-factor signal scoring behind a closed set of strategies
//! - Risk sizing bounded by per-trade risk, notional and margin
//! - Trailing stops under the ratchet invariant
//! - The `SymbolPipeline` context object and a candle-replay backtest

pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod position_management;
pub mod signals;
pub mod sizers;

pub use config::{ConfigError, StrategyConfig};
pub use engine::{run_backtest, BacktestReport, Decision, ExecutionVenue, Step, SymbolPipeline};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: all core domain types are Send + Sync.
    ///
    /// The runner evaluates one pipeline per symbol on a thread pool. If any
    /// type fails this check, the build breaks immediately.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::PriceEvent>();
        require_sync::<domain::PriceEvent>();
        require_send::<domain::AccountState>();
        require_sync::<domain::AccountState>();
        require_send::<domain::InstrumentConstraints>();
        require_sync::<domain::InstrumentConstraints>();
        require_send::<domain::PositionPlan>();
        require_sync::<domain::PositionPlan>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();
        require_send::<domain::PositionId>();
        require_sync::<domain::PositionId>();

        // Analysis types
        require_send::<analysis::Zone>();
        require_sync::<analysis::Zone>();
        require_send::<analysis::Pattern>();
        require_sync::<analysis::Pattern>();
        require_send::<analysis::Analyzer>();
        require_sync::<analysis::Analyzer>();

        // Signals and sizing
        require_send::<signals::Signal>();
        require_sync::<signals::Signal>();
        require_send::<signals::SignalScorer>();
        require_sync::<signals::SignalScorer>();
        require_send::<sizers::RiskSizer>();
        require_sync::<sizers::RiskSizer>();
        require_send::<sizers::Rejection>();
        require_sync::<sizers::Rejection>();

        // Stateful components
        require_send::<data::CandleAggregator>();
        require_sync::<data::CandleAggregator>();
        require_send::<position_management::TrailingStopTracker>();
        require_sync::<position_management::TrailingStopTracker>();
        require_send::<engine::SymbolPipeline>();
        require_sync::<engine::SymbolPipeline>();
        require_send::<engine::BacktestReport>();
        require_sync::<engine::BacktestReport>();

        // Configuration
        require_send::<config::StrategyConfig>();
        require_sync::<config::StrategyConfig>();
    }

    /// Architecture contract: scoring never sees account state.
    ///
    /// `SignalScorer::score` takes the candle snapshot and derived analysis
    /// only. Account state first appears in `RiskSizer::size`.
    #[test]
    fn scorer_has_no_account_parameter() {
        fn _check_signature(
            scorer: &signals::SignalScorer,
            candles: &[domain::Candle],
            zones: &[analysis::Zone],
            patterns: &[analysis::Pattern],
        ) -> Option<signals::Signal> {
            scorer.score(candles, zones, patterns, 0.0, 0.0)
        }
    }
}
