//! Market-structure analysis: zones, patterns and market metrics.
//!
//! All analysis is a pure function of a candle snapshot. Nothing here keeps
//! state between calls, so recomputing on the same snapshot always yields the
//! same zones and patterns.

pub mod market;
pub mod patterns;
pub mod zones;

pub use market::{MarketMetrics, MarketSnapshot};
pub use patterns::{Pattern, PatternKind, PatternRecognizer, RiskClass};
pub use zones::{nearest_zone, Zone, ZoneDetector, ZoneKind};

use crate::config::AnalysisConfig;
use crate::domain::Candle;

/// The detectors a strategy evaluates a snapshot with.
#[derive(Debug, Clone, PartialEq)]
pub struct Analyzer {
    pub zones: ZoneDetector,
    pub patterns: PatternRecognizer,
    pub metrics: MarketMetrics,
    pub min_zone_strength: u8,
}

/// Everything derived from one snapshot before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub zones: Vec<Zone>,
    pub patterns: Vec<Pattern>,
    pub market: MarketSnapshot,
}

impl Analysis {
    /// Eligible zone nearest to `price`.
    pub fn nearest_zone(&self, price: f64, min_strength: u8) -> Option<&Zone> {
        nearest_zone(&self.zones, price, min_strength)
    }
}

impl Analyzer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            zones: ZoneDetector::from_config(config),
            patterns: PatternRecognizer::from_config(config),
            metrics: MarketMetrics::new(
                config.momentum_window,
                config.volatility_window,
                config.price_action_lookback,
            ),
            min_zone_strength: config.min_zone_strength,
        }
    }

    /// Zones, patterns and metrics for the snapshot; `None` while the
    /// metric windows are still filling.
    pub fn analyze(&self, candles: &[Candle]) -> Option<Analysis> {
        let market = self.metrics.snapshot(candles)?;
        let close = candles.last()?.close;
        let zones = self.zones.detect(candles);
        let nearest = nearest_zone(&zones, close, self.min_zone_strength);
        let patterns = self.patterns.recognize(candles, nearest);
        Some(Analysis {
            zones,
            patterns,
            market,
        })
    }
}
