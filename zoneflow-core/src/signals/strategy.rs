//! Strategy variants.
//!
//! The strategy set is closed: selecting one is a configuration decision,
//! validated at startup, and every variant runs through [`Strategy::evaluate`].

use super::scorer::{Signal, SignalScorer};
use crate::analysis::{Analysis, Analyzer, Pattern, RiskClass};
use crate::config::ConfigError;
use crate::domain::Candle;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Every pattern, breakouts included.
    PurePriceAction,
    /// Reversal patterns at an eligible zone only.
    ZoneReversal,
}

/// Output of one strategy evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub analysis: Analysis,
    pub signal: Option<Signal>,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::PurePriceAction, Strategy::ZoneReversal];

    /// Resolve a configured strategy name. Case, `_` and `-` are ignored.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "purepriceaction" | "purepriceactionstrategy" | "smarttrendcatcher" => {
                Ok(Strategy::PurePriceAction)
            }
            "zonereversal" | "zonereversalstrategy" => Ok(Strategy::ZoneReversal),
            _ => Err(ConfigError::UnknownStrategy(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::PurePriceAction => "PurePriceActionStrategy",
            Strategy::ZoneReversal => "ZoneReversalStrategy",
        }
    }

    pub fn admits(&self, pattern: &Pattern) -> bool {
        match self {
            Strategy::PurePriceAction => true,
            Strategy::ZoneReversal => pattern.kind.risk_class() == RiskClass::Reversal,
        }
    }

    /// Analyze the snapshot and score it. `None` while warming up.
    pub fn evaluate(
        &self,
        candles: &[Candle],
        analyzer: &Analyzer,
        scorer: &SignalScorer,
    ) -> Option<Evaluation> {
        let mut analysis = analyzer.analyze(candles)?;
        analysis.patterns.retain(|p| self.admits(p));

        let signal = match self {
            Strategy::ZoneReversal => {
                let close = candles.last()?.close;
                if analysis.nearest_zone(close, analyzer.min_zone_strength).is_none() {
                    None
                } else {
                    self.score(candles, &analysis, scorer)
                }
            }
            Strategy::PurePriceAction => self.score(candles, &analysis, scorer),
        };
        Some(Evaluation { analysis, signal })
    }

    fn score(&self, candles: &[Candle], analysis: &Analysis, scorer: &SignalScorer) -> Option<Signal> {
        scorer.score(
            candles,
            &analysis.zones,
            &analysis.patterns,
            analysis.market.momentum,
            analysis.market.volatility,
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
