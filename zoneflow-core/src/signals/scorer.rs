//! Multi-factor signal scoring.
//!
//! Each direction is scored independently on four factors, each 0–10:
//!
//! | factor     | long                                   | short                                     |
//! |------------|----------------------------------------|-------------------------------------------|
//! | zone       | support strength, or resistance broken upward | resistance strength, or support broken downward |
//! | pattern    | 10 × best long confidence              | 10 × best short confidence                |
//! | momentum   | 10 × min(m / threshold, 1), m > 0      | same with -m                              |
//! | volatility | 10 in band, scaled down outside it     | same                                      |
//!
//! The composite is the weight-normalised sum, damped further when
//! volatility is below the band. A signal needs the minimum strength and a
//! clear lead over the opposite direction.

use crate::analysis::{nearest_zone, Pattern, PatternKind, Zone, ZoneKind};
use crate::config::{AnalysisConfig, ScoreWeights};
use crate::domain::{Candle, Direction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Factor values behind a composite score, each 0–10.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalFactors {
    pub zone: f64,
    pub pattern: f64,
    pub momentum: f64,
    pub volatility: f64,
}

/// A directional trade signal, valid for one candle close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Composite strength, 0–10.
    pub strength: f64,
    pub factors: SignalFactors,
    /// Close time of the evaluated candle.
    pub timestamp: i64,
    /// Close of the evaluated candle.
    pub entry_price: f64,
    /// Highest-confidence pattern in the signal's direction.
    pub pattern: Option<PatternKind>,
    /// Zone the signal was scored against.
    pub zone: Option<Zone>,
}

/// Score for one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionScore {
    pub direction: Direction,
    pub composite: f64,
    pub factors: SignalFactors,
    pub best_pattern: Option<PatternKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalScorer {
    pub weights: ScoreWeights,
    pub momentum_threshold: f64,
    pub volatility_min: f64,
    pub volatility_max: f64,
    pub min_signal_strength: f64,
    pub dominance_margin: f64,
    pub require_pattern: bool,
    pub min_zone_strength: u8,
}

impl Default for SignalScorer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl SignalScorer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            weights: config.score_weights,
            momentum_threshold: config.momentum_threshold,
            volatility_min: config.volatility_min,
            volatility_max: config.volatility_max,
            min_signal_strength: config.min_signal_strength,
            dominance_margin: config.dominance_margin,
            require_pattern: config.require_pattern,
            min_zone_strength: config.min_zone_strength,
        }
    }

    /// Score the snapshot and emit a signal if one direction clearly wins.
    ///
    /// The zone considered is the eligible zone nearest to the last close.
    pub fn score(
        &self,
        candles: &[Candle],
        zones: &[Zone],
        patterns: &[Pattern],
        momentum: f64,
        volatility: f64,
    ) -> Option<Signal> {
        let last = candles.last()?;
        let zone = nearest_zone(zones, last.close, self.min_zone_strength);

        let long = self.score_direction(Direction::Long, zone, patterns, momentum, volatility);
        let short = self.score_direction(Direction::Short, zone, patterns, momentum, volatility);
        debug!(
            close_time = last.close_time,
            long = long.composite,
            short = short.composite,
            patterns = patterns.len(),
            momentum,
            volatility,
            "scored snapshot"
        );

        let (best, other) = if long.composite >= short.composite {
            (long, short)
        } else {
            (short, long)
        };
        if best.composite < self.min_signal_strength {
            return None;
        }
        if best.composite <= other.composite
            || best.composite - other.composite < self.dominance_margin
        {
            return None;
        }

        Some(Signal {
            direction: best.direction,
            strength: best.composite,
            factors: best.factors,
            timestamp: last.close_time,
            entry_price: last.close,
            pattern: best.best_pattern,
            zone: zone.cloned(),
        })
    }

    pub fn score_direction(
        &self,
        direction: Direction,
        zone: Option<&Zone>,
        patterns: &[Pattern],
        momentum: f64,
        volatility: f64,
    ) -> DirectionScore {
        let best = patterns
            .iter()
            .filter(|p| p.direction == direction)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

        let aligned_kind = match direction {
            Direction::Long => ZoneKind::Support,
            Direction::Short => ZoneKind::Resistance,
        };
        let breaks_through = patterns
            .iter()
            .any(|p| p.kind == PatternKind::Breakout && p.direction == direction);
        let zone_factor = zone
            .filter(|z| z.kind == aligned_kind || breaks_through)
            .map_or(0.0, |z| f64::from(z.strength));

        let directional = momentum * direction.sign();
        let momentum_factor = if directional > 0.0 {
            10.0 * (directional / self.momentum_threshold).min(1.0)
        } else {
            0.0
        };

        let factors = SignalFactors {
            zone: zone_factor,
            pattern: best.map_or(0.0, |p| 10.0 * p.confidence),
            momentum: momentum_factor,
            volatility: self.volatility_factor(volatility),
        };

        let composite = if self.require_pattern && best.is_none() {
            0.0
        } else {
            self.composite(&factors, volatility)
        };

        DirectionScore {
            direction,
            composite,
            factors,
            best_pattern: best.map(|p| p.kind),
        }
    }

    /// 10 inside the band, proportionally less outside it.
    pub fn volatility_factor(&self, volatility: f64) -> f64 {
        if !(volatility > 0.0) {
            0.0
        } else if volatility < self.volatility_min {
            10.0 * volatility / self.volatility_min
        } else if volatility > self.volatility_max {
            10.0 * self.volatility_max / volatility
        } else {
            10.0
        }
    }

    fn composite(&self, f: &SignalFactors, volatility: f64) -> f64 {
        let w = &self.weights;
        let total = w.zone + w.pattern + w.momentum + w.volatility;
        if total <= 0.0 {
            return 0.0;
        }
        let mut score = (w.zone * f.zone
            + w.pattern * f.pattern
            + w.momentum * f.momentum
            + w.volatility * f.volatility)
            / total;
        if volatility < self.volatility_min {
            score *= (volatility / self.volatility_min).max(0.0);
        }
        score.clamp(0.0, 10.0)
    }
}
