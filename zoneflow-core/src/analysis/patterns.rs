//! Price-action pattern recognition on the candle tail.
//!
//! Every detector reports a confidence of 0.5 when its thresholds are just
//! met, rising linearly to 1.0 as the margins grow. Several patterns may fire
//! on the same candle; the scorer weighs all of them.

use super::market::average_volume;
use super::zones::{Zone, ZoneKind};
use crate::config::AnalysisConfig;
use crate::domain::{Candle, Direction};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Stop/target family a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Reversal,
    Breakout,
    Continuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    PinBar,
    Engulfing,
    Breakout,
    ZoneRejection,
    Marubozu,
    Star,
    ThreeSoldiers,
    Tweezer,
    OutsideBar,
}

impl PatternKind {
    pub fn risk_class(self) -> RiskClass {
        match self {
            PatternKind::PinBar
            | PatternKind::Engulfing
            | PatternKind::ZoneRejection
            | PatternKind::Star
            | PatternKind::Tweezer => RiskClass::Reversal,
            PatternKind::Breakout | PatternKind::Marubozu => RiskClass::Breakout,
            PatternKind::ThreeSoldiers | PatternKind::OutsideBar => RiskClass::Continuation,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PatternKind::PinBar => "pin_bar",
            PatternKind::Engulfing => "engulfing",
            PatternKind::Breakout => "breakout",
            PatternKind::ZoneRejection => "rejection",
            PatternKind::Marubozu => "marubozu",
            PatternKind::Star => "star",
            PatternKind::ThreeSoldiers => "three_soldiers",
            PatternKind::Tweezer => "tweezer",
            PatternKind::OutsideBar => "outside_bar",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A detected formation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub direction: Direction,
    /// In [0.5, 1.0] for detected patterns.
    pub confidence: f64,
    /// Buffer indices of the candles forming the pattern.
    pub candle_range: Range<usize>,
}

impl Pattern {
    pub fn new(kind: PatternKind, direction: Direction, confidence: f64, candle_range: Range<usize>) -> Self {
        Self {
            kind,
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            candle_range,
        }
    }
}

/// Map threshold margins (each clamped to 0..=1) to a confidence in 0.5..=1.0.
/// Minimum tweezer wick beyond the body, as a fraction of the body edge.
const TWEEZER_MIN_WICK: f64 = 0.005;

fn confidence(margins: &[f64]) -> f64 {
    if margins.is_empty() {
        return 0.5;
    }
    let mean = margins.iter().map(|m| m.clamp(0.0, 1.0)).sum::<f64>() / margins.len() as f64;
    0.5 + 0.5 * mean
}

fn color(c: &Candle) -> Option<Direction> {
    if c.is_bullish() {
        Some(Direction::Long)
    } else if c.is_bearish() {
        Some(Direction::Short)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternRecognizer {
    pub pin_bar_max_body: f64,
    pub pin_bar_min_wick: f64,
    pub pin_bar_max_opposite_wick: f64,
    pub breakout_threshold: f64,
    pub volume_lookback: usize,
    pub multi_candle: bool,
    pub marubozu_min_body: f64,
    pub tweezer_tolerance: f64,
}

impl Default for PatternRecognizer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl PatternRecognizer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            pin_bar_max_body: config.pin_bar_max_body,
            pin_bar_min_wick: config.pin_bar_min_wick,
            pin_bar_max_opposite_wick: config.pin_bar_max_opposite_wick,
            breakout_threshold: config.breakout_threshold,
            volume_lookback: config.price_action_lookback,
            multi_candle: config.enable_multi_candle_patterns,
            marubozu_min_body: config.marubozu_min_body,
            tweezer_tolerance: config.tweezer_tolerance,
        }
    }

    /// Detect every pattern ending on the last candle.
    ///
    /// `zone` is the eligible zone nearest to the current close, if any.
    pub fn recognize(&self, candles: &[Candle], zone: Option<&Zone>) -> Vec<Pattern> {
        let n = candles.len();
        let mut found = Vec::new();
        let Some(cur) = candles.last() else {
            return found;
        };
        let prev = n.checked_sub(2).map(|i| &candles[i]);

        if let Some((dir, conf)) = self.pin_bar(cur) {
            found.push(Pattern::new(PatternKind::PinBar, dir, conf, n - 1..n));
        }
        if let Some(prev) = prev {
            if let Some((dir, conf)) = engulfing(prev, cur) {
                found.push(Pattern::new(PatternKind::Engulfing, dir, conf, n - 2..n));
            }
        }
        if let (Some(zone), Some(prev)) = (zone, prev) {
            let avg = average_volume(candles, self.volume_lookback);
            if let Some((dir, conf)) = self.breakout(prev, cur, zone, avg) {
                found.push(Pattern::new(PatternKind::Breakout, dir, conf, n - 1..n));
            }
            if let Some((dir, conf, span)) = zone_rejection(prev, cur, zone) {
                found.push(Pattern::new(PatternKind::ZoneRejection, dir, conf, n - span..n));
            }
        }

        if self.multi_candle {
            if let Some((dir, conf)) = self.marubozu(cur) {
                found.push(Pattern::new(PatternKind::Marubozu, dir, conf, n - 1..n));
            }
            if let Some(prev) = prev {
                if let Some((dir, conf)) = self.tweezer(prev, cur) {
                    found.push(Pattern::new(PatternKind::Tweezer, dir, conf, n - 2..n));
                }
                if let Some((dir, conf)) = outside_bar(prev, cur) {
                    found.push(Pattern::new(PatternKind::OutsideBar, dir, conf, n - 2..n));
                }
            }
            if n >= 3 {
                let tail = &candles[n - 3..];
                if let Some((dir, conf)) = star(&tail[0], &tail[1], &tail[2]) {
                    found.push(Pattern::new(PatternKind::Star, dir, conf, n - 3..n));
                }
                if let Some((dir, conf)) = three_soldiers(&tail[0], &tail[1], &tail[2]) {
                    found.push(Pattern::new(PatternKind::ThreeSoldiers, dir, conf, n - 3..n));
                }
            }
        }

        found
    }

    /// Small body, one long wick, short opposite wick. Direction opposes the long wick.
    pub fn pin_bar(&self, c: &Candle) -> Option<(Direction, f64)> {
        let range = c.range();
        if range <= 0.0 {
            return None;
        }
        let body = c.body() / range;
        if body > self.pin_bar_max_body {
            return None;
        }
        let lower = c.lower_wick() / range;
        let upper = c.upper_wick() / range;

        let (dir, wick, opposite) = if lower >= self.pin_bar_min_wick && upper <= self.pin_bar_max_opposite_wick {
            (Direction::Long, lower, upper)
        } else if upper >= self.pin_bar_min_wick && lower <= self.pin_bar_max_opposite_wick {
            (Direction::Short, upper, lower)
        } else {
            return None;
        };

        let conf = confidence(&[
            (self.pin_bar_max_body - body) / self.pin_bar_max_body,
            (wick - self.pin_bar_min_wick) / (1.0 - self.pin_bar_min_wick),
            (self.pin_bar_max_opposite_wick - opposite) / self.pin_bar_max_opposite_wick,
        ]);
        Some((dir, conf))
    }

    /// Close beyond the zone edge by more than the threshold, on at least
    /// average volume, with the previous close still inside the threshold.
    fn breakout(&self, prev: &Candle, cur: &Candle, zone: &Zone, avg_volume: Option<f64>) -> Option<(Direction, f64)> {
        let avg = avg_volume?;
        if cur.volume < avg {
            return None;
        }
        let thr = self.breakout_threshold;
        let (dir, excess) = match zone.kind {
            ZoneKind::Resistance => {
                let level = zone.price_high;
                let trigger = level * (1.0 + thr);
                if cur.close <= trigger || prev.close > trigger {
                    return None;
                }
                (Direction::Long, cur.close / level - 1.0)
            }
            ZoneKind::Support => {
                let level = zone.price_low;
                let trigger = level * (1.0 - thr);
                if cur.close >= trigger || prev.close < trigger {
                    return None;
                }
                (Direction::Short, 1.0 - cur.close / level)
            }
        };
        let volume_margin = if avg > 0.0 { cur.volume / avg - 1.0 } else { 1.0 };
        Some((dir, confidence(&[(excess - thr) / thr, volume_margin])))
    }

    fn marubozu(&self, c: &Candle) -> Option<(Direction, f64)> {
        let ratio = c.body_ratio();
        if ratio < self.marubozu_min_body {
            return None;
        }
        let dir = color(c)?;
        Some((dir, confidence(&[(ratio - self.marubozu_min_body) / (1.0 - self.marubozu_min_body)])))
    }

    /// Two same-colored candles with matching lows (bottom, bullish) or matching
    /// highs (top, bearish), the current extreme at least 0.5% beyond its body.
    fn tweezer(&self, prev: &Candle, cur: &Candle) -> Option<(Direction, f64)> {
        let tol = self.tweezer_tolerance;
        let (dir, diff, wick) = if prev.is_bullish() && cur.is_bullish() {
            (
                Direction::Long,
                (cur.low - prev.low).abs() / prev.low,
                (cur.body_low() - cur.low) / cur.body_low(),
            )
        } else if prev.is_bearish() && cur.is_bearish() {
            (
                Direction::Short,
                (cur.high - prev.high).abs() / prev.high,
                (cur.high - cur.body_high()) / cur.body_high(),
            )
        } else {
            return None;
        };
        if diff > tol || wick < TWEEZER_MIN_WICK {
            return None;
        }
        Some((
            dir,
            confidence(&[1.0 - diff / tol, wick / TWEEZER_MIN_WICK - 1.0]),
        ))
    }
}

/// Opposite-colored candle whose body contains the previous body.
fn engulfing(prev: &Candle, cur: &Candle) -> Option<(Direction, f64)> {
    let dir = color(cur)?;
    if color(prev)? != dir.opposite() {
        return None;
    }
    if cur.body_low() > prev.body_low() || cur.body_high() < prev.body_high() {
        return None;
    }
    let ratio = cur.body() / prev.body();
    Some((dir, confidence(&[ratio - 1.0])))
}

/// Wick into the zone with the close back outside on the origin side, either
/// on the touching candle or on the one after it. Returns the candle span.
fn zone_rejection(prev: &Candle, cur: &Candle, zone: &Zone) -> Option<(Direction, f64, usize)> {
    let width = zone.price_high - zone.price_low;
    if width <= 0.0 {
        return None;
    }
    match zone.kind {
        ZoneKind::Support => {
            if cur.close <= zone.price_high {
                return None;
            }
            let recovery = (cur.close - zone.price_high) / width;
            if cur.low <= zone.price_high {
                let depth = (zone.price_high - cur.low) / width;
                Some((Direction::Long, confidence(&[depth, recovery]), 1))
            } else if prev.low <= zone.price_high && prev.close >= zone.price_low {
                let depth = (zone.price_high - prev.low) / width;
                Some((Direction::Long, confidence(&[depth, recovery]), 2))
            } else {
                None
            }
        }
        ZoneKind::Resistance => {
            if cur.close >= zone.price_low {
                return None;
            }
            let recovery = (zone.price_low - cur.close) / width;
            if cur.high >= zone.price_low {
                let depth = (cur.high - zone.price_low) / width;
                Some((Direction::Short, confidence(&[depth, recovery]), 1))
            } else if prev.high >= zone.price_low && prev.close <= zone.price_high {
                let depth = (prev.high - zone.price_low) / width;
                Some((Direction::Short, confidence(&[depth, recovery]), 2))
            } else {
                None
            }
        }
    }
}

/// Morning/evening star: strong candle, small middle body, opposite candle
/// closing past the first body's midpoint.
fn star(first: &Candle, middle: &Candle, last: &Candle) -> Option<(Direction, f64)> {
    let first_dir = color(first)?;
    let last_dir = color(last)?;
    if last_dir != first_dir.opposite() || first.body_ratio() < 0.5 {
        return None;
    }
    if middle.body() >= 0.5 * first.body() {
        return None;
    }
    let mid = first.body_mid();
    let past_mid = (last.close - mid) * last_dir.sign();
    if past_mid <= 0.0 {
        return None;
    }
    Some((last_dir, confidence(&[past_mid / (first.body() / 2.0)])))
}

/// Three same-colored strong bodies with progressive closes, each opening
/// inside (or within 0.5% of) the previous body.
fn three_soldiers(a: &Candle, b: &Candle, c: &Candle) -> Option<(Direction, f64)> {
    let dir = color(a)?;
    if color(b)? != dir || color(c)? != dir {
        return None;
    }
    let s = dir.sign();
    for (prev, cur) in [(a, b), (b, c)] {
        if (cur.close - prev.close) * s <= 0.0 {
            return None;
        }
        let opens_inside = match dir {
            Direction::Long => cur.open >= prev.open && cur.open <= prev.close * 1.005,
            Direction::Short => cur.open <= prev.open && cur.open >= prev.close * 0.995,
        };
        if !opens_inside {
            return None;
        }
    }
    let ratios = [a.body_ratio(), b.body_ratio(), c.body_ratio()];
    if ratios.iter().any(|r| *r <= 0.6) {
        return None;
    }
    let margins: Vec<f64> = ratios.iter().map(|r| (r - 0.6) / 0.4).collect();
    Some((dir, confidence(&margins)))
}

/// Range engulfs the previous range with a larger body; direction by color.
fn outside_bar(prev: &Candle, cur: &Candle) -> Option<(Direction, f64)> {
    if cur.high <= prev.high || cur.low >= prev.low || cur.body() <= prev.body() {
        return None;
    }
    let dir = color(cur)?;
    let expansion = if prev.range() > 0.0 {
        cur.range() / prev.range() - 1.0
    } else {
        1.0
    };
    Some((dir, confidence(&[expansion])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::zones::ZoneScores;

    fn c(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        let t = i as i64 * 300_000;
        Candle::new(t, t + 299_999, open, high, low, close, volume)
    }

    fn zone(kind: ZoneKind, low: f64, high: f64) -> Zone {
        Zone {
            price_low: low,
            price_high: high,
            kind,
            strength: 5,
            touches: 3,
            rejections: 2,
            last_touch_time: 0,
            scores: ZoneScores::default(),
        }
    }

    fn kinds(patterns: &[Pattern]) -> Vec<PatternKind> {
        patterns.iter().map(|p| p.kind).collect()
    }

    #[test]
    fn bullish_pin_bar() {
        // Range 1.0: lower wick 0.75, body 0.11, upper wick 0.14.
        let candle = c(0, 100.75, 101.0, 100.0, 100.86, 1.0);
        let (dir, conf) = PatternRecognizer::default().pin_bar(&candle).unwrap();
        assert_eq!(dir, Direction::Long);
        assert!(conf > 0.5 && conf <= 1.0);
    }

    #[test]
    fn bearish_pin_bar() {
        let candle = c(0, 100.25, 101.0, 100.0, 100.1, 1.0);
        let (dir, _) = PatternRecognizer::default().pin_bar(&candle).unwrap();
        assert_eq!(dir, Direction::Short);
    }

    #[test]
    fn long_opposite_wick_is_not_a_pin_bar() {
        // Lower wick 0.70, body 0.10, upper wick 0.20 > 0.15.
        let candle = c(0, 100.7, 101.0, 100.0, 100.8, 1.0);
        assert!(PatternRecognizer::default().pin_bar(&candle).is_none());
    }

    #[test]
    fn pin_bar_confidence_grows_with_margin() {
        let r = PatternRecognizer::default();
        let marginal = c(0, 100.62, 101.0, 100.0, 100.86, 1.0);
        let strong = c(0, 100.92, 101.0, 100.0, 100.97, 1.0);
        let (_, weak_conf) = r.pin_bar(&marginal).unwrap();
        let (_, strong_conf) = r.pin_bar(&strong).unwrap();
        assert!(strong_conf > weak_conf);
    }

    #[test]
    fn bullish_engulfing() {
        let prev = c(0, 101.0, 101.2, 99.8, 100.0, 1.0);
        let cur = c(1, 99.9, 102.2, 99.7, 102.0, 1.0);
        let (dir, conf) = engulfing(&prev, &cur).unwrap();
        assert_eq!(dir, Direction::Long);
        assert!(conf > 0.9);
    }

    #[test]
    fn same_color_or_smaller_body_is_not_engulfing() {
        let prev = c(0, 100.0, 101.2, 99.8, 101.0, 1.0);
        let same = c(1, 99.9, 102.2, 99.7, 102.0, 1.0);
        assert!(engulfing(&prev, &same).is_none());

        let prev = c(0, 101.0, 101.2, 99.8, 100.0, 1.0);
        let inside = c(1, 100.2, 100.9, 100.1, 100.8, 1.0);
        assert!(engulfing(&prev, &inside).is_none());
    }

    #[test]
    fn resistance_breakout_needs_volume() {
        let r = PatternRecognizer::default();
        let z = zone(ZoneKind::Resistance, 99.7, 100.3);
        let mut candles: Vec<Candle> = (0..12).map(|i| c(i, 99.0, 99.5, 98.5, 99.2, 10.0)).collect();
        candles.push(c(12, 99.5, 101.8, 99.4, 101.6, 20.0));
        let found = r.recognize(&candles, Some(&z));
        let breakout = found.iter().find(|p| p.kind == PatternKind::Breakout).unwrap();
        assert_eq!(breakout.direction, Direction::Long);

        let last = candles.len() - 1;
        candles[last].volume = 5.0;
        let found = r.recognize(&candles, Some(&z));
        assert!(!kinds(&found).contains(&PatternKind::Breakout));
    }

    #[test]
    fn breakout_below_support_is_short() {
        let r = PatternRecognizer::default();
        let z = zone(ZoneKind::Support, 99.7, 100.3);
        let candles = vec![
            c(0, 100.5, 100.8, 100.2, 100.4, 10.0),
            c(1, 100.4, 100.5, 98.0, 98.2, 15.0),
        ];
        let found = r.recognize(&candles, Some(&z));
        let b = found.iter().find(|p| p.kind == PatternKind::Breakout).unwrap();
        assert_eq!(b.direction, Direction::Short);
    }

    #[test]
    fn support_rejection_on_touching_candle() {
        let z = zone(ZoneKind::Support, 99.7, 100.3);
        let prev = c(0, 101.0, 101.2, 100.6, 100.8, 1.0);
        let cur = c(1, 100.8, 101.0, 99.8, 100.9, 1.0);
        let (dir, _, span) = zone_rejection(&prev, &cur, &z).unwrap();
        assert_eq!(dir, Direction::Long);
        assert_eq!(span, 1);
    }

    #[test]
    fn delayed_resistance_rejection() {
        let z = zone(ZoneKind::Resistance, 99.7, 100.3);
        let prev = c(0, 99.5, 100.2, 99.4, 100.0, 1.0);
        let cur = c(1, 99.6, 99.65, 99.0, 99.2, 1.0);
        let (dir, _, span) = zone_rejection(&prev, &cur, &z).unwrap();
        assert_eq!(dir, Direction::Short);
        assert_eq!(span, 2);
    }

    #[test]
    fn close_inside_zone_is_not_a_rejection() {
        let z = zone(ZoneKind::Support, 99.7, 100.3);
        let prev = c(0, 101.0, 101.2, 100.6, 100.8, 1.0);
        let cur = c(1, 100.8, 100.9, 99.8, 100.0, 1.0);
        assert!(zone_rejection(&prev, &cur, &z).is_none());
    }

    #[test]
    fn morning_star() {
        let a = c(0, 102.0, 102.1, 99.9, 100.0, 1.0);
        let b = c(1, 99.9, 100.0, 99.5, 99.8, 1.0);
        let d = c(2, 99.9, 101.8, 99.8, 101.6, 1.0);
        let (dir, _) = star(&a, &b, &d).unwrap();
        assert_eq!(dir, Direction::Long);
    }

    #[test]
    fn three_white_soldiers() {
        let a = c(0, 100.0, 101.1, 99.95, 101.0, 1.0);
        let b = c(1, 100.9, 102.1, 100.85, 102.0, 1.0);
        let d = c(2, 101.9, 103.1, 101.85, 103.0, 1.0);
        let (dir, _) = three_soldiers(&a, &b, &d).unwrap();
        assert_eq!(dir, Direction::Long);
    }

    #[test]
    fn tweezer_bottom() {
        let r = PatternRecognizer::default();
        let prev = c(0, 99.5, 100.4, 99.0, 100.2, 1.0);
        let cur = c(1, 100.2, 101.0, 99.05, 100.9, 1.0);
        let (dir, conf) = r.tweezer(&prev, &cur).unwrap();
        assert_eq!(dir, Direction::Long);
        assert!((0.5..=1.0).contains(&conf));
    }

    #[test]
    fn tweezer_top() {
        let r = PatternRecognizer::default();
        let prev = c(0, 100.5, 101.0, 99.8, 100.0, 1.0);
        let cur = c(1, 100.0, 100.95, 99.0, 99.2, 1.0);
        let (dir, _) = r.tweezer(&prev, &cur).unwrap();
        assert_eq!(dir, Direction::Short);
    }

    #[test]
    fn tweezer_needs_wick_beyond_body() {
        let r = PatternRecognizer::default();
        // Lows match, but neither candle has a lower wick.
        let prev = c(0, 100.0, 101.0, 100.0, 100.8, 1.0);
        let cur = c(1, 100.0, 101.0, 100.0, 101.0, 1.0);
        assert_eq!(r.tweezer(&prev, &cur), None);

        // Opposite colors never form a tweezer.
        let prev = c(0, 101.0, 101.0, 100.0, 100.0, 1.0);
        let cur = c(1, 100.6, 101.5, 100.0, 101.4, 1.0);
        assert_eq!(r.tweezer(&prev, &cur), None);
    }

    #[test]
    fn multi_candle_patterns_can_be_disabled() {
        let mut config = AnalysisConfig::default();
        config.enable_multi_candle_patterns = false;
        let r = PatternRecognizer::from_config(&config);
        let candles = vec![c(0, 100.0, 101.05, 99.95, 101.0, 1.0)];
        assert!(r.recognize(&candles, None).is_empty());

        let r = PatternRecognizer::default();
        assert_eq!(kinds(&r.recognize(&candles, None)), vec![PatternKind::Marubozu]);
    }

    #[test]
    fn risk_classes() {
        assert_eq!(PatternKind::PinBar.risk_class(), RiskClass::Reversal);
        assert_eq!(PatternKind::Breakout.risk_class(), RiskClass::Breakout);
        assert_eq!(PatternKind::ThreeSoldiers.risk_class(), RiskClass::Continuation);
    }
}
