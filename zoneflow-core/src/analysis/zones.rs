//! Support/resistance zone detection.
//!
//! Zones are rebuilt from scratch on every call from the buffer snapshot:
//!
//! 1. **Seeds** — candle highs (lows) that are the maximum (minimum) of a
//!    symmetric `±window` neighbourhood. Flat tops seed once, at the earliest
//!    candle.
//! 2. **Merge** — same-kind seeds within `width` of the cluster's lowest
//!    price form one zone, padded by `width / 2` on each side.
//! 3. **Score** — touch count, recency of the last touch and rejection rate,
//!    each on a 0–10 scale, combined with [`ZoneWeights`] and capped at 10.

use crate::config::{AnalysisConfig, ZoneWeights};
use crate::domain::Candle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Support,
    Resistance,
}

/// Sub-scores behind a zone's strength, each on a 0–10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneScores {
    pub touch: f64,
    pub recency: f64,
    pub rejection: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub price_low: f64,
    pub price_high: f64,
    pub kind: ZoneKind,
    /// 0–10.
    pub strength: u8,
    pub touches: usize,
    pub rejections: usize,
    pub last_touch_time: i64,
    pub scores: ZoneScores,
}

impl Zone {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.price_low && price <= self.price_high
    }

    pub fn mid(&self) -> f64 {
        (self.price_low + self.price_high) / 2.0
    }

    /// Zero inside the zone, otherwise distance to the nearer edge.
    pub fn distance_to(&self, price: f64) -> f64 {
        if price < self.price_low {
            self.price_low - price
        } else if price > self.price_high {
            price - self.price_high
        } else {
            0.0
        }
    }

    /// True when the candle's range intersects the zone.
    pub fn is_touched_by(&self, candle: &Candle) -> bool {
        candle.low <= self.price_high && candle.high >= self.price_low
    }
}

/// Touch sub-score: linear up to five touches, then saturating towards 10.
pub fn touch_score(touches: usize) -> f64 {
    if touches <= 5 {
        1.6 * touches as f64
    } else {
        8.0 + 2.0 * (1.0 - 0.5_f64.powi((touches - 5) as i32))
    }
}

/// Combine sub-scores into an integer strength in 0..=10.
///
/// `recency` is already on a 0–10 scale; `rejection_rate` is a fraction.
pub fn zone_strength(weights: &ZoneWeights, touches: usize, recency: f64, rejection_rate: f64) -> u8 {
    let raw = weights.touch * touch_score(touches)
        + weights.recency * recency.clamp(0.0, 10.0)
        + weights.rejection * 10.0 * rejection_rate.clamp(0.0, 1.0);
    raw.round().clamp(0.0, 10.0) as u8
}

/// Pick the eligible zone nearest to `price`.
pub fn nearest_zone(zones: &[Zone], price: f64, min_strength: u8) -> Option<&Zone> {
    zones
        .iter()
        .filter(|z| z.strength >= min_strength)
        .min_by(|a, b| a.distance_to(price).total_cmp(&b.distance_to(price)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDetector {
    pub window: usize,
    pub width: f64,
    pub rejection_lookahead: usize,
    pub weights: ZoneWeights,
}

impl ZoneDetector {
    pub fn new(window: usize, width: f64, rejection_lookahead: usize, weights: ZoneWeights) -> Self {
        Self {
            window: window.max(1),
            width,
            rejection_lookahead,
            weights,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.extremum_window,
            config.zone_width,
            config.rejection_lookahead,
            config.zone_weights,
        )
    }

    /// All zones in the snapshot, strongest first.
    pub fn detect(&self, candles: &[Candle]) -> Vec<Zone> {
        let mut zones = self.detect_kind(candles, ZoneKind::Resistance);
        zones.extend(self.detect_kind(candles, ZoneKind::Support));
        zones.sort_by(|a, b| {
            b.strength
                .cmp(&a.strength)
                .then(a.price_low.total_cmp(&b.price_low))
        });
        zones
    }

    fn detect_kind(&self, candles: &[Candle], kind: ZoneKind) -> Vec<Zone> {
        let seeds = self.seeds(candles, kind);
        cluster(seeds, self.width)
            .into_iter()
            .map(|c| self.score(candles, kind, &c))
            .collect()
    }

    /// Indices and prices of local extrema.
    fn seeds(&self, candles: &[Candle], kind: ZoneKind) -> Vec<(usize, f64)> {
        let w = self.window;
        let n = candles.len();
        if n < 2 * w + 1 {
            return Vec::new();
        }
        let price = |c: &Candle| match kind {
            ZoneKind::Resistance => c.high,
            ZoneKind::Support => c.low,
        };
        // `beats(a, b)` is true when `a` is the more extreme price.
        let beats = |a: f64, b: f64| match kind {
            ZoneKind::Resistance => a > b,
            ZoneKind::Support => a < b,
        };

        (w..n - w)
            .filter_map(|i| {
                let p = price(&candles[i]);
                let left = candles[i - w..i].iter().all(|c| beats(p, price(c)));
                let right = candles[i + 1..=i + w]
                    .iter()
                    .all(|c| !beats(price(c), p));
                (left && right).then_some((i, p))
            })
            .collect()
    }

    fn score(&self, candles: &[Candle], kind: ZoneKind, cluster: &Cluster) -> Zone {
        let n = candles.len();
        let price_low = cluster.min * (1.0 - self.width / 2.0);
        let price_high = cluster.max * (1.0 + self.width / 2.0);

        let mut zone = Zone {
            price_low,
            price_high,
            kind,
            strength: 0,
            touches: 0,
            rejections: 0,
            last_touch_time: 0,
            scores: ZoneScores::default(),
        };

        let mut last_index = cluster.last_seed;
        for j in cluster.first_seed + 1..n {
            if !zone.is_touched_by(&candles[j]) {
                continue;
            }
            zone.touches += 1;
            last_index = last_index.max(j);
            if self.is_rejection(candles, &zone, j) {
                zone.rejections += 1;
            }
        }

        let age = (n - 1 - last_index) as f64;
        let recency = 10.0 * (1.0 - age / n as f64);
        let rejection_rate = if zone.touches == 0 {
            0.0
        } else {
            zone.rejections as f64 / zone.touches as f64
        };

        zone.last_touch_time = candles[last_index].close_time;
        zone.scores = ZoneScores {
            touch: touch_score(zone.touches),
            recency,
            rejection: 10.0 * rejection_rate,
        };
        zone.strength = zone_strength(&self.weights, zone.touches, recency, rejection_rate);
        zone
    }

    /// The first close outside the zone within the lookahead decides: back on
    /// the origin side is a rejection, through the zone is a breach.
    fn is_rejection(&self, candles: &[Candle], zone: &Zone, touch: usize) -> bool {
        let end = (touch + self.rejection_lookahead).min(candles.len() - 1);
        for c in &candles[touch..=end] {
            if c.close < zone.price_low {
                return zone.kind == ZoneKind::Resistance;
            }
            if c.close > zone.price_high {
                return zone.kind == ZoneKind::Support;
            }
        }
        false
    }
}

struct Cluster {
    min: f64,
    max: f64,
    first_seed: usize,
    last_seed: usize,
}

/// Group price-sorted seeds whose distance from the cluster floor is within `width`.
fn cluster(mut seeds: Vec<(usize, f64)>, width: f64) -> Vec<Cluster> {
    seeds.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut clusters: Vec<Cluster> = Vec::new();
    for (idx, price) in seeds {
        match clusters.last_mut() {
            Some(c) if price - c.min <= c.min * width => {
                c.max = c.max.max(price);
                c.first_seed = c.first_seed.min(idx);
                c.last_seed = c.last_seed.max(idx);
            }
            _ => clusters.push(Cluster {
                min: price,
                max: price,
                first_seed: idx,
                last_seed: idx,
            }),
        }
    }
    clusters
}
