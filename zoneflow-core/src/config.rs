//! Strategy configuration — TOML file plus environment overrides.
//!
//! Every knob has a default, so an empty TOML document is a valid
//! configuration. Environment variables use the upper-case names
//! (`LEVERAGE`, `MIN_SIGNAL_STRENGTH`, ...) and override file values.
//! [`StrategyConfig::validate`] is run by every loader; a config that
//! fails validation never reaches the pipeline.

use crate::analysis::RiskClass;
use crate::signals::Strategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {key}={value:?} is not a valid value")]
    InvalidEnv { key: String, value: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("unknown timeframe '{0}' (expected e.g. 1m, 5m, 1h, 1d)")]
    UnknownTimeframe(String),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ─── Sections ───────────────────────────────────────────────────────

/// Complete configuration for one symbol pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub market: MarketConfig,
    pub risk: RiskConfig,
    pub analysis: AnalysisConfig,
    pub instrument: InstrumentConfig,
    pub backtest: BacktestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub symbol: String,
    pub timeframe: String,
    pub strategy: String,
    pub buffer_capacity: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".into(),
            timeframe: "5m".into(),
            strategy: "PurePriceActionStrategy".into(),
            buffer_capacity: 60,
        }
    }
}

/// How the initial stop is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopAnchor {
    /// Stop at a fixed percentage from entry (pattern table).
    Percent,
    /// Stop just beyond the signal's zone, falling back to percent when no zone.
    Zone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub leverage: f64,
    /// Fraction of equity lost if the stop is hit.
    pub fixed_trade_percentage: f64,
    pub max_open_positions: usize,
    pub margin_safety_factor: f64,
    pub max_position_size_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub pattern_specific_risk: bool,
    pub reversal_pattern_stop_pct: f64,
    pub breakout_pattern_stop_pct: f64,
    pub continuation_pattern_stop_pct: f64,
    pub reversal_pattern_tp_pct: f64,
    pub breakout_pattern_tp_pct: f64,
    pub continuation_pattern_tp_pct: f64,
    pub trailing_stop: bool,
    pub trailing_stop_pct: f64,
    pub stop_anchor: StopAnchor,
    /// Distance beyond the zone edge for zone-anchored stops, as a fraction of price.
    pub zone_stop_buffer: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            leverage: 30.0,
            fixed_trade_percentage: 0.02,
            max_open_positions: 3,
            margin_safety_factor: 0.90,
            max_position_size_pct: 0.50,
            stop_loss_pct: 0.008,
            take_profit_pct: 0.012,
            pattern_specific_risk: true,
            reversal_pattern_stop_pct: 0.010,
            breakout_pattern_stop_pct: 0.008,
            continuation_pattern_stop_pct: 0.006,
            reversal_pattern_tp_pct: 0.018,
            breakout_pattern_tp_pct: 0.020,
            continuation_pattern_tp_pct: 0.012,
            trailing_stop: true,
            trailing_stop_pct: 0.006,
            stop_anchor: StopAnchor::Percent,
            zone_stop_buffer: 0.001,
        }
    }
}

impl RiskConfig {
    /// Stop-loss and take-profit fractions for a pattern risk class.
    pub fn stop_table(&self, class: RiskClass) -> (f64, f64) {
        if !self.pattern_specific_risk {
            return (self.stop_loss_pct, self.take_profit_pct);
        }
        match class {
            RiskClass::Reversal => (self.reversal_pattern_stop_pct, self.reversal_pattern_tp_pct),
            RiskClass::Breakout => (self.breakout_pattern_stop_pct, self.breakout_pattern_tp_pct),
            RiskClass::Continuation => (
                self.continuation_pattern_stop_pct,
                self.continuation_pattern_tp_pct,
            ),
        }
    }
}

/// Zone strength sub-score weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneWeights {
    pub touch: f64,
    pub recency: f64,
    pub rejection: f64,
}

impl Default for ZoneWeights {
    fn default() -> Self {
        Self {
            touch: 0.5,
            recency: 0.2,
            rejection: 0.3,
        }
    }
}

/// Composite signal weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub zone: f64,
    pub pattern: f64,
    pub momentum: f64,
    pub volatility: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            zone: 0.30,
            pattern: 0.35,
            momentum: 0.20,
            volatility: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Candles averaged for volume confirmation.
    pub price_action_lookback: usize,
    pub breakout_threshold: f64,
    pub volatility_window: usize,
    pub volatility_min: f64,
    pub volatility_max: f64,
    pub momentum_window: usize,
    pub momentum_threshold: f64,
    pub zone_width: f64,
    /// Half-width of the local-extremum window used to seed zones.
    pub extremum_window: usize,
    /// Candles after a touch in which a close outside the zone counts as a rejection.
    pub rejection_lookahead: usize,
    pub min_zone_strength: u8,
    pub min_signal_strength: f64,
    /// Minimum lead of the winning direction over the other.
    pub dominance_margin: f64,
    /// A direction with no pattern cannot produce a signal.
    pub require_pattern: bool,
    pub enable_multi_candle_patterns: bool,
    pub pin_bar_max_body: f64,
    pub pin_bar_min_wick: f64,
    pub pin_bar_max_opposite_wick: f64,
    pub marubozu_min_body: f64,
    pub tweezer_tolerance: f64,
    pub zone_weights: ZoneWeights,
    pub score_weights: ScoreWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            price_action_lookback: 12,
            breakout_threshold: 0.008,
            volatility_window: 14,
            volatility_min: 0.0005,
            volatility_max: 0.03,
            momentum_window: 10,
            momentum_threshold: 0.007,
            zone_width: 0.006,
            extremum_window: 2,
            rejection_lookahead: 2,
            min_zone_strength: 3,
            min_signal_strength: 4.0,
            dominance_margin: 1.0,
            require_pattern: true,
            enable_multi_candle_patterns: true,
            pin_bar_max_body: 0.30,
            pin_bar_min_wick: 0.60,
            pin_bar_max_opposite_wick: 0.15,
            marubozu_min_body: 0.87,
            tweezer_tolerance: 0.002,
            zone_weights: ZoneWeights::default(),
            score_weights: ScoreWeights::default(),
        }
    }
}

/// Lot-size filters applied by the sizer. Zero disables a filter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub min_qty: f64,
    pub qty_step: f64,
    pub min_notional: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    /// Commission per side as a fraction of notional.
    pub commission: f64,
    pub min_profit_pct: f64,
    pub min_win_rate: f64,
    pub max_drawdown: f64,
    pub min_profit_factor: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 50.0,
            commission: 0.0004,
            min_profit_pct: 10.0,
            min_win_rate: 40.0,
            max_drawdown: 30.0,
            min_profit_factor: 1.2,
        }
    }
}

// ─── Loading ────────────────────────────────────────────────────────

impl StrategyConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: StrategyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, apply process environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: StrategyConfig = toml::from_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = StrategyConfig::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup: &lookup };

        env.string("TRADING_SYMBOL", &mut self.market.symbol);
        env.string("TIMEFRAME", &mut self.market.timeframe);
        env.string("STRATEGY", &mut self.market.strategy);

        let r = &mut self.risk;
        env.parse("LEVERAGE", &mut r.leverage)?;
        env.parse("FIXED_TRADE_PERCENTAGE", &mut r.fixed_trade_percentage)?;
        env.parse("MAX_OPEN_POSITIONS", &mut r.max_open_positions)?;
        env.parse("MARGIN_SAFETY_FACTOR", &mut r.margin_safety_factor)?;
        env.parse("MAX_POSITION_SIZE_PCT", &mut r.max_position_size_pct)?;
        env.parse("STOP_LOSS_PCT", &mut r.stop_loss_pct)?;
        env.parse("TAKE_PROFIT_PCT", &mut r.take_profit_pct)?;
        env.flag("PATTERN_SPECIFIC_RISK", &mut r.pattern_specific_risk)?;
        env.parse("REVERSAL_PATTERN_STOP_PCT", &mut r.reversal_pattern_stop_pct)?;
        env.parse("BREAKOUT_PATTERN_STOP_PCT", &mut r.breakout_pattern_stop_pct)?;
        env.parse(
            "CONTINUATION_PATTERN_STOP_PCT",
            &mut r.continuation_pattern_stop_pct,
        )?;
        env.parse("REVERSAL_PATTERN_TP_PCT", &mut r.reversal_pattern_tp_pct)?;
        env.parse("BREAKOUT_PATTERN_TP_PCT", &mut r.breakout_pattern_tp_pct)?;
        env.parse(
            "CONTINUATION_PATTERN_TP_PCT",
            &mut r.continuation_pattern_tp_pct,
        )?;
        env.flag("TRAILING_STOP", &mut r.trailing_stop)?;
        env.parse("TRAILING_STOP_PCT", &mut r.trailing_stop_pct)?;

        let a = &mut self.analysis;
        env.parse("PRICE_ACTION_LOOKBACK", &mut a.price_action_lookback)?;
        env.parse("BREAKOUT_THRESHOLD", &mut a.breakout_threshold)?;
        env.parse("VOLATILITY_WINDOW", &mut a.volatility_window)?;
        env.parse("MOMENTUM_WINDOW", &mut a.momentum_window)?;
        env.parse("ZONE_WIDTH", &mut a.zone_width)?;
        env.parse("MIN_SIGNAL_STRENGTH", &mut a.min_signal_strength)?;
        env.parse("MIN_ZONE_STRENGTH", &mut a.min_zone_strength)?;
        env.flag(
            "ENABLE_MULTI_CANDLE_PATTERNS",
            &mut a.enable_multi_candle_patterns,
        )?;

        let b = &mut self.backtest;
        env.parse("BACKTEST_INITIAL_BALANCE", &mut b.initial_balance)?;
        env.parse("BACKTEST_COMMISSION", &mut b.commission)?;
        env.parse("BACKTEST_MIN_PROFIT_PCT", &mut b.min_profit_pct)?;
        env.parse("BACKTEST_MIN_WIN_RATE", &mut b.min_win_rate)?;
        env.parse("BACKTEST_MAX_DRAWDOWN", &mut b.max_drawdown)?;
        env.parse("BACKTEST_MIN_PROFIT_FACTOR", &mut b.min_profit_factor)?;

        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Strategy::from_name(&self.market.strategy)?;
        self.interval_ms()?;
        if self.market.symbol.trim().is_empty() {
            return Err(invalid("market.symbol", "must not be empty"));
        }

        let r = &self.risk;
        let a = &self.analysis;

        if self.market.buffer_capacity < self.warmup_candles() {
            return Err(invalid(
                "market.buffer_capacity",
                format!(
                    "{} is smaller than the {} candles the analysis windows need",
                    self.market.buffer_capacity,
                    self.warmup_candles()
                ),
            ));
        }
        if !(r.leverage >= 1.0) {
            return Err(invalid("risk.leverage", "must be at least 1"));
        }
        if r.max_open_positions == 0 {
            return Err(invalid("risk.max_open_positions", "must be at least 1"));
        }

        let unit_fractions = [
            ("risk.fixed_trade_percentage", r.fixed_trade_percentage),
            ("risk.margin_safety_factor", r.margin_safety_factor),
            ("risk.max_position_size_pct", r.max_position_size_pct),
        ];
        for (field, value) in unit_fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(field, format!("{value} must be in (0, 1]")));
            }
        }

        let positive = [
            ("risk.stop_loss_pct", r.stop_loss_pct),
            ("risk.take_profit_pct", r.take_profit_pct),
            ("risk.reversal_pattern_stop_pct", r.reversal_pattern_stop_pct),
            ("risk.breakout_pattern_stop_pct", r.breakout_pattern_stop_pct),
            (
                "risk.continuation_pattern_stop_pct",
                r.continuation_pattern_stop_pct,
            ),
            ("risk.reversal_pattern_tp_pct", r.reversal_pattern_tp_pct),
            ("risk.breakout_pattern_tp_pct", r.breakout_pattern_tp_pct),
            (
                "risk.continuation_pattern_tp_pct",
                r.continuation_pattern_tp_pct,
            ),
            ("risk.trailing_stop_pct", r.trailing_stop_pct),
            ("analysis.breakout_threshold", a.breakout_threshold),
            ("analysis.momentum_threshold", a.momentum_threshold),
            ("analysis.zone_width", a.zone_width),
            ("analysis.volatility_min", a.volatility_min),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value < 1.0) {
                return Err(invalid(field, format!("{value} must be in (0, 1)")));
            }
        }
        if !(r.zone_stop_buffer >= 0.0 && r.zone_stop_buffer < 1.0) {
            return Err(invalid("risk.zone_stop_buffer", "must be in [0, 1)"));
        }

        if a.volatility_max <= a.volatility_min {
            return Err(invalid(
                "analysis.volatility_max",
                "must be greater than volatility_min",
            ));
        }
        for (field, value) in [
            ("analysis.price_action_lookback", a.price_action_lookback),
            ("analysis.volatility_window", a.volatility_window),
            ("analysis.momentum_window", a.momentum_window),
            ("analysis.extremum_window", a.extremum_window),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }
        if a.min_zone_strength > 10 {
            return Err(invalid("analysis.min_zone_strength", "must be within 0..=10"));
        }
        if !(0.0..=10.0).contains(&a.min_signal_strength) {
            return Err(invalid(
                "analysis.min_signal_strength",
                "must be within 0..=10",
            ));
        }
        if !(a.dominance_margin >= 0.0) {
            return Err(invalid("analysis.dominance_margin", "must be non-negative"));
        }
        for (field, value) in [
            ("analysis.pin_bar_max_body", a.pin_bar_max_body),
            ("analysis.pin_bar_min_wick", a.pin_bar_min_wick),
            ("analysis.pin_bar_max_opposite_wick", a.pin_bar_max_opposite_wick),
            ("analysis.marubozu_min_body", a.marubozu_min_body),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(invalid(field, format!("{value} must be in (0, 1)")));
            }
        }

        let zw = a.zone_weights;
        let sw = a.score_weights;
        let weights = [
            zw.touch,
            zw.recency,
            zw.rejection,
            sw.zone,
            sw.pattern,
            sw.momentum,
            sw.volatility,
        ];
        if weights.iter().any(|w| !(*w >= 0.0)) {
            return Err(invalid("analysis weights", "must be non-negative"));
        }
        if zw.touch + zw.recency + zw.rejection <= 0.0 {
            return Err(invalid("analysis.zone_weights", "must not all be zero"));
        }
        if sw.zone + sw.pattern + sw.momentum + sw.volatility <= 0.0 {
            return Err(invalid("analysis.score_weights", "must not all be zero"));
        }

        let i = &self.instrument;
        if [i.min_qty, i.qty_step, i.min_notional]
            .iter()
            .any(|v| !(*v >= 0.0))
        {
            return Err(invalid("instrument", "filters must be non-negative"));
        }

        let b = &self.backtest;
        if !(b.initial_balance > 0.0) {
            return Err(invalid("backtest.initial_balance", "must be positive"));
        }
        if !(b.commission >= 0.0 && b.commission < 1.0) {
            return Err(invalid("backtest.commission", "must be in [0, 1)"));
        }

        Ok(())
    }

    /// Parsed strategy variant.
    pub fn strategy(&self) -> Result<Strategy, ConfigError> {
        Strategy::from_name(&self.market.strategy)
    }

    /// Candle interval in milliseconds.
    pub fn interval_ms(&self) -> Result<i64, ConfigError> {
        parse_timeframe(&self.market.timeframe)
    }

    /// Candles needed before every analysis window is populated.
    pub fn warmup_candles(&self) -> usize {
        let a = &self.analysis;
        (a.momentum_window + 1)
            .max(a.volatility_window + 1)
            .max(2 * a.extremum_window + 1)
            .max(3)
    }

    pub fn constraints(&self) -> crate::domain::InstrumentConstraints {
        crate::domain::InstrumentConstraints::new(
            self.instrument.min_qty,
            self.instrument.qty_step,
            self.instrument.min_notional,
        )
    }
}

/// Parse an exchange interval string (`1m`, `5m`, `4h`, `1d`, `1w`) into milliseconds.
pub fn parse_timeframe(timeframe: &str) -> Result<i64, ConfigError> {
    let tf = timeframe.trim();
    let unknown = || ConfigError::UnknownTimeframe(timeframe.to_string());
    let Some((split, unit)) = tf.char_indices().last() else {
        return Err(unknown());
    };
    let count: i64 = tf[..split].parse().map_err(|_| unknown())?;
    if count <= 0 {
        return Err(unknown());
    }
    let unit_ms: i64 = match unit {
        's' => 1_000,
        'm' => 60_000,
        'h' => 3_600_000,
        'd' => 86_400_000,
        'w' => 604_800_000,
        _ => return Err(unknown()),
    };
    count.checked_mul(unit_ms).ok_or_else(unknown)
}

struct EnvReader<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<'a, F: Fn(&str) -> Option<String>> EnvReader<'a, F> {
    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = (self.lookup)(key) {
            *target = value;
        }
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = (self.lookup)(key) {
            *target = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value: value.clone(),
            })?;
        }
        Ok(())
    }

    fn flag(&self, key: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(value) = (self.lookup)(key) {
            *target = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: key.to_string(),
                        value,
                    })
                }
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = StrategyConfig::default();
        config.validate().unwrap();
        assert_eq!(config.analysis.min_zone_strength, 3);
        assert_eq!(config.analysis.min_signal_strength, 4.0);
        assert_eq!(config.market.buffer_capacity, 60);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = StrategyConfig::from_toml("").unwrap();
        assert_eq!(config, StrategyConfig::default());
    }

    #[test]
    fn toml_overrides_nested_sections() {
        let config = StrategyConfig::from_toml(
            r#"
            [market]
            symbol = "ETHUSDT"
            timeframe = "15m"

            [risk]
            max_open_positions = 5
            trailing_stop = false

            [analysis.score_weights]
            pattern = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.market.symbol, "ETHUSDT");
        assert_eq!(config.interval_ms().unwrap(), 900_000);
        assert_eq!(config.risk.max_open_positions, 5);
        assert!(!config.risk.trailing_stop);
        assert_eq!(config.analysis.score_weights.pattern, 0.5);
        assert_eq!(config.analysis.score_weights.zone, 0.30);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = StrategyConfig::default();
        config
            .apply_env(env(&[
                ("LEVERAGE", "10"),
                ("MAX_OPEN_POSITIONS", "1"),
                ("TRAILING_STOP", "False"),
                ("MIN_ZONE_STRENGTH", "5"),
                ("STRATEGY", "SmartTrendCatcher"),
            ]))
            .unwrap();
        assert_eq!(config.risk.leverage, 10.0);
        assert_eq!(config.risk.max_open_positions, 1);
        assert!(!config.risk.trailing_stop);
        assert_eq!(config.analysis.min_zone_strength, 5);
        config.validate().unwrap();
    }

    #[test]
    fn malformed_env_value_is_an_error() {
        let mut config = StrategyConfig::default();
        let err = config
            .apply_env(env(&[("STOP_LOSS_PCT", "one percent")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn negative_stop_loss_is_fatal() {
        let mut config = StrategyConfig::default();
        config.risk.stop_loss_pct = -0.01;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("risk.stop_loss_pct"));
    }

    #[test]
    fn unknown_strategy_is_fatal() {
        let mut config = StrategyConfig::default();
        config.market.strategy = "MartingaleMadness".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn buffer_must_hold_the_analysis_windows() {
        let mut config = StrategyConfig::default();
        config.market.buffer_capacity = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_volatility_band_is_rejected() {
        let mut config = StrategyConfig::default();
        config.analysis.volatility_max = config.analysis.volatility_min / 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn timeframe_parsing() {
        assert_eq!(parse_timeframe("1m").unwrap(), 60_000);
        assert_eq!(parse_timeframe("5m").unwrap(), 300_000);
        assert_eq!(parse_timeframe("4h").unwrap(), 14_400_000);
        assert_eq!(parse_timeframe("1d").unwrap(), 86_400_000);
        assert!(parse_timeframe("m").is_err());
        assert!(parse_timeframe("0m").is_err());
        assert!(parse_timeframe("5x").is_err());
        assert!(parse_timeframe("").is_err());
    }

    #[test]
    fn malformed_timeframes_are_errors_not_panics() {
        assert!(matches!(
            parse_timeframe("5é"),
            Err(ConfigError::UnknownTimeframe(_))
        ));
        assert!(matches!(
            parse_timeframe("é"),
            Err(ConfigError::UnknownTimeframe(_))
        ));
        assert!(matches!(
            parse_timeframe("99999999999999999w"),
            Err(ConfigError::UnknownTimeframe(_))
        ));
    }

    #[test]
    fn flat_risk_table_when_pattern_specific_risk_off() {
        let mut risk = RiskConfig::default();
        assert_eq!(risk.stop_table(RiskClass::Reversal), (0.010, 0.018));
        assert_eq!(risk.stop_table(RiskClass::Breakout), (0.008, 0.020));
        assert_eq!(risk.stop_table(RiskClass::Continuation), (0.006, 0.012));
        risk.pattern_specific_risk = false;
        assert_eq!(risk.stop_table(RiskClass::Reversal), (0.008, 0.012));
    }
}
