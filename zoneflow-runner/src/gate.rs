//! Go-live validation gate.
//!
//! A backtest must clear every check before a strategy configuration is
//! considered for live trading:
//! - total return of at least `min_profit_pct` percent
//! - win rate of at least `min_win_rate` percent
//! - drawdown no deeper than `max_drawdown` percent
//! - profit factor of at least `min_profit_factor`

use crate::metrics::PerformanceMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use zoneflow_core::config::BacktestConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationGate {
    pub min_profit_pct: f64,
    pub min_win_rate: f64,
    pub max_drawdown: f64,
    pub min_profit_factor: f64,
}

/// One gate check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCheck {
    pub name: String,
    pub actual: f64,
    pub threshold: f64,
    pub passed: bool,
}

impl fmt::Display for GateCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "[{mark}] {}: {:.2} (threshold {:.2})",
            self.name, self.actual, self.threshold
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub passed: bool,
    pub checks: Vec<GateCheck>,
}

impl GateReport {
    pub fn failures(&self) -> impl Iterator<Item = &GateCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

impl ValidationGate {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            min_profit_pct: config.min_profit_pct,
            min_win_rate: config.min_win_rate,
            max_drawdown: config.max_drawdown,
            min_profit_factor: config.min_profit_factor,
        }
    }

    pub fn evaluate(&self, metrics: &PerformanceMetrics) -> GateReport {
        let profit_pct = metrics.total_return * 100.0;
        let win_rate_pct = metrics.win_rate * 100.0;
        let drawdown_pct = metrics.max_drawdown.abs() * 100.0;

        let checks = vec![
            GateCheck {
                name: "profit %".into(),
                actual: profit_pct,
                threshold: self.min_profit_pct,
                passed: profit_pct >= self.min_profit_pct,
            },
            GateCheck {
                name: "win rate %".into(),
                actual: win_rate_pct,
                threshold: self.min_win_rate,
                passed: win_rate_pct >= self.min_win_rate,
            },
            GateCheck {
                name: "max drawdown %".into(),
                actual: drawdown_pct,
                threshold: self.max_drawdown,
                passed: drawdown_pct <= self.max_drawdown,
            },
            GateCheck {
                name: "profit factor".into(),
                actual: metrics.profit_factor,
                threshold: self.min_profit_factor,
                passed: metrics.profit_factor >= self.min_profit_factor,
            },
        ];
        GateReport {
            passed: checks.iter().all(|c| c.passed),
            checks,
        }
    }
}

impl Default for ValidationGate {
    fn default() -> Self {
        Self::from_config(&BacktestConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(total_return: f64, win_rate: f64, max_drawdown: f64, profit_factor: f64) -> PerformanceMetrics {
        PerformanceMetrics {
            total_return,
            max_drawdown,
            win_rate,
            profit_factor,
            trade_count: 20,
            avg_win: 1.0,
            avg_loss: -1.0,
            largest_loss: -2.0,
            total_commission: 0.1,
            final_equity: 50.0 * (1.0 + total_return),
        }
    }

    #[test]
    fn healthy_run_passes() {
        let report = ValidationGate::default().evaluate(&metrics(0.15, 0.5, -0.12, 1.6));
        assert!(report.passed);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn each_threshold_can_fail_independently() {
        let gate = ValidationGate::default();
        let cases = [
            (metrics(0.05, 0.5, -0.1, 1.6), "profit %"),
            (metrics(0.15, 0.3, -0.1, 1.6), "win rate %"),
            (metrics(0.15, 0.5, -0.35, 1.6), "max drawdown %"),
            (metrics(0.15, 0.5, -0.1, 1.1), "profit factor"),
        ];
        for (m, failing) in cases {
            let report = gate.evaluate(&m);
            assert!(!report.passed);
            let names: Vec<&str> = report.failures().map(|c| c.name.as_str()).collect();
            assert_eq!(names, vec![failing]);
        }
    }

    #[test]
    fn thresholds_are_inclusive() {
        let report = ValidationGate::default().evaluate(&metrics(0.1, 0.4, -0.3, 1.2));
        assert!(report.passed, "{:?}", report.checks);
    }

    #[test]
    fn display_marks_failures() {
        let report = ValidationGate::default().evaluate(&metrics(0.05, 0.5, -0.1, 1.6));
        let line = report.checks[0].to_string();
        assert!(line.starts_with("[FAIL] profit %"));
    }
}
