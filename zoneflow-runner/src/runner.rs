//! Backtest runner — wires together loading, the core backtest, metrics and
//! the validation gate.
//!
//! Two entry points:
//! - `run_symbol()`: one symbol, candles already in memory
//! - `run_symbols()`: many symbols in parallel, one independent pipeline each

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use zoneflow_core::config::{ConfigError, StrategyConfig};
use zoneflow_core::domain::Candle;
use zoneflow_core::engine::{run_backtest, BacktestReport};

use crate::gate::{GateReport, ValidationGate};
use crate::loader::{load_candles, LoadError};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error for '{symbol}': {source}")]
    Data {
        symbol: String,
        #[source]
        source: LoadError,
    },
}

/// Candle source for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolInput {
    pub symbol: String,
    pub candles: Vec<Candle>,
}

/// Complete result of one symbol's backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub metrics: PerformanceMetrics,
    pub gate: GateReport,
    pub report: BacktestReport,
}

/// Backtest one symbol. `config.market.symbol` is replaced by `symbol`.
pub fn run_symbol(
    config: &StrategyConfig,
    symbol: &str,
    candles: &[Candle],
) -> Result<SymbolResult, RunError> {
    let mut config = config.clone();
    config.market.symbol = symbol.to_string();

    let initial_equity = config.backtest.initial_balance;
    let report = run_backtest(&config, candles, initial_equity)?;
    let curve: Vec<f64> = report.equity_curve.iter().map(|p| p.equity).collect();
    let metrics = PerformanceMetrics::compute(&curve, &report.trades, initial_equity);
    let gate = ValidationGate::from_config(&config.backtest).evaluate(&metrics);

    info!(
        symbol,
        trades = metrics.trade_count,
        total_return = metrics.total_return,
        max_drawdown = metrics.max_drawdown,
        passed = gate.passed,
        "symbol backtest complete"
    );
    Ok(SymbolResult {
        symbol: symbol.to_string(),
        metrics,
        gate,
        report,
    })
}

/// Backtest every input in parallel. Results keep the input order.
pub fn run_symbols(
    config: &StrategyConfig,
    inputs: &[SymbolInput],
) -> Result<Vec<SymbolResult>, RunError> {
    config.validate()?;
    inputs
        .par_iter()
        .map(|input| run_symbol(config, &input.symbol, &input.candles))
        .collect()
}

/// Load each `(symbol, csv path)` pair, then run them all in parallel.
pub fn load_and_run(
    config: &StrategyConfig,
    sources: &[(String, PathBuf)],
) -> Result<Vec<SymbolResult>, RunError> {
    let inputs = sources
        .par_iter()
        .map(|(symbol, path)| {
            load_candles(path)
                .map(|candles| SymbolInput {
                    symbol: symbol.clone(),
                    candles,
                })
                .map_err(|source| RunError::Data {
                    symbol: symbol.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    run_symbols(config, &inputs)
}
