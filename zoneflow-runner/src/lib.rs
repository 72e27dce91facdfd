//! Zoneflow Runner — backtest orchestration, metrics and the go-live gate.
//!
//! This crate builds on `zoneflow-core` to provide:
//! - Candle loading from exchange kline CSV exports
//! - Single- and multi-symbol backtest runs (symbols in parallel)
//! - Performance metrics and the go-live validation gate
//! - JSON run reports with a configuration fingerprint

pub mod gate;
pub mod loader;
pub mod metrics;
pub mod report;
pub mod runner;

pub use gate::{GateCheck, GateReport, ValidationGate};
pub use loader::{load_candles, read_candles, LoadError};
pub use metrics::PerformanceMetrics;
pub use report::{config_fingerprint, ReportError, RunReport};
pub use runner::{load_and_run, run_symbol, run_symbols, RunError, SymbolInput, SymbolResult};
