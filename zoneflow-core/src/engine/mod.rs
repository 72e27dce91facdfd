//! Execution-facing side of the pipeline.
//!
//! - `pipeline`: per-symbol context object driven by candle closes
//! - `venue`: the outbound execution trait
//! - `backtest`: historical replay through the same pipeline

pub mod backtest;
pub mod pipeline;
pub mod venue;

pub use backtest::{run_backtest, BacktestReport, EquityPoint, RejectionRecord};
pub use pipeline::{Decision, Step, SymbolPipeline};
pub use venue::{ExecutionVenue, SubmitOutcome};
