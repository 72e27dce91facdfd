//! Zoneflow CLI — backtest and configuration commands.
//!
//! Commands:
//! - `backtest` — run the strategy over one or more kline CSV files
//! - `check-config` — load, validate and print the effective configuration

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zoneflow_core::StrategyConfig;
use zoneflow_runner::{config_fingerprint, load_and_run, RunReport, SymbolResult};

#[derive(Parser)]
#[command(
    name = "zoneflow",
    about = "Zoneflow — support/resistance zone strategy backtester"
)]
struct Cli {
    /// Log level filter, used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest the configured strategy over kline CSV files.
    Backtest {
        /// Path to a TOML config file. Defaults plus environment when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data sources as SYMBOL=path, or a bare path for the configured symbol.
        #[arg(long = "data", required = true)]
        data: Vec<String>,

        /// Write the JSON run report to this path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit non-zero unless every symbol clears the go-live gate.
        #[arg(long, default_value_t = false)]
        require_pass: bool,
    },
    /// Load and validate a configuration, then print it with its fingerprint.
    CheckConfig {
        /// Path to a TOML config file. Defaults plus environment when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Commands::Backtest {
            config,
            data,
            output,
            require_pass,
        } => run_backtest_cmd(config.as_deref(), &data, output.as_deref(), require_pass),
        Commands::CheckConfig { config } => run_check_config(config.as_deref()),
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::try_new(level)
            .with_context(|| format!("invalid --log-level '{level}'"))?,
    };

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<StrategyConfig> {
    match path {
        Some(path) => StrategyConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => StrategyConfig::from_env().context("invalid configuration from environment"),
    }
}

fn parse_sources(data: &[String], default_symbol: &str) -> Result<Vec<(String, PathBuf)>> {
    let mut sources = Vec::with_capacity(data.len());
    for entry in data {
        let (symbol, path) = match entry.split_once('=') {
            Some((symbol, path)) => (symbol.trim().to_uppercase(), PathBuf::from(path.trim())),
            None => (default_symbol.to_string(), PathBuf::from(entry)),
        };
        if symbol.is_empty() {
            bail!("empty symbol in --data '{entry}'");
        }
        if sources.iter().any(|(s, _): &(String, PathBuf)| *s == symbol) {
            bail!("symbol {symbol} given more than once");
        }
        sources.push((symbol, path));
    }
    Ok(sources)
}

fn run_backtest_cmd(
    config_path: Option<&Path>,
    data: &[String],
    output: Option<&Path>,
    require_pass: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let sources = parse_sources(data, &config.market.symbol)?;
    info!(
        strategy = %config.market.strategy,
        timeframe = %config.market.timeframe,
        symbols = sources.len(),
        "starting backtest"
    );

    let results = load_and_run(&config, &sources).context("backtest failed")?;
    for result in &results {
        print_summary(result);
    }

    let report = RunReport::new(&config, results)?;
    if let Some(path) = output {
        report
            .write(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }

    if require_pass && !report.all_passed() {
        bail!("go-live gate failed");
    }
    Ok(())
}

fn run_check_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let strategy = config.strategy()?;
    let fingerprint = config_fingerprint(&config)?;

    println!("Configuration OK");
    println!("Strategy:       {strategy:?}");
    println!("Symbol:         {}", config.market.symbol);
    println!("Timeframe:      {}", config.market.timeframe);
    println!("Warmup candles: {}", config.warmup_candles());
    println!("Fingerprint:    {fingerprint}");
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("failed to render config")?
    );
    Ok(())
}

fn format_time(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => ms.to_string(),
    }
}

fn print_summary(result: &SymbolResult) {
    let report = &result.report;
    let m = &result.metrics;

    println!();
    println!("=== Backtest Result: {} ===", result.symbol);
    if let (Some(first), Some(last)) = (report.equity_curve.first(), report.equity_curve.last()) {
        println!(
            "Period:         {} to {}",
            format_time(first.time),
            format_time(last.time)
        );
    }
    println!("Candles:        {}", report.candles_processed);
    println!("Plans:          {}", report.plans.len());
    println!("Rejections:     {}", report.rejections.len());
    println!("Stop updates:   {}", report.stop_updates);
    println!("Trades:         {}", m.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Initial Equity: {:.2}", report.initial_equity);
    println!("Final Equity:   {:.2}", m.final_equity);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Avg Win:        {:.4}", m.avg_win);
    println!("Avg Loss:       {:.4}", m.avg_loss);
    println!("Largest Loss:   {:.4}", m.largest_loss);
    println!("Commission:     {:.4}", m.total_commission);
    println!();
    println!(
        "--- Go-live gate: {} ---",
        if result.gate.passed { "PASSED" } else { "FAILED" }
    );
    for check in &result.gate.checks {
        println!("{check}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_uses_configured_symbol() {
        let sources = parse_sources(&["data/btc.csv".into()], "BTCUSDT").unwrap();
        assert_eq!(sources, vec![("BTCUSDT".to_string(), PathBuf::from("data/btc.csv"))]);
    }

    #[test]
    fn symbol_prefix_is_uppercased() {
        let sources = parse_sources(&["ethusdt=eth.csv".into()], "BTCUSDT").unwrap();
        assert_eq!(sources[0].0, "ETHUSDT");
        assert_eq!(sources[0].1, PathBuf::from("eth.csv"));
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let data = vec!["A=a.csv".to_string(), "a=b.csv".to_string()];
        assert!(parse_sources(&data, "X").is_err());
    }

    #[test]
    fn cli_parses_backtest_args() {
        let cli = Cli::try_parse_from([
            "zoneflow",
            "--log-level",
            "debug",
            "backtest",
            "--data",
            "BTCUSDT=btc.csv",
            "--data",
            "ETHUSDT=eth.csv",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Backtest { data, config, .. } => {
                assert_eq!(data.len(), 2);
                assert!(config.is_none());
            }
            Commands::CheckConfig { .. } => panic!("wrong command"),
        }
    }

    #[test]
    fn format_time_renders_utc() {
        assert_eq!(format_time(1_700_000_000_000), "2023-11-14 22:13");
    }
}
