//! Integration tests for the runner: CSV on disk through to a persisted report.

use proptest::prelude::*;
use std::fmt::Write as _;
use std::path::PathBuf;
use zoneflow_core::config::StrategyConfig;
use zoneflow_runner::metrics::max_drawdown;
use zoneflow_runner::{config_fingerprint, load_and_run, LoadError, RunError, RunReport};

const BAR_MS: i64 = 300_000;

fn kline_csv(prices: &[f64]) -> String {
    let mut out = String::from("open_time,open,high,low,close,volume,close_time\n");
    for (i, &p) in prices.iter().enumerate() {
        let t = 1_700_000_000_000 + i as i64 * BAR_MS;
        writeln!(out, "{t},{p},{},{},{p},10.0,{}", p + 0.1, p - 0.1, t + BAR_MS - 1).unwrap();
    }
    out
}

fn write_csv(dir: &tempfile::TempDir, name: &str, prices: &[f64]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, kline_csv(prices)).unwrap();
    path
}

#[test]
fn csv_to_report_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let btc = write_csv(&dir, "btc.csv", &vec![100.0; 60]);
    let eth = write_csv(&dir, "eth.csv", &vec![2_000.0; 60]);
    let config = StrategyConfig::default();

    let results = load_and_run(
        &config,
        &[("BTCUSDT".to_string(), btc), ("ETHUSDT".to_string(), eth)],
    )
    .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].symbol, "BTCUSDT");
    assert_eq!(results[1].report.candles_processed, 60);

    let report = RunReport::new(&config, results).unwrap();
    let out = dir.path().join("report.json");
    report.write(&out).unwrap();

    let back = RunReport::read(&out).unwrap();
    assert_eq!(back.config_fingerprint, report.config_fingerprint);
    assert_eq!(back.config_fingerprint, config_fingerprint(&back.config).unwrap());
    assert_eq!(back.results.len(), 2);
    assert!(!back.all_passed());
}

#[test]
fn missing_file_names_the_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_run(
        &StrategyConfig::default(),
        &[("SOLUSDT".to_string(), dir.path().join("absent.csv"))],
    )
    .unwrap_err();
    match err {
        RunError::Data { symbol, source } => {
            assert_eq!(symbol, "SOLUSDT");
            assert!(matches!(source, LoadError::Io { .. }));
        }
        other => panic!("expected data error, got {other}"),
    }
}

#[test]
fn header_only_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "empty.csv", &[]);
    let err = load_and_run(&StrategyConfig::default(), &[("X".to_string(), path)]).unwrap_err();
    assert!(matches!(
        err,
        RunError::Data {
            source: LoadError::Empty(_),
            ..
        }
    ));
}

proptest! {
    #[test]
    fn drawdown_is_a_bounded_fraction(curve in prop::collection::vec(0.01f64..1e6, 0..200)) {
        let dd = max_drawdown(&curve);
        prop_assert!(dd <= 0.0);
        prop_assert!(dd >= -1.0);
    }

    #[test]
    fn rising_curve_has_no_drawdown(start in 1.0f64..1e4, steps in prop::collection::vec(0.0f64..10.0, 1..100)) {
        let mut curve = vec![start];
        for s in steps {
            let last = *curve.last().unwrap();
            curve.push(last + s);
        }
        prop_assert_eq!(max_drawdown(&curve), 0.0);
    }
}
