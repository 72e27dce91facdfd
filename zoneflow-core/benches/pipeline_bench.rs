//! Criterion benchmarks for the per-candle hot paths.
//!
//! Benchmarks:
//! 1. Zone detection over a full buffer
//! 2. Pattern recognition on the buffer tail
//! 3. One complete strategy evaluation (analysis + scoring)
//! 4. Full candle replay through the backtest

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use zoneflow_core::analysis::{Analyzer, PatternRecognizer, ZoneDetector};
use zoneflow_core::config::{AnalysisConfig, StrategyConfig};
use zoneflow_core::domain::Candle;
use zoneflow_core::engine::run_backtest;
use zoneflow_core::signals::{SignalScorer, Strategy};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_candles(n: usize) -> Vec<Candle> {
    let mut prev = 100.0;
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.15).sin() * 5.0 + (i as f64 * 0.031).cos() * 2.0;
            let open = prev;
            prev = close;
            let t = i as i64 * 300_000;
            Candle::new(
                t,
                t + 299_999,
                open,
                open.max(close) + 0.4,
                open.min(close) - 0.4,
                close,
                1_000.0 + (i % 13) as f64 * 50.0,
            )
        })
        .collect()
}

// ── 1. Zones ─────────────────────────────────────────────────────────

fn bench_zones(c: &mut Criterion) {
    let detector = ZoneDetector::from_config(&AnalysisConfig::default());
    let mut group = c.benchmark_group("zone_detection");
    for n in [60usize, 240, 1_000] {
        let candles = make_candles(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &candles, |b, candles| {
            b.iter(|| detector.detect(black_box(candles)))
        });
    }
    group.finish();
}

// ── 2. Patterns ──────────────────────────────────────────────────────

fn bench_patterns(c: &mut Criterion) {
    let recognizer = PatternRecognizer::default();
    let candles = make_candles(60);
    c.bench_function("pattern_recognition_60", |b| {
        b.iter(|| recognizer.recognize(black_box(&candles), None))
    });
}

// ── 3. Evaluation ────────────────────────────────────────────────────

fn bench_evaluation(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let analyzer = Analyzer::from_config(&config);
    let scorer = SignalScorer::from_config(&config);
    let candles = make_candles(60);
    c.bench_function("strategy_evaluate_60", |b| {
        b.iter(|| Strategy::PurePriceAction.evaluate(black_box(&candles), &analyzer, &scorer))
    });
}

// ── 4. Backtest ──────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let config = StrategyConfig::default();
    let candles = make_candles(2_000);
    c.bench_function("backtest_2000_candles", |b| {
        b.iter(|| run_backtest(&config, black_box(&candles), 1_000.0))
    });
}

criterion_group!(
    benches,
    bench_zones,
    bench_patterns,
    bench_evaluation,
    bench_backtest
);
criterion_main!(benches);
