//! Candle loading from exchange kline exports.
//!
//! Expected column order (Binance kline CSV):
//! `open_time, open, high, low, close, volume, close_time, ...`
//!
//! A header row is optional and detected by a non-numeric first field. Extra
//! columns are ignored. Timestamps in microseconds are scaled to milliseconds.
//! Rows are returned sorted by open time with duplicate intervals removed.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};
use zoneflow_core::domain::{Candle, CandleError};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {reason}")]
    Parse { row: usize, reason: String },

    #[error("row {row}: {source}")]
    InvalidCandle {
        row: usize,
        #[source]
        source: CandleError,
    },

    #[error("'{0}' contains no candles")]
    Empty(String),
}

/// Anything above this is a microsecond timestamp.
const MICROS_THRESHOLD: i64 = 100_000_000_000_000;

/// Load candles from a kline CSV file.
pub fn load_candles(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let candles = read_candles(file)?;
    if candles.is_empty() {
        return Err(LoadError::Empty(path.display().to_string()));
    }
    debug!(path = %path.display(), candles = candles.len(), "loaded candles");
    Ok(candles)
}

/// Parse kline CSV from any reader.
pub fn read_candles<R: Read>(reader: R) -> Result<Vec<Candle>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut candles = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if index == 0 && is_header(&record) {
            continue;
        }
        candles.push(parse_row(&record, row)?);
    }

    candles.sort_by_key(|c| c.open_time);
    let before = candles.len();
    candles.dedup_by_key(|c| c.open_time);
    if candles.len() < before {
        warn!(dropped = before - candles.len(), "dropped duplicate kline rows");
    }
    Ok(candles)
}

fn is_header(record: &csv::StringRecord) -> bool {
    record
        .get(0)
        .is_some_and(|f| f.parse::<f64>().is_err())
}

fn parse_row(record: &csv::StringRecord, row: usize) -> Result<Candle, LoadError> {
    if record.len() < 7 {
        return Err(LoadError::Parse {
            row,
            reason: format!("expected at least 7 columns, found {}", record.len()),
        });
    }
    let float = |i: usize, name: &str| -> Result<f64, LoadError> {
        record[i].parse::<f64>().map_err(|e| LoadError::Parse {
            row,
            reason: format!("{name} '{}': {e}", &record[i]),
        })
    };
    let time = |i: usize, name: &str| -> Result<i64, LoadError> {
        let raw = record[i].parse::<i64>().map_err(|e| LoadError::Parse {
            row,
            reason: format!("{name} '{}': {e}", &record[i]),
        })?;
        Ok(if raw > MICROS_THRESHOLD { raw / 1_000 } else { raw })
    };

    let candle = Candle::new(
        time(0, "open_time")?,
        time(6, "close_time")?,
        float(1, "open")?,
        float(2, "high")?,
        float(3, "low")?,
        float(4, "close")?,
        float(5, "volume")?,
    );
    candle
        .validate()
        .map_err(|source| LoadError::InvalidCandle { row, source })?;
    Ok(candle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = "\
1700000000000,100.0,101.0,99.5,100.5,12.5,1700000299999,1256.1,42,6.1,612.0,0
1700000300000,100.5,102.0,100.1,101.8,20.0,1700000599999,2020.0,50,10.0,1010.0,0
";

    #[test]
    fn parses_headerless_rows_and_ignores_extra_columns() {
        let candles = read_candles(ROWS.as_bytes()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1_700_000_000_000);
        assert_eq!(candles[0].close_time, 1_700_000_299_999);
        assert_eq!(candles[1].close, 101.8);
        assert_eq!(candles[1].volume, 20.0);
    }

    #[test]
    fn skips_header_row() {
        let csv = format!("open_time,open,high,low,close,volume,close_time\n{ROWS}");
        assert_eq!(read_candles(csv.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn sorts_and_dedups() {
        let shuffled = "\
1700000300000,100.5,102.0,100.1,101.8,20.0,1700000599999
1700000000000,100.0,101.0,99.5,100.5,12.5,1700000299999
1700000300000,100.5,102.0,100.1,101.8,20.0,1700000599999
";
        let candles = read_candles(shuffled.as_bytes()).unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles[0].close_time < candles[1].close_time);
    }

    #[test]
    fn scales_microsecond_timestamps() {
        let rows = "1700000000000000,100.0,101.0,99.5,100.5,12.5,1700000299999999\n";
        let candles = read_candles(rows.as_bytes()).unwrap();
        assert_eq!(candles[0].open_time, 1_700_000_000_000);
        assert_eq!(candles[0].close_time, 1_700_000_299_999);
    }

    #[test]
    fn short_row_is_a_parse_error() {
        let err = read_candles("1700000000000,100.0,101.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { row: 1, .. }));
    }

    #[test]
    fn inconsistent_candle_is_rejected() {
        let rows = "1700000000000,100.0,99.0,99.5,100.5,12.5,1700000299999\n";
        let err = read_candles(rows.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidCandle { row: 1, .. }));
    }
}
