//! CSV provider — one file per (symbol, timeframe).
//!
//! Layout: `<dir>/<SYMBOL>_<timeframe>.csv` with header
//! `timestamp,open,high,low,close,volume` and RFC 3339 timestamps.
//! `/` in symbols becomes `_` in file names (`BTC/USDT` -> `BTC_USDT_1h.csv`).

use super::provider::{check_range, filter_range, BarSeriesProvider, DataError, Timeframe};
use crate::domain::Bar;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", sanitize_symbol(symbol), timeframe))
    }

    /// Write a series in this provider's layout.
    pub fn write_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[Bar],
    ) -> Result<PathBuf, DataError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(symbol, timeframe);
        let mut writer = ::csv::Writer::from_path(&path)?;
        for bar in bars {
            writer.serialize(CsvRow {
                timestamp: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            })?;
        }
        writer.flush()?;
        Ok(path)
    }
}

impl BarSeriesProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        check_range(start, end)?;
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            });
        }

        let mut reader = ::csv::ReaderBuilder::new().trim(::csv::Trim::All).from_path(&path)?;
        let mut bars = Vec::new();
        for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| {
                DataError::Parse(format!("{} row {}: {e}", path.display(), line + 1))
            })?;
            bars.push(Bar::new(
                row.timestamp,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume,
            ));
        }
        filter_range(bars, symbol, timeframe, start, end)
    }
}

fn sanitize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
