//! Provider trait, timeframes and structured data errors.

use crate::domain::Bar;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data for {symbol} {timeframe} between {start} and {end}")]
    NoData {
        symbol: String,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("series not found: {symbol} {timeframe}")]
    NotFound { symbol: String, timeframe: Timeframe },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown timeframe '{0}'")]
    UnknownTimeframe(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Bar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1_440,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Bars per calendar day.
    pub fn bars_per_day(self) -> f64 {
        1_440.0 / self.minutes() as f64
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.label() == normalized)
            .ok_or_else(|| DataError::UnknownTimeframe(s.to_string()))
    }
}

/// Source of OHLCV bar series.
///
/// `start` and `end` are inclusive calendar dates (UTC). An empty result is
/// reported as [`DataError::NoData`], never as an empty vector.
pub trait BarSeriesProvider: Send + Sync {
    fn name(&self) -> &str;

    fn load(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;
}

/// Shared range check for providers.
pub(crate) fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), DataError> {
    if start > end {
        return Err(DataError::InvalidRange { start, end });
    }
    Ok(())
}

/// Keep bars whose UTC date falls in `[start, end]`; empty is `NoData`.
pub(crate) fn filter_range(
    bars: impl IntoIterator<Item = Bar>,
    symbol: &str,
    timeframe: Timeframe,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Bar>, DataError> {
    let filtered: Vec<Bar> = bars
        .into_iter()
        .filter(|b| {
            let day = b.timestamp.date_naive();
            day >= start && day <= end
        })
        .collect();
    if filtered.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
            timeframe,
            start,
            end,
        });
    }
    Ok(filtered)
}
