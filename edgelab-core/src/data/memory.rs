//! In-memory provider for pre-loaded series.

use super::provider::{check_range, filter_range, BarSeriesProvider, DataError, Timeframe};
use crate::domain::Bar;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<(String, Timeframe), Vec<Bar>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.insert(symbol, timeframe, bars);
        self
    }

    pub fn insert(&mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.series.insert((symbol.to_string(), timeframe), bars);
    }
}

impl BarSeriesProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        check_range(start, end)?;
        let bars = self
            .series
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| DataError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
            })?;
        filter_range(bars.iter().cloned(), symbol, timeframe, start, end)
    }
}
