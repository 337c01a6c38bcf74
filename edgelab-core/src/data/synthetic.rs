//! Synthetic provider — deterministic seeded random walk.
//!
//! The seed is a BLAKE3 hash of `(symbol, timeframe, start)`, so every call
//! with the same arguments yields the same bars on any thread. Output is
//! clearly fake and meant for development and tests.

use super::provider::{check_range, BarSeriesProvider, DataError, Timeframe};
use crate::domain::Bar;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticParams {
    pub start_price: f64,
    /// Expected return per calendar day.
    pub daily_drift: f64,
    /// Return volatility per calendar day.
    pub daily_volatility: f64,
    /// Upper bound on bars produced per load.
    pub max_bars: usize,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            daily_drift: 0.0003,
            daily_volatility: 0.02,
            max_bars: 50_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    params: SyntheticParams,
}

impl SyntheticProvider {
    pub fn new(params: SyntheticParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SyntheticParams {
        &self.params
    }

    fn seed(symbol: &str, timeframe: Timeframe, start: NaiveDate) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(timeframe.label().as_bytes());
        hasher.update(start.to_string().as_bytes());
        *hasher.finalize().as_bytes()
    }
}

impl BarSeriesProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        check_range(start, end)?;
        let mut rng = StdRng::from_seed(Self::seed(symbol, timeframe, start));

        let step = timeframe.duration();
        let scale = 1.0 / timeframe.bars_per_day();
        let drift = self.params.daily_drift * scale;
        // Uniform on [-1, 1) has variance 1/3.
        let vol = self.params.daily_volatility * scale.sqrt() * 3.0_f64.sqrt();

        let mut ts = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));
        let mut price = self.params.start_price;
        let mut bars = Vec::new();

        while ts.date_naive() <= end {
            if bars.len() >= self.params.max_bars {
                warn!(symbol, %timeframe, max_bars = self.params.max_bars, "synthetic series truncated");
                break;
            }
            let ret = drift + vol * rng.gen_range(-1.0..1.0);
            let open = price;
            let close = (price * (1.0 + ret)).max(0.01);
            let wick = vol.abs() * 0.5;
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..=wick));
            let low = (open.min(close) * (1.0 - rng.gen_range(0.0..=wick))).max(0.005);
            let volume = rng.gen_range(1_000.0..100_000.0);
            bars.push(Bar::new(ts, open, high, low, close, volume));
            price = close;
            ts += step;
        }

        if bars.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                timeframe,
                start,
                end,
            });
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn deterministic_per_arguments() {
        let provider = SyntheticProvider::default();
        let a = provider.load("BTC/USDT", Timeframe::H4, date(1, 1), date(1, 31)).unwrap();
        let b = provider.load("BTC/USDT", Timeframe::H4, date(1, 1), date(1, 31)).unwrap();
        assert_eq!(a, b);
        let other = provider.load("ETH/USDT", Timeframe::H4, date(1, 1), date(1, 31)).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn bar_count_matches_timeframe() {
        let provider = SyntheticProvider::default();
        let daily = provider.load("X", Timeframe::D1, date(1, 1), date(1, 10)).unwrap();
        assert_eq!(daily.len(), 10);
        let four_hour = provider.load("X", Timeframe::H4, date(1, 1), date(1, 2)).unwrap();
        assert_eq!(four_hour.len(), 12);
    }

    #[test]
    fn bars_are_sane_and_increasing() {
        let provider = SyntheticProvider::default();
        let bars = provider.load("X", Timeframe::H1, date(3, 1), date(3, 15)).unwrap();
        assert!(bars.iter().all(Bar::is_sane));
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn max_bars_truncates() {
        let provider = SyntheticProvider::new(SyntheticParams {
            max_bars: 5,
            ..SyntheticParams::default()
        });
        let bars = provider.load("X", Timeframe::M1, date(1, 1), date(1, 1)).unwrap();
        assert_eq!(bars.len(), 5);
    }
}
