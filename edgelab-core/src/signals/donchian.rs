//! Donchian breakout: enter when the close exceeds the highest high of the
//! prior `entry_period` bars, exit when it falls below the lowest low of the
//! prior `exit_period` bars.
//!
//! Params: `entry_period` (default 20), `exit_period` (default 10).

use super::indicators::{prior_max, prior_min};
use super::{param_usize, SignalError, SignalSeries, SignalSource, StrategyParams};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, Default)]
pub struct DonchianBreakout;

impl SignalSource for DonchianBreakout {
    fn name(&self) -> &str {
        "donchian"
    }

    fn generate(&self, bars: &[Bar], params: &StrategyParams) -> Result<SignalSeries, SignalError> {
        let entry_period = param_usize(params, "entry_period", 20)?;
        let exit_period = param_usize(params, "exit_period", 10)?;

        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let upper = prior_max(&highs, entry_period);
        let lower = prior_min(&lows, exit_period);

        let mut series = SignalSeries::empty(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            // NaN comparisons are false, so warmup bars stay quiet.
            series.entries[i] = bar.close > upper[i];
            series.exits[i] = bar.close < lower[i];
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::flat(t0 + Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn breakout_and_breakdown() {
        let params = StrategyParams::from([
            ("entry_period".to_string(), json!(3)),
            ("exit_period".to_string(), json!(2)),
        ]);
        let closes = [10.0, 11.0, 10.5, 12.0, 11.5, 9.0];
        let series = DonchianBreakout.generate(&bars(&closes), &params).unwrap();
        assert_eq!(series.entries, vec![false, false, false, true, false, false]);
        assert!(series.exits[5]);
        assert!(!series.exits[4]);
    }

    #[test]
    fn warmup_is_quiet() {
        let series = DonchianBreakout
            .generate(&bars(&[1.0, 2.0, 3.0]), &StrategyParams::new())
            .unwrap();
        assert_eq!(series.entry_count(), 0);
    }
}
