//! Moving-average crossover: enter when the fast SMA crosses above the slow
//! SMA, exit when it crosses back below.
//!
//! Params: `fast_period` (default 10), `slow_period` (default 30).

use super::indicators::sma;
use super::{param_usize, SignalError, SignalSeries, SignalSource, StrategyParams};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, Default)]
pub struct MovingAverageCross;

impl SignalSource for MovingAverageCross {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn generate(&self, bars: &[Bar], params: &StrategyParams) -> Result<SignalSeries, SignalError> {
        let fast_period = param_usize(params, "fast_period", 10)?;
        let slow_period = param_usize(params, "slow_period", 30)?;
        if fast_period >= slow_period {
            return Err(SignalError::InvalidParameter {
                name: "fast_period".into(),
                reason: format!("must be below slow_period ({slow_period})"),
            });
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = sma(&closes, fast_period);
        let slow = sma(&closes, slow_period);

        let mut series = SignalSeries::empty(bars.len());
        for i in 1..bars.len() {
            let (f0, s0, f1, s1) = (fast[i - 1], slow[i - 1], fast[i], slow[i]);
            if [f0, s0, f1, s1].iter().any(|v| v.is_nan()) {
                continue;
            }
            series.entries[i] = f0 <= s0 && f1 > s1;
            series.exits[i] = f0 >= s0 && f1 < s1;
        }
        Ok(series)
    }
}
