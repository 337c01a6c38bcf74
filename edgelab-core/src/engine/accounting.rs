//! Period sampling of the valuation series.
//!
//! Periodic returns are the pct-change of the last valuation in each calendar
//! day (UTC). Intraday marks overwrite the running close for their day.

use crate::domain::ValuationRecord;
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, Default)]
pub struct PeriodSampler {
    closes: Vec<(NaiveDate, f64)>,
}

impl PeriodSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a finished valuation history.
    pub fn from_history(history: &[ValuationRecord]) -> Self {
        let mut sampler = Self::new();
        for record in history {
            sampler.observe(record.timestamp, record.total_value);
        }
        sampler
    }

    /// Record a valuation. Returns true when the timestamp opened a new period.
    pub fn observe(&mut self, timestamp: DateTime<Utc>, value: f64) -> bool {
        let day = timestamp.date_naive();
        match self.closes.last_mut() {
            Some((last_day, close)) if *last_day == day => {
                *close = value;
                false
            }
            _ => {
                self.closes.push((day, value));
                true
            }
        }
    }

    pub fn closes(&self) -> &[(NaiveDate, f64)] {
        &self.closes
    }

    pub fn returns(&self) -> Vec<f64> {
        let values: Vec<f64> = self.closes.iter().map(|(_, v)| *v).collect();
        pct_change(&values)
    }

    /// Period returns keyed by the date that closed them.
    pub fn dated_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.closes
            .windows(2)
            .map(|w| (w[1].0, ratio_change(w[0].1, w[1].1)))
            .collect()
    }
}

/// Simple returns between consecutive values; 0 where the base is not positive.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| ratio_change(w[0], w[1]))
        .collect()
}

fn ratio_change(prev: f64, curr: f64) -> f64 {
    if prev > 0.0 {
        curr / prev - 1.0
    } else {
        0.0
    }
}
