//! Canonicalization — sort, dedupe and drop unusable bars.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// What [`canonicalize`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalizeReport {
    pub input_len: usize,
    pub was_unsorted: bool,
    pub duplicates_removed: usize,
    pub invalid_removed: usize,
}

impl CanonicalizeReport {
    pub fn is_clean(&self) -> bool {
        !self.was_unsorted && self.duplicates_removed == 0 && self.invalid_removed == 0
    }
}

/// Produce a strictly increasing series.
///
/// Bars with a non-finite OHLC field or a non-positive close are dropped.
/// The remainder is stably sorted by timestamp; for duplicate timestamps the
/// last occurrence wins.
pub fn canonicalize(bars: Vec<Bar>) -> (Vec<Bar>, CanonicalizeReport) {
    let mut report = CanonicalizeReport {
        input_len: bars.len(),
        ..CanonicalizeReport::default()
    };

    let mut valid: Vec<Bar> = bars
        .into_iter()
        .filter(|b| !b.is_void() && b.close > 0.0)
        .collect();
    report.invalid_removed = report.input_len - valid.len();

    report.was_unsorted = valid.windows(2).any(|w| w[0].timestamp > w[1].timestamp);
    if report.was_unsorted {
        valid.sort_by_key(|b| b.timestamp);
    }

    let mut out: Vec<Bar> = Vec::with_capacity(valid.len());
    for bar in valid {
        match out.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => {
                *last = bar;
                report.duplicates_removed += 1;
            }
            _ => out.push(bar),
        }
    }

    (out, report)
}
