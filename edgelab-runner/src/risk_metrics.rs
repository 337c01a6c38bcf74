//! Risk metrics — tail loss, benchmark sensitivity and exposure.
//!
//! Pure functions: periodic returns and valuation history in, scalars out.

use chrono::{DateTime, NaiveDate, Utc};
use edgelab_core::domain::ValuationRecord;
use edgelab_core::engine::PeriodSampler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metrics::{downside_deviation, mean_f64, std_dev, volatility, PERIODS_PER_YEAR};

/// Minimum aligned return pairs before beta/alpha are computed.
pub const MIN_BENCHMARK_SAMPLES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// 5th percentile of periodic returns (negative = loss).
    pub var_95: f64,
    /// Mean of periodic returns at or below `var_95`.
    pub cvar_95: f64,
    pub volatility: f64,
    pub downside_deviation: f64,
    pub beta: f64,
    /// Annualized CAPM alpha.
    pub alpha: f64,
    pub benchmark_samples: usize,
    /// Absolute position value over total value at the last record.
    pub current_exposure: f64,
    pub max_exposure: f64,
    /// Peak of `max(0, (positions_value - cash) / total_value)`.
    pub leverage_ratio: f64,
}

impl RiskMetrics {
    pub fn compute(
        history: &[ValuationRecord],
        benchmark_returns: Option<&[(NaiveDate, f64)]>,
        risk_free_rate: f64,
    ) -> Self {
        let sampler = PeriodSampler::from_history(history);
        let returns = sampler.returns();
        let var = value_at_risk(&returns, 0.95);

        let (beta, alpha, samples) = match benchmark_returns {
            Some(bench) => {
                let (portfolio, benchmark) = align_returns(&sampler.dated_returns(), bench);
                let samples = portfolio.len();
                let (beta, alpha) = capm(&portfolio, &benchmark, risk_free_rate);
                (beta, alpha, samples)
            }
            None => (0.0, 0.0, 0),
        };

        Self {
            var_95: var,
            cvar_95: conditional_var(&returns, var),
            volatility: volatility(&returns),
            downside_deviation: downside_deviation(&returns),
            beta,
            alpha,
            benchmark_samples: samples,
            current_exposure: history.last().map_or(0.0, exposure),
            max_exposure: history.iter().map(exposure).fold(0.0, f64::max),
            leverage_ratio: history.iter().map(leverage).fold(0.0, f64::max),
        }
    }
}

// ─── Tail risk ──────────────────────────────────────────────────────

/// Linear-interpolation percentile, `q` in [0, 100].
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * weight
}

/// Return at the `(1 - confidence)` quantile.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    percentile(returns, (1.0 - confidence) * 100.0)
}

pub fn conditional_var(returns: &[f64], var: f64) -> f64 {
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= var).collect();
    mean_f64(&tail)
}

// ─── Benchmark ──────────────────────────────────────────────────────

/// Pair portfolio and benchmark returns that share a period date.
pub fn align_returns(
    portfolio: &[(NaiveDate, f64)],
    benchmark: &[(NaiveDate, f64)],
) -> (Vec<f64>, Vec<f64>) {
    let bench: BTreeMap<NaiveDate, f64> = benchmark.iter().copied().collect();
    portfolio
        .iter()
        .filter_map(|(date, r)| bench.get(date).map(|b| (*r, *b)))
        .unzip()
}

/// `(beta, alpha)`: beta = cov(p, b) / var(b); alpha is annualized
/// `(Rp - rf) - beta * (Rb - rf)`. Zero below the sample minimum or with a
/// constant benchmark.
pub fn capm(portfolio: &[f64], benchmark: &[f64], risk_free_rate: f64) -> (f64, f64) {
    let n = portfolio.len().min(benchmark.len());
    if n < MIN_BENCHMARK_SAMPLES {
        return (0.0, 0.0);
    }
    let (p, b) = (&portfolio[..n], &benchmark[..n]);
    let bench_var = std_dev(b).powi(2);
    if bench_var < 1e-18 {
        return (0.0, 0.0);
    }
    let (mp, mb) = (mean_f64(p), mean_f64(b));
    let cov = p
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mp) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64;
    let beta = cov / bench_var;
    let alpha = (mp * PERIODS_PER_YEAR - risk_free_rate)
        - beta * (mb * PERIODS_PER_YEAR - risk_free_rate);
    (beta, alpha)
}

/// Daily returns of a price series, keyed by closing date.
pub fn benchmark_returns(
    closes: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
) -> Vec<(NaiveDate, f64)> {
    let mut sampler = PeriodSampler::new();
    for (ts, close) in closes {
        sampler.observe(ts, close);
    }
    sampler.dated_returns()
}

// ─── Exposure ───────────────────────────────────────────────────────

fn exposure(record: &ValuationRecord) -> f64 {
    if record.total_value > 0.0 {
        record.positions_value.abs() / record.total_value
    } else {
        0.0
    }
}

fn leverage(record: &ValuationRecord) -> f64 {
    if record.total_value > 0.0 {
        ((record.positions_value - record.cash) / record.total_value).max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert!((percentile(&values, 5.0) - 1.2).abs() < 1e-12);
        assert_eq!(percentile(&[], 5.0), 0.0);
    }

    #[test]
    fn var_and_cvar() {
        let returns: Vec<f64> = (0..20).map(|i| (i as f64 - 10.0) / 100.0).collect();
        let var = value_at_risk(&returns, 0.95);
        // rank 0.95 between -0.10 and -0.09
        assert!((var + 0.0905).abs() < 1e-12);
        assert!((conditional_var(&returns, var) + 0.10).abs() < 1e-12);
    }

    #[test]
    fn capm_needs_ten_samples() {
        let p = [0.01; 9];
        assert_eq!(capm(&p, &p, 0.0), (0.0, 0.0));
    }

    #[test]
    fn capm_identical_series_has_unit_beta() {
        let series: Vec<f64> = (0..30).map(|i| ((i % 5) as f64 - 2.0) / 100.0).collect();
        let (beta, alpha) = capm(&series, &series, 0.02);
        assert!((beta - 1.0).abs() < 1e-12);
        assert!(alpha.abs() < 1e-12);
    }

    #[test]
    fn capm_scaled_series() {
        let bench: Vec<f64> = (0..30).map(|i| ((i % 7) as f64 - 3.0) / 100.0).collect();
        let port: Vec<f64> = bench.iter().map(|b| 2.0 * b).collect();
        let (beta, _) = capm(&port, &bench, 0.0);
        assert!((beta - 2.0).abs() < 1e-12);
    }

    #[test]
    fn align_keeps_shared_dates() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let (p, b) = align_returns(&[(d(1), 0.1), (d(2), 0.2)], &[(d(2), 0.5), (d(3), 0.6)]);
        assert_eq!(p, vec![0.2]);
        assert_eq!(b, vec![0.5]);
    }

    #[test]
    fn exposure_and_leverage_from_history() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = |i: i64, cash: f64, pos: f64| ValuationRecord {
            timestamp: t0 + Duration::days(i),
            total_value: cash + pos,
            cash,
            positions_value: pos,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
        };
        let history = vec![record(0, 10_000.0, 0.0), record(1, 2_000.0, 8_000.0), record(2, 10_100.0, 0.0)];
        let risk = RiskMetrics::compute(&history, None, 0.02);
        assert!((risk.max_exposure - 0.8).abs() < 1e-12);
        assert_eq!(risk.current_exposure, 0.0);
        // (8_000 - 2_000) / 10_000
        assert!((risk.leverage_ratio - 0.6).abs() < 1e-12);
        assert_eq!(risk.beta, 0.0);
    }
}
