//! Rolling indicators used by the built-in signals. NaN marks warmup.

/// Simple moving average; `out[i]` averages `values[i+1-period..=i]`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// Highest value over the `period` values strictly before `i`.
pub fn prior_max(values: &[f64], period: usize) -> Vec<f64> {
    prior_extreme(values, period, f64::max)
}

/// Lowest value over the `period` values strictly before `i`.
pub fn prior_min(values: &[f64], period: usize) -> Vec<f64> {
    prior_extreme(values, period, f64::min)
}

fn prior_extreme(values: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    for i in period..values.len() {
        out[i] = values[i - period..i]
            .iter()
            .copied()
            .reduce(pick)
            .unwrap_or(f64::NAN);
    }
    out
}
