//! Signal sources — boolean entry/exit series from bars.
//!
//! A signal source never sees portfolio state. Every built-in is causal:
//! the value at bar `i` depends only on `bars[..=i]`.

pub mod donchian;
pub mod func;
pub mod indicators;
pub mod ma_cross;

pub use donchian::DonchianBreakout;
pub use func::FnSignalSource;
pub use ma_cross::MovingAverageCross;

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Strategy parameter map, as read from config.
pub type StrategyParams = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("signal generation failed: {0}")]
    Failed(String),
}

/// Entry and exit flags, one per bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub entries: Vec<bool>,
    pub exits: Vec<bool>,
}

impl SignalSeries {
    pub fn new(entries: Vec<bool>, exits: Vec<bool>) -> Self {
        Self { entries, exits }
    }

    /// All-false series of length `len`.
    pub fn empty(len: usize) -> Self {
        Self::new(vec![false; len], vec![false; len])
    }

    pub fn is_aligned_to(&self, len: usize) -> bool {
        self.entries.len() == len && self.exits.len() == len
    }

    /// Pad with `false` or clip so both sequences have length `len`.
    pub fn conform(mut self, len: usize) -> Self {
        self.entries.resize(len, false);
        self.exits.resize(len, false);
        self
    }

    pub fn entry_count(&self) -> usize {
        self.entries.iter().filter(|&&e| e).count()
    }

    pub fn exit_count(&self) -> usize {
        self.exits.iter().filter(|&&e| e).count()
    }
}

/// Produces entry/exit flags for a bar series.
pub trait SignalSource: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, bars: &[Bar], params: &StrategyParams) -> Result<SignalSeries, SignalError>;
}

/// Look up a built-in source by name.
pub fn builtin_signal(name: &str) -> Option<Box<dyn SignalSource>> {
    match name {
        "ma_cross" | "sma_cross" => Some(Box::new(MovingAverageCross)),
        "donchian" | "donchian_breakout" => Some(Box::new(DonchianBreakout)),
        _ => None,
    }
}

pub const BUILTIN_SIGNALS: [&str; 2] = ["ma_cross", "donchian"];

/// Read a positive integer parameter, falling back to `default` when absent.
pub fn param_usize(
    params: &StrategyParams,
    name: &str,
    default: usize,
) -> Result<usize, SignalError> {
    let Some(value) = params.get(name) else {
        return Ok(default);
    };
    let invalid = |reason: &str| SignalError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    let n = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| invalid("expected a non-negative integer"))?;
    if n == 0 {
        return Err(invalid("must be at least 1"));
    }
    Ok(n as usize)
}
