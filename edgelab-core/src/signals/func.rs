//! Closure adapter for embedding and tests.

use super::{SignalError, SignalSeries, SignalSource, StrategyParams};
use crate::domain::Bar;

type SignalFn = dyn Fn(&[Bar], &StrategyParams) -> Result<SignalSeries, SignalError> + Send + Sync;

pub struct FnSignalSource {
    name: String,
    func: Box<SignalFn>,
}

impl FnSignalSource {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Bar], &StrategyParams) -> Result<SignalSeries, SignalError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// Source that never flags anything.
    pub fn never() -> Self {
        Self::new("never", |bars, _| Ok(SignalSeries::empty(bars.len())))
    }

    /// Entry at fixed bar indices, exit at fixed bar indices.
    pub fn at_indices(entries: Vec<usize>, exits: Vec<usize>) -> Self {
        Self::new("fixed", move |bars, _| {
            let mut series = SignalSeries::empty(bars.len());
            for &i in entries.iter().filter(|&&i| i < bars.len()) {
                series.entries[i] = true;
            }
            for &i in exits.iter().filter(|&&i| i < bars.len()) {
                series.exits[i] = true;
            }
            Ok(series)
        })
    }
}

impl std::fmt::Debug for FnSignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSignalSource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SignalSource for FnSignalSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, bars: &[Bar], params: &StrategyParams) -> Result<SignalSeries, SignalError> {
        (self.func)(bars, params)
    }
}
