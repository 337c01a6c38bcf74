//! Bar series providers and data hygiene.
//!
//! Providers are read-only collaborators: the orchestrator receives one by
//! argument and never looks it up from process-wide state.

pub mod canonicalize;
pub mod csv;
pub mod memory;
pub mod provider;
pub mod synthetic;

pub use canonicalize::{canonicalize, CanonicalizeReport};
pub use csv::CsvProvider;
pub use memory::InMemoryProvider;
pub use provider::{BarSeriesProvider, DataError, Timeframe};
pub use synthetic::{SyntheticParams, SyntheticProvider};
