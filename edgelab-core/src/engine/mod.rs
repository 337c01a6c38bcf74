//! Simulation engine — execution model, sizing, accounting and the
//! portfolio simulator that ties them together.
//!
//! A simulator instance is single-threaded and owned by exactly one run.

pub mod accounting;
pub mod execution;
pub mod simulator;
pub mod sizing;

pub use accounting::{pct_change, PeriodSampler};
pub use execution::{CashCheck, CostModel, OrderOutcome};
pub use simulator::{CloseQuantity, PortfolioSimulator, SimulationLedger, SimulatorConfig};
pub use sizing::SizingLimits;
