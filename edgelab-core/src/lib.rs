//! EdgeLab Core — bars, orders, positions, trades, the portfolio simulator,
//! bar series providers and signal sources.
//!
//! This crate holds everything a single backtest needs below the
//! orchestrator:
//! - Domain types (bars, orders, positions, trades, portfolio)
//! - Order execution model (slippage + commission, cash checks)
//! - Portfolio simulator with sizing, FIFO trade ledger and valuation history
//! - Bar series providers (memory, CSV, synthetic) and canonicalization
//! - Signal source trait and built-in causal signals

pub mod data;
pub mod domain;
pub mod engine;
pub mod signals;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types that cross validation worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::Portfolio>();
        require_sync::<domain::Portfolio>();

        require_send::<engine::PortfolioSimulator>();
        require_sync::<engine::PortfolioSimulator>();
        require_send::<engine::SimulationLedger>();

        require_send::<data::InMemoryProvider>();
        require_sync::<data::InMemoryProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();
        require_send::<data::DataError>();

        require_send::<signals::FnSignalSource>();
        require_sync::<signals::FnSignalSource>();
        require_send::<signals::SignalError>();
        require_send::<Box<dyn signals::SignalSource>>();
        require_send::<Box<dyn data::BarSeriesProvider>>();
    }
}
