//! Portfolio — cash, positions and the append-only valuation history.

use super::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One mark-to-market snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub timestamp: DateTime<Utc>,
    pub total_value: f64,
    pub cash: f64,
    pub positions_value: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

/// Aggregate portfolio state.
///
/// Accounting identities that hold after every operation:
/// `total_value == cash + Σ market_value` and
/// `total_pnl == Σ realized_pnl + Σ unrealized_pnl`.
///
/// Positions live in a `BTreeMap` so aggregate sums iterate in a fixed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub history: Vec<ValuationRecord>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            total_commission: 0.0,
            total_slippage: 0.0,
            history: Vec::new(),
        }
    }

    pub fn positions_value(&self) -> f64 {
        self.positions.values().map(|p| p.market_value).sum()
    }

    pub fn total_value(&self) -> f64 {
        self.cash + self.positions_value()
    }

    /// Aggregate absolute position value.
    pub fn gross_exposure(&self) -> f64 {
        self.positions.values().map(|p| p.market_value.abs()).sum()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.unrealized_pnl).sum()
    }

    pub fn total_pnl(&self) -> f64 {
        self.realized_pnl() + self.unrealized_pnl()
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.get(symbol).is_some_and(|p| !p.is_flat())
    }

    /// Position by symbol, if open.
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol).filter(|p| !p.is_flat())
    }

    /// Net signed quantity, 0 when the symbol was never traded.
    pub fn net_quantity(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.quantity)
    }

    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> ValuationRecord {
        ValuationRecord {
            timestamp,
            total_value: self.total_value(),
            cash: self.cash,
            positions_value: self.positions_value(),
            unrealized_pnl: self.unrealized_pnl(),
            realized_pnl: self.realized_pnl(),
        }
    }

    /// Last recorded total value, or the initial capital before any mark.
    pub fn last_recorded_value(&self) -> f64 {
        self.history
            .last()
            .map_or(self.initial_capital, |r| r.total_value)
    }
}
