//! Portfolio simulator — owns cash, positions, the order and trade ledgers,
//! and the valuation history for one run.
//!
//! Per-symbol state machine:
//!
//! ```text
//! FLAT --open--> LONG|SHORT --partial close--> LONG|SHORT (smaller) --full close--> FLAT
//! ```
//!
//! A single call never crosses zero. Closing more than is open clips to the
//! open quantity; opening against opposite exposure is rejected.

use super::accounting::PeriodSampler;
use super::execution::{CashCheck, CostModel, OrderOutcome};
use super::sizing::SizingLimits;
use crate::domain::position::QTY_EPSILON;
use crate::domain::{
    Order, OrderId, OrderSide, Portfolio, Position, PositionSide, RejectReason, Trade, TradeId,
    ValuationRecord,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub initial_capital: f64,
    pub cost_model: CostModel,
    pub limits: SizingLimits,
}

impl SimulatorConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cost_model: CostModel::default(),
            limits: SizingLimits::default(),
        }
    }

    pub fn with_costs(mut self, commission_rate: f64, slippage_rate: f64) -> Self {
        self.cost_model = CostModel::new(commission_rate, slippage_rate);
        self
    }

    pub fn with_limits(mut self, limits: SizingLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// How much of an open position to close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseQuantity {
    All,
    Partial(f64),
}

/// Everything a finished run hands to the metrics engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationLedger {
    pub portfolio: Portfolio,
    pub orders: Vec<Order>,
    pub closed_trades: Vec<Trade>,
    pub open_trades: Vec<Trade>,
    pub daily_closes: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone)]
pub struct PortfolioSimulator {
    portfolio: Portfolio,
    cost_model: CostModel,
    limits: SizingLimits,
    orders: Vec<Order>,
    open_trades: Vec<Trade>,
    closed_trades: Vec<Trade>,
    sampler: PeriodSampler,
    next_order_id: u64,
    next_trade_id: u64,
}

impl PortfolioSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            portfolio: Portfolio::new(config.initial_capital),
            cost_model: config.cost_model,
            limits: config.limits,
            orders: Vec::new(),
            open_trades: Vec::new(),
            closed_trades: Vec::new(),
            sampler: PeriodSampler::new(),
            next_order_id: 1,
            next_trade_id: 1,
        }
    }

    // ─── Sizing ──────────────────────────────────────────────────────

    /// Quantity to open in `symbol` at `entry_price`.
    ///
    /// Existing exposure in `symbol` counts against the aggregate cap like any
    /// other position.
    pub fn calculate_position_size(
        &self,
        symbol: &str,
        entry_price: f64,
        risk_per_trade_pct: f64,
    ) -> f64 {
        let quantity = self.limits.quantity(
            self.portfolio.total_value(),
            self.portfolio.gross_exposure(),
            entry_price,
            risk_per_trade_pct,
        );
        debug!(symbol, entry_price, quantity, "position size");
        quantity
    }

    // ─── Open / close ────────────────────────────────────────────────

    /// Open (or add to) exposure. `Buy` opens long, `Sell` opens short.
    ///
    /// Opens are always cash-checked, shorts included. On rejection nothing
    /// but the order ledger changes.
    pub fn open_position(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<TradeId, RejectReason> {
        let order = Order::pending(self.alloc_order_id(), timestamp, symbol, side, quantity);
        let direction = match side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        };

        let current = self
            .portfolio
            .position(symbol)
            .map_or(PositionSide::Flat, Position::side);
        if current != PositionSide::Flat && current != direction {
            return Err(self.reject(order, RejectReason::OppositeExposure));
        }

        let outcome = self.cost_model.execute(
            quantity,
            price,
            side,
            CashCheck::Required {
                available: self.portfolio.cash,
            },
        );
        let (fill_price, commission, slippage) = match outcome {
            OrderOutcome::Filled {
                price,
                commission,
                slippage,
            } => (price, commission, slippage),
            OrderOutcome::Rejected(reason) => return Err(self.reject(order, reason)),
        };

        self.apply_cash(side, quantity, fill_price, commission, slippage);
        self.portfolio
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::flat(symbol))
            .add(direction.sign() * quantity, fill_price);

        let trade_id = self.alloc_trade_id();
        self.open_trades.push(Trade::open(
            trade_id,
            symbol,
            direction,
            timestamp,
            fill_price,
            quantity,
            commission,
            slippage,
        ));
        self.orders.push(order.fill(fill_price, commission, slippage));
        debug!(symbol, %trade_id, quantity, fill_price, "opened");
        Ok(trade_id)
    }

    /// Close some or all exposure in `symbol`, FIFO against open trades.
    ///
    /// Returns the ids of trades finalized by this call. Closing a flat
    /// symbol is a no-op that returns an empty list.
    pub fn close_position(
        &mut self,
        symbol: &str,
        quantity: CloseQuantity,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Vec<TradeId> {
        let Some(position) = self.portfolio.position(symbol) else {
            debug!(symbol, "close requested on flat symbol");
            return Vec::new();
        };
        let held = position.abs_quantity();
        let side = match position.side() {
            PositionSide::Long => OrderSide::Sell,
            _ => OrderSide::Buy,
        };
        let requested = match quantity {
            CloseQuantity::All => held,
            CloseQuantity::Partial(q) => q,
        };
        let close_qty = requested.min(held);
        if requested > held + QTY_EPSILON {
            debug!(symbol, requested, held, "close clipped to open quantity");
        }

        let order = Order::pending(self.alloc_order_id(), timestamp, symbol, side, close_qty);
        let (fill_price, commission, slippage) =
            match self
                .cost_model
                .execute(close_qty, price, side, CashCheck::Exempt)
            {
                OrderOutcome::Filled {
                    price,
                    commission,
                    slippage,
                } => (price, commission, slippage),
                OrderOutcome::Rejected(reason) => {
                    self.reject(order, reason);
                    return Vec::new();
                }
            };

        self.apply_cash(side, close_qty, fill_price, commission, slippage);

        let mut remaining = close_qty;
        let mut realized = 0.0;
        let mut closed_ids = Vec::new();
        let mut i = 0;
        while remaining > QTY_EPSILON && i < self.open_trades.len() {
            if self.open_trades[i].symbol != symbol {
                i += 1;
                continue;
            }
            let take = remaining.min(self.open_trades[i].quantity);
            let share = take / close_qty;
            let mut closed = if take >= self.open_trades[i].quantity - QTY_EPSILON {
                self.open_trades.remove(i)
            } else {
                let slice_id = self.alloc_trade_id();
                let slice = self.open_trades[i].split(take, slice_id);
                i += 1;
                slice
            };
            closed.close(timestamp, fill_price, commission * share, slippage * share);
            realized += closed.pnl;
            closed_ids.push(closed.id);
            self.closed_trades.push(closed);
            remaining -= take;
        }

        let (open_qty, open_cost) = self
            .open_trades
            .iter()
            .filter(|t| t.symbol == symbol)
            .fold((0.0, 0.0), |(q, c), t| (q + t.quantity, c + t.quantity * t.entry_price));
        if let Some(position) = self.portfolio.positions.get_mut(symbol) {
            position.reduce(close_qty, fill_price);
            position.realized_pnl += realized;
            if !position.is_flat() && open_qty > QTY_EPSILON {
                position.rebase(open_cost / open_qty);
            }
        }
        self.orders.push(order.fill(fill_price, commission, slippage));
        debug!(symbol, quantity = close_qty, fill_price, realized, "closed");
        closed_ids
    }

    // ─── Valuation ───────────────────────────────────────────────────

    /// Mark positions to `mark_prices` and record a valuation.
    ///
    /// A timestamp equal to the last record's replaces that record. A
    /// timestamp earlier than the last record is marked but not recorded.
    pub fn update_portfolio_value(
        &mut self,
        mark_prices: &HashMap<String, f64>,
        timestamp: DateTime<Utc>,
    ) -> ValuationRecord {
        for (symbol, position) in self.portfolio.positions.iter_mut() {
            if let Some(&price) = mark_prices.get(symbol) {
                if price.is_finite() && price > 0.0 {
                    position.mark(price);
                }
            }
        }

        let record = self.portfolio.snapshot(timestamp);
        match self.portfolio.history.last_mut() {
            Some(last) if last.timestamp == timestamp => *last = record.clone(),
            Some(last) if last.timestamp > timestamp => {
                warn!(%timestamp, last = %last.timestamp, "out-of-order valuation not recorded");
                return record;
            }
            _ => self.portfolio.history.push(record.clone()),
        }
        self.sampler.observe(timestamp, record.total_value);
        record
    }

    /// Single-symbol convenience for [`update_portfolio_value`](Self::update_portfolio_value).
    pub fn mark(&mut self, symbol: &str, price: f64, timestamp: DateTime<Utc>) -> ValuationRecord {
        let prices = HashMap::from([(symbol.to_string(), price)]);
        self.update_portfolio_value(&prices, timestamp)
    }

    // ─── Accessors ───────────────────────────────────────────────────

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn open_trades(&self) -> &[Trade] {
        &self.open_trades
    }

    pub fn closed_trades(&self) -> &[Trade] {
        &self.closed_trades
    }

    pub fn history(&self) -> &[ValuationRecord] {
        &self.portfolio.history
    }

    pub fn period_returns(&self) -> Vec<f64> {
        self.sampler.returns()
    }

    pub fn rejected_orders(&self) -> usize {
        self.orders.iter().filter(|o| o.is_rejected()).count()
    }

    pub fn is_flat(&self, symbol: &str) -> bool {
        !self.portfolio.has_position(symbol)
    }

    pub fn into_ledger(self) -> SimulationLedger {
        SimulationLedger {
            daily_closes: self.sampler.closes().to_vec(),
            portfolio: self.portfolio,
            orders: self.orders,
            closed_trades: self.closed_trades,
            open_trades: self.open_trades,
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────

    fn alloc_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    fn alloc_trade_id(&mut self) -> TradeId {
        let id = TradeId(self.next_trade_id);
        self.next_trade_id += 1;
        id
    }

    fn reject(&mut self, order: Order, reason: RejectReason) -> RejectReason {
        debug!(symbol = %order.symbol, order_id = %order.id, %reason, "order rejected");
        self.orders.push(order.reject(reason.clone()));
        reason
    }

    /// Buys pay notional plus commission; sells receive notional minus commission.
    fn apply_cash(
        &mut self,
        side: OrderSide,
        quantity: f64,
        fill_price: f64,
        commission: f64,
        slippage: f64,
    ) {
        let notional = quantity * fill_price;
        match side {
            OrderSide::Buy => self.portfolio.cash -= notional + commission,
            OrderSide::Sell => self.portfolio.cash += notional - commission,
        }
        self.portfolio.total_commission += commission;
        self.portfolio.total_slippage += slippage;
    }
}
