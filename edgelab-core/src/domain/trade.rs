//! Trade — one round trip (or one FIFO slice of it) in a single symbol.

use super::ids::TradeId;
use super::position::PositionSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade record.
///
/// Created open when a position is opened; finalized when the exposure it
/// backs is closed. A partial close splits off a closed slice carrying a
/// fresh id and `parent_trade_id` pointing at the still-open parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub parent_trade_id: Option<TradeId>,
    pub symbol: String,
    pub side: PositionSide,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub duration_secs: i64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub commission: f64,
    pub slippage: f64,
    pub is_winner: bool,
    pub is_open: bool,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: TradeId,
        symbol: impl Into<String>,
        side: PositionSide,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        quantity: f64,
        commission: f64,
        slippage: f64,
    ) -> Self {
        Self {
            id,
            parent_trade_id: None,
            symbol: symbol.into(),
            side,
            entry_time,
            exit_time: None,
            entry_price,
            exit_price: None,
            quantity,
            duration_secs: 0,
            pnl: 0.0,
            pnl_pct: 0.0,
            commission,
            slippage,
            is_winner: false,
            is_open: true,
        }
    }

    /// Carve `quantity` units off this open trade into a new open trade with
    /// id `slice_id`. Entry costs are pro-rated between the two.
    pub fn split(&mut self, quantity: f64, slice_id: TradeId) -> Trade {
        let fraction = if self.quantity > 0.0 {
            (quantity / self.quantity).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let slice_commission = self.commission * fraction;
        let slice_slippage = self.slippage * fraction;

        self.quantity -= quantity;
        self.commission -= slice_commission;
        self.slippage -= slice_slippage;

        let mut slice = self.clone();
        slice.id = slice_id;
        slice.parent_trade_id = Some(self.id);
        slice.quantity = quantity;
        slice.commission = slice_commission;
        slice.slippage = slice_slippage;
        slice
    }

    /// Finalize at the exit fill. PnL is net of both legs' commission.
    pub fn close(
        &mut self,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        exit_commission: f64,
        exit_slippage: f64,
    ) {
        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self.commission += exit_commission;
        self.slippage += exit_slippage;
        self.duration_secs = (exit_time - self.entry_time).num_seconds().max(0);

        let gross = self.side.sign() * (exit_price - self.entry_price) * self.quantity;
        self.pnl = gross - self.commission;
        let basis = self.entry_price * self.quantity;
        self.pnl_pct = if basis > 0.0 {
            self.pnl / basis * 100.0
        } else {
            0.0
        };
        self.is_winner = self.pnl > 0.0;
        self.is_open = false;
    }

    pub fn duration_days(&self) -> f64 {
        self.duration_secs as f64 / 86_400.0
    }
}
