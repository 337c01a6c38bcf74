//! Position sizing: the smaller of a fixed fraction of equity and a
//! risk-budget size, capped by remaining exposure room.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingLimits {
    /// Max single-position value as a percent of total value.
    pub max_position_size_pct: f64,
    /// Max aggregate absolute exposure as a percent of total value.
    pub max_total_exposure_pct: f64,
    /// Stop distance the risk budget is spread over, in percent of entry.
    pub assumed_stop_distance_pct: f64,
}

impl Default for SizingLimits {
    fn default() -> Self {
        Self {
            max_position_size_pct: 10.0,
            max_total_exposure_pct: 100.0,
            assumed_stop_distance_pct: 2.0,
        }
    }
}

impl SizingLimits {
    /// Currency value to commit to a new position.
    ///
    /// `min(max_position_value, risk_based_value)`, then capped so that
    /// `current_exposure + value <= total_value * max_total_exposure_pct / 100`.
    pub fn position_value(
        &self,
        total_value: f64,
        current_exposure: f64,
        risk_per_trade_pct: f64,
    ) -> f64 {
        if !total_value.is_finite() || total_value <= 0.0 {
            return 0.0;
        }
        let max_position_value = total_value * self.max_position_size_pct / 100.0;
        let stop_distance = self.assumed_stop_distance_pct / 100.0;
        let risk_based_value = if stop_distance > 0.0 {
            (total_value * risk_per_trade_pct / 100.0) / stop_distance
        } else {
            max_position_value
        };
        let exposure_room =
            (total_value * self.max_total_exposure_pct / 100.0 - current_exposure).max(0.0);

        max_position_value
            .min(risk_based_value)
            .min(exposure_room)
            .max(0.0)
    }

    /// Quantity for `entry_price`; 0 for a non-positive or non-finite price.
    pub fn quantity(
        &self,
        total_value: f64,
        current_exposure: f64,
        entry_price: f64,
        risk_per_trade_pct: f64,
    ) -> f64 {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return 0.0;
        }
        self.position_value(total_value, current_exposure, risk_per_trade_pct) / entry_price
    }
}
