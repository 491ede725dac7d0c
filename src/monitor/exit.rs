use serde::{Deserialize, Serialize};

use crate::models::{ExitReason, Position};

/// Take-profit / stop-loss thresholds, in percent of entry price
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExitThresholds {
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
}

impl Default for ExitThresholds {
    fn default() -> Self {
        Self {
            take_profit_pct: 100.0, // 2x
            stop_loss_pct: 50.0,    // half gone
        }
    }
}

impl ExitThresholds {
    /// Exit trigger for a given P&L percentage, if any
    pub fn check(&self, pnl_pct: f64) -> Option<ExitReason> {
        if pnl_pct >= self.take_profit_pct {
            Some(ExitReason::TakeProfit)
        } else if pnl_pct <= -self.stop_loss_pct {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }

    /// Exit trigger for `position` at `current_price`
    pub fn evaluate(&self, position: &Position, current_price: f64) -> Option<ExitReason> {
        self.check(position.pnl_percent(current_price))
    }

    /// Price at which take-profit fires
    pub fn take_profit_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + self.take_profit_pct / 100.0)
    }

    /// Price at which stop-loss fires
    pub fn stop_loss_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_pct / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(entry_price: f64) -> Position {
        Position::from_fill("MintA".to_string(), None, entry_price, 1.0)
    }

    #[test]
    fn test_take_profit_at_double() {
        let thresholds = ExitThresholds {
            take_profit_pct: 100.0,
            stop_loss_pct: 50.0,
        };
        let position = position(1.0);

        assert_eq!(thresholds.evaluate(&position, 2.0), Some(ExitReason::TakeProfit));
        assert_eq!(thresholds.evaluate(&position, 2.5), Some(ExitReason::TakeProfit));
        assert_eq!(thresholds.evaluate(&position, 1.9), None);
    }

    #[test]
    fn test_stop_loss_symmetric() {
        let thresholds = ExitThresholds {
            take_profit_pct: 100.0,
            stop_loss_pct: 50.0,
        };
        let position = position(1.0);

        assert_eq!(thresholds.evaluate(&position, 0.5), Some(ExitReason::StopLoss));
        assert_eq!(thresholds.evaluate(&position, 0.1), Some(ExitReason::StopLoss));
        assert_eq!(thresholds.evaluate(&position, 0.51), None);
    }

    #[test]
    fn test_flat_price_holds() {
        let thresholds = ExitThresholds::default();
        assert_eq!(thresholds.evaluate(&position(0.000_03), 0.000_03), None);
    }

    #[test]
    fn test_trigger_prices() {
        let thresholds = ExitThresholds {
            take_profit_pct: 50.0,
            stop_loss_pct: 20.0,
        };

        assert_eq!(thresholds.take_profit_price(2.0), 3.0);
        assert_eq!(thresholds.stop_loss_price(2.0), 1.6);
    }
}
