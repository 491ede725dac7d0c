use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert a raw lamport balance into SOL units
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert SOL into lamports, rounding up so a balance check never undercounts
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).ceil() as u64
}

/// A freshly listed token observed by the market data provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateToken {
    pub address: String,     // Solana mint address
    pub symbol: Option<String>,
    pub volume: f64,         // 24h volume (USD)
}

/// An open holding tracked by the position book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub id: Uuid,
    pub token_address: String,
    pub symbol: Option<String>,
    pub entry_price: f64,    // SOL per token
    pub quantity: f64,       // tokens held
    pub sol_invested: f64,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Build a position from a confirmed buy of `sol_invested` SOL at `entry_price`
    pub fn from_fill(
        token_address: String,
        symbol: Option<String>,
        entry_price: f64,
        sol_invested: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_address,
            symbol,
            entry_price,
            quantity: sol_invested / entry_price,
            sol_invested,
            opened_at: Utc::now(),
        }
    }

    /// Short label for logs: symbol when known, otherwise the mint address
    pub fn label(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.token_address)
    }

    /// Unrealized P&L in percent at `current_price`
    pub fn pnl_percent(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) / self.entry_price * 100.0
    }

    /// P&L in SOL if the whole position were sold at `price`
    pub fn pnl_sol(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity
    }
}

/// A position that has been sold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosedPosition {
    pub position: Position,
    pub reason: ExitReason,
    /// None when the venue reported no fill price and none was observed
    pub exit_price: Option<f64>,
    pub realized_pnl_sol: Option<f64>,
    pub signature: Option<String>,
}

impl ClosedPosition {
    pub fn new(
        position: Position,
        reason: ExitReason,
        exit_price: Option<f64>,
        signature: Option<String>,
    ) -> Self {
        let realized_pnl_sol = exit_price.map(|price| position.pnl_sol(price));
        Self {
            position,
            reason,
            exit_price,
            realized_pnl_sol,
            signature,
        }
    }

    pub fn realized_pnl_pct(&self) -> Option<f64> {
        self.exit_price.map(|price| self.position.pnl_percent(price))
    }
}

/// Result of one buy or sell call against a venue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionReceipt {
    pub price: f64,
    pub confirmed: bool,
    pub signature: Option<String>, // Solana transaction signature (None for paper fills)
}

/// How much of a holding to sell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SellAmount {
    All,
    Tokens(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Manual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamport_conversion() {
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
        assert_eq!(sol_to_lamports(0.25), 250_000_000);
        assert_eq!(sol_to_lamports(1.0), LAMPORTS_PER_SOL);
    }

    #[test]
    fn test_position_from_fill() {
        let position = Position::from_fill("Mint111".to_string(), None, 0.5, 2.0);

        assert_eq!(position.entry_price, 0.5);
        assert_eq!(position.quantity, 4.0);
        assert_eq!(position.sol_invested, 2.0);
        assert_eq!(position.label(), "Mint111");
    }

    #[test]
    fn test_pnl_percent() {
        let position = Position::from_fill("Mint111".to_string(), Some("PEPE".to_string()), 1.0, 1.0);

        assert_eq!(position.pnl_percent(2.0), 100.0);
        assert_eq!(position.pnl_percent(0.5), -50.0);
        assert_eq!(position.pnl_sol(1.5), 0.5);
        assert_eq!(position.label(), "PEPE");
    }

    #[test]
    fn test_closed_position_realized_pnl() {
        let position = Position::from_fill("Mint111".to_string(), None, 0.5, 1.0);
        let closed = ClosedPosition::new(position, ExitReason::TakeProfit, Some(1.0), None);

        // 2 tokens bought at 0.5, sold at 1.0
        assert_eq!(closed.realized_pnl_sol, Some(1.0));
        assert_eq!(closed.realized_pnl_pct(), Some(100.0));
    }
}
