use std::sync::Arc;

use super::token_locks::{TokenGuard, TokenLocks};
use crate::api::{TradeVenue, WalletBalance};
use crate::error::{BuyError, SellError};
use crate::models::{lamports_to_sol, sol_to_lamports, ExecutionReceipt, SellAmount};

/// Runs buys and sells against a venue
///
/// Holds no position state. Every call needs a [`TokenGuard`] for the mint,
/// so a buy and a sell on the same mint never overlap; different mints
/// trade independently.
#[derive(Clone)]
pub struct TradeExecutor {
    venue: Arc<dyn TradeVenue>,
    wallet: Arc<dyn WalletBalance>,
    locks: TokenLocks,
}

impl TradeExecutor {
    pub fn new(venue: Arc<dyn TradeVenue>, wallet: Arc<dyn WalletBalance>) -> Self {
        Self {
            venue,
            wallet,
            locks: TokenLocks::new(),
        }
    }

    /// Take exclusive trading rights on `token`
    pub async fn lock_token(&self, token: &str) -> TokenGuard {
        self.locks.lock(token).await
    }

    pub fn venue_name(&self) -> &str {
        self.venue.name()
    }

    /// Buy `sol_amount` SOL worth of the guarded token
    ///
    /// Checks the wallet first; nothing is sent to the venue unless the
    /// balance covers the amount.
    pub async fn buy(&self, guard: &TokenGuard, sol_amount: f64) -> Result<ExecutionReceipt, BuyError> {
        let token = guard.token();

        // Check 1: Sane amount
        if !sol_amount.is_finite() || sol_amount <= 0.0 {
            return Err(BuyError::InvalidAmount(sol_amount));
        }

        // Check 2: Enough SOL in the wallet
        let lamports = self
            .wallet
            .balance_lamports()
            .await
            .map_err(|e| BuyError::BalanceUnavailable(e.to_string()))?;

        if lamports < sol_to_lamports(sol_amount) {
            let available = lamports_to_sol(lamports);
            tracing::warn!(
                "  ✗ Insufficient funds for {}: need {:.4} SOL, have {:.4} SOL",
                token,
                sol_amount,
                available
            );
            return Err(BuyError::InsufficientFunds {
                required: sol_amount,
                available,
            });
        }

        // Execute
        tracing::info!("  → BUY {} for {:.4} SOL via {}", token, sol_amount, self.venue.name());
        let receipt = self
            .venue
            .buy(token, sol_amount)
            .await
            .map_err(|e| BuyError::ExecutionFailed(e.to_string()))?;

        if !receipt.confirmed {
            return Err(BuyError::ExecutionFailed("fill not confirmed".to_string()));
        }
        if !receipt.price.is_finite() || receipt.price <= 0.0 {
            return Err(BuyError::ExecutionFailed(format!(
                "venue reported invalid fill price {}",
                receipt.price
            )));
        }

        tracing::info!("  ✓ Bought {} @ {:.10} SOL", token, receipt.price);
        Ok(receipt)
    }

    /// Sell the guarded token
    pub async fn sell(&self, guard: &TokenGuard, amount: SellAmount) -> Result<ExecutionReceipt, SellError> {
        let token = guard.token();

        if let SellAmount::Tokens(quantity) = amount {
            if !quantity.is_finite() || quantity <= 0.0 {
                return Err(SellError::InvalidQuantity(quantity));
            }
        }

        tracing::info!("  → SELL {} ({:?}) via {}", token, amount, self.venue.name());
        let receipt = self
            .venue
            .sell(token, amount)
            .await
            .map_err(|e| SellError::ExecutionFailed(e.to_string()))?;

        if !receipt.confirmed {
            return Err(SellError::ExecutionFailed("fill not confirmed".to_string()));
        }

        tracing::info!("  ✓ Sold {} @ {:.10} SOL", token, receipt.price);
        Ok(receipt)
    }
}
