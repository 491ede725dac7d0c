use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::{MarketDataProvider, TradeVenue, WalletBalance};
use crate::error::{ProviderError, VenueError};
use crate::models::{lamports_to_sol, sol_to_lamports, ExecutionReceipt, SellAmount};

#[derive(Debug, Default)]
struct PaperAccount {
    lamports: u64,
    holdings: HashMap<String, f64>, // mint -> tokens
}

/// Dry-run wallet and venue in one
///
/// Fills instantly at the provider's current price and moves a simulated
/// lamport balance. Nothing touches the chain.
pub struct PaperBroker {
    prices: Arc<dyn MarketDataProvider>,
    account: Mutex<PaperAccount>,
}

impl PaperBroker {
    pub fn new(prices: Arc<dyn MarketDataProvider>, starting_sol: f64) -> Self {
        Self {
            prices,
            account: Mutex::new(PaperAccount {
                lamports: sol_to_lamports(starting_sol.max(0.0)),
                holdings: HashMap::new(),
            }),
        }
    }

    /// Simulated SOL balance
    pub fn balance_sol(&self) -> f64 {
        lamports_to_sol(self.account().lamports)
    }

    /// Simulated token holding for `address`
    pub fn holding(&self, address: &str) -> f64 {
        self.account().holdings.get(address).copied().unwrap_or(0.0)
    }

    fn account(&self) -> std::sync::MutexGuard<'_, PaperAccount> {
        self.account.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fill_price(&self, address: &str) -> Result<f64, VenueError> {
        match self.prices.get_price(address).await {
            Ok(Some(price)) if price > 0.0 => Ok(price),
            Ok(_) => Err(VenueError::NoPrice(address.to_string())),
            Err(e) => Err(VenueError::Unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl WalletBalance for PaperBroker {
    async fn balance_lamports(&self) -> Result<u64, ProviderError> {
        Ok(self.account().lamports)
    }
}

#[async_trait]
impl TradeVenue for PaperBroker {
    async fn buy(&self, address: &str, sol_amount: f64) -> Result<ExecutionReceipt, VenueError> {
        let price = self.fill_price(address).await?;
        let cost = sol_to_lamports(sol_amount);

        let mut account = self.account();
        if account.lamports < cost {
            return Err(VenueError::Rejected(format!(
                "paper balance {:.4} SOL below {:.4} SOL",
                lamports_to_sol(account.lamports),
                sol_amount
            )));
        }
        account.lamports -= cost;
        *account.holdings.entry(address.to_string()).or_insert(0.0) += sol_amount / price;

        tracing::info!("  📝 Paper BUY {} {:.4} SOL @ {:.10}", address, sol_amount, price);
        Ok(ExecutionReceipt {
            price,
            confirmed: true,
            signature: None,
        })
    }

    async fn sell(&self, address: &str, amount: SellAmount) -> Result<ExecutionReceipt, VenueError> {
        let price = self.fill_price(address).await?;

        let mut account = self.account();
        let held = account.holdings.get(address).copied().unwrap_or(0.0);
        if held <= 0.0 {
            return Err(VenueError::Rejected(format!("no paper holdings of {}", address)));
        }

        let quantity = match amount {
            SellAmount::All => held,
            SellAmount::Tokens(tokens) => tokens.min(held),
        };

        let remaining = held - quantity;
        if remaining > 0.0 {
            account.holdings.insert(address.to_string(), remaining);
        } else {
            account.holdings.remove(address);
        }
        account.lamports += sol_to_lamports(quantity * price);

        tracing::info!("  📝 Paper SELL {} {:.2} tokens @ {:.10}", address, quantity, price);
        Ok(ExecutionReceipt {
            price,
            confirmed: true,
            signature: None,
        })
    }

    fn name(&self) -> &str {
        "paper"
    }
}
