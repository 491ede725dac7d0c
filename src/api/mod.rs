//! External collaborators of the engine.
//!
//! The engine only sees the three traits below; concrete clients for
//! DexScreener, Solana JSON-RPC and PumpPortal live in the submodules.

pub mod dexscreener;
pub mod pumpportal;
pub mod solana_rpc;

pub use dexscreener::DexScreenerClient;
pub use pumpportal::{PumpPortalClient, TradeAmount, TradeRequest};
pub use solana_rpc::{SignatureStatus, SolanaRpcClient};

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{ProviderError, VenueError};
use crate::models::{CandidateToken, ExecutionReceipt, SellAmount};

/// Per-request timeout applied to every outbound HTTP call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client that gives up on a request after `timeout`
pub(crate) fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Source of new listings and live prices.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current listings on the launch venue, unfiltered.
    async fn list_candidates(&self) -> Result<Vec<CandidateToken>, ProviderError>;

    /// Current price in SOL per token, `None` when the token is unknown.
    async fn get_price(&self, address: &str) -> Result<Option<f64>, ProviderError>;
}

/// Something that fills buy and sell orders.
#[async_trait]
pub trait TradeVenue: Send + Sync {
    async fn buy(&self, address: &str, sol_amount: f64) -> Result<ExecutionReceipt, VenueError>;

    async fn sell(&self, address: &str, amount: SellAmount)
        -> Result<ExecutionReceipt, VenueError>;

    /// Venue name for logging.
    fn name(&self) -> &str;
}

/// Wallet balance lookup.
#[async_trait]
pub trait WalletBalance: Send + Sync {
    async fn balance_lamports(&self) -> Result<u64, ProviderError>;
}
