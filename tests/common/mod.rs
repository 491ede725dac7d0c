//! In-memory market, venue and wallet for integration tests.
//!
//! Everything is deterministic and controllable from test code: listings,
//! prices, forced failures, and call counters.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

use solsniper::api::{MarketDataProvider, TradeVenue, WalletBalance};
use solsniper::discovery::MarketScanner;
use solsniper::error::{ProviderError, VenueError};
use solsniper::execution::{PositionBook, TradeExecutor};
use solsniper::models::{sol_to_lamports, CandidateToken, ExecutionReceipt, SellAmount};
use solsniper::monitor::{ExitThresholds, MonitorConfig, MonitorLoop};
use solsniper::sniper::Sniper;

pub const MIN_VOLUME: f64 = 10_000.0;
pub const BUY_AMOUNT_SOL: f64 = 1.0;

/// Listings and prices, set by the test
#[derive(Default)]
pub struct MockMarket {
    listings: Mutex<Vec<CandidateToken>>,
    prices: Mutex<HashMap<String, f64>>,
    /// Tokens whose price reads fail with a provider error
    failing: Mutex<Vec<String>>,
    price_delay: Mutex<Option<Duration>>,
    /// Extra latency for individual tokens, on top of `price_delay`
    token_delays: Mutex<HashMap<String, Duration>>,
}

impl MockMarket {
    pub fn list(&self, address: &str, volume: f64, price: f64) {
        self.listings.lock().unwrap().push(CandidateToken {
            address: address.to_string(),
            symbol: None,
            volume,
        });
        self.set_price(address, price);
    }

    pub fn set_price(&self, address: &str, price: f64) {
        self.prices.lock().unwrap().insert(address.to_string(), price);
    }

    pub fn fail_price(&self, address: &str) {
        self.failing.lock().unwrap().push(address.to_string());
    }

    pub fn delay_prices(&self, delay: Duration) {
        *self.price_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_price(&self, address: &str, delay: Duration) {
        self.token_delays
            .lock()
            .unwrap()
            .insert(address.to_string(), delay);
    }
}

#[async_trait]
impl MarketDataProvider for MockMarket {
    async fn list_candidates(&self) -> Result<Vec<CandidateToken>, ProviderError> {
        Ok(self.listings.lock().unwrap().clone())
    }

    async fn get_price(&self, address: &str) -> Result<Option<f64>, ProviderError> {
        let delay = *self.price_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let token_delay = self.token_delays.lock().unwrap().get(address).copied();
        if let Some(delay) = token_delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().iter().any(|a| a == address) {
            return Err(ProviderError::Status {
                endpoint: format!("/tokens/{}", address),
                status: 503,
            });
        }
        Ok(self.prices.lock().unwrap().get(address).copied())
    }
}

/// Venue that fills at the market's current price and keeps a SOL balance
pub struct MockVenue {
    market: Arc<MockMarket>,
    lamports: Mutex<u64>,
    fail_sells: Mutex<bool>,
    sell_delay: Mutex<Option<Duration>>,
    pub buys: AtomicU32,
    pub sells: AtomicU32,
}

impl MockVenue {
    pub fn new(market: Arc<MockMarket>, balance_sol: f64) -> Self {
        Self {
            market,
            lamports: Mutex::new(sol_to_lamports(balance_sol)),
            fail_sells: Mutex::new(false),
            sell_delay: Mutex::new(None),
            buys: AtomicU32::new(0),
            sells: AtomicU32::new(0),
        }
    }

    pub fn set_fail_sells(&self, fail: bool) {
        *self.fail_sells.lock().unwrap() = fail;
    }

    /// Every sell takes `delay` before it fills
    pub fn delay_sells(&self, delay: Duration) {
        *self.sell_delay.lock().unwrap() = Some(delay);
    }

    pub fn buy_count(&self) -> u32 {
        self.buys.load(Ordering::SeqCst)
    }

    pub fn sell_count(&self) -> u32 {
        self.sells.load(Ordering::SeqCst)
    }

    async fn market_price(&self, address: &str) -> Result<f64, VenueError> {
        match self.market.get_price(address).await {
            Ok(Some(price)) => Ok(price),
            _ => Err(VenueError::NoPrice(address.to_string())),
        }
    }
}

#[async_trait]
impl TradeVenue for MockVenue {
    async fn buy(&self, address: &str, sol_amount: f64) -> Result<ExecutionReceipt, VenueError> {
        self.buys.fetch_add(1, Ordering::SeqCst);
        let price = self.market_price(address).await?;

        let mut lamports = self.lamports.lock().unwrap();
        *lamports = lamports.saturating_sub(sol_to_lamports(sol_amount));

        Ok(ExecutionReceipt {
            price,
            confirmed: true,
            signature: Some(format!("buy-{}", address)),
        })
    }

    async fn sell(&self, address: &str, _amount: SellAmount) -> Result<ExecutionReceipt, VenueError> {
        self.sells.fetch_add(1, Ordering::SeqCst);
        let delay = *self.sell_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_sells.lock().unwrap() {
            return Err(VenueError::Rejected("no liquidity".to_string()));
        }
        let price = self.market_price(address).await?;

        Ok(ExecutionReceipt {
            price,
            confirmed: true,
            signature: Some(format!("sell-{}", address)),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[async_trait]
impl WalletBalance for MockVenue {
    async fn balance_lamports(&self) -> Result<u64, ProviderError> {
        Ok(*self.lamports.lock().unwrap())
    }
}

/// Sniper and monitor wired to the same book, venue and market
pub struct Harness {
    pub market: Arc<MockMarket>,
    pub venue: Arc<MockVenue>,
    pub book: PositionBook,
    pub sniper: Sniper,
    pub executor: TradeExecutor,
}

impl Harness {
    pub fn new(balance_sol: f64) -> Self {
        let market = Arc::new(MockMarket::default());
        let venue = Arc::new(MockVenue::new(market.clone(), balance_sol));
        let executor = TradeExecutor::new(venue.clone(), venue.clone());
        let book = PositionBook::new();
        let scanner = MarketScanner::new(market.clone(), MIN_VOLUME);
        let sniper = Sniper::new(scanner, executor.clone(), book.clone(), BUY_AMOUNT_SOL);

        Self {
            market,
            venue,
            book,
            sniper,
            executor,
        }
    }

    pub fn monitor(&self, take_profit_pct: f64, stop_loss_pct: f64) -> MonitorLoop {
        let config = MonitorConfig {
            interval: Duration::from_secs(30),
            thresholds: ExitThresholds {
                take_profit_pct,
                stop_loss_pct,
            },
            max_concurrency: 4,
            price_timeout: Duration::from_secs(15),
            sell_timeout: Duration::from_secs(120),
        };
        MonitorLoop::new(self.book.clone(), self.executor.clone(), self.market.clone(), config)
    }
}
