//! Background exit monitor.
//!
//! Every tick the loop snapshots the position book, prices each position
//! concurrently, and sells the ones that crossed take-profit or stop-loss.
//! Per position, one cycle goes:
//!
//! ```text
//! OPEN -> EVALUATING -> no trigger        -> OPEN
//!                    -> SELL_TRIGGERED -> CLOSING -> CLOSED
//!                                                 -> CLOSE_FAILED -> OPEN (next cycle)
//! ```
//!
//! A failed price read or sell never removes a position and never stops
//! the loop.

pub mod exit;

pub use exit::ExitThresholds;

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};

use crate::api::MarketDataProvider;
use crate::error::SellError;
use crate::execution::{PositionBook, TradeExecutor};
use crate::models::{ClosedPosition, ExitReason, Position, SellAmount};

const DEFAULT_INTERVAL_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENCY: usize = 8;
const DEFAULT_PRICE_TIMEOUT_SECS: u64 = 15;
// Above the live venue's confirmation budget (30 polls x 2s) plus submission
const DEFAULT_SELL_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub thresholds: ExitThresholds,
    /// Positions priced/sold in parallel per cycle
    pub max_concurrency: usize,
    /// Longest wait for one token's price before skipping it this cycle
    pub price_timeout: Duration,
    /// Longest wait for one triggered sell before reporting it failed
    pub sell_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            thresholds: ExitThresholds::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            price_timeout: Duration::from_secs(DEFAULT_PRICE_TIMEOUT_SECS),
            sell_timeout: Duration::from_secs(DEFAULT_SELL_TIMEOUT_SECS),
        }
    }
}

/// What happened to one position during a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum PositionOutcome {
    /// No trigger; stays open
    Held { price: f64, pnl_pct: f64 },
    /// Price read failed or token unknown; skipped this cycle
    PriceUnavailable,
    Closed(ClosedPosition),
    /// Sell failed; stays open and is retried next cycle
    CloseFailed { reason: ExitReason, error: SellError },
    /// Sold or removed elsewhere between snapshot and sell
    AlreadyClosed,
}

/// Per-token outcomes of one monitor cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(String, PositionOutcome)>,
}

impl CycleReport {
    pub fn outcome(&self, token: &str) -> Option<&PositionOutcome> {
        self.outcomes
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, outcome)| outcome)
    }

    pub fn closed(&self) -> Vec<&ClosedPosition> {
        self.outcomes
            .iter()
            .filter_map(|(_, outcome)| match outcome {
                PositionOutcome::Closed(closed) => Some(closed),
                _ => None,
            })
            .collect()
    }

    pub fn failed_closes(&self) -> usize {
        self.count(|o| matches!(o, PositionOutcome::CloseFailed { .. }))
    }

    pub fn unpriced(&self) -> usize {
        self.count(|o| matches!(o, PositionOutcome::PriceUnavailable))
    }

    pub fn held(&self) -> usize {
        self.count(|o| matches!(o, PositionOutcome::Held { .. }))
    }

    fn count(&self, pred: impl Fn(&PositionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    fn log_summary(&self) {
        let realized: f64 = self.closed().iter().filter_map(|c| c.realized_pnl_sol).sum();

        tracing::info!("📊 Cycle Summary:");
        tracing::info!("  Positions checked: {}", self.outcomes.len());
        tracing::info!(
            "  Held: {} | Closed: {} | Close failed: {} | No price: {}",
            self.held(),
            self.closed().len(),
            self.failed_closes(),
            self.unpriced()
        );
        if !self.closed().is_empty() {
            tracing::info!("  Realized P&L: {:+.4} SOL", realized);
        }
    }
}

/// Periodic exit monitor over a shared [`PositionBook`]
pub struct MonitorLoop {
    book: PositionBook,
    executor: TradeExecutor,
    prices: Arc<dyn MarketDataProvider>,
    config: MonitorConfig,
}

impl MonitorLoop {
    pub fn new(
        book: PositionBook,
        executor: TradeExecutor,
        prices: Arc<dyn MarketDataProvider>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            book,
            executor,
            prices,
            config,
        }
    }

    /// Run cycles until `shutdown` flips to true or its sender is dropped
    ///
    /// Shutdown is only observed between cycles, so a cycle that already
    /// started runs to completion. Its sells are bounded only by `sell_timeout`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "👀 Monitor Loop starting (every {:?}, TP +{}%, SL -{}%)",
            self.config.interval,
            self.config.thresholds.take_profit_pct,
            self.config.thresholds.stop_loss_pct
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let report = self.run_cycle().await;
            if !report.outcomes.is_empty() {
                report.log_summary();
            }
        }

        tracing::info!("👀 Monitor Loop stopped");
    }

    /// One pass over a snapshot of the book
    pub async fn run_cycle(&self) -> CycleReport {
        let snapshot = self.book.snapshot();
        if snapshot.is_empty() {
            tracing::debug!("No open positions to monitor");
            return CycleReport::default();
        }

        tracing::info!("👀 [MONITOR] Checking {} open positions", snapshot.len());

        let outcomes = stream::iter(snapshot)
            .map(|position| async move {
                let outcome = self.evaluate(&position).await;
                (position.token_address, outcome)
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        CycleReport { outcomes }
    }

    async fn evaluate(&self, position: &Position) -> PositionOutcome {
        let fetch = self.prices.get_price(&position.token_address);
        let price = match timeout(self.config.price_timeout, fetch).await {
            Ok(Ok(Some(price))) => price,
            Ok(Ok(None)) => {
                tracing::warn!("  ✗ {} - no price available, skipping", position.label());
                return PositionOutcome::PriceUnavailable;
            }
            Ok(Err(e)) => {
                tracing::warn!("  ✗ {} - price fetch failed: {}", position.label(), e);
                return PositionOutcome::PriceUnavailable;
            }
            Err(_) => {
                tracing::warn!(
                    "  ✗ {} - no price within {:?}, skipping",
                    position.label(),
                    self.config.price_timeout
                );
                return PositionOutcome::PriceUnavailable;
            }
        };

        let pnl_pct = position.pnl_percent(price);
        tracing::info!(
            "    {} | Entry: {:.10} | Current: {:.10} | P&L: {:+.2}%",
            position.label(),
            position.entry_price,
            price,
            pnl_pct
        );

        match self.config.thresholds.check(pnl_pct) {
            Some(reason) => {
                tracing::info!("  🎯 {} {:?} triggered at {:+.2}%", position.label(), reason, pnl_pct);
                self.close(position, reason, price).await
            }
            None => PositionOutcome::Held { price, pnl_pct },
        }
    }

    async fn close(&self, position: &Position, reason: ExitReason, trigger_price: f64) -> PositionOutcome {
        let guard = self.executor.lock_token(&position.token_address).await;

        // The snapshot may be stale by now
        match self.book.get(&position.token_address) {
            Some(current) if current.id == position.id => {}
            _ => {
                tracing::info!("  {} already closed elsewhere", position.label());
                return PositionOutcome::AlreadyClosed;
            }
        }

        let sell = self.executor.sell(&guard, SellAmount::All);
        let result = match timeout(self.config.sell_timeout, sell).await {
            Ok(result) => result,
            Err(_) => Err(SellError::TimedOut(self.config.sell_timeout)),
        };

        match result {
            Ok(receipt) => {
                self.book.remove(&position.token_address);

                // Without a fill price the observed trigger price is the best estimate
                let exit_price = if receipt.price > 0.0 {
                    receipt.price
                } else {
                    trigger_price
                };
                let closed = ClosedPosition::new(position.clone(), reason, Some(exit_price), receipt.signature);

                tracing::info!(
                    "  ✓ Closed {} ({:?}) @ {:.10} | Realized: {:+.4} SOL ({:+.2}%)",
                    position.label(),
                    reason,
                    exit_price,
                    position.pnl_sol(exit_price),
                    position.pnl_percent(exit_price)
                );
                PositionOutcome::Closed(closed)
            }
            Err(error) => {
                tracing::error!(
                    "  ✗ Failed to close {} ({:?}): {} - will retry next cycle",
                    position.label(),
                    reason,
                    error
                );
                PositionOutcome::CloseFailed { reason, error }
            }
        }
    }
}
