use crate::discovery::MarketScanner;
use crate::error::{BookError, BuyError, ManualSellError};
use crate::execution::{PositionBook, TradeExecutor};
use crate::models::{CandidateToken, ClosedPosition, ExitReason, Position, SellAmount};

/// Result of one buy attempt during a snipe
#[derive(Debug, Clone, PartialEq)]
pub enum SnipeOutcome {
    Bought(Position),
    Skipped { reason: String },
    Failed(BuyError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnipeResult {
    pub candidate: CandidateToken,
    pub outcome: SnipeOutcome,
}

/// Operator-facing engine: discover, buy, list, manual sell
///
/// The monitor loop shares the same book and executor, so anything bought
/// here is picked up on its next cycle.
#[derive(Clone)]
pub struct Sniper {
    scanner: MarketScanner,
    executor: TradeExecutor,
    book: PositionBook,
    buy_amount_sol: f64,
}

impl Sniper {
    pub fn new(scanner: MarketScanner, executor: TradeExecutor, book: PositionBook, buy_amount_sol: f64) -> Self {
        Self {
            scanner,
            executor,
            book,
            buy_amount_sol,
        }
    }

    pub fn buy_amount_sol(&self) -> f64 {
        self.buy_amount_sol
    }

    /// Discover candidates and buy each one not already held
    ///
    /// Buys go one after another so every balance check sees the SOL spent
    /// by the previous buy.
    pub async fn snipe(&self) -> Vec<SnipeResult> {
        tracing::info!("🎯 Sniping: scanning for candidates...");
        let candidates = self.scanner.discover_candidates().await;
        if candidates.is_empty() {
            tracing::info!("No candidates passed the volume filter");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let outcome = self.buy_candidate(&candidate).await;
            results.push(SnipeResult { candidate, outcome });
        }

        let bought = results
            .iter()
            .filter(|r| matches!(r.outcome, SnipeOutcome::Bought(_)))
            .count();
        tracing::info!("🎯 Snipe complete: {}/{} bought", bought, results.len());

        results
    }

    async fn buy_candidate(&self, candidate: &CandidateToken) -> SnipeOutcome {
        if self.book.contains(&candidate.address) {
            return SnipeOutcome::Skipped {
                reason: "already holding a position".to_string(),
            };
        }

        let guard = self.executor.lock_token(&candidate.address).await;

        // Re-check under the guard; a concurrent snipe may have bought it
        if self.book.contains(&candidate.address) {
            return SnipeOutcome::Skipped {
                reason: "already holding a position".to_string(),
            };
        }

        let receipt = match self.executor.buy(&guard, self.buy_amount_sol).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!("  ✗ Buy {} failed: {}", candidate.address, e);
                return SnipeOutcome::Failed(e);
            }
        };

        let position = Position::from_fill(
            candidate.address.clone(),
            candidate.symbol.clone(),
            receipt.price,
            self.buy_amount_sol,
        );

        match self.book.add(position.clone()) {
            Ok(()) => {
                tracing::info!(
                    "  ✓ Opened {} | {:.6} tokens @ {:.10} SOL",
                    position.label(),
                    position.quantity,
                    position.entry_price
                );
                SnipeOutcome::Bought(position)
            }
            // Unreachable while the guard is held, but never overwrite a cost basis
            Err(BookError::AlreadyTracked(address)) => SnipeOutcome::Skipped {
                reason: format!("position for {} already tracked", address),
            },
        }
    }

    /// Read-only view of what a snipe would consider right now
    pub async fn recent(&self) -> Vec<CandidateToken> {
        self.scanner.discover_candidates().await
    }

    pub fn positions(&self) -> Vec<Position> {
        let mut positions = self.book.snapshot();
        positions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        positions
    }

    /// Sell a tracked position on operator request
    ///
    /// The position leaves the book only after the sell succeeds.
    pub async fn sell(&self, token_address: &str) -> Result<ClosedPosition, ManualSellError> {
        let guard = self.executor.lock_token(token_address).await;

        let position = self
            .book
            .get(token_address)
            .ok_or_else(|| ManualSellError::NotTracked(token_address.to_string()))?;

        let receipt = self.executor.sell(&guard, SellAmount::All).await?;
        self.book.remove(token_address);

        // A zero fill price means the venue had no quote
        let exit_price = (receipt.price > 0.0).then_some(receipt.price);
        let closed = ClosedPosition::new(position, ExitReason::Manual, exit_price, receipt.signature);

        match (closed.exit_price, closed.realized_pnl_sol) {
            (Some(price), Some(pnl)) => tracing::info!(
                "  ✓ Manually closed {} @ {:.10} | Realized: {:+.4} SOL",
                closed.position.label(),
                price,
                pnl
            ),
            _ => tracing::warn!(
                "  ✓ Manually closed {} | exit price unknown, realized P&L not computed",
                closed.position.label()
            ),
        }
        Ok(closed)
    }
}
