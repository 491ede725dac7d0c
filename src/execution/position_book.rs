use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::BookError;
use crate::models::Position;

/// Thread-safe in-memory store of open positions, keyed by mint address
///
/// Clones share the same underlying map. Readers never iterate the live map:
/// `snapshot()` hands out an owned copy, so a cycle walking a snapshot can't
/// observe a half-applied add or remove.
#[derive(Clone, Default)]
pub struct PositionBook {
    positions: Arc<RwLock<HashMap<String, Position>>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new position
    ///
    /// At most one position per mint: a second add for a tracked mint is
    /// rejected and the existing cost basis is kept.
    pub fn add(&self, position: Position) -> Result<(), BookError> {
        let mut positions = self.positions.write().unwrap_or_else(PoisonError::into_inner);

        if positions.contains_key(&position.token_address) {
            return Err(BookError::AlreadyTracked(position.token_address));
        }

        tracing::debug!(
            token = %position.token_address,
            entry_price = position.entry_price,
            quantity = position.quantity,
            "Position added"
        );
        positions.insert(position.token_address.clone(), position);
        Ok(())
    }

    /// Stop tracking a mint. Removing an untracked mint is a no-op.
    pub fn remove(&self, token_address: &str) -> Option<Position> {
        let mut positions = self.positions.write().unwrap_or_else(PoisonError::into_inner);
        positions.remove(token_address)
    }

    /// Owned copy of every open position
    pub fn snapshot(&self) -> Vec<Position> {
        let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
        positions.values().cloned().collect()
    }

    pub fn get(&self, token_address: &str) -> Option<Position> {
        let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
        positions.get(token_address).cloned()
    }

    pub fn contains(&self, token_address: &str) -> bool {
        let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
        positions.contains_key(token_address)
    }

    pub fn len(&self) -> usize {
        let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
        positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
