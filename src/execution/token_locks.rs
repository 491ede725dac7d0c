use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive right to trade one mint
///
/// Obtained from [`TokenLocks::lock`]; held for the duration of a buy or
/// sell (and any book update that goes with it). Dropping it releases the mint.
pub struct TokenGuard {
    token: String,
    _guard: OwnedMutexGuard<()>,
}

impl TokenGuard {
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for TokenGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGuard").field("token", &self.token).finish()
    }
}

/// One async mutex per mint, created on demand
#[derive(Clone, Default)]
pub struct TokenLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl TokenLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no one else is trading `token`, then take it
    pub async fn lock(&self, token: &str) -> TokenGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks
                .entry(token.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        TokenGuard {
            token: token.to_string(),
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of mints currently locked or awaited
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|m| Arc::strong_count(m) > 1).count()
    }
}
