use std::future::Future;
use tokio::time::{sleep, Duration};

use crate::api::SignatureStatus;
use crate::error::{ProviderError, VenueError};

const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_MAX_ATTEMPTS: u32 = 30; // ~60s, past blockhash expiry

/// Polls a transaction's status until it lands, fails, or runs out of attempts
#[derive(Debug, Clone)]
pub struct ConfirmationPoller {
    interval: Duration,
    max_attempts: u32,
}

impl Default for ConfirmationPoller {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ConfirmationPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Total time budget before giving up
    pub fn timeout(&self) -> Duration {
        self.interval * self.max_attempts
    }

    /// Wait for `signature` to reach confirmed commitment
    ///
    /// `check` is called once per attempt. Status lookup errors count as an
    /// attempt and are retried; an on-chain error ends the wait immediately.
    pub async fn wait<F, Fut>(&self, signature: &str, mut check: F) -> Result<(), VenueError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<SignatureStatus, ProviderError>>,
    {
        for attempt in 1..=self.max_attempts {
            match check().await {
                Ok(SignatureStatus::Confirmed) => {
                    tracing::debug!(%signature, attempt, "Transaction confirmed");
                    return Ok(());
                }
                Ok(SignatureStatus::Failed(reason)) => {
                    return Err(VenueError::TransactionFailed {
                        signature: signature.to_string(),
                        reason,
                    });
                }
                Ok(status) => {
                    tracing::debug!(%signature, attempt, ?status, "Waiting for confirmation");
                }
                Err(e) => {
                    tracing::warn!(
                        "Status check {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        signature,
                        e
                    );
                }
            }

            if attempt < self.max_attempts {
                sleep(self.interval).await;
            }
        }

        Err(VenueError::ConfirmationTimeout {
            signature: signature.to_string(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn poller() -> ConfirmationPoller {
        ConfirmationPoller::new(Duration::from_millis(1), 5)
    }

    #[tokio::test]
    async fn test_confirms_after_pending() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = poller()
            .wait("sig", move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(match n {
                        0 => SignatureStatus::Pending,
                        1 => SignatureStatus::Processed,
                        _ => SignatureStatus::Confirmed,
                    })
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_on_chain_failure_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = poller()
            .wait("sig", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(SignatureStatus::Failed("custom program error".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(VenueError::TransactionFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_times_out_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = poller()
            .wait("sig", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Decode("rpc down".to_string())) }
            })
            .await;

        assert!(matches!(
            result,
            Err(VenueError::ConfirmationTimeout { attempts: 5, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_default_budget() {
        assert_eq!(ConfirmationPoller::default().timeout(), Duration::from_secs(60));
    }
}
