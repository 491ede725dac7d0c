use std::collections::HashSet;
use std::sync::Arc;

use super::filter::passes_volume_filter;
use crate::api::MarketDataProvider;
use crate::models::CandidateToken;

/// Number of candidates handed to the buy path per scan
pub const MAX_CANDIDATES: usize = 5;

/// Turns raw provider listings into a short, ranked list of buy candidates
#[derive(Clone)]
pub struct MarketScanner {
    provider: Arc<dyn MarketDataProvider>,
    min_volume: f64,
    max_candidates: usize,
}

impl MarketScanner {
    pub fn new(provider: Arc<dyn MarketDataProvider>, min_volume: f64) -> Self {
        Self {
            provider,
            min_volume,
            max_candidates: MAX_CANDIDATES,
        }
    }

    pub fn min_volume(&self) -> f64 {
        self.min_volume
    }

    /// Fetch listings, keep those with volume >= min_volume, return the top
    /// `MAX_CANDIDATES` by descending volume.
    ///
    /// Provider failures are logged and yield an empty list.
    pub async fn discover_candidates(&self) -> Vec<CandidateToken> {
        let listings = match self.provider.list_candidates().await {
            Ok(listings) => listings,
            Err(e) => {
                tracing::warn!("⚠ Candidate discovery failed: {}", e);
                return Vec::new();
            }
        };

        tracing::info!("Found {} new listings", listings.len());
        let candidates = self.rank(listings);
        tracing::info!("✅ {} candidates passed volume filter", candidates.len());

        candidates
    }

    fn rank(&self, listings: Vec<CandidateToken>) -> Vec<CandidateToken> {
        let mut seen = HashSet::new();
        let mut passing: Vec<CandidateToken> = Vec::new();

        for token in listings {
            let (passes, reason) = passes_volume_filter(&token, self.min_volume);
            if !passes {
                tracing::debug!("❌ {} - {}", token.address, reason);
                continue;
            }
            // A mint listed on several pools shows up once, with its best volume
            if !seen.insert(token.address.clone()) {
                if let Some(existing) = passing.iter_mut().find(|t| t.address == token.address) {
                    if token.volume > existing.volume {
                        *existing = token;
                    }
                }
                continue;
            }
            tracing::debug!("✅ {} - {}", token.address, reason);
            passing.push(token);
        }

        passing.sort_by(|a, b| b.volume.total_cmp(&a.volume));
        passing.truncate(self.max_candidates);
        passing
    }
}
