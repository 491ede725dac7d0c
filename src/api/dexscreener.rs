use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use super::{http_client, MarketDataProvider, REQUEST_TIMEOUT};
use crate::error::ProviderError;
use crate::models::CandidateToken;

const DEXSCREENER_API_BASE: &str = "https://api.dexscreener.com/latest/dex";
const RATE_LIMIT_RPM: u32 = 300; // search/tokens endpoints: 300 requests per minute
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000; // Start with 2 seconds

/// Wrapped SOL mint; only pairs quoted in it carry a SOL-denominated `priceNative`
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

type DexRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Client for DexScreener API
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct DexScreenerClient {
    client: Client,
    base_url: String,
    search_query: String,
    dex_ids: Vec<String>,
    max_retries: u32,
    initial_backoff: Duration,
    rate_limiter: Arc<DexRateLimiter>,
}

#[derive(Debug, Deserialize)]
struct DexScreenerResponse {
    #[serde(default)]
    pairs: Option<Vec<PairData>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairData {
    chain_id: String,
    dex_id: String,
    base_token: TokenInfo,
    #[serde(default)]
    quote_token: Option<TokenInfo>,
    #[serde(default)]
    price_native: Option<String>,
    #[serde(default)]
    volume: VolumeData,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    address: String,
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct VolumeData {
    #[serde(default)]
    h24: f64,
}

impl DexScreenerClient {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(DEXSCREENER_API_BASE)
    }

    /// Point the client at another host (tests, proxies)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).expect("non-zero quota"));

        Ok(Self {
            client: http_client(REQUEST_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            search_query: "pump".to_string(),
            dex_ids: vec!["pumpfun".to_string(), "pumpswap".to_string()],
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Replace the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    /// Search query and DEX ids used to find launch-venue listings.
    /// An empty `dex_ids` accepts every Solana pair.
    pub fn with_listing_filter(mut self, search_query: impl Into<String>, dex_ids: Vec<String>) -> Self {
        self.search_query = search_query.into();
        self.dex_ids = dex_ids;
        self
    }

    pub fn with_retry(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    /// GET `url` with rate limiting and retry logic with exponential backoff
    async fn fetch(&self, url: &str) -> Result<DexScreenerResponse, ProviderError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.fetch_once(url).await {
                Ok(response) => {
                    if attempt > 1 {
                        tracing::info!("✓ Successfully fetched {} after {} attempts", url, attempt);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        let backoff = self.initial_backoff * 2_u32.pow(attempt - 1);
                        tracing::warn!(
                            "Attempt {}/{} failed for {}: {}. Retrying in {:?}...",
                            attempt,
                            self.max_retries,
                            url,
                            e,
                            backoff
                        );
                        sleep(backoff).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        // All retries exhausted
        Err(last_error.unwrap_or_else(|| ProviderError::Decode("no attempts made".to_string())))
    }

    /// Single request without retry logic
    async fn fetch_once(&self, url: &str) -> Result<DexScreenerResponse, ProviderError> {
        self.rate_limiter.until_ready().await;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<DexScreenerResponse>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    fn is_launch_pair(&self, pair: &PairData) -> bool {
        is_sol_pair(pair) && (self.dex_ids.is_empty() || self.dex_ids.iter().any(|id| id == &pair.dex_id))
    }
}

/// Solana pair quoted in wrapped SOL
fn is_sol_pair(pair: &PairData) -> bool {
    pair.chain_id == "solana" && pair.quote_token.as_ref().is_some_and(|q| q.address == WSOL_MINT)
}

#[async_trait]
impl MarketDataProvider for DexScreenerClient {
    async fn list_candidates(&self) -> Result<Vec<CandidateToken>, ProviderError> {
        let url = format!("{}/search?q={}", self.base_url, self.search_query);
        let response = self.fetch(&url).await?;

        let candidates: Vec<CandidateToken> = response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .filter(|p| self.is_launch_pair(p))
            .map(|p| CandidateToken {
                address: p.base_token.address,
                symbol: p.base_token.symbol,
                volume: p.volume.h24,
            })
            .collect();

        tracing::debug!("DexScreener returned {} launch listings", candidates.len());
        Ok(candidates)
    }

    async fn get_price(&self, address: &str) -> Result<Option<f64>, ProviderError> {
        let url = format!("{}/tokens/{}", self.base_url, address);
        let response = self.fetch(&url).await?;

        // Price of the token itself, quoted in SOL; USDC/USDT pools are skipped
        let pair = response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .find(|p| is_sol_pair(p) && p.base_token.address == address);

        let Some(raw) = pair.and_then(|p| p.price_native) else {
            return Ok(None);
        };

        let price: f64 = raw
            .parse()
            .map_err(|e| ProviderError::Decode(format!("bad priceNative {:?}: {}", raw, e)))?;

        Ok((price.is_finite() && price > 0.0).then_some(price))
    }
}
