use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{http_client, REQUEST_TIMEOUT};
use crate::error::{ProviderError, VenueError};
use crate::models::{SellAmount, TradeSide};

// PumpPortal Lightning Transaction API
// Docs: https://pumpportal.fun/trading-api/
const PUMPPORTAL_API_BASE: &str = "https://pumpportal.fun/api";

/// Client for PumpPortal's server-signed trade endpoint
#[derive(Clone)]
pub struct PumpPortalClient {
    client: Client,
    base_url: String,
    api_key: String,
    slippage_pct: u32,
    priority_fee_sol: f64,
    pool: String,
}

/// Body of a `POST /trade` request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub action: &'static str,
    pub mint: String,
    pub amount: Value, // number, or "100%" to sell the whole holding
    pub denominated_in_sol: &'static str,
    pub slippage: u32,
    pub priority_fee: f64,
    pub pool: String,
}

#[derive(Debug, Deserialize)]
struct TradeResponse {
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    errors: Vec<Value>,
}

impl PumpPortalClient {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(PUMPPORTAL_API_BASE, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(REQUEST_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            slippage_pct: 10,
            priority_fee_sol: 0.0005,
            pool: "pump".to_string(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Result<Self, ProviderError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    pub fn with_execution_params(mut self, slippage_pct: u32, priority_fee_sol: f64) -> Self {
        self.slippage_pct = slippage_pct;
        self.priority_fee_sol = priority_fee_sol;
        self
    }

    /// Build the request body for a trade
    ///
    /// Buys are denominated in SOL, sells in tokens.
    pub fn build_request(&self, side: TradeSide, mint: &str, amount: TradeAmount) -> TradeRequest {
        let (action, denominated_in_sol) = match side {
            TradeSide::Buy => ("buy", "true"),
            TradeSide::Sell => ("sell", "false"),
        };

        let amount = match amount {
            TradeAmount::Sol(sol) => Value::from(sol),
            TradeAmount::Sell(SellAmount::Tokens(tokens)) => Value::from(tokens),
            TradeAmount::Sell(SellAmount::All) => Value::from("100%"),
        };

        TradeRequest {
            action,
            mint: mint.to_string(),
            amount,
            denominated_in_sol,
            slippage: self.slippage_pct,
            priority_fee: self.priority_fee_sol,
            pool: self.pool.clone(),
        }
    }

    /// Submit a trade and return its transaction signature
    ///
    /// The signature is only a submission receipt; confirmation is polled separately.
    pub async fn submit(&self, request: &TradeRequest) -> Result<String, VenueError> {
        let url = format!("{}/trade?api-key={}", self.base_url, self.api_key);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| VenueError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body: TradeResponse = response
            .json()
            .await
            .map_err(|e| VenueError::Unavailable(format!("bad response ({}): {}", status, e)))?;

        if !body.errors.is_empty() {
            let reasons: Vec<String> = body.errors.iter().map(|e| e.to_string()).collect();
            return Err(VenueError::Rejected(reasons.join("; ")));
        }

        match body.signature {
            Some(signature) if status.is_success() => {
                tracing::debug!(mint = %request.mint, action = request.action, %signature, "Trade submitted");
                Ok(signature)
            }
            _ => Err(VenueError::Rejected(format!("no signature returned (status {})", status))),
        }
    }
}

/// Amount argument for [`PumpPortalClient::build_request`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeAmount {
    Sol(f64),
    Sell(SellAmount),
}
