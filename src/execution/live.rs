use async_trait::async_trait;
use std::sync::Arc;

use super::confirmation::ConfirmationPoller;
use crate::api::{MarketDataProvider, PumpPortalClient, SolanaRpcClient, TradeAmount, TradeVenue};
use crate::error::VenueError;
use crate::models::{ExecutionReceipt, SellAmount, TradeSide};

/// Real-money venue: PumpPortal submits and signs, Solana RPC confirms
///
/// The fill price recorded on the receipt is the provider price observed
/// right before submission.
pub struct PumpPortalVenue {
    portal: PumpPortalClient,
    rpc: SolanaRpcClient,
    prices: Arc<dyn MarketDataProvider>,
    poller: ConfirmationPoller,
}

impl PumpPortalVenue {
    pub fn new(
        portal: PumpPortalClient,
        rpc: SolanaRpcClient,
        prices: Arc<dyn MarketDataProvider>,
        poller: ConfirmationPoller,
    ) -> Self {
        Self {
            portal,
            rpc,
            prices,
            poller,
        }
    }

    async fn observed_price(&self, address: &str) -> Option<f64> {
        match self.prices.get_price(address).await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!("Price lookup for {} failed: {}", address, e);
                None
            }
        }
    }

    async fn execute(
        &self,
        side: TradeSide,
        address: &str,
        amount: TradeAmount,
        price: f64,
    ) -> Result<ExecutionReceipt, VenueError> {
        let request = self.portal.build_request(side, address, amount);
        let signature = self.portal.submit(&request).await?;

        tracing::info!(
            "  ⏳ {:?} {} submitted ({}), waiting up to {:?} for confirmation",
            side,
            address,
            signature,
            self.poller.timeout()
        );

        let rpc = &self.rpc;
        let sig = signature.as_str();
        self.poller
            .wait(sig, move || rpc.get_signature_status(sig))
            .await?;

        Ok(ExecutionReceipt {
            price,
            confirmed: true,
            signature: Some(signature),
        })
    }
}

#[async_trait]
impl TradeVenue for PumpPortalVenue {
    async fn buy(&self, address: &str, sol_amount: f64) -> Result<ExecutionReceipt, VenueError> {
        // No entry price means no way to track the position afterwards
        let price = self
            .observed_price(address)
            .await
            .ok_or_else(|| VenueError::NoPrice(address.to_string()))?;

        self.execute(TradeSide::Buy, address, TradeAmount::Sol(sol_amount), price)
            .await
    }

    async fn sell(&self, address: &str, amount: SellAmount) -> Result<ExecutionReceipt, VenueError> {
        // Exits go out even without a quote
        let price = match self.observed_price(address).await {
            Some(price) => price,
            None => {
                tracing::warn!("Selling {} without a reference price", address);
                0.0
            }
        };

        self.execute(TradeSide::Sell, address, TradeAmount::Sell(amount), price)
            .await
    }

    fn name(&self) -> &str {
        "pumpportal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::CandidateToken;
    use tokio::time::Duration;

    struct FixedPrice(Option<f64>);

    #[async_trait]
    impl MarketDataProvider for FixedPrice {
        async fn list_candidates(&self) -> Result<Vec<CandidateToken>, ProviderError> {
            Ok(vec![])
        }

        async fn get_price(&self, _address: &str) -> Result<Option<f64>, ProviderError> {
            Ok(self.0)
        }
    }

    const CONFIRMED: &str = r#"{"jsonrpc":"2.0","result":{"context":{"slot":9},"value":[{"slot":9,"err":null,"confirmationStatus":"confirmed"}]},"id":1}"#;

    fn venue(server: &mockito::Server, price: Option<f64>) -> PumpPortalVenue {
        PumpPortalVenue::new(
            PumpPortalClient::with_base_url(server.url(), "key".to_string()).unwrap(),
            SolanaRpcClient::new(server.url(), "Wallet111").unwrap(),
            Arc::new(FixedPrice(price)),
            ConfirmationPoller::new(Duration::from_millis(1), 3),
        )
    }

    #[tokio::test]
    async fn test_buy_confirms_and_reports_observed_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/trade")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"signature": "sigBuy", "errors": []}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(CONFIRMED)
            .create_async()
            .await;

        let receipt = venue(&server, Some(0.000_004)).buy("MintA", 0.2).await.unwrap();

        assert!(receipt.confirmed);
        assert_eq!(receipt.price, 0.000_004);
        assert_eq!(receipt.signature.as_deref(), Some("sigBuy"));
    }

    #[tokio::test]
    async fn test_buy_without_price_never_submits() {
        let mut server = mockito::Server::new_async().await;
        let trade = server
            .mock("POST", "/trade")
            .match_query(mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let result = venue(&server, None).buy("MintA", 0.2).await;

        assert!(matches!(result, Err(VenueError::NoPrice(_))));
        trade.assert_async().await;
    }

    #[tokio::test]
    async fn test_sell_times_out_when_never_confirmed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/trade")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"signature": "sigSell", "errors": []}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","result":{"context":{"slot":9},"value":[null]},"id":1}"#)
            .expect(3)
            .create_async()
            .await;

        let result = venue(&server, Some(0.1)).sell("MintA", SellAmount::All).await;

        assert!(matches!(
            result,
            Err(VenueError::ConfirmationTimeout { attempts: 3, .. })
        ));
    }
}
