use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{http_client, WalletBalance, REQUEST_TIMEOUT};
use crate::error::ProviderError;

pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Minimal Solana JSON-RPC client: wallet balance and signature status
#[derive(Clone)]
pub struct SolanaRpcClient {
    client: Client,
    rpc_url: String,
    wallet: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusEntry {
    #[serde(default)]
    confirmation_status: Option<String>,
    #[serde(default)]
    err: Option<Value>,
}

/// On-chain state of a submitted transaction
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureStatus {
    /// Not seen by the cluster yet
    Pending,
    Processed,
    Confirmed,
    Failed(String),
}

impl SolanaRpcClient {
    pub fn new(rpc_url: impl Into<String>, wallet: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(REQUEST_TIMEOUT)?,
            rpc_url: rpc_url.into(),
            wallet: wallet.into(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Result<Self, ProviderError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ProviderError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.rpc_url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                endpoint: method.to_string(),
                status: status.as_u16(),
            });
        }

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(ProviderError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        parsed
            .result
            .ok_or_else(|| ProviderError::Decode(format!("{} returned no result", method)))
    }

    /// Balance of `address` in lamports
    pub async fn get_balance(&self, address: &str) -> Result<u64, ProviderError> {
        let result: WithContext<u64> = self
            .call("getBalance", json!([address, {"commitment": "confirmed"}]))
            .await?;
        Ok(result.value)
    }

    /// Current status of a transaction signature
    pub async fn get_signature_status(&self, signature: &str) -> Result<SignatureStatus, ProviderError> {
        let result: WithContext<Vec<Option<StatusEntry>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], {"searchTransactionHistory": true}]),
            )
            .await?;

        let Some(Some(entry)) = result.value.into_iter().next() else {
            return Ok(SignatureStatus::Pending);
        };

        if let Some(err) = entry.err {
            return Ok(SignatureStatus::Failed(err.to_string()));
        }

        Ok(match entry.confirmation_status.as_deref() {
            Some("confirmed") | Some("finalized") => SignatureStatus::Confirmed,
            _ => SignatureStatus::Processed,
        })
    }
}

#[async_trait]
impl WalletBalance for SolanaRpcClient {
    async fn balance_lamports(&self) -> Result<u64, ProviderError> {
        self.get_balance(&self.wallet).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    #[tokio::test]
    async fn test_get_balance() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"method": "getBalance"})),
                Matcher::Regex(WALLET.to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":2500000000},"id":1}"#)
            .create_async()
            .await;

        let client = SolanaRpcClient::new(server.url(), WALLET).unwrap();
        let lamports = client.balance_lamports().await.unwrap();

        assert_eq!(lamports, 2_500_000_000);
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid param"},"id":1}"#)
            .create_async()
            .await;

        let client = SolanaRpcClient::new(server.url(), "bad").unwrap();
        let result = client.balance_lamports().await;

        assert!(matches!(result, Err(ProviderError::Rpc { code: -32602, .. })));
    }

    #[tokio::test]
    async fn test_signature_status_variants() {
        let cases = [
            (r#"[null]"#, SignatureStatus::Pending),
            (r#"[{"slot":5,"confirmations":0,"err":null,"confirmationStatus":"processed"}]"#, SignatureStatus::Processed),
            (r#"[{"slot":5,"confirmations":null,"err":null,"confirmationStatus":"finalized"}]"#, SignatureStatus::Confirmed),
        ];

        for (value, expected) in cases {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/")
                .with_status(200)
                .with_body(format!(
                    r#"{{"jsonrpc":"2.0","result":{{"context":{{"slot":5}},"value":{}}},"id":1}}"#,
                    value
                ))
                .create_async()
                .await;

            let client = SolanaRpcClient::new(server.url(), WALLET).unwrap();
            assert_eq!(client.get_signature_status("sig").await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_failed_transaction_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","result":{"context":{"slot":5},"value":[{"slot":5,"err":{"InstructionError":[0,"Custom"]},"confirmationStatus":"confirmed"}]},"id":1}"#)
            .create_async()
            .await;

        let client = SolanaRpcClient::new(server.url(), WALLET).unwrap();
        let status = client.get_signature_status("sig").await.unwrap();

        assert!(matches!(status, SignatureStatus::Failed(reason) if reason.contains("InstructionError")));
    }
}
